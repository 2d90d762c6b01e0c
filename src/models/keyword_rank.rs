// Keyword rank capture model
// Append-only facts: one row per (keyword, device, capture time). Rows are
// only ever inserted by the rank tracking job; per keyword+device the rows
// form a time series ordered by captured_at.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::{keyword_ranks, keywords};

/// Device a SERP was captured for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Device {
    Desktop,
    Mobile,
}

impl Device {
    pub const ALL: [Device; 2] = [Device::Desktop, Device::Mobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(Device::Desktop),
            "mobile" => Ok(Device::Mobile),
            _ => Err(format!("Invalid device: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = keyword_ranks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct KeywordRank {
    pub id: Uuid,
    pub keyword_id: Uuid,
    pub device: String,
    pub rank_position: Option<i32>,
    pub map_pack_position: Option<i32>,
    pub has_featured_snippet: bool,
    pub has_people_also_ask: bool,
    pub has_local_pack: bool,
    pub has_knowledge_panel: bool,
    pub has_image_pack: bool,
    pub has_video_carousel: bool,
    pub ranking_url: Option<String>,
    pub search_location: Option<String>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = keyword_ranks)]
pub struct NewKeywordRank {
    pub keyword_id: Uuid,
    pub device: String,
    pub rank_position: Option<i32>,
    pub map_pack_position: Option<i32>,
    pub has_featured_snippet: bool,
    pub has_people_also_ask: bool,
    pub has_local_pack: bool,
    pub has_knowledge_panel: bool,
    pub has_image_pack: bool,
    pub has_video_carousel: bool,
    pub ranking_url: Option<String>,
    pub search_location: Option<String>,
    pub captured_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug)]
pub enum RankError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl KeywordRank {
    /// Append one capture; never updates
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        new_rank: NewKeywordRank,
    ) -> Result<Self, RankError> {
        diesel::insert_into(keyword_ranks::table)
            .values(&new_rank)
            .get_result::<KeywordRank>(conn)
            .await
            .map_err(RankError::Database)
    }

    /// All captures inside a half-open window `[start, end)` for the
    /// active keywords of a business (optionally one location), ordered
    /// oldest first so a fold over the result leaves the latest capture
    /// per keyword. The exclusive end keeps a capture stamped exactly on
    /// a period boundary out of the preceding window.
    pub async fn in_window_for_scope(
        conn: &mut AsyncPgConnection,
        business: Uuid,
        location: Option<Uuid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Self>, RankError> {
        let mut query = keyword_ranks::table
            .inner_join(keywords::table)
            .filter(keywords::business_id.eq(business))
            .filter(keywords::status.eq("active"))
            .filter(keyword_ranks::captured_at.ge(start))
            .filter(keyword_ranks::captured_at.lt(end))
            .into_boxed();

        if let Some(loc) = location {
            query = query.filter(keywords::location_id.eq(loc));
        }

        query
            .order(keyword_ranks::captured_at.asc())
            .select(KeywordRank::as_select())
            .load::<KeywordRank>(conn)
            .await
            .map_err(RankError::Database)
    }

    /// Capture history for a set of keywords inside a half-open range
    /// `[start, end)`, oldest first; read side of the heatmap
    pub async fn history_for_keywords(
        conn: &mut AsyncPgConnection,
        keyword_ids: &[Uuid],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Self>, RankError> {
        use crate::schema::keyword_ranks::dsl::*;

        keyword_ranks
            .filter(keyword_id.eq_any(keyword_ids))
            .filter(captured_at.ge(start))
            .filter(captured_at.lt(end))
            .order(captured_at.asc())
            .load::<KeywordRank>(conn)
            .await
            .map_err(RankError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_conversion() {
        assert_eq!(Device::Desktop.as_str(), "desktop");
        assert_eq!(Device::Mobile.as_str(), "mobile");
        assert_eq!(Device::from_str("desktop"), Ok(Device::Desktop));
        assert_eq!(Device::from_str("mobile"), Ok(Device::Mobile));
        assert!(Device::from_str("tablet").is_err());
    }

    #[test]
    fn test_device_set_is_fixed() {
        assert_eq!(Device::ALL.len(), 2);
    }
}
