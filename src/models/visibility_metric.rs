// Visibility metric model
// Derived, cached aggregate over a (business, location?, period) window.
// Owned by the visibility computation service; read-only elsewhere.
// Recomputation upserts on the natural key rather than accumulating.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::visibility_metrics;

/// Aggregation window granularity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
        }
    }
}

impl FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(PeriodType::Daily),
            "weekly" => Ok(PeriodType::Weekly),
            "monthly" => Ok(PeriodType::Monthly),
            _ => Err(format!("Invalid period type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = visibility_metrics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VisibilityMetric {
    pub id: Uuid,
    pub business_id: Uuid,
    pub location_id: Option<Uuid>,
    pub period_type: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub map_pack_appearances: i32,
    pub total_tracked_keywords: i32,
    pub map_pack_visibility: f64,
    pub top3_count: i32,
    pub top10_count: i32,
    pub top20_count: i32,
    pub share_of_voice: f64,
    pub featured_snippet_count: i32,
    pub local_pack_count: i32,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = visibility_metrics)]
pub struct NewVisibilityMetric {
    pub business_id: Uuid,
    pub location_id: Option<Uuid>,
    pub period_type: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub map_pack_appearances: i32,
    pub total_tracked_keywords: i32,
    pub map_pack_visibility: f64,
    pub top3_count: i32,
    pub top10_count: i32,
    pub top20_count: i32,
    pub share_of_voice: f64,
    pub featured_snippet_count: i32,
    pub local_pack_count: i32,
    pub computed_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug)]
pub enum MetricError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl VisibilityMetric {
    /// Upsert on the window's natural key so recomputation overwrites rather
    /// than accumulating (unique index is NULLS NOT DISTINCT on location_id)
    pub async fn upsert(
        conn: &mut AsyncPgConnection,
        metric: NewVisibilityMetric,
    ) -> Result<Self, MetricError> {
        use crate::schema::visibility_metrics::dsl::*;

        diesel::insert_into(visibility_metrics)
            .values(&metric)
            .on_conflict((business_id, location_id, period_type, period_start))
            .do_update()
            .set((
                period_end.eq(&metric.period_end),
                map_pack_appearances.eq(metric.map_pack_appearances),
                total_tracked_keywords.eq(metric.total_tracked_keywords),
                map_pack_visibility.eq(metric.map_pack_visibility),
                top3_count.eq(metric.top3_count),
                top10_count.eq(metric.top10_count),
                top20_count.eq(metric.top20_count),
                share_of_voice.eq(metric.share_of_voice),
                featured_snippet_count.eq(metric.featured_snippet_count),
                local_pack_count.eq(metric.local_pack_count),
                computed_at.eq(metric.computed_at),
            ))
            .get_result::<VisibilityMetric>(conn)
            .await
            .map_err(MetricError::Database)
    }

    /// Stored metrics for a business, newest window first
    pub async fn list_for_business(
        conn: &mut AsyncPgConnection,
        business: Uuid,
        period: Option<PeriodType>,
    ) -> Result<Vec<Self>, MetricError> {
        use crate::schema::visibility_metrics::dsl::*;

        let mut query = visibility_metrics
            .filter(business_id.eq(business))
            .into_boxed();

        if let Some(p) = period {
            query = query.filter(period_type.eq(p.as_str()));
        }

        query
            .order(period_start.desc())
            .load::<VisibilityMetric>(conn)
            .await
            .map_err(MetricError::Database)
    }
}
