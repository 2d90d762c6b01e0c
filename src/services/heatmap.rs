// Heatmap and share-of-voice breakdown
// Read-side views over the raw rank captures: a keyword-by-day matrix of
// best positions, and the per-keyword decomposition of the aggregate
// share-of-voice figure. Both are pure over loaded rows.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::keyword::{Keyword, KeywordError};
use crate::models::keyword_rank::{KeywordRank, RankError};
use crate::services::visibility::{latest_per_keyword, position_weight};

#[derive(Error, Debug)]
pub enum HeatmapError {
    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Keyword error: {0}")]
    Keyword(#[from] KeywordError),

    #[error("Rank error: {0}")]
    Rank(#[from] RankError),
}

/// One keyword row in the heatmap: the best organic position observed on
/// each day of the range, `None` where nothing ranked
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapRow {
    pub keyword_id: Uuid,
    pub keyword: String,
    pub positions: Vec<Option<i32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Heatmap {
    pub days: Vec<NaiveDate>,
    pub rows: Vec<HeatmapRow>,
}

/// One keyword's slice of the aggregate share of voice
#[derive(Debug, Clone, Serialize)]
pub struct SovEntry {
    pub keyword_id: Uuid,
    pub keyword: String,
    pub search_volume: i32,
    pub rank_position: Option<i32>,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SovBreakdown {
    pub share_of_voice: f64,
    pub entries: Vec<SovEntry>,
}

/// Build the day axis covering [start, end] inclusive
fn day_axis(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

/// Assemble the matrix from keywords and their captures. The cell value is
/// the best (lowest) rank_position captured that day across devices.
pub fn build_heatmap(
    keywords: &[Keyword],
    ranks: &[KeywordRank],
    start: NaiveDate,
    end: NaiveDate,
) -> Heatmap {
    let days = day_axis(start, end);
    let day_index: HashMap<NaiveDate, usize> =
        days.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut cells: HashMap<Uuid, Vec<Option<i32>>> = keywords
        .iter()
        .map(|kw| (kw.id, vec![None; days.len()]))
        .collect();

    for rank in ranks {
        let day = rank.captured_at.date_naive();
        let (Some(idx), Some(row)) = (day_index.get(&day), cells.get_mut(&rank.keyword_id)) else {
            continue;
        };
        if let Some(pos) = rank.rank_position {
            let cell = &mut row[*idx];
            *cell = Some(match *cell {
                Some(existing) => existing.min(pos),
                None => pos,
            });
        }
    }

    let rows = keywords
        .iter()
        .map(|kw| HeatmapRow {
            keyword_id: kw.id,
            keyword: kw.keyword.clone(),
            positions: cells.remove(&kw.id).unwrap_or_else(|| vec![None; days.len()]),
        })
        .collect();

    Heatmap { days, rows }
}

/// Decompose window share of voice into per-keyword contributions. The
/// entry contributions sum to the aggregate figure, so this view always
/// reconciles with the stored metric for the same window.
pub fn build_sov_breakdown(keywords: &[Keyword], ranks: &[KeywordRank]) -> SovBreakdown {
    let latest = latest_per_keyword(ranks);
    let latest_by_keyword: HashMap<Uuid, &KeywordRank> =
        latest.iter().map(|r| (r.keyword_id, *r)).collect();

    let total_volume: f64 = keywords.iter().map(|kw| kw.search_volume as f64).sum();

    let mut entries = Vec::with_capacity(keywords.len());
    let mut share_of_voice = 0.0;

    for kw in keywords {
        let rank_position = latest_by_keyword
            .get(&kw.id)
            .and_then(|r| r.rank_position);
        let weight = position_weight(rank_position);
        let contribution = if total_volume > 0.0 {
            kw.search_volume as f64 * weight / total_volume * 100.0
        } else {
            0.0
        };
        share_of_voice += contribution;

        entries.push(SovEntry {
            keyword_id: kw.id,
            keyword: kw.keyword.clone(),
            search_volume: kw.search_volume,
            rank_position,
            weight,
            contribution,
        });
    }

    // Biggest contributors first
    entries.sort_by(|a, b| {
        b.contribution
            .partial_cmp(&a.contribution)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    SovBreakdown {
        share_of_voice,
        entries,
    }
}

pub struct HeatmapService {
    db_pool: DieselPool,
}

impl HeatmapService {
    pub fn new(db_pool: DieselPool) -> Self {
        Self { db_pool }
    }

    /// Keyword-by-day heatmap for a business over a date range
    pub async fn heatmap(
        &self,
        business_id: Uuid,
        location_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Heatmap, HeatmapError> {
        let mut conn = self
            .db_pool
            .get()
            .await
            .map_err(|e| HeatmapError::PoolError(e.to_string()))?;

        let keywords = Keyword::active_in_scope(&mut conn, business_id, location_id).await?;
        let keyword_ids: Vec<Uuid> = keywords.iter().map(|kw| kw.id).collect();

        let range_start = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        // Exclusive next-midnight bound so sub-second captures late on the
        // last day still land in the range
        let range_end = end
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);

        let ranks =
            KeywordRank::history_for_keywords(&mut conn, &keyword_ids, range_start, range_end)
                .await?;

        Ok(build_heatmap(&keywords, &ranks, start, end))
    }

    /// Share-of-voice breakdown for the half-open window `[start, end)`
    pub async fn sov_breakdown(
        &self,
        business_id: Uuid,
        location_id: Option<Uuid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SovBreakdown, HeatmapError> {
        let mut conn = self
            .db_pool
            .get()
            .await
            .map_err(|e| HeatmapError::PoolError(e.to_string()))?;

        let keywords = Keyword::active_in_scope(&mut conn, business_id, location_id).await?;
        let ranks =
            KeywordRank::in_window_for_scope(&mut conn, business_id, location_id, start, end)
                .await?;

        Ok(build_sov_breakdown(&keywords, &ranks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn keyword(id: Uuid, phrase: &str, volume: i32) -> Keyword {
        Keyword {
            id,
            business_id: Uuid::new_v4(),
            location_id: None,
            keyword: phrase.to_string(),
            search_volume: volume,
            difficulty: None,
            tags: vec![],
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn capture(keyword_id: Uuid, pos: Option<i32>, day: u32, hour: u32) -> KeywordRank {
        KeywordRank {
            id: Uuid::new_v4(),
            keyword_id,
            device: "desktop".to_string(),
            rank_position: pos,
            map_pack_position: None,
            has_featured_snippet: false,
            has_people_also_ask: false,
            has_local_pack: false,
            has_knowledge_panel: false,
            has_image_pack: false,
            has_video_carousel: false,
            ranking_url: None,
            search_location: None,
            captured_at: Utc
                .with_ymd_and_hms(2026, 3, day, hour, 0, 0)
                .single()
                .expect("valid test timestamp"),
        }
    }

    #[test]
    fn test_heatmap_best_position_per_day() {
        let kw = Uuid::new_v4();
        let keywords = vec![keyword(kw, "best pizza", 100)];
        // Two captures on the same day, the better one wins the cell
        let ranks = vec![
            capture(kw, Some(8), 10, 9),
            capture(kw, Some(5), 10, 15),
            capture(kw, Some(6), 11, 9),
        ];

        let start = NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date");
        let end = NaiveDate::from_ymd_opt(2026, 3, 12).expect("valid date");
        let heatmap = build_heatmap(&keywords, &ranks, start, end);

        assert_eq!(heatmap.days.len(), 3);
        assert_eq!(heatmap.rows.len(), 1);
        assert_eq!(
            heatmap.rows[0].positions,
            vec![Some(5), Some(6), None],
            "Cell must hold the best position of the day, empty days stay None"
        );
    }

    #[test]
    fn test_heatmap_unranked_capture_leaves_cell_empty() {
        let kw = Uuid::new_v4();
        let keywords = vec![keyword(kw, "plumber near me", 50)];
        let ranks = vec![capture(kw, None, 10, 9)];

        let start = NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date");
        let heatmap = build_heatmap(&keywords, &ranks, start, start);

        assert_eq!(heatmap.rows[0].positions, vec![None]);
    }

    #[test]
    fn test_sov_breakdown_reconciles_with_aggregate() {
        use crate::services::visibility::{compute_window_metrics, KeywordSnapshot};

        let kw_a = Uuid::new_v4();
        let kw_b = Uuid::new_v4();
        let keywords = vec![keyword(kw_a, "dentist", 1000), keyword(kw_b, "emergency dentist", 100)];
        let ranks = vec![capture(kw_a, Some(1), 10, 9), capture(kw_b, Some(50), 10, 9)];

        let breakdown = build_sov_breakdown(&keywords, &ranks);

        let snapshots: Vec<KeywordSnapshot> = keywords
            .iter()
            .map(|kw| KeywordSnapshot {
                keyword_id: kw.id,
                search_volume: kw.search_volume,
                rank_position: if kw.id == kw_a { Some(1) } else { Some(50) },
                map_pack_position: None,
                has_featured_snippet: false,
                has_local_pack: false,
            })
            .collect();
        let aggregate = compute_window_metrics(&snapshots);

        assert!(
            (breakdown.share_of_voice - aggregate.share_of_voice).abs() < 1e-9,
            "Breakdown total {} must equal aggregate {}",
            breakdown.share_of_voice,
            aggregate.share_of_voice
        );

        let entry_sum: f64 = breakdown.entries.iter().map(|e| e.contribution).sum();
        assert!((entry_sum - breakdown.share_of_voice).abs() < 1e-9);

        // Sorted biggest contributor first
        assert_eq!(breakdown.entries[0].keyword_id, kw_a);
    }

    #[test]
    fn test_sov_breakdown_empty_keywords() {
        let breakdown = build_sov_breakdown(&[], &[]);
        assert_eq!(breakdown.share_of_voice, 0.0);
        assert!(breakdown.entries.is_empty());
    }
}
