// Visibility metric computation
// Aggregates the latest in-window rank capture per keyword into a cached
// metric row. The arithmetic lives in pure functions over plain inputs so
// the math is testable without a database.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::keyword::{Keyword, KeywordError};
use crate::models::keyword_rank::{KeywordRank, RankError};
use crate::models::visibility_metric::{
    MetricError, NewVisibilityMetric, PeriodType, VisibilityMetric,
};

/// Positions ranked worse than this contribute zero share of voice
const SOV_CUTOFF: i32 = 30;

#[derive(Error, Debug)]
pub enum VisibilityError {
    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Keyword error: {0}")]
    Keyword(#[from] KeywordError),

    #[error("Rank error: {0}")]
    Rank(#[from] RankError),

    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),
}

/// One keyword's contribution to a window: its search volume and the
/// latest capture observed for it inside the window
#[derive(Debug, Clone)]
pub struct KeywordSnapshot {
    pub keyword_id: Uuid,
    pub search_volume: i32,
    pub rank_position: Option<i32>,
    pub map_pack_position: Option<i32>,
    pub has_featured_snippet: bool,
    pub has_local_pack: bool,
}

/// Computed aggregate for one window, before persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedVisibility {
    pub total_tracked_keywords: i32,
    pub map_pack_appearances: i32,
    pub map_pack_visibility: f64,
    pub top3_count: i32,
    pub top10_count: i32,
    pub top20_count: i32,
    pub share_of_voice: f64,
    pub featured_snippet_count: i32,
    pub local_pack_count: i32,
}

/// Linear decay weight for a rank position: 1.0 at position 1, reaching
/// zero just past position 30. Unranked keywords weigh nothing.
pub fn position_weight(position: Option<i32>) -> f64 {
    match position {
        Some(p) if p >= 1 && p <= SOV_CUTOFF => {
            let w = (SOV_CUTOFF as f64 + 1.0 - p as f64) / SOV_CUTOFF as f64;
            w.clamp(0.0, 1.0)
        },
        _ => 0.0,
    }
}

/// Aggregate a set of per-keyword snapshots into window metrics.
/// Percentages are 0..=100; an empty snapshot set yields all zeros.
pub fn compute_window_metrics(snapshots: &[KeywordSnapshot]) -> ComputedVisibility {
    let total = snapshots.len() as i32;

    let mut map_pack_appearances = 0;
    let mut top3 = 0;
    let mut top10 = 0;
    let mut top20 = 0;
    let mut featured_snippets = 0;
    let mut local_packs = 0;
    let mut weighted_volume = 0.0_f64;
    let mut total_volume = 0.0_f64;

    for snap in snapshots {
        if snap.map_pack_position.is_some() {
            map_pack_appearances += 1;
        }
        if let Some(pos) = snap.rank_position {
            // Bands are cumulative: a position in the top 3 counts in all three
            if pos <= 3 {
                top3 += 1;
            }
            if pos <= 10 {
                top10 += 1;
            }
            if pos <= 20 {
                top20 += 1;
            }
        }
        if snap.has_featured_snippet {
            featured_snippets += 1;
        }
        if snap.has_local_pack {
            local_packs += 1;
        }
        total_volume += snap.search_volume as f64;
        weighted_volume += snap.search_volume as f64 * position_weight(snap.rank_position);
    }

    let map_pack_visibility = if total > 0 {
        map_pack_appearances as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let share_of_voice = if total_volume > 0.0 {
        weighted_volume / total_volume * 100.0
    } else {
        0.0
    };

    ComputedVisibility {
        total_tracked_keywords: total,
        map_pack_appearances,
        map_pack_visibility,
        top3_count: top3,
        top10_count: top10,
        top20_count: top20,
        share_of_voice,
        featured_snippet_count: featured_snippets,
        local_pack_count: local_packs,
    }
}

/// Fold window captures down to the latest capture per keyword. Input must
/// be ordered by captured_at ascending; later rows overwrite earlier ones,
/// so each keyword ends up represented by its most recent capture across
/// all devices.
pub fn latest_per_keyword(ranks: &[KeywordRank]) -> Vec<&KeywordRank> {
    let mut latest: std::collections::HashMap<Uuid, &KeywordRank> = std::collections::HashMap::new();
    for rank in ranks {
        latest.insert(rank.keyword_id, rank);
    }
    let mut out: Vec<&KeywordRank> = latest.into_values().collect();
    out.sort_by_key(|r| r.keyword_id);
    out
}

/// Start/end bounds for the window containing `at`
pub fn window_bounds(period: PeriodType, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day_start = Utc
        .with_ymd_and_hms(at.year(), at.month(), at.day(), 0, 0, 0)
        .single()
        .unwrap_or(at);

    match period {
        PeriodType::Daily => (day_start, day_start + Duration::days(1)),
        PeriodType::Weekly => {
            let weekday = day_start.weekday().num_days_from_monday() as i64;
            let week_start = day_start - Duration::days(weekday);
            (week_start, week_start + Duration::days(7))
        },
        PeriodType::Monthly => {
            let month_start = Utc
                .with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or(day_start);
            let next_month = if at.month() == 12 {
                Utc.with_ymd_and_hms(at.year() + 1, 1, 1, 0, 0, 0)
            } else {
                Utc.with_ymd_and_hms(at.year(), at.month() + 1, 1, 0, 0, 0)
            };
            (month_start, next_month.single().unwrap_or(month_start))
        },
    }
}

pub struct VisibilityService {
    db_pool: DieselPool,
}

impl VisibilityService {
    pub fn new(db_pool: DieselPool) -> Self {
        Self { db_pool }
    }

    /// Compute and upsert the metric row for one (business, location?,
    /// period) window. Recomputation is idempotent: the same inputs
    /// overwrite the same row with the same values.
    pub async fn compute_for_window(
        &self,
        business_id: Uuid,
        location_id: Option<Uuid>,
        period: PeriodType,
        at: DateTime<Utc>,
    ) -> Result<VisibilityMetric, VisibilityError> {
        let (start, end) = window_bounds(period, at);

        let mut conn = self
            .db_pool
            .get()
            .await
            .map_err(|e| VisibilityError::PoolError(e.to_string()))?;

        let keywords =
            Keyword::active_in_scope(&mut conn, business_id, location_id).await?;
        let ranks =
            KeywordRank::in_window_for_scope(&mut conn, business_id, location_id, start, end)
                .await?;

        let latest = latest_per_keyword(&ranks);
        let latest_by_keyword: std::collections::HashMap<Uuid, &KeywordRank> =
            latest.iter().map(|r| (r.keyword_id, *r)).collect();

        // Every active keyword contributes, captured or not; keywords with
        // no capture in the window count as unranked
        let snapshots: Vec<KeywordSnapshot> = keywords
            .iter()
            .map(|kw| {
                let rank = latest_by_keyword.get(&kw.id).copied();
                KeywordSnapshot {
                    keyword_id: kw.id,
                    search_volume: kw.search_volume,
                    rank_position: rank.and_then(|r| r.rank_position),
                    map_pack_position: rank.and_then(|r| r.map_pack_position),
                    has_featured_snippet: rank.map(|r| r.has_featured_snippet).unwrap_or(false),
                    has_local_pack: rank.map(|r| r.has_local_pack).unwrap_or(false),
                }
            })
            .collect();

        let computed = compute_window_metrics(&snapshots);

        let metric = VisibilityMetric::upsert(
            &mut conn,
            NewVisibilityMetric {
                business_id,
                location_id,
                period_type: period.as_str().to_string(),
                period_start: start,
                period_end: end,
                map_pack_appearances: computed.map_pack_appearances,
                total_tracked_keywords: computed.total_tracked_keywords,
                map_pack_visibility: computed.map_pack_visibility,
                top3_count: computed.top3_count,
                top10_count: computed.top10_count,
                top20_count: computed.top20_count,
                share_of_voice: computed.share_of_voice,
                featured_snippet_count: computed.featured_snippet_count,
                local_pack_count: computed.local_pack_count,
                computed_at: Utc::now(),
            },
        )
        .await?;

        tracing::debug!(
            business_id = %business_id,
            period = period.as_str(),
            keywords = computed.total_tracked_keywords,
            share_of_voice = computed.share_of_voice,
            "Computed visibility window"
        );

        Ok(metric)
    }

    /// Recompute the daily, weekly, and monthly windows containing `at`
    /// for the business-wide scope
    pub async fn compute_all_windows(
        &self,
        business_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<VisibilityMetric>, VisibilityError> {
        let mut metrics = Vec::with_capacity(3);
        for period in [PeriodType::Daily, PeriodType::Weekly, PeriodType::Monthly] {
            metrics.push(
                self.compute_for_window(business_id, None, period, at)
                    .await?,
            );
        }
        Ok(metrics)
    }
}
