// Share-of-voice and window-metric computation tests

use chrono::{Datelike, TimeZone, Timelike, Utc};
use localrank_backend::models::PeriodType;
use localrank_backend::services::visibility::{
    compute_window_metrics, position_weight, window_bounds, KeywordSnapshot,
};
use uuid::Uuid;

fn snapshot(volume: i32, rank: Option<i32>, map_pack: Option<i32>) -> KeywordSnapshot {
    KeywordSnapshot {
        keyword_id: Uuid::new_v4(),
        search_volume: volume,
        rank_position: rank,
        map_pack_position: map_pack,
        has_featured_snippet: false,
        has_local_pack: map_pack.is_some(),
    }
}

#[test]
fn test_position_weight_linear_decay() {
    assert_eq!(position_weight(Some(1)), 1.0);
    assert!((position_weight(Some(2)) - 29.0 / 30.0).abs() < 1e-12);
    assert!((position_weight(Some(30)) - 1.0 / 30.0).abs() < 1e-12);
    assert_eq!(position_weight(Some(31)), 0.0);
    assert_eq!(position_weight(Some(0)), 0.0);
    assert_eq!(position_weight(Some(-3)), 0.0);
    assert_eq!(position_weight(None), 0.0);
}

#[test]
fn test_share_of_voice_worked_example() {
    // One keyword at volume 1000 ranked #1, one at 100 unranked:
    // weighted 1000 of a possible 1100, i.e. about 90.9%.
    let snapshots = vec![snapshot(1000, Some(1), None), snapshot(100, None, None)];

    let metrics = compute_window_metrics(&snapshots);

    let expected = 1000.0 / 1100.0 * 100.0;
    assert!((metrics.share_of_voice - expected).abs() < 1e-9);
    assert!(metrics.share_of_voice > 90.0);
}

#[test]
fn test_rank_bands_are_cumulative() {
    let snapshots = vec![
        snapshot(10, Some(2), None),
        snapshot(10, Some(7), None),
        snapshot(10, Some(15), None),
        snapshot(10, Some(40), None),
        snapshot(10, None, None),
    ];

    let metrics = compute_window_metrics(&snapshots);

    assert_eq!(metrics.total_tracked_keywords, 5);
    assert_eq!(metrics.top3_count, 1);
    assert_eq!(metrics.top10_count, 2, "top10 includes top3");
    assert_eq!(metrics.top20_count, 3, "top20 includes top10");
}

#[test]
fn test_map_pack_visibility_percentage() {
    let snapshots = vec![
        snapshot(10, Some(4), Some(1)),
        snapshot(10, Some(9), Some(3)),
        snapshot(10, Some(12), None),
        snapshot(10, None, None),
    ];

    let metrics = compute_window_metrics(&snapshots);

    assert_eq!(metrics.map_pack_appearances, 2);
    assert!((metrics.map_pack_visibility - 50.0).abs() < 1e-9);
    assert_eq!(metrics.local_pack_count, 2);
}

#[test]
fn test_empty_snapshot_set_yields_zeros() {
    let metrics = compute_window_metrics(&[]);

    assert_eq!(metrics.total_tracked_keywords, 0);
    assert_eq!(metrics.share_of_voice, 0.0);
    assert_eq!(metrics.map_pack_visibility, 0.0);
    assert_eq!(metrics.top20_count, 0);
}

#[test]
fn test_computation_is_deterministic() {
    let snapshots: Vec<KeywordSnapshot> = (1..=25)
        .map(|i| snapshot(i * 10, Some(i), if i % 3 == 0 { Some(i % 3 + 1) } else { None }))
        .collect();

    let first = compute_window_metrics(&snapshots);
    let second = compute_window_metrics(&snapshots);

    assert_eq!(first, second);
}

#[test]
fn test_daily_window_spans_utc_midnights() {
    let at = Utc.with_ymd_and_hms(2026, 3, 18, 14, 30, 0).unwrap();
    let (start, end) = window_bounds(PeriodType::Daily, at);

    assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 18, 0, 0, 0).unwrap());
    assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 19, 0, 0, 0).unwrap());
}

#[test]
fn test_weekly_window_starts_monday() {
    // 2026-03-18 is a Wednesday
    let at = Utc.with_ymd_and_hms(2026, 3, 18, 9, 0, 0).unwrap();
    let (start, end) = window_bounds(PeriodType::Weekly, at);

    assert_eq!(start.weekday(), chrono::Weekday::Mon);
    assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap());
    assert_eq!(end - start, chrono::Duration::days(7));
}

#[test]
fn test_monthly_window_rolls_over_december() {
    let at = Utc.with_ymd_and_hms(2026, 12, 25, 23, 0, 0).unwrap();
    let (start, end) = window_bounds(PeriodType::Monthly, at);

    assert_eq!(start, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
    assert_eq!(end.year(), 2027);
    assert_eq!(end.month(), 1);
    assert_eq!(end.day(), 1);
    assert_eq!(end.hour(), 0);
}
