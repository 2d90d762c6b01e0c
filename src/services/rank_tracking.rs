// Daily rank tracking pipeline
// Fetches SERP observations for every active keyword of every active
// business and appends them as keyword_ranks rows, then recomputes the
// visibility windows touched by the new captures. One business failing
// never aborts the run.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::business::{Business, BusinessError, Location};
use crate::models::keyword::{Keyword, KeywordError};
use crate::models::keyword_rank::{Device, KeywordRank, NewKeywordRank, RankError};
use crate::services::serp::{SerpClient, SerpError, SerpQuery};
use crate::services::visibility::{VisibilityError, VisibilityService};

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Business error: {0}")]
    Business(#[from] BusinessError),

    #[error("Keyword error: {0}")]
    Keyword(#[from] KeywordError),

    #[error("Rank error: {0}")]
    Rank(#[from] RankError),

    #[error("SERP error: {0}")]
    Serp(#[from] SerpError),

    #[error("Visibility error: {0}")]
    Visibility(#[from] VisibilityError),
}

/// Outcome of one full tracking run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TrackingSummary {
    pub businesses_processed: usize,
    pub businesses_failed: usize,
    pub records_created: usize,
}

pub struct RankTrackingService {
    db_pool: DieselPool,
    serp: Arc<dyn SerpClient>,
    visibility: VisibilityService,
}

impl RankTrackingService {
    pub fn new(db_pool: DieselPool, serp: Arc<dyn SerpClient>) -> Self {
        let visibility = VisibilityService::new(db_pool.clone());
        Self {
            db_pool,
            serp,
            visibility,
        }
    }

    /// Fetch and store today's captures for one business, both devices,
    /// then recompute its visibility windows. Returns rows created.
    pub async fn track_business(&self, business_id: Uuid) -> Result<usize, TrackingError> {
        let captured_at = Utc::now();

        let (business, keywords, location_names) = {
            let mut conn = self
                .db_pool
                .get()
                .await
                .map_err(|e| TrackingError::PoolError(e.to_string()))?;

            let business = Business::find_by_id(&mut conn, business_id).await?;
            let keywords = Keyword::active_in_scope(&mut conn, business_id, None).await?;
            let locations = Location::active_for_business(&mut conn, business_id).await?;
            let location_names: HashMap<Uuid, String> =
                locations.into_iter().map(|l| (l.id, l.name)).collect();
            (business, keywords, location_names)
        };

        let mut created = 0;
        for keyword in &keywords {
            let location = keyword
                .location_id
                .and_then(|id| location_names.get(&id).cloned());
            let search_location = location.as_deref().unwrap_or(business.name.as_str());

            for device in Device::ALL {
                let query = SerpQuery {
                    keyword: &keyword.keyword,
                    location: search_location,
                    device,
                    business_name: &business.name,
                };

                let observation = match self.serp.fetch(&query).await {
                    Ok(obs) => obs,
                    Err(e) => {
                        // One keyword failing never loses the rest of
                        // the business's captures
                        tracing::warn!(
                            business_id = %business_id,
                            keyword_id = %keyword.id,
                            device = device.as_str(),
                            error = %e,
                            "SERP fetch failed, skipping capture"
                        );
                        continue;
                    },
                };

                let mut conn = self
                    .db_pool
                    .get()
                    .await
                    .map_err(|e| TrackingError::PoolError(e.to_string()))?;

                KeywordRank::insert(
                    &mut conn,
                    NewKeywordRank {
                        keyword_id: keyword.id,
                        device: device.as_str().to_string(),
                        rank_position: observation.rank_position,
                        map_pack_position: observation.map_pack_position,
                        has_featured_snippet: observation.has_featured_snippet,
                        has_people_also_ask: observation.has_people_also_ask,
                        has_local_pack: observation.has_local_pack,
                        has_knowledge_panel: observation.has_knowledge_panel,
                        has_image_pack: observation.has_image_pack,
                        has_video_carousel: observation.has_video_carousel,
                        ranking_url: observation.ranking_url,
                        search_location: Some(search_location.to_string()),
                        captured_at,
                    },
                )
                .await?;
                created += 1;
            }
        }

        self.visibility
            .compute_all_windows(business_id, captured_at)
            .await?;

        tracing::info!(
            business_id = %business_id,
            keywords = keywords.len(),
            records = created,
            "Tracked business"
        );

        Ok(created)
    }

    /// Run the full daily tracking pass over all active businesses.
    /// Sequential on purpose: the SERP provider meters per account, and a
    /// failed business is logged and skipped rather than aborting the run.
    pub async fn run_daily_tracking(&self) -> Result<TrackingSummary, TrackingError> {
        let business_ids = {
            let mut conn = self
                .db_pool
                .get()
                .await
                .map_err(|e| TrackingError::PoolError(e.to_string()))?;
            Business::active_ids(&mut conn).await?
        };

        let mut summary = TrackingSummary::default();
        for business_id in business_ids {
            match self.track_business(business_id).await {
                Ok(created) => {
                    summary.businesses_processed += 1;
                    summary.records_created += created;
                },
                Err(e) => {
                    summary.businesses_failed += 1;
                    tracing::error!(
                        business_id = %business_id,
                        error = %e,
                        "Tracking failed for business, continuing with the rest"
                    );
                },
            }
        }

        tracing::info!(
            processed = summary.businesses_processed,
            failed = summary.businesses_failed,
            records = summary.records_created,
            "Daily rank tracking run complete"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_diesel_pool, DieselDatabaseConfig, DieselPool};
    use crate::models::business::NewBusiness;
    use crate::models::keyword::{KeywordStatus, NewKeyword};
    use crate::models::user::NewUser;
    use crate::models::user::User;
    use crate::schema::{businesses, keyword_ranks};
    use crate::services::serp::stub::StubSerpClient;
    use crate::services::serp::SerpObservation;
    use crate::utils::password::hash_password;
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;

    async fn test_pool() -> Option<DieselPool> {
        if std::env::var("DATABASE_URL").is_err() {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        }
        dotenv::dotenv().ok();
        create_diesel_pool(DieselDatabaseConfig::default()).await.ok()
    }

    async fn seed_business_with_keyword(pool: &DieselPool, phrase: &str) -> Uuid {
        let mut conn = pool.get().await.expect("Failed to get connection");

        let user = User::create(
            &mut conn,
            NewUser {
                email: format!("it-{}@example.com", Uuid::new_v4()),
                password_hash: hash_password("Sup3rSecret!pw").expect("hash"),
                full_name: "Tracking Test".to_string(),
            },
        )
        .await
        .expect("Failed to create user");

        let business: Business = diesel::insert_into(businesses::table)
            .values(&NewBusiness {
                name: format!("Test Plumbing {}", Uuid::new_v4()),
                owner_id: user.id,
            })
            .get_result(&mut conn)
            .await
            .expect("Failed to create business");

        let keyword = Keyword::create(
            &mut conn,
            NewKeyword {
                business_id: business.id,
                location_id: None,
                keyword: phrase.to_string(),
                search_volume: 100,
                difficulty: None,
                tags: vec![],
                status: KeywordStatus::Active.as_str().to_string(),
            },
        )
        .await
        .expect("Failed to create keyword");

        keyword.id
    }

    async fn rank_count(pool: &DieselPool, kw: Uuid) -> i64 {
        let mut conn = pool.get().await.expect("Failed to get connection");
        keyword_ranks::table
            .filter(keyword_ranks::keyword_id.eq(kw))
            .count()
            .get_result(&mut conn)
            .await
            .expect("Failed to count ranks")
    }

    #[tokio::test]
    async fn test_daily_run_survives_failing_business() {
        let Some(pool) = test_pool().await else { return };

        let healthy_phrase = format!("healthy plumber {}", Uuid::new_v4());
        let failing_phrase = format!("failing plumber {}", Uuid::new_v4());
        let healthy_kw = seed_business_with_keyword(&pool, &healthy_phrase).await;
        let failing_kw = seed_business_with_keyword(&pool, &failing_phrase).await;

        let mut stub = StubSerpClient::new().with_response(
            &healthy_phrase,
            SerpObservation {
                rank_position: Some(3),
                ..Default::default()
            },
        );
        stub.fail_on = Some(failing_phrase.clone());

        let service = RankTrackingService::new(pool.clone(), Arc::new(stub));
        let summary = service
            .run_daily_tracking()
            .await
            .expect("Run must complete despite the failing business");

        assert!(summary.businesses_processed >= 2);

        // The healthy business recorded both device captures; the failing
        // one recorded nothing, and its failure did not abort the run
        assert_eq!(rank_count(&pool, healthy_kw).await, 2);
        assert_eq!(rank_count(&pool, failing_kw).await, 0);
    }
}
