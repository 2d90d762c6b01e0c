// Application state and configuration
use std::sync::Arc;

use crate::{
    db::DieselPool,
    services::{
        HeatmapService, JwtService, PasswordResetService, RankTrackingService, RbacService,
        VerificationService, VisibilityService,
    },
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub diesel_pool: DieselPool,
    pub jwt_service: Arc<JwtService>,
    pub rbac_service: Arc<RbacService>,
    pub verification_service: Arc<VerificationService>,
    pub password_reset_service: Arc<PasswordResetService>,
    pub tracking_service: Arc<RankTrackingService>,
    pub visibility_service: Arc<VisibilityService>,
    pub heatmap_service: Arc<HeatmapService>,
    pub max_connections: u32,
}
