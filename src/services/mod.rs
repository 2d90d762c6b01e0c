// Service layer

pub mod email;
pub mod heatmap;
pub mod jwt;
pub mod password_reset;
pub mod rank_tracking;
pub mod rbac;
pub mod scheduler;
pub mod serp;
pub mod verification;
pub mod visibility;

pub use email::{EmailDispatcher, EmailService};
pub use heatmap::HeatmapService;
pub use jwt::{AccessTokenClaims, JwtConfig, JwtError, JwtService};
pub use password_reset::PasswordResetService;
pub use rank_tracking::{RankTrackingService, TrackingSummary};
pub use rbac::RbacService;
pub use scheduler::JobScheduler;
pub use serp::{HttpSerpClient, SerpClient, SerpObservation};
pub use verification::VerificationService;
pub use visibility::VisibilityService;
