// Database models

pub mod business;
pub mod keyword;
pub mod keyword_rank;
pub mod password_reset;
pub mod role;
pub mod session;
pub mod user;
pub mod verification_token;
pub mod visibility_metric;

pub use business::{Business, BusinessError, Location, NewBusiness, Subscription};
pub use keyword::{Keyword, KeywordError, KeywordStatus, KeywordUpdate, NewKeyword};
pub use keyword_rank::{Device, KeywordRank, NewKeywordRank, RankError};
pub use password_reset::{PasswordResetToken, ResetTokenInfo};
pub use role::{Permission, Role, RoleError};
pub use session::{NewSession, Session, SessionError};
pub use user::{NewUser, User, UserError};
pub use verification_token::{EmailVerificationToken, TokenError};
pub use visibility_metric::{MetricError, NewVisibilityMetric, PeriodType, VisibilityMetric};
