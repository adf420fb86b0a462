// Domain types and value objects
mod documents;
mod events;
mod preferences;
mod quota;
mod tokens;
mod topic;
mod user;
mod validation;

// Re-export commonly used types to the world
pub use documents::{ExportFormat, Feedback, UploadFile};
pub use events::{
    AnomalyDetected, HealthCheck, PriceUpdate, RiskAlert, Severity, StreamEvent, SupplierSignal,
    TrendChange,
};
pub use preferences::Theme;
pub use quota::{Quota, Tier, Usage};
pub use tokens::{AccessClaims, RefreshRequest, TokenPair};
pub use topic::Topic;
pub use user::{Credentials, RegisterRequest, UserProfile};
pub use validation::ValidationError;
