pub mod analytics;
pub mod config;
pub mod domain;
pub mod errors;

pub use analytics::{
    HealthScore, HealthStatus, PipelineAnalyzer, PipelineReport, Priority, Recommendation,
    ReportOptions,
};
pub use config::{AnalyticsConfig, AppConfig, ConfigOverrides, LoadOptions};
pub use domain::deal::{Deal, DealId, DealStatus, Stage, StageCategory};
pub use domain::snapshot::{normalize_deals, parse_envelope, SnapshotEnvelope};
pub use errors::{ApplicationError, DomainError, InterfaceError, ValidationError};
