pub mod analytics;
pub mod monitoring;
pub mod violation_filter;

pub use analytics::{AnalyticsService, AnalyticsSummary, Period};
pub use monitoring::{LiveMonitor, MonitorSnapshot};
pub use violation_filter::{DateRange, ViolationFilter};
