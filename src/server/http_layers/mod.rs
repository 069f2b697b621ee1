mod rate_limit;
mod requests_logging;
#[cfg(feature = "slowdown")]
mod slowdown;

pub use rate_limit::enforce_rate_limit;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
#[cfg(feature = "slowdown")]
pub use slowdown::slowdown_request;
