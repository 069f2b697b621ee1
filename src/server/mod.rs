mod api_routes;
mod auth;
mod dashboard;
mod http_layers;
mod mcp_routes;
#[allow(clippy::module_inception)]
mod server;
pub mod state;

pub use auth::{ApiKey, HEADER_API_KEY};
pub use http_layers::RequestsLoggingLevel;
pub use mcp_routes::PROTOCOL_VERSION;
pub use server::{make_app, run_server};
pub use state::HubState;
