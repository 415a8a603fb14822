mod principal;
mod requests_logging;
#[allow(clippy::module_inception)]
mod server;
mod state;

pub use principal::{Principal, PRINCIPAL_HEADER};
pub use requests_logging::{log_requests, RequestsLoggingLevel};
pub use server::{make_app, run_server};
pub use state::{ServerConfig, ServerState};
