// Authentication module
// Token refresh, authenticated call execution and session state

mod executor;
mod refresh;
mod service;
mod session;
mod types;

pub use executor::AuthExecutor;
pub use refresh::TokenRefresher;
pub use service::AuthService;
pub use session::Session;
pub use types::{AuthTokens, RegisterRequest, SessionEpoch, SessionState, SignUpRequest, User};
