// Feature services
// Typed wrappers over the Mirim API; every bearer call runs through the executor

mod admin;
mod consent;
mod notices;
mod oauth_clients;
mod profile;

pub use admin::AdminService;
pub use consent::ConsentService;
pub use notices::NoticeService;
pub use oauth_clients::OAuthClientService;
pub use profile::ProfileService;
