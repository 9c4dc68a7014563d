// Payload types for the Mirim API

pub mod consent;
pub mod notice;
pub mod oauth_client;
pub mod profile;
