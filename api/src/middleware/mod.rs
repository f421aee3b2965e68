pub mod cors;
pub mod rate_limit;
pub mod webhook_secret;
