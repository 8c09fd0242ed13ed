//! Transport middleware layers.

pub mod oauth_blocking;
pub mod retry;
pub mod retry_blocking;

pub use oauth_blocking::OAuthBlocking;
pub use retry::RetryConfig;
pub use retry_blocking::RetryBlocking;
