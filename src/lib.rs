//! Mautic-SDK – blocking Mautic REST client with OAuth1 authorization.
//!
//! ```no_run
//! use mautic_sdk::{BlockingClient, ContactLookup};
//!
//! # fn main() -> Result<(), mautic_sdk::Error> {
//! let client = BlockingClient::builder("https://mautic.example.com", "key", "secret")?
//!     .access_token("token", "token-secret")
//!     .build()?;
//!
//! if let ContactLookup::Found(id) = client.contacts().find_id("email:ada@example.com")? {
//!     client.campaigns().add_contact(3u64, id)?;
//! }
//! # Ok(())
//! # }
//! ```

// compile-time guard: pick a TLS backend.
#[cfg(not(any(feature = "rustls", feature = "native-tls")))]
compile_error!("Enable at least one TLS backend: `rustls` (default) or `native-tls`.");

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod oauth;
pub mod transport;
pub mod types;

mod util;

pub use auth::{AuthPhase, Credentials, SecretString, TokenPair};
pub use client::{BlockingClient, BlockingClientBuilder};
pub use error::*;
pub use oauth::{HmacSha1Signer, Signer, SigningRequest};
pub use transport::{Replay, middleware::RetryConfig};
pub use types::*;
