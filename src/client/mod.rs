//! Blocking Mautic client and its OAuth1 authorization state.

pub mod blocking_client;
mod state;

pub use blocking_client::{BlockingClient, BlockingClientBuilder};
