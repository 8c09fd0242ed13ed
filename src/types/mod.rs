//! Shared request/response types.

pub mod campaigns;
pub mod common;
pub mod contacts;

pub use campaigns::*;
pub use common::*;
pub use contacts::*;
