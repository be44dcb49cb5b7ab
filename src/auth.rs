//! Caller identities, identifiers, and redacted secret values.

pub mod account;
pub mod id;
pub mod secret;

pub use account::*;
pub use id::*;
pub use secret::*;
