#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Dispatches credential requests (save a password, register a passkey, sign in) to an external
//! credential provider and correlates the provider's single asynchronous answer back to the caller.
//!
//! Start with [`CredentialProvider`].

mod callback;
pub use callback::*;

mod cancellation;
pub use cancellation::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod executor;
pub use executor::*;

mod host;
pub use host::*;

mod provider;
pub use provider::*;

mod request;
pub use request::*;

mod response;
pub use response::*;

pub mod codec;

/// Forwarding of library logs to the host platform.
pub mod logger;

// private modules
mod controller;
mod correlator;
mod registry;

uniffi::setup_scaffolding!("credkit_core");
