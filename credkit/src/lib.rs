//! Foreign-language bindings for `CredKit`.
//!
//! Everything lives in [`credkit_core`]; this crate only ships its `UniFFI` scaffolding in the
//! `staticlib`/`cdylib` that Kotlin and Swift load.

pub use credkit_core::*;

credkit_core::uniffi_reexport_scaffolding!();
