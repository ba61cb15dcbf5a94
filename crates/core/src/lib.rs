//! # inklet-core
//!
//! Shared foundations for the Inklet realtime chat client: the persisted
//! client identity, configuration loading, and the error types both expose.

pub mod config;
pub mod identity;

pub use config::{ClientConfig, ConfigError, IdentityConfig, ServerConfig};
pub use identity::{
    new_identity, FileIdentityStore, IdentityError, IdentityProvider, IdentityStore,
    MemoryIdentityStore,
};

pub(crate) fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("chat", "Inklet", "inklet")
}
