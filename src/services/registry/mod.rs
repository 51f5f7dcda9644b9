//! Registry backend module
//!
//! - `types`: registry instances and immutable snapshots
//! - `backend`: the capability set consumed from a backend registry
//! - `memory`: in-process registry backed by `DashMap`
//! - `file`: registry read from a TOML document on every poll

pub mod backend;
pub mod file;
pub mod memory;
pub mod types;

pub use backend::{BackendError, RegistryBackend};
pub use file::FileRegistry;
pub use memory::InMemoryRegistry;
pub use types::{
    InstanceEntry, InstanceSet, RegistryInstance, RegistrySnapshot, ServiceCatalog,
    collect_instances,
};
