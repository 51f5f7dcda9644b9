pub mod poller;
pub mod projector;
pub mod query;
pub mod registry;
pub mod router;
pub mod snapshot;

pub use poller::{BackendPoller, PollReport};
pub use query::{BlockingQueryEngine, ChangeResult};
pub use registry::{RegistryBackend, RegistryInstance, RegistrySnapshot};
pub use snapshot::SnapshotStore;
