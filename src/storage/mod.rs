//! Durable storage of the accumulated counters.
//!  - [snapshot::Snapshot] is the persisted shape of the accountant's state.
//!  - [PersistenceGateway] abstracts where it's kept. [file::FileSnapshotStore] keeps it as a JSON
//!    file in the application directory.

pub mod file;
pub mod snapshot;

use std::{future::Future, ops::Deref};

use anyhow::Result;

use snapshot::Snapshot;

/// Opaque load/save of the last [Snapshot].
pub trait PersistenceGateway {
    /// Returns `None` when nothing was saved yet or the stored data isn't a valid snapshot.
    fn load(&self) -> impl Future<Output = Result<Option<Snapshot>>> + Send;

    fn save(&self, snapshot: &Snapshot) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Deref + Sync> PersistenceGateway for T
where
    T::Target: PersistenceGateway,
{
    fn load(&self) -> impl Future<Output = Result<Option<Snapshot>>> + Send {
        self.deref().load()
    }

    fn save(&self, snapshot: &Snapshot) -> impl Future<Output = Result<()>> + Send {
        self.deref().save(snapshot)
    }
}
