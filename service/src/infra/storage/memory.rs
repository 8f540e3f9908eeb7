//! In-memory [`Storage`] implementation.

use std::{
    collections::HashMap,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::operations::{By, Delete, Insert, Select};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::infra::{
    storage::{self, Entry, Key},
    Storage,
};

/// In-memory [`Storage`], shared between its clones.
///
/// Does not survive a process restart.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored entries.
    entries: Arc<RwLock<HashMap<Key, String>>>,

    /// Indicator whether this [`Memory`] storage is unavailable.
    unavailable: Arc<AtomicBool>,
}

impl Memory {
    /// Creates a new empty [`Memory`] storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes this [`Memory`] storage (and all its clones) fail every
    /// operation with an [`io::Error`] until made available again.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Errors if this [`Memory`] storage is unavailable.
    fn ensure_available(&self) -> Result<(), Traced<storage::Error>> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(tracerr::new!(storage::Error::Io(io::Error::other(
                "`Memory` storage is unavailable",
            ))));
        }
        Ok(())
    }
}

impl Storage<Select<By<Option<String>, Key>>> for Memory {
    type Ok = Option<String>;
    type Err = Traced<storage::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<String>, Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available().map_err(tracerr::wrap!())?;

        Ok(self.entries.read().await.get(by.as_inner()).cloned())
    }
}

impl Storage<Insert<Entry>> for Memory {
    type Ok = ();
    type Err = Traced<storage::Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available().map_err(tracerr::wrap!())?;

        drop(self.entries.write().await.insert(entry.key, entry.value));
        Ok(())
    }
}

impl Storage<Delete<Key>> for Memory {
    type Ok = ();
    type Err = Traced<storage::Error>;

    async fn execute(
        &self,
        Delete(key): Delete<Key>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available().map_err(tracerr::wrap!())?;

        drop(self.entries.write().await.remove(&key));
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Delete, Insert, Select},
        Handler as _,
    };

    use super::{Entry, Key, Memory};

    #[tokio::test]
    async fn stores_entries_per_key() {
        let storage = Memory::new();

        storage
            .execute(Insert(Entry {
                key: Key::Token,
                value: "token".into(),
            }))
            .await
            .unwrap();

        assert_eq!(
            storage
                .execute(Select(By::new(Key::Token)))
                .await
                .unwrap()
                .as_deref(),
            Some("token"),
        );
        assert_eq!(
            storage.execute(Select(By::new(Key::User))).await.unwrap(),
            None,
        );

        storage.execute(Delete(Key::Token)).await.unwrap();
        storage.execute(Delete(Key::Token)).await.unwrap();
        assert_eq!(
            storage.execute(Select(By::new(Key::Token))).await.unwrap(),
            None,
        );
    }

    #[tokio::test]
    async fn fails_while_unavailable() {
        let storage = Memory::new();
        storage.set_unavailable(true);

        assert!(storage
            .execute(Insert(Entry {
                key: Key::User,
                value: "{}".into(),
            }))
            .await
            .is_err());
        assert!(storage.execute(Select(By::new(Key::User))).await.is_err());
        assert!(storage.execute(Delete(Key::User)).await.is_err());

        storage.set_unavailable(false);
        assert_eq!(
            storage.execute(Select(By::new(Key::User))).await.unwrap(),
            None,
        );
    }
}
