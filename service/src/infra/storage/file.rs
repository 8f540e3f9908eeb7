//! File-backed [`Storage`] implementation.

use std::{
    io,
    path::{Path, PathBuf},
};

use common::operations::{By, Delete, Insert, Select};
use tokio::fs;
use tracerr::Traced;

use crate::infra::{
    storage::{self, Entry, Key},
    Storage,
};

/// [`Storage`] keeping every [`Entry`] in its own file inside a directory.
///
/// Files are replaced atomically, so a crash in the middle of a write never
/// leaves a truncated value behind.
#[derive(Clone, Debug)]
pub struct File {
    /// Directory holding the entries.
    dir: PathBuf,
}

impl File {
    /// Creates a new [`File`] storage inside the provided directory.
    ///
    /// The directory is created lazily on the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory of this [`File`] storage.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file storing the provided [`Key`].
    fn path(&self, key: Key) -> PathBuf {
        self.dir.join(key.to_string())
    }
}

impl Storage<Select<By<Option<String>, Key>>> for File {
    type Ok = Option<String>;
    type Err = Traced<storage::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<String>, Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        match fs::read_to_string(self.path(by.into_inner())).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(tracerr::new!(storage::Error::Io(e))),
        }
    }
}

impl Storage<Insert<Entry>> for File {
    type Ok = ();
    type Err = Traced<storage::Error>;

    async fn execute(
        &self,
        Insert(Entry { key, value }): Insert<Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        use storage::Error as E;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let path = self.path(key);
        let tmp = self.dir.join(format!("{key}.tmp"));
        fs::write(&tmp, value)
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(tracerr::from_and_wrap!(=> E))
    }
}

impl Storage<Delete<Key>> for File {
    type Ok = ();
    type Err = Traced<storage::Error>;

    async fn execute(
        &self,
        Delete(key): Delete<Key>,
    ) -> Result<Self::Ok, Self::Err> {
        match fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(tracerr::new!(storage::Error::Io(e))),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Delete, Insert, Select},
        Handler as _,
    };

    use super::{Entry, File, Key};

    #[tokio::test]
    async fn persists_entries_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let storage = File::new(dir.path().join("session"));

        assert_eq!(
            storage.execute(Select(By::new(Key::User))).await.unwrap(),
            None,
        );

        storage
            .execute(Insert(Entry {
                key: Key::User,
                value: "{}".into(),
            }))
            .await
            .unwrap();

        let reopened = File::new(storage.dir());
        assert_eq!(
            reopened
                .execute(Select(By::new(Key::User)))
                .await
                .unwrap()
                .as_deref(),
            Some("{}"),
        );
        assert!(!storage.dir().join("session.user.tmp").exists());
    }

    #[tokio::test]
    async fn deleting_absent_entry_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let storage = File::new(dir.path());

        storage.execute(Delete(Key::Token)).await.unwrap();

        storage
            .execute(Insert(Entry {
                key: Key::Token,
                value: "token".into(),
            }))
            .await
            .unwrap();
        storage.execute(Delete(Key::Token)).await.unwrap();

        assert_eq!(
            storage.execute(Select(By::new(Key::Token))).await.unwrap(),
            None,
        );
    }

    #[tokio::test]
    async fn reports_io_failures() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let storage = File::new(blocker);

        assert!(storage
            .execute(Insert(Entry {
                key: Key::Token,
                value: "token".into(),
            }))
            .await
            .is_err());
    }
}
