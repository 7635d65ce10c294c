use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicI64, Ordering},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

use super::{snapshot::Snapshot, PersistenceGateway};

pub const SNAPSHOT_FILE_NAME: &str = "trackingData.json";
const LOCK_FILE_NAME: &str = "trackingData.lock";
const TEMP_FILE_NAME: &str = "trackingData.json.tmp";

/// Keeps the snapshot in `<dir>/trackingData.json`.
///
/// A save writes a temporary file and renames it over the snapshot, so a crash leaves either the
/// old or the new snapshot behind, never a mix. An advisory lock on a side file keeps the daemon
/// and the cli from interleaving.
pub struct FileSnapshotStore {
    dir: PathBuf,
    last_saved_at: AtomicI64,
}

impl FileSnapshotStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            last_saved_at: AtomicI64::new(i64::MIN),
        })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE_NAME)
    }

    async fn open_lock(&self) -> Result<File, std::io::Error> {
        File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE_NAME))
            .await
    }

    /// `saved_at` has to increase even if the wall clock doesn't.
    fn next_saved_at(&self, requested: i64) -> i64 {
        let mut previous = self.last_saved_at.load(Ordering::Acquire);
        loop {
            let next = requested.max(previous.saturating_add(1));
            match self.last_saved_at.compare_exchange(
                previous,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(current) => previous = current,
            }
        }
    }
}

async fn read_to_string(path: &Path) -> Result<Option<String>, std::io::Error> {
    match File::open(path).await {
        Ok(mut file) => {
            let mut data = String::new();
            file.read_to_string(&mut data).await?;
            Ok(Some(data))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl PersistenceGateway for FileSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        let lock = self.open_lock().await?;
        lock.lock_shared()?;
        let data = read_to_string(&self.snapshot_path()).await;
        lock.unlock_async().await?;

        let Some(data) = data? else {
            debug!("No tracking data at {:?}", self.snapshot_path());
            return Ok(None);
        };
        let snapshot = Snapshot::parse(&data);
        if let Some(snapshot) = &snapshot {
            self.last_saved_at
                .fetch_max(snapshot.saved_at, Ordering::AcqRel);
        }
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut snapshot = snapshot.clone();
        snapshot.saved_at = self.next_saved_at(snapshot.saved_at);
        let data = serde_json::to_vec(&snapshot)?;

        let lock = self.open_lock().await?;
        lock.lock_exclusive()?;
        let result = async {
            let temp_path = self.dir.join(TEMP_FILE_NAME);
            let mut temp = File::create(&temp_path).await?;
            temp.write_all(&data).await?;
            temp.sync_all().await?;
            drop(temp);
            fs::rename(&temp_path, self.snapshot_path()).await
        }
        .await;
        lock.unlock_async().await?;

        result?;
        debug!("Saved tracking data at {}", snapshot.saved_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        accounting::AccumulatorState,
        storage::{snapshot::Snapshot, PersistenceGateway},
    };

    use super::FileSnapshotStore;

    fn snapshot(total: f64, saved_at_ms: i64) -> Snapshot {
        let state = AccumulatorState {
            total_seconds: total,
            productive_seconds: total / 2.,
            is_tracking: true,
            last_tick_at: None,
        };
        Snapshot::capture(
            &state,
            None,
            Utc.timestamp_millis_opt(saved_at_ms).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_load_missing_file() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSnapshotStore::new(dir.path().to_path_buf())?;
        assert_eq!(store.load().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSnapshotStore::new(dir.path().to_path_buf())?;
        store.save(&snapshot(40., 1_000)).await?;
        store.save(&snapshot(42., 2_000)).await?;

        let reopened = FileSnapshotStore::new(dir.path().to_path_buf())?;
        let loaded = reopened.load().await?.unwrap();
        assert_eq!(loaded, snapshot(42., 2_000));
        Ok(())
    }

    #[tokio::test]
    async fn test_saved_at_strictly_increases() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSnapshotStore::new(dir.path().to_path_buf())?;
        store.save(&snapshot(1., 5_000)).await?;
        // Wall clock went backwards between the saves.
        store.save(&snapshot(2., 3_000)).await?;
        let loaded = store.load().await?.unwrap();
        assert_eq!(loaded.saved_at, 5_001);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_file_is_no_data() -> Result<()> {
        let dir = tempdir()?;
        let store = FileSnapshotStore::new(dir.path().to_path_buf())?;
        std::fs::write(
            store.snapshot_path(),
            r#"{"totalTimeSeconds": 10, "productiveTimeSeconds": 5}"#,
        )?;
        assert_eq!(store.load().await?, None);
        Ok(())
    }
}
