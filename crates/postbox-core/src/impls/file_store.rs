//! FileQueueStore - durable queue table on the local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tokio::fs;
use tracing::{debug, error, warn};

use crate::domain::{AttemptPatch, QueueItem, QueueItemId, StoreError};
use crate::ports::{QueueStore, RowStream};

const TMP_PREFIX: &str = ".tmp_";
const CORRUPT_SUFFIX: &str = ".corrupt";

/// File-backed queue table.
///
/// Layout: `<root>/<table>/<ulid>.json`, one JSON document per row.
///
/// # Atomicity
/// Every write goes to `.tmp_<ulid>.json` first and is then renamed over the
/// row file, so a crash never leaves a half-written row behind. Leftover
/// temporary files are swept by `create_table`.
///
/// # Ordering
/// `insert` only accepts rows whose id carries the millisecond of their
/// `created_at`. Cursors list ids, group them by that millisecond, and read
/// one group at a time, sorted by `(created_at, id)`. Rows are never all
/// loaded at once.
///
/// # Corrupt rows
/// A row file that no longer parses is renamed to `<ulid>.json.corrupt`
/// the first time a cursor or purge meets it, and reported once as
/// `StoreError::Corrupt`. Later listings no longer see it.
#[derive(Debug, Clone)]
pub struct FileQueueStore {
    table: String,
    dir: PathBuf,
}

impl FileQueueStore {
    /// Store for `table` under `root`. Nothing is touched on disk.
    ///
    /// # Errors
    /// Rejects table names that are empty or would escape `root`.
    pub fn new(root: impl Into<PathBuf>, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        if table.is_empty()
            || table.starts_with('.')
            || table.contains(['/', '\\'])
        {
            return Err(StoreError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid table name `{table}`"),
            )));
        }
        let dir = root.into().join(&table);
        Ok(Self { table, dir })
    }

    /// Directory holding the rows.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn row_path(&self, id: QueueItemId) -> PathBuf {
        self.dir.join(format!("{}.json", id.file_stem()))
    }

    async fn ensure_table(&self) -> Result<(), StoreError> {
        if self.table_exists().await? {
            Ok(())
        } else {
            Err(StoreError::TableMissing(self.table.clone()))
        }
    }

    /// Read one row; `None` if its file is gone.
    async fn load(&self, id: QueueItemId) -> Result<Option<QueueItem>, StoreError> {
        match fs::read(self.row_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// `load`, moving an unparseable row out of the listing.
    async fn load_listed(&self, id: QueueItemId) -> Result<Option<QueueItem>, StoreError> {
        let result = self.load(id).await;
        if let Err(StoreError::Corrupt(e)) = &result {
            self.quarantine(id, e).await;
        }
        result
    }

    async fn quarantine(&self, id: QueueItemId, cause: &serde_json::Error) {
        let from = self.row_path(id);
        let to = self
            .dir
            .join(format!("{}.json{CORRUPT_SUFFIX}", id.file_stem()));
        match fs::rename(&from, &to).await {
            Ok(()) => error!(%id, error = %cause, path = %to.display(), "corrupt row quarantined"),
            Err(e) => error!(%id, error = %cause, rename_error = %e, "corrupt row could not be quarantined"),
        }
    }

    async fn write_row(&self, item: &QueueItem) -> Result<(), StoreError> {
        let stem = item.id.file_stem();
        let tmp = self.dir.join(format!("{TMP_PREFIX}{stem}.json"));
        fs::write(&tmp, serde_json::to_vec_pretty(item)?).await?;
        fs::rename(&tmp, self.row_path(item.id)).await?;
        Ok(())
    }

    /// Row ids sorted, grouped by the millisecond they carry.
    async fn list_buckets(&self) -> Result<Vec<Vec<QueueItemId>>, StoreError> {
        self.ensure_table().await?;
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = QueueItemId::from_file_name(&name.to_string_lossy()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids
            .chunk_by(|a, b| a.as_ulid().timestamp_ms() == b.as_ulid().timestamp_ms())
            .map(<[QueueItemId]>::to_vec)
            .collect())
    }

    /// Rows of one bucket in `(created_at, id)` order, then its read errors.
    async fn load_bucket(&self, ids: Vec<QueueItemId>) -> Vec<Result<QueueItem, StoreError>> {
        let mut rows = Vec::with_capacity(ids.len());
        let mut errors = Vec::new();
        for id in ids {
            match self.load_listed(id).await {
                Ok(Some(row)) => rows.push(row),
                // Purged after the listing.
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }
        rows.sort_by_key(|row| (row.created_at, row.id));
        rows.into_iter().map(Ok).chain(errors.into_iter().map(Err)).collect()
    }

    async fn sweep_temporaries(&self) -> Result<(), StoreError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
                warn!(path = %entry.path().display(), "removing orphaned temporary row");
                fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }
}

/// The id of a row must encode the millisecond it was created in.
fn check_id_matches_creation(item: &QueueItem) -> Result<(), StoreError> {
    let created_ms = u64::try_from(item.created_at.timestamp_millis()).ok();
    if created_ms == Some(item.id.as_ulid().timestamp_ms()) {
        Ok(())
    } else {
        Err(StoreError::InvalidRow {
            id: item.id,
            reason: format!(
                "id timestamp does not match created_at {}",
                item.created_at.to_rfc3339()
            ),
        })
    }
}

#[async_trait]
impl QueueStore for FileQueueStore {
    fn table(&self) -> &str {
        &self.table
    }

    async fn table_exists(&self) -> Result<bool, StoreError> {
        match fs::metadata(&self.dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_table(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        self.sweep_temporaries().await?;
        debug!(table = %self.table, dir = %self.dir.display(), "queue table ready");
        Ok(())
    }

    async fn insert(&self, item: QueueItem) -> Result<(), StoreError> {
        self.ensure_table().await?;
        check_id_matches_creation(&item)?;
        if fs::try_exists(self.row_path(item.id)).await? {
            return Err(StoreError::Duplicate(item.id));
        }
        self.write_row(&item).await
    }

    fn scan(&self) -> RowStream<'_> {
        stream::once(self.list_buckets())
            .map_ok(move |buckets| {
                stream::iter(buckets)
                    .then(move |ids| self.load_bucket(ids))
                    .flat_map(stream::iter)
            })
            .try_flatten()
            .boxed()
    }

    async fn get(&self, id: QueueItemId) -> Result<Option<QueueItem>, StoreError> {
        self.ensure_table().await?;
        self.load(id).await
    }

    async fn update_attributes(
        &self,
        id: QueueItemId,
        patch: &AttemptPatch,
    ) -> Result<(), StoreError> {
        self.ensure_table().await?;
        let mut row = self.load(id).await?.ok_or(StoreError::RowNotFound(id))?;
        patch.apply_to(&mut row);
        self.write_row(&row).await
    }

    async fn delete_where_sent(&self) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for id in self.list_buckets().await?.into_iter().flatten() {
            let row = match self.load_listed(id).await {
                Ok(Some(row)) => row,
                // A corrupt row was never marked sent; it is quarantined.
                Ok(None) | Err(StoreError::Corrupt(_)) => continue,
                Err(e) => return Err(e),
            };
            if !row.is_sent() {
                continue;
            }
            match fs::remove_file(self.row_path(id)).await {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(deleted)
    }
}
