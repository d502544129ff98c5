//! Positional deletion against the record store.

use tracing::{debug, info};

use crate::entry::EntryCollection;
use crate::error::{Error, Result};
use crate::storage::RecordStore;

/// Delete the entry at `index` and return the collection as saved.
///
/// The index is checked against a fresh load, not against whatever the
/// caller last displayed. The save is guarded by the revision of that load,
/// so a write that lands in between is reported instead of overwritten.
///
/// # Errors
///
/// Returns [`Error::IndexOutOfRange`] if `index` is not a position in the
/// loaded collection, [`Error::StaleWrite`] if the collection changed before
/// the save, or a storage error. The store is unchanged on every error.
pub fn delete_at<S>(store: &S, index: usize) -> Result<EntryCollection>
where
    S: RecordStore + ?Sized,
{
    let snapshot = store.load_snapshot()?;
    let mut entries = snapshot.entries;

    if index >= entries.len() {
        debug!(
            "Delete of position {} rejected, collection has {} entries",
            index,
            entries.len()
        );
        return Err(Error::IndexOutOfRange {
            index,
            len: entries.len(),
        });
    }

    let removed = entries.remove(index);
    store.save_snapshot(&entries, snapshot.revision)?;

    info!(
        "Deleted entry {} ({}), {} remaining",
        index,
        removed.address,
        entries.len()
    );
    Ok(entries)
}
