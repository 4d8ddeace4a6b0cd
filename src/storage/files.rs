use chrono::Utc;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{DownloadEvent, FileRecord, NewFileRecord};
use super::tables::*;

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Insert a new file record, assigning its id and indexing its object location.
    /// A (bucket, key) pair can belong to only one record.
    pub fn create_file(&self, new: NewFileRecord) -> Result<FileRecord, DatabaseError> {
        debug_assert!(!new.bucket.is_empty(), "bucket must not be empty");
        debug_assert!(!new.key.is_empty(), "key must not be empty");

        let write_txn = self.begin_write()?;
        let record = {
            let mut keys = write_txn.open_table(FILE_KEYS)?;
            if keys.get((new.bucket.as_str(), new.key.as_str()))?.is_some() {
                return Err(DatabaseError::DuplicateKey {
                    bucket: new.bucket,
                    key: new.key,
                });
            }

            let id = Database::next_sequence(&write_txn, FILE_ID_SEQUENCE)?;
            let record = new.into_record(id, Utc::now());

            keys.insert((record.bucket.as_str(), record.key.as_str()), id)?;

            let mut files = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(&record)?;
            files.insert(id, data.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// Get a file by its id
    pub fn get_file(&self, id: u64) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Get a file by its object location (resolves (bucket, key) -> id -> file)
    pub fn get_file_by_key(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let keys = read_txn.open_table(FILE_KEYS)?;

        let id = match keys.get((bucket, key))? {
            Some(data) => data.value(),
            None => return Ok(None),
        };

        let files = read_txn.open_table(FILES)?;
        match files.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Delete a file by its id and drop its location index entry.
    /// Returns whether a record was removed.
    pub fn delete_file(&self, id: u64) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<FileRecord> = {
            let table = write_txn.open_table(FILES)?;
            let data = table.get(id)?;
            data.map(|d| rmp_serde::from_slice(d.value())).transpose()?
        };

        let deleted = match existing {
            Some(file) => {
                {
                    let mut table = write_txn.open_table(FILES)?;
                    table.remove(id)?;
                }
                {
                    let mut keys = write_txn.open_table(FILE_KEYS)?;
                    keys.remove((file.bucket.as_str(), file.key.as_str()))?;
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    // ========================================================================
    // Download audit log
    // ========================================================================

    pub fn append_download_event(&self, event: &DownloadEvent) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let seq = {
            let seq = Database::next_sequence(&write_txn, DOWNLOAD_EVENT_SEQUENCE)?;
            let mut table = write_txn.open_table(DOWNLOAD_EVENTS)?;
            let data = rmp_serde::to_vec_named(event)?;
            table.insert(seq, data.as_slice())?;
            seq
        };
        write_txn.commit()?;
        Ok(seq)
    }

    /// Download events recorded for one file, oldest first
    pub fn download_events_for(&self, file_id: u64) -> Result<Vec<DownloadEvent>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(DOWNLOAD_EVENTS)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let event: DownloadEvent = rmp_serde::from_slice(value.value())?;
            if event.file_id == file_id {
                events.push(event);
            }
        }

        Ok(events)
    }
}
