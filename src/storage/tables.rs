use redb::TableDefinition;

/// File records: id -> FileRecord (msgpack)
pub const FILES: TableDefinition<u64, &[u8]> = TableDefinition::new("files");

/// Object location index: (bucket, key) -> id (for download lookups)
pub const FILE_KEYS: TableDefinition<(&str, &str), u64> = TableDefinition::new("file_keys");

/// Monotonic counters: name -> last issued value
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Download audit log: sequence -> DownloadEvent (msgpack)
pub const DOWNLOAD_EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("download_events");

pub const FILE_ID_SEQUENCE: &str = "files";
pub const DOWNLOAD_EVENT_SEQUENCE: &str = "download_events";
