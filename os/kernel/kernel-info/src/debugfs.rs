//! # Query Endpoint

/// Name of the directory holding the query endpoint.
pub const DEBUGFS_DIR_NAME: &str = "at";

/// Name of the query endpoint file.
pub const DEBUGFS_FILE_NAME: &str = "at";

/// Permission bits of the endpoint file (`rw-r--r--`).
pub const DEBUGFS_FILE_MODE: u16 = 0o644;

/// Size of the buffer a single query is copied into, including the
/// terminating NUL.
pub const QUERY_BUFFER_SIZE: usize = 4096;

/// Longest accepted query text in bytes.
pub const MAX_QUERY_LEN: usize = QUERY_BUFFER_SIZE - 1;

const _: () = {
    assert!(!DEBUGFS_DIR_NAME.is_empty());
    assert!(!DEBUGFS_FILE_NAME.is_empty());
    assert!(DEBUGFS_FILE_MODE <= 0o777);
};
