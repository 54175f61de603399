use kernel_info::debugfs::{DEBUGFS_DIR_NAME, DEBUGFS_FILE_MODE, DEBUGFS_FILE_NAME, MAX_QUERY_LEN};
use kernel_rmap::RegionMatch;

/// Runtime settings of the endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name of the directory created at init.
    pub dir_name: &'static str,
    /// Name of the query file inside it.
    pub file_name: &'static str,
    /// Permission bits of the query file.
    pub file_mode: u16,
    /// Longest query write accepted, in bytes.
    pub max_query_len: usize,
    /// How query values are matched against kernel regions.
    pub region_match: RegionMatch,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir_name: DEBUGFS_DIR_NAME,
            file_name: DEBUGFS_FILE_NAME,
            file_mode: DEBUGFS_FILE_MODE,
            max_query_len: MAX_QUERY_LEN,
            region_match: RegionMatch::default(),
        }
    }
}
