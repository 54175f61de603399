//! # Module Lifecycle
//!
//! [`AddressTranslation::init`] creates the endpoint directory and its query
//! file through the host's [`DebugFs`]. Dropping the module removes the
//! directory recursively, and with it the file and any queued records.

use crate::config::Config;
use crate::endpoint::Endpoint;
use kernel_rmap::{KernelRegionRegistry, ReverseMap};
use log::{error, info};

/// Host filesystem the endpoint is published in.
pub trait DebugFs {
    /// Handle to a created directory or file.
    type Dentry;

    /// Create a top-level directory.
    fn create_dir(&self, name: &str) -> Option<Self::Dentry>;

    /// Create a file with permission bits `mode` in `parent`.
    fn create_file(&self, name: &str, mode: u16, parent: &Self::Dentry) -> Option<Self::Dentry>;

    /// Remove `dentry` and everything below it.
    fn remove_recursive(&self, dentry: Self::Dentry);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("failed to create debugfs directory")]
    CreateDir,
    #[error("failed to create debugfs file")]
    CreateFile,
}

/// The loaded module: its published directory and the endpoint behind it.
pub struct AddressTranslation<'h, H, F: DebugFs> {
    endpoint: Endpoint<'h, H>,
    fs: F,
    dir: Option<F::Dentry>,
    file: F::Dentry,
}

impl<'h, H, F> AddressTranslation<'h, H, F>
where
    H: ReverseMap + KernelRegionRegistry,
    F: DebugFs,
{
    /// Publish the endpoint for `host`.
    ///
    /// # Errors
    /// [`InitError::CreateDir`] or [`InitError::CreateFile`]. A directory
    /// created before the file failed is removed again.
    pub fn init(host: &'h H, fs: F, config: Config) -> Result<Self, InitError> {
        let Some(dir) = fs.create_dir(config.dir_name) else {
            error!("Failed to create debugfs directory");
            return Err(InitError::CreateDir);
        };
        let Some(file) = fs.create_file(config.file_name, config.file_mode, &dir) else {
            error!("Failed to create debugfs file");
            fs.remove_recursive(dir);
            return Err(InitError::CreateFile);
        };

        info!(
            "Address Translation Module loaded at {}/{}",
            config.dir_name, config.file_name
        );
        Ok(Self {
            endpoint: Endpoint::new(host, config),
            fs,
            dir: Some(dir),
            file,
        })
    }

    /// File operations of the published query file.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint<'h, H> {
        &self.endpoint
    }

    #[must_use]
    pub const fn file(&self) -> &F::Dentry {
        &self.file
    }
}

impl<H, F: DebugFs> Drop for AddressTranslation<'_, H, F> {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            self.fs.remove_recursive(dir);
        }
        info!("Address Translation Module Unloaded");
    }
}
