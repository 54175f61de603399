//! # Query Endpoint
//!
//! File operations of the query file. A write submits one address and runs
//! the analysis synchronously; each read returns the oldest queued record
//! whole, or nothing once the queue is drained.

use crate::config::Config;
use crate::errno::Errno;
use crate::query::{Analyzer, QueryError, parse_address};
use crate::queue::ResultQueue;
use kernel_rmap::{KernelRegionRegistry, ReverseMap};
use log::{info, warn};

/// Backing state of the query file.
pub struct Endpoint<'h, H> {
    host: &'h H,
    queue: ResultQueue,
    config: Config,
}

impl<'h, H> Endpoint<'h, H>
where
    H: ReverseMap + KernelRegionRegistry,
{
    #[must_use]
    pub const fn new(host: &'h H, config: Config) -> Self {
        Self {
            host,
            queue: ResultQueue::new(),
            config,
        }
    }

    /// Analyzer over this endpoint's host and queue.
    #[must_use]
    pub const fn analyzer(&self) -> Analyzer<'_, H> {
        Analyzer::new(self.host, &self.queue, self.config.region_match)
    }

    #[must_use]
    pub const fn queue(&self) -> &ResultQueue {
        &self.queue
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// # Errors
    /// Never fails.
    pub fn open(&self) -> Result<(), Errno> {
        info!("Address translation device open");
        Ok(())
    }

    /// # Errors
    /// Never fails.
    pub fn release(&self) -> Result<(), Errno> {
        info!("Address translation device close");
        Ok(())
    }

    /// Submit the query in `buf` and return the number of bytes consumed.
    ///
    /// # Errors
    /// [`Errno::EFAULT`] for text that is not a hex address (nothing is
    /// queued), [`Errno::EINVAL`] for a write longer than the configured
    /// limit.
    pub fn write(&self, buf: &[u8]) -> Result<usize, Errno> {
        let addr = parse_address(buf, self.config.max_query_len).map_err(|e| {
            match e {
                QueryError::InvalidAddress => warn!("invalid address '{}'", buf.escape_ascii()),
                QueryError::TooLong { .. } => warn!("rejecting query: {e}"),
            }
            Errno::from(e)
        })?;
        info!("Device wrote {} bytes: {addr:#X}", buf.len());

        let outcome = self.analyzer().analyse(addr);
        info!("query {addr:#x}: {outcome:?}");
        Ok(buf.len())
    }

    /// Move the oldest record into `buf` and advance `pos` past it.
    ///
    /// Returns `0` when no record is queued.
    ///
    /// # Errors
    /// [`Errno::ENOSPC`] if `buf` cannot hold the whole record; the record
    /// stays queued.
    pub fn read(&self, buf: &mut [u8], pos: &mut u64) -> Result<usize, Errno> {
        let record = self.queue.pop_if_fits(buf.len()).map_err(|e| {
            warn!("read of {} bytes: {e}", buf.len());
            Errno::from(e)
        })?;
        let Some(record) = record else {
            return Ok(0);
        };

        let n = record.len();
        buf[..n].copy_from_slice(record.as_bytes());
        *pos = pos.saturating_add(n as u64);
        Ok(n)
    }
}
