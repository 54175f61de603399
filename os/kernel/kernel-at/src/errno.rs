use crate::debugfs::InitError;
use crate::query::QueryError;
use crate::queue::{QueueError, ReadError};
use core::fmt;

/// Error codes handed back to the host across the endpoint boundary.
#[repr(i32)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Errno {
    /// Out of memory.
    ENOMEM = 12,
    /// Bad address.
    EFAULT = 14,
    /// Invalid argument.
    EINVAL = 22,
    /// No space left on device.
    ENOSPC = 28,
}

impl Errno {
    /// The code as returned by a failing file operation, e.g. `-14`.
    #[inline]
    #[must_use]
    pub const fn as_negative(self) -> i32 {
        -(self as i32)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.as_negative())
    }
}

impl From<QueryError> for Errno {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidAddress => Self::EFAULT,
            QueryError::TooLong { .. } => Self::EINVAL,
        }
    }
}

impl From<ReadError> for Errno {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::BufferTooSmall { .. } => Self::ENOSPC,
        }
    }
}

impl From<QueueError> for Errno {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::OutOfMemory => Self::ENOMEM,
            QueueError::Format => Self::EINVAL,
        }
    }
}

impl From<InitError> for Errno {
    fn from(_: InitError) -> Self {
        Self::ENOMEM
    }
}
