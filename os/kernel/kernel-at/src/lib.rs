//! # Address Translation Endpoint
//!
//! Accepts a physical address as hex text, works out what maps it, and queues
//! one text line per finding for the reader of the endpoint.
//!
//! ```text
//!  write("1a2b3c000") ──► parse_address ──► Analyzer::analyse
//!                                               │
//!                   kernel region? ─────────────┼──► "VA start: 0x…"
//!                   LRU folio + rmap hits? ─────┼──► "Virtual Address of 0x… is 0x… with pid …"
//!                   neither ────────────────────┴──► "Physical address 0x… is not mapped …"
//!                                                        │
//!  read() ◄──────────────────── ResultQueue (FIFO) ◄─────┘
//! ```
//!
//! The module registers itself as a directory holding one file through an
//! injected [`DebugFs`]; the host then forwards `open`/`read`/`write`/
//! `release` on that file to the [`Endpoint`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod config;
mod debugfs;
mod endpoint;
mod errno;
mod query;
mod queue;

pub use crate::config::Config;
pub use crate::debugfs::{AddressTranslation, DebugFs, InitError};
pub use crate::endpoint::Endpoint;
pub use crate::errno::Errno;
pub use crate::query::{Analyzer, QueryError, QueryOutcome, parse_address};
pub use crate::queue::{QueueError, ReadError, ResultQueue, ResultRecord};
pub use kernel_rmap::RegionMatch;
