//! # Address Translation Configuration
//!
//! Compile-time configuration shared by the address translation crates. This
//! is the single place where memory layout assumptions and the names of the
//! query endpoint are defined, so that the page-table walker, the kernel
//! region scanner and the endpoint agree on them.
//!
//! ## Modules
//!
//! ### Memory Layout ([`memory`])
//! * **Page Size**: the base page granularity used for page frame numbers and
//!   in-page offsets.
//! * **Direct Map**: the linear-map (HHDM) base used to derive the kernel
//!   virtual address of a physical frame.
//! * **Userspace Boundary**: the end of the canonical lower half.
//!
//! ```text
//! 0x0000_0000_0000_0000 ┌─────────────────────────────────┐
//!                       │         User Space              │
//!                       │  (process mappings, rmap hits)  │
//! USERSPACE_END         ├─────────────────────────────────┤
//!                       │        Guard Region             │
//! HHDM_BASE             ├─────────────────────────────────┤ 0xffff_8880_0000_0000
//!                       │   Linear (direct) map of RAM    │
//!                       ├─────────────────────────────────┤
//!                       │   vmalloc / kernel regions      │
//! 0xFFFF_FFFF_FFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! ### Query Endpoint ([`debugfs`])
//! * **Names**: directory and file name of the endpoint.
//! * **Mode**: permission bits of the endpoint file.
//! * **Buffer Size**: the maximum size of a single query write.
//!
//! All values are `const` and checked with compile-time assertions where a
//! relation between them must hold.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod debugfs;
pub mod memory;
