//! # Reverse Address Resolution
//!
//! Given a physical address, find every process virtual address that maps it,
//! or the kernel allocation it belongs to.
//!
//! The host environment owns all the state involved. This crate only consumes
//! it through four injected services:
//!
//! | Service                    | Host concept                              |
//! |:---------------------------|:------------------------------------------|
//! | [`FrameDatabase`]          | page descriptors, folios, LRU, refcounts  |
//! | [`ReverseMap`]             | the rmap: folio → (address space, va)     |
//! | [`KernelRegionRegistry`]   | the list of vmalloc'd kernel areas        |
//! | [`AddressSpaceRegistry`]   | pid → address space                       |
//!
//! ## Flow
//!
//! ```text
//!  pa ──► locate(pfn) ──► FolioRef ──► for_each_mapping ──► ResolvedMapping*
//!              │                         │
//!              │ none                    └─► AddressSpace::translate(va_base)
//!              ▼
//!        "not mapped"
//! ```
//!
//! [`kernel_region_containing`] is the separate, virtual-address-domain check
//! against kernel allocations.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod frame;
mod region;
mod registry;
mod rmap;

pub use crate::frame::{FolioRef, FrameDatabase, locate};
pub use crate::region::{
    KernelRegion, KernelRegionRegistry, RegionMatch, kernel_region_backing,
    kernel_region_containing,
};
pub use crate::registry::{AddressSpaceRegistry, ResolveError, translate_process_address};
pub use crate::rmap::{MappingError, ResolvedMapping, ReverseMap, TraversalStats, for_each_mapping};
