//! # Physical and Virtual Address Types
//!
//! Strongly typed wrappers for the addresses handled while resolving a
//! physical address back into the virtual addresses that map it.
//!
//! ## Overview
//!
//! Address translation constantly moves between three domains: physical
//! addresses, page frame numbers and virtual addresses (of a process or of the
//! kernel). Mixing them up silently is the classic bug in this kind of code, so
//! every domain gets its own type:
//!
//! | Concept | Generic | Description |
//! |----------|----------|-------------|
//! | [`MemoryAddress`] | – | A raw 64-bit address of unspecified kind. |
//! | [`MemoryPage<S>`] | [`S: PageSize`](PageSize) | A page-aligned base address of a page of size `S`. |
//! | [`MemoryAddressOffset<S>`] | [`S: PageSize`](PageSize) | An offset within a page of size `S`. |
//! | [`PhysicalAddress`] / [`PhysicalPage<S>`] | | Machine (bus) addresses. |
//! | [`VirtualAddress`] / [`VirtualPage<S>`] | | Page-table translated addresses. |
//! | [`PageFrameNumber`] | – | Index of a 4 KiB physical frame (`pa >> 12`). |
//!
//! Conversions between the physical and virtual domains are never implicit;
//! there is no `From<PhysicalAddress> for VirtualAddress`. Code that has to
//! reinterpret one as the other must go through [`MemoryAddress`] and say so.
//!
//! ## Page Sizes
//!
//! - [`Size4K`]: 4 KiB pages (base granularity)
//! - [`Size2M`]: 2 MiB huge pages
//! - [`Size1G`]: 1 GiB giant pages
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x1_a2b3_c123);
//! let pfn = pa.frame_number();
//! assert_eq!(pfn.as_u64(), 0x1a_2b3c);
//! assert_eq!(pfn.base().as_u64(), 0x1_a2b3_c000);
//!
//! let (page, off) = pa.split::<Size4K>();
//! assert_eq!(off.as_u64(), 0x123);
//! assert_eq!(page.join(off), pa);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod memory_address;
mod memory_page;
mod page_frame_number;
mod page_size;
mod physical_address;
mod virtual_address;

pub use crate::memory_address::MemoryAddress;
pub use crate::memory_page::{MemoryAddressOffset, MemoryPage};
pub use crate::page_frame_number::PageFrameNumber;
pub use crate::page_size::{PageSize, Size1G, Size2M, Size4K};
pub use crate::physical_address::{PhysicalAddress, PhysicalPage};
pub use crate::virtual_address::{VirtualAddress, VirtualPage};
