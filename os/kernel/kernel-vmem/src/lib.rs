//! # Virtual Memory Translation
//!
//! Read-only x86-64 page-table walking: given a process [`AddressSpace`] and a
//! virtual address, find the physical address backing it.
//!
//! ## What you get
//! - An [`AddressSpace`] describing a `PML4` root page table, its owning
//!   process and the lock that serializes walks of its tables.
//! - Typed page-table levels ([`PageMapLevel4`], [`PageDirectoryPointerTable`],
//!   [`PageDirectory`], [`PageTable`]) with `bitfield-struct` entries.
//! - A [`PhysMapper`] trait that makes a physical table frame readable from the
//!   current address space, and [`HhdmPhysMapper`] for a direct map at a fixed offset.
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! Each 48-bit virtual address is divided into five fields:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! The fields index four levels of tables with 512 entries each:
//!
//! ```text
//!  PML4  →  PDPT  →  PD  →  PT  →  Physical Page
//!   │        │        │        │
//!   │        │        │        └───► PTE   → maps 4 KiB page
//!   │        │        └────────────► PDE   → PS=1 → 2 MiB page
//!   │        └─────────────────────► PDPTE → PS=1 → 1 GiB page
//!   └──────────────────────────────► PML4E
//! ```
//!
//! A walk stops at the first entry that is not present and reports the level
//! in a [`TranslateError`]. Nothing below a missing entry is ever read.
//!
//! The final physical address is `leaf_base + (va mod leaf_size)`.

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod address_space;
#[cfg(any(test, feature = "arena"))]
pub mod arena;
mod page_table;
mod process;

pub use crate::address_space::{AddressSpace, TranslateError};
pub use crate::page_table::pd::{L2Index, PageDirectory, PdEntry, PdEntryKind};
pub use crate::page_table::pdpt::{L3Index, PageDirectoryPointerTable, PdptEntry, PdptEntryKind};
pub use crate::page_table::pml4::{L4Index, PageMapLevel4, Pml4Entry};
pub use crate::page_table::pt::{L1Index, PageTable, PtEntry};
pub use crate::page_table::{EntryBits, split_indices};
pub use crate::process::ProcessId;

/// Re-export constants as info module.
pub use kernel_info::memory as info;

pub use kernel_memory_addresses as addresses;
use kernel_memory_addresses::{PhysicalPage, Size4K};

/// Makes a physical page-table frame readable from the current address space
/// (identity map, higher-half direct map, or a test arena).
///
/// Walks only ever read tables, so the mapper hands out shared references.
pub trait PhysMapper {
    /// Borrow the frame at `page` as a `T`.
    ///
    /// # Safety
    /// - `page` must hold an initialized `T` (a page table of the level the
    ///   caller expects) and must stay mapped while the reference is alive.
    /// - Concurrent writers must be excluded, normally by holding the owning
    ///   address space's page-table lock.
    unsafe fn phys_to_ref<T>(&self, page: PhysicalPage<Size4K>) -> &T;

    /// Borrow a [`PageMapLevel4`] in this frame.
    #[inline]
    fn pml4(&self, page: PhysicalPage<Size4K>) -> &PageMapLevel4 {
        // SAFETY: walks only follow present entries, under the page-table lock.
        unsafe { self.phys_to_ref(page) }
    }

    /// Borrow a [`PageDirectoryPointerTable`] in this frame.
    #[inline]
    fn pdpt(&self, page: PhysicalPage<Size4K>) -> &PageDirectoryPointerTable {
        unsafe { self.phys_to_ref(page) }
    }

    /// Borrow a [`PageDirectory`] in this frame.
    #[inline]
    fn pd(&self, page: PhysicalPage<Size4K>) -> &PageDirectory {
        unsafe { self.phys_to_ref(page) }
    }

    /// Borrow a [`PageTable`] in this frame.
    #[inline]
    fn pt(&self, page: PhysicalPage<Size4K>) -> &PageTable {
        unsafe { self.phys_to_ref(page) }
    }
}

impl<M: PhysMapper> PhysMapper for &M {
    #[inline]
    unsafe fn phys_to_ref<T>(&self, page: PhysicalPage<Size4K>) -> &T {
        unsafe { (**self).phys_to_ref(page) }
    }
}

impl<M: PhysMapper> PhysMapper for alloc::sync::Arc<M> {
    #[inline]
    unsafe fn phys_to_ref<T>(&self, page: PhysicalPage<Size4K>) -> &T {
        unsafe { (**self).phys_to_ref(page) }
    }
}

/// [`PhysMapper`] for kernels with a higher-half direct map: every physical
/// address `pa` is readable at `base + pa`, with `base` defaulting to
/// [`info::HHDM_BASE`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HhdmPhysMapper {
    base: u64,
}

impl HhdmPhysMapper {
    /// Direct map starting at virtual address `base`.
    #[inline]
    #[must_use]
    pub const fn new(base: u64) -> Self {
        Self { base }
    }
}

impl Default for HhdmPhysMapper {
    fn default() -> Self {
        Self::new(info::HHDM_BASE)
    }
}

impl PhysMapper for HhdmPhysMapper {
    #[inline]
    unsafe fn phys_to_ref<T>(&self, page: PhysicalPage<Size4K>) -> &T {
        let va = self.base.wrapping_add(page.base().as_u64()) as *const T;
        // SAFETY: Caller guarantees the frame is covered by the direct map.
        unsafe { &*va }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use kernel_memory_addresses::PhysicalAddress;

    #[test]
    fn default_direct_map_starts_at_hhdm_base() {
        assert_eq!(HhdmPhysMapper::default(), HhdmPhysMapper::new(info::HHDM_BASE));
    }

    #[test]
    fn direct_map_reads_table_at_base_plus_pa() {
        let mut table = Box::new(PageTable::zeroed());
        let leaf = PhysicalPage::from_addr(PhysicalAddress::new(0x1_a2b3_c000));
        table.set(L1Index::new(3), PtEntry::leaf_4k(leaf, EntryBits::user_rw()));

        // Pretend the table lives at pa 0x5000 of a direct map placed so that
        // base + 0x5000 is the boxed table.
        let table_va = (&raw const *table).addr() as u64;
        let mapper = HhdmPhysMapper::new(table_va.wrapping_sub(0x5000));
        let page = PhysicalPage::from_addr(PhysicalAddress::new(0x5000));

        assert_eq!(mapper.pt(page).get(L1Index::new(3)).page_4k(), Some(leaf));
        assert_eq!(mapper.pt(page).get(L1Index::new(4)).page_4k(), None);
    }
}
