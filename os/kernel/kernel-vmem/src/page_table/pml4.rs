//! # x86-64 Page Map Level 4 (PML4)
//!
//! - [`L4Index`]: index type for bits 47..39 of a canonical virtual address.
//! - [`Pml4Entry`]: a single PML4 entry (never a leaf).
//! - [`PageMapLevel4`]: a 4 KiB-aligned array of 512 PML4 entries.
//!
//! A PML4E either is not present or points to a Page-Directory-Pointer Table
//! ([PDPT](super::pdpt::PageDirectoryPointerTable)). `PS` must be 0.

use crate::page_table::EntryBits;
use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualAddress};

/// Index into the PML4 table (derived from virtual-address bits `[47:39]`).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L4Index(u16);

impl L4Index {
    /// Extract bits `[47:39]` of `va`.
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u64() >> 39) & 0x1FF) as u16)
    }

    /// ### Debug assertions
    /// - Asserts `v < 512` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < 512);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// L4 **PML4E**: pointer to a **PDPT**.
#[doc(alias = "PML4E")]
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pml4Entry(EntryBits);

impl Pml4Entry {
    /// Create a zero (non-present) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(EntryBits::new())
    }

    /// Present entry pointing at `pdpt`, with `flags` for the rest.
    ///
    /// `PS` is forced to 0.
    #[inline]
    #[must_use]
    pub const fn next(pdpt: PhysicalPage<Size4K>, flags: EntryBits) -> Self {
        Self(
            flags
                .with_present(true)
                .with_large_page(false)
                .with_physical_address(pdpt.base()),
        )
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// If present, return the physical page of the next-level PDPT.
    #[inline]
    #[must_use]
    pub const fn next_table(self) -> Option<PhysicalPage<Size4K>> {
        if !self.0.present() {
            return None;
        }
        Some(PhysicalPage::from_addr(self.0.physical_address()))
    }

    #[inline]
    #[must_use]
    pub const fn flags(self) -> EntryBits {
        self.0
    }
}

/// The top-level page map (PML4): 512 entries, 4 KiB-aligned.
#[doc(alias = "PML4")]
#[repr(C, align(4096))]
pub struct PageMapLevel4 {
    entries: [Pml4Entry; 512],
}

impl PageMapLevel4 {
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [Pml4Entry::zero(); 512],
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: L4Index) -> Pml4Entry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`; TLB maintenance is the caller's business.
    #[inline]
    pub const fn set(&mut self, i: L4Index, e: Pml4Entry) {
        self.entries[i.as_usize()] = e;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::PhysicalAddress;

    #[test]
    fn pml4_points_to_pdpt() {
        let pdpt_page = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x1234_5000));
        let e = Pml4Entry::next(pdpt_page, EntryBits::user_rw().with_large_page(true));
        assert!(e.is_present());
        assert!(!e.flags().large_page());
        assert_eq!(e.next_table().unwrap().base().as_u64(), 0x1234_5000);
    }

    #[test]
    fn zero_entry_has_no_next_table() {
        assert!(Pml4Entry::zero().next_table().is_none());
        let t = PageMapLevel4::zeroed();
        assert!(!t.get(L4Index::new(511)).is_present());
    }
}
