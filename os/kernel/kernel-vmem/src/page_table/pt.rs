//! # x86-64 Page Table (PT / L1)
//!
//! The lowest paging level. Every present entry maps one 4 KiB page; bit 7 is
//! PAT here, never PS.

use crate::page_table::EntryBits;
use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualAddress};

/// Index into the Page Table (derived from VA bits `[20:12]`).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L1Index(u16);

impl L1Index {
    /// Extract bits `[20:12]` of `va`.
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u64() >> 12) & 0x1FF) as u16)
    }

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

/// A single Page Table entry (PTE).
#[doc(alias = "PTE")]
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PtEntry(EntryBits);

impl PtEntry {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(EntryBits::new())
    }

    /// Present 4 KiB leaf mapping `page`.
    #[inline]
    #[must_use]
    pub const fn leaf_4k(page: PhysicalPage<Size4K>, flags: EntryBits) -> Self {
        Self(flags.with_present(true).with_physical_address(page.base()))
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// If present, the mapped 4 KiB physical page.
    #[inline]
    #[must_use]
    pub const fn page_4k(self) -> Option<PhysicalPage<Size4K>> {
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

/// The Page Table (L1): 512 entries, 4 KiB-aligned.
#[doc(alias = "PT")]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PtEntry; 512],
}

impl PageTable {
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PtEntry::zero(); 512],
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: L1Index) -> PtEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: L1Index, e: PtEntry) {
        self.entries[i.as_usize()] = e;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use kernel_memory_addresses::PhysicalAddress;

    #[test]
    fn pte_4k_leaf() {
        let k4 = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x5555_0000));
        let e = PtEntry::leaf_4k(k4, EntryBits::new().with_user(true).with_no_execute(true));
        assert_eq!(e.page_4k().unwrap().base().as_u64(), 0x5555_0000);
        assert!(e.flags().no_execute());
        assert!(e.flags().user());
        assert!(!e.flags().writable());
    }

    #[test]
    fn non_present_pte_maps_nothing() {
        let stale = PtEntry(EntryBits::new().with_physical_address(PhysicalAddress::new(0x9000)));
        assert!(stale.page_4k().is_none());
    }
}
