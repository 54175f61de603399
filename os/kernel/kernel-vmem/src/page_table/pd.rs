//! # x86-64 Page Directory (PD / L2)
//!
//! At L2, the `PS` bit selects the role of an entry:
//! - `PS=0`: entry points to a next-level Page Table (PT), whose base is 4 KiB-aligned.
//! - `PS=1`: entry is a 2 MiB leaf mapping; base must be 2 MiB-aligned.

use crate::page_table::EntryBits;
use kernel_memory_addresses::{PhysicalPage, Size2M, Size4K, VirtualAddress};

/// Index into the Page Directory (derived from VA bits `[29:21]`).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L2Index(u16);

impl L2Index {
    /// Extract bits `[29:21]` of `va`.
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u64() >> 21) & 0x1FF) as u16)
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

/// Decoded view of a present PDE.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PdEntryKind {
    /// `PS=0`: the next-level Page Table.
    NextPageTable(PhysicalPage<Size4K>),
    /// `PS=1`: a 2 MiB leaf.
    Leaf2MiB(PhysicalPage<Size2M>),
}

#[doc(alias = "PDE")]
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PdEntry(EntryBits);

impl PdEntry {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(EntryBits::new())
    }

    /// Present non-leaf entry pointing at `pt` (`PS=0`).
    #[inline]
    #[must_use]
    pub const fn next(pt: PhysicalPage<Size4K>, flags: EntryBits) -> Self {
        Self(
            flags
                .with_present(true)
                .with_large_page(false)
                .with_physical_address(pt.base()),
        )
    }

    /// Present 2 MiB leaf (`PS=1`).
    #[inline]
    #[must_use]
    pub const fn leaf_2m(page: PhysicalPage<Size2M>, flags: EntryBits) -> Self {
        Self(
            flags
                .with_present(true)
                .with_large_page(true)
                .with_physical_address(page.base()),
        )
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// Decode a present entry; `None` if not present.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> Option<PdEntryKind> {
        if !self.0.present() {
            return None;
        }
        let pa = self.0.physical_address();
        Some(if self.0.large_page() {
            PdEntryKind::Leaf2MiB(PhysicalPage::from_addr(pa))
        } else {
            PdEntryKind::NextPageTable(PhysicalPage::from_addr(pa))
        })
    }
}

/// The Page Directory (L2): 512 entries, 4 KiB-aligned.
#[doc(alias = "PD")]
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PdEntry; 512],
}

impl PageDirectory {
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PdEntry::zero(); 512],
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: L2Index) -> PdEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: L2Index, e: PdEntry) {
        self.entries[i.as_usize()] = e;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::PhysicalAddress;

    #[test]
    fn leaf_2m_drops_the_pat_bit() {
        // Bit 12 of a 2 MiB leaf is PAT, not part of the address.
        let raw = EntryBits::user_rw()
            .with_large_page(true)
            .with_physical_address(PhysicalAddress::new(0x0040_1000));
        let e = PdEntry(raw);
        assert_eq!(
            e.kind(),
            Some(PdEntryKind::Leaf2MiB(PhysicalPage::from_addr(
                PhysicalAddress::new(0x0040_0000)
            )))
        );
    }

    #[test]
    fn non_leaf_points_to_page_table() {
        let pt = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x7000));
        let e = PdEntry::next(pt, EntryBits::user_rw());
        assert_eq!(e.kind(), Some(PdEntryKind::NextPageTable(pt)));
    }
}
