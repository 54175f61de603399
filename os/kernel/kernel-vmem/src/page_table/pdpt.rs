//! # x86-64 Page Directory Pointer Table (PDPT / L3)
//!
//! At this level the `PS` bit selects the role of an entry:
//! - `PS=0`: points to a Page Directory (4 KiB-aligned base).
//! - `PS=1`: maps a 1 GiB page (1 GiB-aligned base).

use crate::page_table::EntryBits;
use kernel_memory_addresses::{PhysicalPage, Size1G, Size4K, VirtualAddress};

/// Index into the PDPT (derived from VA bits `[38:30]`).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct L3Index(u16);

impl L3Index {
    /// Extract bits `[38:30]` of `va`.
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u64() >> 30) & 0x1FF) as u16)
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

/// Decoded view of a present PDPTE.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PdptEntryKind {
    /// `PS=0`: the next-level Page Directory.
    NextPageDirectory(PhysicalPage<Size4K>),
    /// `PS=1`: a 1 GiB leaf.
    Leaf1GiB(PhysicalPage<Size1G>),
}

#[doc(alias = "PDPTE")]
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PdptEntry(EntryBits);

impl PdptEntry {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(EntryBits::new())
    }

    /// Present non-leaf entry pointing at `pd` (`PS=0`).
    #[inline]
    #[must_use]
    pub const fn next(pd: PhysicalPage<Size4K>, flags: EntryBits) -> Self {
        Self(
            flags
                .with_present(true)
                .with_large_page(false)
                .with_physical_address(pd.base()),
        )
    }

    /// Present 1 GiB leaf (`PS=1`).
    #[inline]
    #[must_use]
    pub const fn leaf_1g(page: PhysicalPage<Size1G>, flags: EntryBits) -> Self {
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
    pub const fn kind(self) -> Option<PdptEntryKind> {
        if !self.0.present() {
            return None;
        }
        let pa = self.0.physical_address();
        Some(if self.0.large_page() {
            PdptEntryKind::Leaf1GiB(PhysicalPage::from_addr(pa))
        } else {
            PdptEntryKind::NextPageDirectory(PhysicalPage::from_addr(pa))
        })
    }
}

/// The PDPT (L3): 512 entries, 4 KiB-aligned.
#[doc(alias = "PDPT")]
#[repr(C, align(4096))]
pub struct PageDirectoryPointerTable {
    entries: [PdptEntry; 512],
}

impl PageDirectoryPointerTable {
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PdptEntry::zero(); 512],
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: L3Index) -> PdptEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: L3Index, e: PdptEntry) {
        self.entries[i.as_usize()] = e;
    }
}
