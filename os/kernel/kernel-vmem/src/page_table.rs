//! # Memory Page Table
//!
//! All four levels share one 64-bit entry layout ([`EntryBits`]); the level
//! wrappers decide which bits are meaningful and how an entry is decoded.

pub mod pd;
pub mod pdpt;
pub mod pml4;
pub mod pt;

use crate::page_table::pd::L2Index;
use crate::page_table::pdpt::L3Index;
use crate::page_table::pml4::L4Index;
use crate::page_table::pt::L1Index;
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Common superset of the x86-64 paging entry formats (PML4E, PDPTE, PDE, PTE).
///
/// | Bits      | Name / Mnemonic   | Meaning |
/// |-----------|-------------------|----------|
/// | 0         | `P` (present)     | Valid entry if set |
/// | 1         | `RW`              | Writable if set |
/// | 2         | `US`              | User-mode accessible if set |
/// | 3         | `PWT`             | Write-through caching |
/// | 4         | `PCD`             | Disable caching |
/// | 5         | `A`               | Accessed |
/// | 6         | `D`               | Dirty (leaf only) |
/// | 7         | `PS`              | Large page flag (PDPTE/PDE), PAT in a PTE |
/// | 8         | `G`               | Global (leaf only) |
/// | 9–11      | OS avail low      | Reserved for OS use |
/// | 12–51     | `addr`            | Physical frame bits [51:12] |
/// | 52–58     | OS avail high     | Reserved for OS use |
/// | 59–62     | `PKU` / OS use    | Protection key or OS use |
/// | 63        | `NX`              | Execute disable |
///
/// For 2 MiB and 1 GiB leaves, bit 12 holds PAT; the leaf decoders align the
/// address down to the leaf size, which drops it.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct EntryBits {
    /// Present (P, bit 0).
    pub present: bool,
    /// Writable (RW, bit 1).
    pub writable: bool,
    /// User/Supervisor (US, bit 2).
    pub user: bool,
    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,
    /// Page Cache Disable (PCD, bit 4).
    pub cache_disable: bool,
    /// Accessed (A, bit 5).
    pub accessed: bool,
    /// Dirty (D, bit 6), leaf only.
    pub dirty: bool,
    /// Page Size (PS, bit 7).
    pub large_page: bool,
    /// Global (G, bit 8), leaf only.
    pub global: bool,
    /// OS-available low (bits 9..11).
    #[bits(3)]
    pub os_available_low: u8,
    /// Physical address bits 12..51.
    #[bits(40)]
    phys_addr_51_12: u64,
    /// OS-available high (bits 52..58).
    #[bits(7)]
    pub os_available_high: u8,
    /// Protection key / OS use (bits 59..62).
    #[bits(4)]
    pub protection_key: u8,
    /// No-Execute (NX, bit 63).
    pub no_execute: bool,
}

impl EntryBits {
    /// Present + writable + user, the usual flags of a user mapping chain.
    #[inline]
    #[must_use]
    pub const fn user_rw() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user(true)
    }

    /// The physical address stored in bits 12..51.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.phys_addr_51_12() << 12)
    }

    /// Store `pa` in bits 12..51; the low 12 bits of `pa` are discarded.
    #[inline]
    #[must_use]
    pub const fn with_physical_address(self, pa: PhysicalAddress) -> Self {
        self.with_phys_addr_51_12(pa.as_u64() >> 12)
    }
}

/// Split a virtual address into its four table indices.
#[inline]
#[must_use]
pub const fn split_indices(va: VirtualAddress) -> (L4Index, L3Index, L2Index, L1Index) {
    (
        L4Index::from(va),
        L3Index::from(va),
        L2Index::from(va),
        L1Index::from(va),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_ok() {
        let va = VirtualAddress::new(0xFFFF_8888_0123_4567);
        let (i4, i3, i2, i1) = split_indices(va);
        assert!(i4.as_usize() < 512);
        assert!(i3.as_usize() < 512);
        assert!(i2.as_usize() < 512);
        assert!(i1.as_usize() < 512);
    }

    #[test]
    fn indices_of_a_user_address() {
        let (i4, i3, i2, i1) = split_indices(VirtualAddress::new(0x7f11_1111_0000));
        assert_eq!(i4.as_usize(), 0xFE);
        assert_eq!(i3.as_usize(), 0x44);
        assert_eq!(i2.as_usize(), 0x88);
        assert_eq!(i1.as_usize(), 0x110);
    }

    #[test]
    fn physical_address_drops_flag_bits() {
        let e = EntryBits::user_rw()
            .with_no_execute(true)
            .with_physical_address(PhysicalAddress::new(0x1_a2b3_c123));
        assert_eq!(e.physical_address().as_u64(), 0x1_a2b3_c000);
        assert!(e.present() && e.writable() && e.user() && e.no_execute());
    }
}
