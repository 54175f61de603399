use crate::{PageSize, PhysicalAddress, PhysicalPage, Size4K};
use core::fmt;

/// Page frame number: the index of a 4 KiB physical frame.
///
/// `pfn = pa >> 12`. This is the key under which the host's frame database
/// tracks page descriptors.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageFrameNumber(u64);

impl PageFrameNumber {
    #[inline]
    #[must_use]
    pub const fn new(pfn: u64) -> Self {
        Self(pfn)
    }

    /// The frame containing `pa`.
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self(pa.as_u64() >> Size4K::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// First byte of the frame.
    ///
    /// Bits shifted out above bit 63 are discarded; use
    /// [`checked_base`](Self::checked_base) for frame numbers of unknown origin.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << Size4K::SHIFT)
    }

    /// First byte of the frame, or `None` if it does not fit in 64 bits.
    #[inline]
    #[must_use]
    pub const fn checked_base(self) -> Option<PhysicalAddress> {
        match self.0.checked_mul(Size4K::SIZE) {
            Some(pa) => Some(PhysicalAddress::new(pa)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn page(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(self.base())
    }

    /// The following frame, or `None` past the end of the address space.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for PageFrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PFN({:#x})", self.0)
    }
}

impl fmt::Display for PageFrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<PhysicalPage<Size4K>> for PageFrameNumber {
    #[inline]
    fn from(page: PhysicalPage<Size4K>) -> Self {
        Self::containing(page.base())
    }
}
