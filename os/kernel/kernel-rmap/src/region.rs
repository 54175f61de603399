//! # Kernel Region Scanner
//!
//! Checks whether an address belongs to one of the kernel's own dynamically
//! allocated virtual areas (vmalloc areas), and if so which one.
//!
//! A region's span is taken from its backing frames, not from its own base:
//!
//! ```text
//! start = page_address(pages[0])
//! end   = page_address(pages[n - 1]) + PAGE_SIZE
//! ```
//!
//! where `page_address` is the frame's alias in the linear map. Regions
//! without backing frames have no span and never match; the first matching
//! region in registry order wins.
//!
//! The scan is a virtual-address operation. Callers that start from a
//! physical query value pick a [`RegionMatch`] policy and convert at that
//! boundary.

use kernel_info::memory::{HHDM_BASE, PAGE_SIZE};
use kernel_memory_addresses::{PageFrameNumber, PhysicalAddress, VirtualAddress};
use log::trace;

/// One kernel virtual area and the frames backing it, in virtual order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KernelRegion<'a> {
    /// First virtual address of the area.
    pub base: VirtualAddress,
    /// Backing frames; not necessarily physically contiguous.
    pub pages: &'a [PageFrameNumber],
}

/// Host registry of kernel virtual areas.
pub trait KernelRegionRegistry {
    /// All registered areas, in registry order.
    fn regions(&self) -> impl Iterator<Item = KernelRegion<'_>>;

    /// Linear-map virtual address of `pfn`.
    ///
    /// Defaults to `HHDM_BASE + pfn * PAGE_SIZE`; `None` if that overflows.
    fn page_address(&self, pfn: PageFrameNumber) -> Option<VirtualAddress> {
        VirtualAddress::new(HHDM_BASE).checked_add(pfn.checked_base()?.as_u64())
    }
}

/// How a physical query value is matched against kernel regions.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum RegionMatch {
    /// Reinterpret the value as a virtual address and test it against each
    /// region's linear-map span.
    #[default]
    LinearMapAlias,
    /// Test the physical frame of the value against each region's backing
    /// frames.
    BackingFrames,
}

impl<'a> KernelRegion<'a> {
    #[inline]
    #[must_use]
    pub const fn new(base: VirtualAddress, pages: &'a [PageFrameNumber]) -> Self {
        Self { base, pages }
    }

    /// `[start, end)` of the linear-map aliases of the first and last
    /// backing frames, or `None` for an empty region.
    #[must_use]
    pub fn linear_span<R: KernelRegionRegistry + ?Sized>(
        &self,
        registry: &R,
    ) -> Option<(VirtualAddress, VirtualAddress)> {
        let first = registry.page_address(*self.pages.first()?)?;
        let last = registry.page_address(*self.pages.last()?)?;
        Some((first, last.checked_add(PAGE_SIZE)?))
    }

    /// Whether `pfn` is one of the backing frames.
    #[must_use]
    pub fn is_backed_by(&self, pfn: PageFrameNumber) -> bool {
        self.pages.contains(&pfn)
    }
}

/// Base of the first kernel region whose linear-map span contains `candidate`.
#[must_use]
pub fn kernel_region_containing<R: KernelRegionRegistry + ?Sized>(
    registry: &R,
    candidate: VirtualAddress,
) -> Option<VirtualAddress> {
    registry.regions().find_map(|region| {
        let Some((start, end)) = region.linear_span(registry) else {
            trace!("skipping empty region at {}", region.base);
            return None;
        };
        trace!("region {}: [{start}, {end})", region.base);
        (start <= candidate && candidate < end).then_some(region.base)
    })
}

/// Base of the first kernel region backed by the frame containing `pa`.
#[must_use]
pub fn kernel_region_backing<R: KernelRegionRegistry + ?Sized>(
    registry: &R,
    pa: PhysicalAddress,
) -> Option<VirtualAddress> {
    let pfn = pa.frame_number();
    registry
        .regions()
        .find(|region| region.is_backed_by(pfn))
        .map(|region| region.base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Regions(Vec<(VirtualAddress, Vec<PageFrameNumber>)>);

    impl KernelRegionRegistry for Regions {
        fn regions(&self) -> impl Iterator<Item = KernelRegion<'_>> {
            self.0
                .iter()
                .map(|(base, pages)| KernelRegion::new(*base, pages))
        }
    }

    fn pfns(list: &[u64]) -> Vec<PageFrameNumber> {
        list.iter().copied().map(PageFrameNumber::new).collect()
    }

    const VMALLOC_A: VirtualAddress = VirtualAddress::new(0xffff_a000_0000_0000);
    const VMALLOC_B: VirtualAddress = VirtualAddress::new(0xffff_a000_0001_0000);

    fn linear(pfn: u64) -> VirtualAddress {
        VirtualAddress::new(HHDM_BASE + pfn * PAGE_SIZE)
    }

    #[test]
    fn span_covers_first_to_one_past_last_frame() {
        let reg = Regions(vec![(VMALLOC_A, pfns(&[0x100, 0x2000, 0x180]))]);
        let region = reg.regions().next().unwrap();
        assert_eq!(
            region.linear_span(&reg),
            Some((linear(0x100), linear(0x181)))
        );
    }

    #[test]
    fn candidate_in_span_matches_its_region() {
        let reg = Regions(vec![(VMALLOC_A, pfns(&[0x100, 0x101]))]);
        assert_eq!(kernel_region_containing(&reg, linear(0x100)), Some(VMALLOC_A));
        assert_eq!(
            kernel_region_containing(&reg, VirtualAddress::new(HHDM_BASE + 0x101_fff)),
            Some(VMALLOC_A)
        );
        assert_eq!(kernel_region_containing(&reg, linear(0x102)), None);
        assert_eq!(
            kernel_region_containing(&reg, VirtualAddress::new(HHDM_BASE + 0xff_fff)),
            None
        );
    }

    #[test]
    fn empty_regions_are_skipped_and_first_match_wins() {
        let reg = Regions(vec![
            (VirtualAddress::new(0xffff_a000_0000_0000), Vec::new()),
            (VMALLOC_B, pfns(&[0x10, 0x20])),
            (VirtualAddress::new(0xffff_a000_0002_0000), pfns(&[0x18])),
        ]);
        assert_eq!(kernel_region_containing(&reg, linear(0x18)), Some(VMALLOC_B));
    }

    #[test]
    fn backing_frames_match_on_physical_frame() {
        let reg = Regions(vec![
            (VMALLOC_A, pfns(&[0x100, 0x2000])),
            (VMALLOC_B, pfns(&[0x300])),
        ]);
        assert_eq!(
            kernel_region_backing(&reg, PhysicalAddress::new(0x2000_123)),
            Some(VMALLOC_A)
        );
        assert_eq!(
            kernel_region_backing(&reg, PhysicalAddress::new(0x30_0fff)),
            Some(VMALLOC_B)
        );
        assert_eq!(kernel_region_backing(&reg, PhysicalAddress::new(0x101_000)), None);
    }

    #[test]
    fn unaddressable_frames_give_no_span() {
        let reg = Regions(vec![(VMALLOC_A, pfns(&[u64::MAX >> 12]))]);
        assert_eq!(kernel_region_containing(&reg, VirtualAddress::new(u64::MAX)), None);
    }

    #[test]
    fn frames_past_physical_range_do_not_alias_low_memory() {
        // 1 << 52 shifted by 12 would wrap to zero, i.e. onto HHDM_BASE.
        let reg = Regions(vec![(VMALLOC_A, pfns(&[1 << 52]))]);
        assert_eq!(reg.page_address(PageFrameNumber::new(1 << 52)), None);
        assert_eq!(reg.regions().next().unwrap().linear_span(&reg), None);
        assert_eq!(kernel_region_containing(&reg, VirtualAddress::new(HHDM_BASE)), None);
    }
}
