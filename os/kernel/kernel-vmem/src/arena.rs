//! # In-memory frame arena
//!
//! Simulated physical memory for host-side tests: a run of 4 KiB-aligned
//! frames starting at [`FrameArena::BASE`], a bump allocator for page-table
//! frames, and helpers that install mappings into a PML4 tree.
//!
//! Tables are built through `&mut self` and only read afterwards through the
//! [`PhysMapper`] impl, so no frame is ever written while a walk borrows it.
//! Data pages referenced by leaf entries are plain numbers and need not lie in
//! the arena.

use crate::{
    EntryBits, PageDirectory, PageDirectoryPointerTable, PageMapLevel4, PageTable, PdEntry,
    PdEntryKind, PdptEntry, PdptEntryKind, PhysMapper, Pml4Entry, PtEntry, split_indices,
};
use alloc::boxed::Box;
use alloc::vec::Vec;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size1G, Size2M, Size4K, VirtualAddress};

/// One 4 KiB frame of simulated RAM.
#[repr(C, align(4096))]
struct Frame([u64; 512]);

const _: () = assert!(size_of::<Frame>() == 4096);

/// Simulated physical memory holding page tables.
pub struct FrameArena {
    frames: Box<[Frame]>,
    next: usize,
}

/// Reason a mapping could not be installed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("arena is out of frames")]
    OutOfFrames,
    #[error("{0} is already covered by a huge leaf")]
    HugeLeafInTheWay(VirtualAddress),
}

impl FrameArena {
    /// Physical address of the first arena frame.
    pub const BASE: u64 = 0x0010_0000;

    /// Arena with `frames` zeroed frames.
    #[must_use]
    pub fn new(frames: usize) -> Self {
        let frames: Vec<Frame> = (0..frames).map(|_| Frame([0; 512])).collect();
        Self {
            frames: frames.into_boxed_slice(),
            next: 0,
        }
    }

    /// Number of frames handed out so far.
    #[must_use]
    pub const fn used_frames(&self) -> usize {
        self.next
    }

    /// Allocate a zeroed frame for a page table.
    ///
    /// # Errors
    /// [`ArenaError::OutOfFrames`] when the arena is exhausted.
    pub fn alloc_table(&mut self) -> Result<PhysicalPage<Size4K>, ArenaError> {
        let idx = self.next;
        let frame = self.frames.get_mut(idx).ok_or(ArenaError::OutOfFrames)?;
        frame.0 = [0; 512];
        self.next += 1;
        Ok(PhysicalPage::from_addr(PhysicalAddress::new(
            Self::BASE + (idx as u64) * 4096,
        )))
    }

    /// Frame index of `page`; out of range (and thus panicking on use) for
    /// pages outside the arena.
    fn index_of(page: PhysicalPage<Size4K>) -> usize {
        page.base()
            .checked_distance_from(PhysicalAddress::new(Self::BASE))
            .and_then(|offset| usize::try_from(offset / 4096).ok())
            .unwrap_or(usize::MAX)
    }

    fn table_mut<T>(&mut self, page: PhysicalPage<Size4K>) -> &mut T {
        debug_assert!(size_of::<T>() <= size_of::<Frame>());
        debug_assert!(align_of::<T>() <= align_of::<Frame>());
        let frame: *mut Frame = &raw mut self.frames[Self::index_of(page)];
        // SAFETY: every table type is a 4 KiB, 4 KiB-aligned array of u64
        // entries, and `&mut self` rules out other borrows of the frame.
        unsafe { &mut *frame.cast::<T>() }
    }

    /// Return the PDPT below `root` for `va`, creating it if missing.
    fn ensure_pdpt(
        &mut self,
        root: PhysicalPage<Size4K>,
        va: VirtualAddress,
    ) -> Result<PhysicalPage<Size4K>, ArenaError> {
        let (i4, ..) = split_indices(va);
        if let Some(pdpt) = self.table_mut::<PageMapLevel4>(root).get(i4).next_table() {
            return Ok(pdpt);
        }
        let pdpt = self.alloc_table()?;
        self.table_mut::<PageMapLevel4>(root)
            .set(i4, Pml4Entry::next(pdpt, EntryBits::user_rw()));
        Ok(pdpt)
    }

    fn ensure_pd(
        &mut self,
        root: PhysicalPage<Size4K>,
        va: VirtualAddress,
    ) -> Result<PhysicalPage<Size4K>, ArenaError> {
        let (_, i3, ..) = split_indices(va);
        let pdpt = self.ensure_pdpt(root, va)?;
        match self.table_mut::<PageDirectoryPointerTable>(pdpt).get(i3).kind() {
            Some(PdptEntryKind::NextPageDirectory(pd)) => Ok(pd),
            Some(PdptEntryKind::Leaf1GiB(_)) => Err(ArenaError::HugeLeafInTheWay(va)),
            None => {
                let pd = self.alloc_table()?;
                self.table_mut::<PageDirectoryPointerTable>(pdpt)
                    .set(i3, PdptEntry::next(pd, EntryBits::user_rw()));
                Ok(pd)
            }
        }
    }

    fn ensure_pt(
        &mut self,
        root: PhysicalPage<Size4K>,
        va: VirtualAddress,
    ) -> Result<PhysicalPage<Size4K>, ArenaError> {
        let (_, _, i2, _) = split_indices(va);
        let pd = self.ensure_pd(root, va)?;
        match self.table_mut::<PageDirectory>(pd).get(i2).kind() {
            Some(PdEntryKind::NextPageTable(pt)) => Ok(pt),
            Some(PdEntryKind::Leaf2MiB(_)) => Err(ArenaError::HugeLeafInTheWay(va)),
            None => {
                let pt = self.alloc_table()?;
                self.table_mut::<PageDirectory>(pd)
                    .set(i2, PdEntry::next(pt, EntryBits::user_rw()));
                Ok(pt)
            }
        }
    }

    /// Install a 4 KiB mapping `va → pa` below `root`.
    ///
    /// # Errors
    /// Out of frames, or a huge leaf already covers `va`.
    pub fn map_4k(
        &mut self,
        root: PhysicalPage<Size4K>,
        va: VirtualAddress,
        pa: PhysicalPage<Size4K>,
    ) -> Result<(), ArenaError> {
        let (.., i1) = split_indices(va);
        let pt = self.ensure_pt(root, va)?;
        self.table_mut::<PageTable>(pt)
            .set(i1, PtEntry::leaf_4k(pa, EntryBits::user_rw()));
        Ok(())
    }

    /// Install a 2 MiB leaf `va → pa` below `root`.
    ///
    /// # Errors
    /// Out of frames, or a 1 GiB leaf already covers `va`.
    pub fn map_2m(
        &mut self,
        root: PhysicalPage<Size4K>,
        va: VirtualAddress,
        pa: PhysicalPage<Size2M>,
    ) -> Result<(), ArenaError> {
        let (_, _, i2, _) = split_indices(va);
        let pd = self.ensure_pd(root, va)?;
        self.table_mut::<PageDirectory>(pd)
            .set(i2, PdEntry::leaf_2m(pa, EntryBits::user_rw()));
        Ok(())
    }

    /// Install a 1 GiB leaf `va → pa` below `root`.
    ///
    /// # Errors
    /// Out of frames.
    pub fn map_1g(
        &mut self,
        root: PhysicalPage<Size4K>,
        va: VirtualAddress,
        pa: PhysicalPage<Size1G>,
    ) -> Result<(), ArenaError> {
        let (_, i3, ..) = split_indices(va);
        let pdpt = self.ensure_pdpt(root, va)?;
        self.table_mut::<PageDirectoryPointerTable>(pdpt)
            .set(i3, PdptEntry::leaf_1g(pa, EntryBits::user_rw()));
        Ok(())
    }

    /// Clear the PTE for `va`, keeping the intermediate tables.
    ///
    /// Returns `false` if there was no page table to clear it in.
    pub fn unmap_4k(&mut self, root: PhysicalPage<Size4K>, va: VirtualAddress) -> bool {
        let (i4, i3, i2, i1) = split_indices(va);
        let Some(pdpt) = self.table_mut::<PageMapLevel4>(root).get(i4).next_table() else {
            return false;
        };
        let Some(PdptEntryKind::NextPageDirectory(pd)) =
            self.table_mut::<PageDirectoryPointerTable>(pdpt).get(i3).kind()
        else {
            return false;
        };
        let Some(PdEntryKind::NextPageTable(pt)) = self.table_mut::<PageDirectory>(pd).get(i2).kind()
        else {
            return false;
        };
        self.table_mut::<PageTable>(pt).set(i1, PtEntry::zero());
        true
    }
}

impl PhysMapper for FrameArena {
    unsafe fn phys_to_ref<T>(&self, page: PhysicalPage<Size4K>) -> &T {
        let frame: *const Frame = &raw const self.frames[Self::index_of(page)];
        // SAFETY: see `table_mut`; shared borrow of `self` excludes writers.
        unsafe { &*frame.cast::<T>() }
    }
}
