//! # In-memory host
//!
//! A [`FakeHost`] implements every host service this crate consumes, over a
//! [`FrameArena`] holding real page tables. It counts folio references taken
//! and put, and the number of reverse-map walks, so callers can check that a
//! query balances its references and which paths it took.
//!
//! ```
//! use kernel_rmap::fake::FakeHostBuilder;
//! use kernel_rmap::{for_each_mapping, locate};
//! use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
//! use kernel_vmem::ProcessId;
//!
//! let mut host = FakeHostBuilder::default();
//! let space = host.address_space(Some(ProcessId::new(100))).unwrap();
//! let pa = PhysicalAddress::new(0x1_a2b3_c000);
//! host.map_page(space, VirtualAddress::new(0x7f00_0000_0000), pa).unwrap();
//! let host = host.build();
//!
//! let folio = locate(&host, pa.frame_number()).unwrap();
//! let stats = for_each_mapping(&host, &folio, pa, |_| {});
//! assert_eq!(stats.resolved, 1);
//! drop(folio);
//! assert_eq!(host.gets(), host.puts());
//! ```

use crate::frame::{FolioRef, FrameDatabase};
use crate::region::{KernelRegion, KernelRegionRegistry};
use crate::registry::AddressSpaceRegistry;
use crate::rmap::ReverseMap;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::ControlFlow;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use kernel_memory_addresses::{PageFrameNumber, PhysicalAddress, VirtualAddress};
use kernel_sync::SpinLock;
use kernel_vmem::AddressSpace;
use kernel_vmem::ProcessId;
use kernel_vmem::address_space::RootPage;
use kernel_vmem::arena::{ArenaError, FrameArena};

/// Page-table mapper of every fake address space.
pub type FakeMapper = Arc<FrameArena>;

/// A fake folio, named by its head frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FakeFolio(pub PageFrameNumber);

/// Index of an address space in a [`FakeHostBuilder`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpaceId(usize);

/// Builds a [`FakeHost`].
pub struct FakeHostBuilder {
    arena: FrameArena,
    spaces: Vec<(Option<ProcessId>, RootPage)>,
    heads: BTreeMap<PageFrameNumber, PageFrameNumber>,
    lru: BTreeSet<PageFrameNumber>,
    rmap: BTreeMap<PageFrameNumber, Vec<(SpaceId, VirtualAddress)>>,
    regions: Vec<(VirtualAddress, Vec<PageFrameNumber>)>,
}

impl Default for FakeHostBuilder {
    fn default() -> Self {
        Self::with_table_frames(64)
    }
}

impl FakeHostBuilder {
    /// Builder whose arena holds `frames` page-table frames.
    #[must_use]
    pub fn with_table_frames(frames: usize) -> Self {
        Self {
            arena: FrameArena::new(frames),
            spaces: Vec::new(),
            heads: BTreeMap::new(),
            lru: BTreeSet::new(),
            rmap: BTreeMap::new(),
            regions: Vec::new(),
        }
    }

    /// Add an empty address space.
    ///
    /// # Errors
    /// The arena has no frame left for the PML4.
    pub fn address_space(&mut self, owner: Option<ProcessId>) -> Result<SpaceId, ArenaError> {
        let root = self.arena.alloc_table()?;
        self.spaces.push((owner, root));
        Ok(SpaceId(self.spaces.len() - 1))
    }

    /// Map the 4 KiB page at `va` to the frame of `pa`, make that frame an
    /// online single-page LRU folio and record the mapping in the reverse map.
    ///
    /// # Errors
    /// The arena has no frame left for an intermediate table.
    pub fn map_page(
        &mut self,
        space: SpaceId,
        va: VirtualAddress,
        pa: PhysicalAddress,
    ) -> Result<(), ArenaError> {
        let pfn = pa.frame_number();
        self.map_table_only(space, va, pa)?;
        self.heads.insert(pfn, pfn);
        self.lru.insert(pfn);
        self.rmap_entry(space, va, pfn);
        Ok(())
    }

    /// Install a page-table mapping without touching the frame database or
    /// the reverse map.
    ///
    /// # Errors
    /// The arena has no frame left for an intermediate table.
    pub fn map_table_only(
        &mut self,
        space: SpaceId,
        va: VirtualAddress,
        pa: PhysicalAddress,
    ) -> Result<(), ArenaError> {
        let root = self.spaces[space.0].1;
        self.arena.map_4k(root, va, pa.page())
    }

    /// Record that the folio headed by `head` is mapped at `va` in `space`.
    pub fn rmap_entry(&mut self, space: SpaceId, va: VirtualAddress, head: PageFrameNumber) {
        self.rmap.entry(head).or_default().push((space, va));
    }

    /// Make `pfn` an online frame that is not on any LRU list.
    pub fn online_page(&mut self, pfn: PageFrameNumber) {
        self.heads.insert(pfn, pfn);
    }

    /// Make `nr_pages` frames starting at `head` one online compound folio.
    pub fn compound_folio(&mut self, head: PageFrameNumber, nr_pages: u64, on_lru: bool) {
        for i in 0..nr_pages {
            self.heads.insert(PageFrameNumber::new(head.as_u64() + i), head);
        }
        if on_lru {
            self.lru.insert(head);
        }
    }

    /// Register a kernel region starting at `base` backed by `pages`.
    pub fn kernel_region(&mut self, base: VirtualAddress, pages: &[PageFrameNumber]) {
        self.regions.push((base, pages.to_vec()));
    }

    #[must_use]
    pub fn build(self) -> FakeHost {
        let arena = Arc::new(self.arena);
        let spaces = self
            .spaces
            .into_iter()
            .map(|(owner, root)| AddressSpace::new(owner, root, Arc::clone(&arena)))
            .collect();
        FakeHost {
            spaces,
            heads: self.heads,
            rmap: self.rmap,
            regions: self.regions,
            lru: SpinLock::new(self.lru),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            walks: AtomicUsize::new(0),
            leave_lru_on_get: AtomicBool::new(false),
        }
    }
}

/// In-memory host; see the module docs.
pub struct FakeHost {
    spaces: Vec<AddressSpace<FakeMapper>>,
    heads: BTreeMap<PageFrameNumber, PageFrameNumber>,
    rmap: BTreeMap<PageFrameNumber, Vec<(SpaceId, VirtualAddress)>>,
    regions: Vec<(VirtualAddress, Vec<PageFrameNumber>)>,
    lru: SpinLock<BTreeSet<PageFrameNumber>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    walks: AtomicUsize,
    leave_lru_on_get: AtomicBool,
}

impl FakeHost {
    /// Folio references taken so far.
    #[must_use]
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Folio references put so far.
    #[must_use]
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Reverse-map walks started so far.
    #[must_use]
    pub fn rmap_walks(&self) -> usize {
        self.walks.load(Ordering::SeqCst)
    }

    /// Make the next successful reference take the folio off the LRU, as if
    /// reclaim isolated it concurrently.
    pub fn isolate_on_next_get(&self) {
        self.leave_lru_on_get.store(true, Ordering::SeqCst);
    }

    /// The address space with index `space`.
    #[must_use]
    pub fn space(&self, space: SpaceId) -> &AddressSpace<FakeMapper> {
        &self.spaces[space.0]
    }
}

impl FrameDatabase for FakeHost {
    type Page = PageFrameNumber;
    type Folio = FakeFolio;

    fn online_page(&self, pfn: PageFrameNumber) -> Option<PageFrameNumber> {
        self.heads.contains_key(&pfn).then_some(pfn)
    }

    fn is_tail(&self, page: PageFrameNumber) -> bool {
        self.heads.get(&page).is_some_and(|head| *head != page)
    }

    fn folio_of(&self, page: PageFrameNumber) -> FakeFolio {
        FakeFolio(self.heads.get(&page).copied().unwrap_or(page))
    }

    fn is_on_lru(&self, folio: FakeFolio) -> bool {
        self.lru.lock().contains(&folio.0)
    }

    fn try_get(&self, folio: FakeFolio) -> bool {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.leave_lru_on_get.swap(false, Ordering::SeqCst) {
            self.lru.lock().remove(&folio.0);
        }
        true
    }

    fn put(&self, _folio: FakeFolio) {
        self.puts.fetch_add(1, Ordering::SeqCst);
    }
}

impl ReverseMap for FakeHost {
    type Mapper = FakeMapper;

    fn walk(
        &self,
        folio: &FolioRef<'_, Self>,
        visit: &mut dyn FnMut(&AddressSpace<FakeMapper>, VirtualAddress) -> ControlFlow<()>,
    ) {
        self.walks.fetch_add(1, Ordering::SeqCst);
        let Some(entries) = self.rmap.get(&folio.folio().0) else {
            return;
        };
        for (space, va) in entries {
            if visit(&self.spaces[space.0], *va).is_break() {
                break;
            }
        }
    }
}

impl KernelRegionRegistry for FakeHost {
    fn regions(&self) -> impl Iterator<Item = KernelRegion<'_>> {
        self.regions
            .iter()
            .map(|(base, pages)| KernelRegion::new(*base, pages))
    }
}

impl AddressSpaceRegistry<FakeMapper> for FakeHost {
    fn address_space(&self, pid: ProcessId) -> Option<&AddressSpace<FakeMapper>> {
        self.spaces.iter().find(|space| space.owner() == Some(pid))
    }
}
