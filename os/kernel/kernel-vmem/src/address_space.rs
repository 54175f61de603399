//! # Address Space (x86-64, PML4-rooted)
//!
//! One process's virtual memory context: the owning process, the root of its
//! page-table tree, and the lock that serializes walks of that tree.
//!
//! ## Forward translation
//!
//! [`AddressSpace::translate`] takes the page-table lock, walks
//! PML4 → PDPT → PD → PT and returns `leaf_base + (va mod leaf_size)`. The walk
//! stops at the first absent entry with a [`TranslateError`] naming the level;
//! it never dereferences a table through a non-present entry. The lock is
//! released on every exit path by dropping its guard.
//!
//! Huge leaves (2 MiB PDE, 1 GiB PDPTE) terminate the walk early and use the
//! in-page offset of their own size.

use crate::page_table::pd::PdEntryKind;
use crate::page_table::pdpt::PdptEntryKind;
use crate::{PhysMapper, ProcessId, split_indices};
use core::fmt;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size1G, Size2M, Size4K, VirtualAddress};
use kernel_sync::{SpinLock, SpinLockGuard};
use log::trace;

/// The PML4 root page for an [`AddressSpace`].
pub type RootPage = PhysicalPage<Size4K>;

/// Handle to a single, concrete address space.
pub struct AddressSpace<M: PhysMapper> {
    owner: Option<ProcessId>,
    root: RootPage,
    mapper: M,
    page_table_lock: SpinLock<()>,
}

/// Level at which a forward translation found no mapping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("no PML4 entry for {0}")]
    Pml4NotPresent(VirtualAddress),
    #[error("no PDPT entry for {0}")]
    PdptNotPresent(VirtualAddress),
    #[error("no PD entry for {0}")]
    PdNotPresent(VirtualAddress),
    #[error("no PTE present for {0}")]
    PteNotPresent(VirtualAddress),
}

impl<M: PhysMapper> AddressSpace<M> {
    /// Describe the address space rooted at `root`.
    ///
    /// `owner` is `None` for address spaces whose process has already exited.
    #[inline]
    pub const fn new(owner: Option<ProcessId>, root: RootPage, mapper: M) -> Self {
        Self {
            owner,
            root,
            mapper,
            page_table_lock: SpinLock::new(()),
        }
    }

    /// Process owning this address space, if it still has one.
    #[inline]
    pub const fn owner(&self) -> Option<ProcessId> {
        self.owner
    }

    /// Take the page-table lock.
    ///
    /// Whoever modifies this space's tables must hold it; [`translate`](Self::translate)
    /// takes it for the duration of a walk.
    #[inline]
    pub fn lock_page_tables(&self) -> SpinLockGuard<'_, ()> {
        self.page_table_lock.lock()
    }

    /// Whether a walk (or a writer) currently holds the page-table lock.
    #[inline]
    pub fn is_page_table_locked(&self) -> bool {
        self.page_table_lock.is_locked()
    }

    /// Translate `va` to the physical address backing it.
    ///
    /// # Errors
    /// Returns the level at which no present entry was found.
    pub fn translate(&self, va: VirtualAddress) -> Result<PhysicalAddress, TranslateError> {
        let _guard = self.lock_page_tables();
        let pa = self.walk(va);
        match &pa {
            Ok(pa) => trace!("{va} -> {pa} (root {})", self.root),
            Err(e) => trace!("walk from root {} failed: {e}", self.root),
        }
        pa
    }

    /// Walk the tables; the caller holds the page-table lock.
    fn walk(&self, va: VirtualAddress) -> Result<PhysicalAddress, TranslateError> {
        let (i4, i3, i2, i1) = split_indices(va);

        // PML4
        let next_pdpt = self
            .mapper
            .pml4(self.root)
            .get(i4)
            .next_table()
            .ok_or(TranslateError::Pml4NotPresent(va))?;

        // PDPT
        let next_pd = match self
            .mapper
            .pdpt(next_pdpt)
            .get(i3)
            .kind()
            .ok_or(TranslateError::PdptNotPresent(va))?
        {
            PdptEntryKind::Leaf1GiB(base) => return Ok(base.join(va.offset::<Size1G>())),
            PdptEntryKind::NextPageDirectory(table) => table,
        };

        // PD
        let next_pt = match self
            .mapper
            .pd(next_pd)
            .get(i2)
            .kind()
            .ok_or(TranslateError::PdNotPresent(va))?
        {
            PdEntryKind::Leaf2MiB(base) => return Ok(base.join(va.offset::<Size2M>())),
            PdEntryKind::NextPageTable(table) => table,
        };

        // PT
        let page = self
            .mapper
            .pt(next_pt)
            .get(i1)
            .page_4k()
            .ok_or(TranslateError::PteNotPresent(va))?;
        Ok(page.join(va.offset::<Size4K>()))
    }
}

impl<M: PhysMapper> fmt::Debug for AddressSpace<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("owner", &self.owner)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
