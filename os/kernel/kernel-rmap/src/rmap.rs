//! # Reverse Mapping Traversal
//!
//! For a referenced folio, visit every (address space, virtual address) pair
//! the host's reverse map records for it, and turn each pair into the virtual
//! address of the queried byte in that process.
//!
//! The pair's virtual address is the base of the mapped page. Its physical
//! base is re-derived with a forward walk, so the offset of the target within
//! the page can be carried over:
//!
//! ```text
//! offset   = target_pa - translate(va_base)
//! resolved = va_base + offset
//! ```
//!
//! Every pair is visited. Pairs that cannot be resolved are skipped and
//! counted; they never end the traversal.

use crate::frame::{FolioRef, FrameDatabase};
use core::ops::ControlFlow;
use kernel_memory_addresses::{PhysicalAddress, Size4K, VirtualAddress};
use kernel_vmem::{AddressSpace, PhysMapper, ProcessId, TranslateError};
use log::{debug, trace, warn};

/// Host reverse map.
pub trait ReverseMap: FrameDatabase {
    /// Page-table access of the address spaces handed to the visitor.
    type Mapper: PhysMapper;

    /// Call `visit` for each address space mapping `folio`, with the virtual
    /// address the folio is mapped at there.
    ///
    /// Order is unspecified and the set may change concurrently. The walk
    /// stops early only if `visit` breaks.
    fn walk(
        &self,
        folio: &FolioRef<'_, Self>,
        visit: &mut dyn FnMut(&AddressSpace<Self::Mapper>, VirtualAddress) -> ControlFlow<()>,
    );
}

/// One process mapping of the queried physical address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub pid: ProcessId,
    pub virtual_address: VirtualAddress,
    pub physical_address: PhysicalAddress,
}

/// Why a reverse-map pair was skipped.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("address space has no owning process")]
    NoOwner,
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("target {target} lies below the page base {page}")]
    OffsetUnderflow {
        target: PhysicalAddress,
        page: PhysicalAddress,
    },
    #[error("{base} + {offset:#x} overflows")]
    AddressOverflow { base: VirtualAddress, offset: u64 },
}

/// What a traversal saw.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TraversalStats {
    /// Pairs handed out by the reverse map.
    pub visited: usize,
    /// Pairs that produced a [`ResolvedMapping`].
    pub resolved: usize,
    /// Pairs dropped with a [`MappingError`].
    pub skipped: usize,
}

impl ResolvedMapping {
    /// Resolve `target` through the page mapped at `va_base` in `space`.
    ///
    /// `va_base` is aligned down to its 4 KiB page before translating.
    ///
    /// # Errors
    /// See [`MappingError`].
    pub fn resolve<M: PhysMapper>(
        space: &AddressSpace<M>,
        va_base: VirtualAddress,
        target: PhysicalAddress,
    ) -> Result<Self, MappingError> {
        let pid = space.owner().ok_or(MappingError::NoOwner)?;
        let base = va_base.page::<Size4K>().base();
        let page = space.translate(base)?;
        let offset = target
            .checked_distance_from(page)
            .ok_or(MappingError::OffsetUnderflow { target, page })?;
        let virtual_address = base
            .checked_add(offset)
            .ok_or(MappingError::AddressOverflow { base, offset })?;
        Ok(Self {
            pid,
            virtual_address,
            physical_address: target,
        })
    }
}

/// Resolve `target` in every address space mapping `folio`, passing each
/// result to `emit` in reverse-map order.
pub fn for_each_mapping<R: ReverseMap + ?Sized>(
    rmap: &R,
    folio: &FolioRef<'_, R>,
    target: PhysicalAddress,
    mut emit: impl FnMut(ResolvedMapping),
) -> TraversalStats {
    let mut stats = TraversalStats::default();
    rmap.walk(folio, &mut |space, va_base| {
        stats.visited += 1;
        match ResolvedMapping::resolve(space, va_base, target) {
            Ok(mapping) => {
                trace!("{target} is {} in {:?}", mapping.virtual_address, mapping.pid);
                stats.resolved += 1;
                emit(mapping);
            }
            Err(e) => {
                warn!("skipping {va_base} of {space:?}: {e}");
                stats.skipped += 1;
            }
        }
        ControlFlow::Continue(())
    });
    debug!(
        "rmap walk of {:?}: {} visited, {} resolved, {} skipped",
        folio.folio(),
        stats.visited,
        stats.resolved,
        stats.skipped
    );
    stats
}
