//! Process lookup and forward translation by pid.

use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_vmem::{AddressSpace, PhysMapper, ProcessId, TranslateError};

/// Host registry of live processes' address spaces.
pub trait AddressSpaceRegistry<M: PhysMapper> {
    /// The address space of `pid`, if the process exists and still has one.
    fn address_space(&self, pid: ProcessId) -> Option<&AddressSpace<M>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("{0:?} has no address space")]
    NoSuchProcess(ProcessId),
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

/// Physical address backing `va` in the address space of `pid`.
///
/// # Errors
/// [`ResolveError::NoSuchProcess`] if the registry has no address space for
/// `pid`, otherwise the level at which the walk found nothing.
pub fn translate_process_address<M, R>(
    registry: &R,
    pid: ProcessId,
    va: VirtualAddress,
) -> Result<PhysicalAddress, ResolveError>
where
    M: PhysMapper,
    R: AddressSpaceRegistry<M> + ?Sized,
{
    let space = registry
        .address_space(pid)
        .ok_or(ResolveError::NoSuchProcess(pid))?;
    Ok(space.translate(va)?)
}
