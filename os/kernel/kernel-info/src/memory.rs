//! # Memory Layout

use kernel_memory_addresses::{PageSize, Size4K};

/// Base page size in bytes.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

/// Number of low address bits covered by [`PAGE_SIZE`].
pub const PAGE_SHIFT: u32 = Size4K::SHIFT;

/// End of userspace VA range after which Kernel space begins.
pub const USERSPACE_END: u64 = 0xffff_0000_0000_0000;

/// Base of the linear map of physical memory.
///
/// The kernel virtual address of a physical frame (`page_address` in host
/// terms) is `HHDM_BASE + pa`.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(1 << PAGE_SHIFT == PAGE_SIZE);
    assert!(HHDM_BASE >= USERSPACE_END);
};
