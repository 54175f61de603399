//! # Query Interface
//!
//! Parses query text and runs the analysis of one physical address:
//!
//! 1. kernel regions, matched according to [`RegionMatch`];
//! 2. otherwise the LRU folio of the address and its reverse mappings;
//! 3. otherwise a single "not mapped" record.
//!
//! Each finding is pushed to the [`ResultQueue`] as one line.

use crate::queue::ResultQueue;
use core::fmt;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_rmap::{
    AddressSpaceRegistry, KernelRegionRegistry, RegionMatch, ResolveError, ReverseMap,
    for_each_mapping, kernel_region_backing, kernel_region_containing, locate,
};
use kernel_vmem::ProcessId;
use log::{debug, error};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid address")]
    InvalidAddress,
    #[error("query of {len} bytes exceeds the limit of {max}")]
    TooLong { len: usize, max: usize },
}

/// Which path an analysis took.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The address belongs to the kernel region starting at this base.
    KernelRegion(VirtualAddress),
    /// The address is on an LRU folio with at least one resolvable mapping.
    Mappings { resolved: usize, skipped: usize },
    /// Neither.
    NotMapped,
}

/// Parse query text as a base-16 number.
///
/// Accepts an optional `+`, an optional `0x`/`0X`, at least one hex digit and
/// one optional trailing newline. Anything after the first NUL byte is
/// ignored.
///
/// ```
/// # use kernel_at::{parse_address, QueryError};
/// assert_eq!(parse_address(b"1a2b3c000\n", 4095), Ok(0x1_a2b3_c000));
/// assert_eq!(parse_address(b"0XFF\0junk", 4095), Ok(0xff));
/// assert_eq!(parse_address(b"nothex", 4095), Err(QueryError::InvalidAddress));
/// ```
///
/// # Errors
/// [`QueryError::TooLong`] if `input` is longer than `max_len`, otherwise
/// [`QueryError::InvalidAddress`] for malformed text or a value that does not
/// fit in 64 bits.
pub fn parse_address(input: &[u8], max_len: usize) -> Result<u64, QueryError> {
    if input.len() > max_len {
        return Err(QueryError::TooLong {
            len: input.len(),
            max: max_len,
        });
    }

    let text = input.split(|b| *b == 0).next().unwrap_or_default();
    let text = text.strip_prefix(b"+").unwrap_or(text);
    let text = text
        .strip_prefix(b"0x")
        .or_else(|| text.strip_prefix(b"0X"))
        .unwrap_or(text);
    let digits = text.strip_suffix(b"\n").unwrap_or(text);
    if digits.is_empty() {
        return Err(QueryError::InvalidAddress);
    }

    digits.iter().try_fold(0u64, |acc, b| {
        let digit = char::from(*b)
            .to_digit(16)
            .ok_or(QueryError::InvalidAddress)?;
        acc.checked_mul(16)
            .and_then(|acc| acc.checked_add(u64::from(digit)))
            .ok_or(QueryError::InvalidAddress)
    })
}

/// Runs queries against a host and queues what it finds.
pub struct Analyzer<'a, H> {
    host: &'a H,
    queue: &'a ResultQueue,
    region_match: RegionMatch,
}

impl<'a, H> Analyzer<'a, H>
where
    H: ReverseMap + KernelRegionRegistry,
{
    #[must_use]
    pub const fn new(host: &'a H, queue: &'a ResultQueue, region_match: RegionMatch) -> Self {
        Self {
            host,
            queue,
            region_match,
        }
    }

    /// Analyse the physical address `addr` and queue the findings.
    pub fn analyse(&self, addr: u64) -> QueryOutcome {
        let pa = PhysicalAddress::new(addr);

        if let Some(base) = self.kernel_region(addr) {
            debug!("{pa} is in the kernel region at {base}");
            self.emit(format_args!("VA start: 0x{base:x}\n"));
            return QueryOutcome::KernelRegion(base);
        }
        error!("Physical address not mapped to KVA: {addr:#x}");

        let Some(folio) = locate(self.host, pa.frame_number()) else {
            return self.not_mapped(pa);
        };
        let stats = for_each_mapping(self.host, &folio, pa, |mapping| {
            self.emit(format_args!(
                "Virtual Address of 0x{:x} is 0x{:x} with pid {}\n",
                mapping.physical_address, mapping.virtual_address, mapping.pid
            ));
        });
        drop(folio);

        if stats.resolved == 0 {
            return self.not_mapped(pa);
        }
        QueryOutcome::Mappings {
            resolved: stats.resolved,
            skipped: stats.skipped,
        }
    }

    /// Physical address backing `va` in the address space of `pid`.
    ///
    /// # Errors
    /// See [`kernel_rmap::translate_process_address`].
    pub fn translate_process_address(
        &self,
        pid: ProcessId,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, ResolveError>
    where
        H: AddressSpaceRegistry<H::Mapper>,
    {
        kernel_rmap::translate_process_address(self.host, pid, va)
    }

    #[must_use]
    pub const fn region_match(&self) -> RegionMatch {
        self.region_match
    }

    fn kernel_region(&self, addr: u64) -> Option<VirtualAddress> {
        match self.region_match {
            RegionMatch::LinearMapAlias => {
                // The query value is physical; regions span virtual addresses.
                let candidate = VirtualAddress::new(addr);
                debug!("matching {addr:#x} against kernel regions as {candidate}");
                kernel_region_containing(self.host, candidate)
            }
            RegionMatch::BackingFrames => kernel_region_backing(self.host, PhysicalAddress::new(addr)),
        }
    }

    fn not_mapped(&self, pa: PhysicalAddress) -> QueryOutcome {
        error!("Physical address {pa:#x} is not mapped to any user process");
        self.emit(format_args!(
            "Physical address 0x{pa:x} is not mapped to any user process\n"
        ));
        QueryOutcome::NotMapped
    }

    fn emit(&self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.queue.push_fmt(args) {
            error!("dropping result record: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 4095;

    #[test]
    fn plain_and_prefixed_hex() {
        assert_eq!(parse_address(b"1a2b3c000", MAX), Ok(0x1_a2b3_c000));
        assert_eq!(parse_address(b"0x1A2B3C000", MAX), Ok(0x1_a2b3_c000));
        assert_eq!(parse_address(b"+0x10", MAX), Ok(0x10));
        assert_eq!(parse_address(b"ffffffffffffffff\n", MAX), Ok(u64::MAX));
    }

    #[test]
    fn trailing_nuls_are_ignored() {
        let mut buf = [0u8; 16];
        buf[..4].copy_from_slice(b"beef");
        assert_eq!(parse_address(&buf, MAX), Ok(0xbeef));
    }

    #[test]
    fn malformed_text_is_invalid() {
        for bad in [
            &b"nothex"[..],
            b"",
            b"\n",
            b"0x",
            b"+",
            b" 10",
            b"10 ",
            b"10\n\n",
            b"-1",
            b"1g",
            b"\x0010",
        ] {
            assert_eq!(
                parse_address(bad, MAX),
                Err(QueryError::InvalidAddress),
                "{}",
                bad.escape_ascii()
            );
        }
    }

    #[test]
    fn values_beyond_64_bits_are_invalid() {
        assert_eq!(
            parse_address(b"10000000000000000", MAX),
            Err(QueryError::InvalidAddress)
        );
    }

    #[test]
    fn overlong_input_is_rejected_before_parsing() {
        let long = vec![b'0'; MAX + 1];
        assert_eq!(
            parse_address(&long, MAX),
            Err(QueryError::TooLong {
                len: MAX + 1,
                max: MAX
            })
        );
        assert_eq!(parse_address(&long[..MAX], MAX), Ok(0));
    }
}
