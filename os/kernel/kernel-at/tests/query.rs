use kernel_at::{Config, Endpoint, Errno, QueryOutcome, RegionMatch};
use kernel_info::memory::{HHDM_BASE, PAGE_SIZE};
use kernel_memory_addresses::{PageFrameNumber, PhysicalAddress, VirtualAddress};
use kernel_rmap::ResolveError;
use kernel_rmap::fake::{FakeHost, FakeHostBuilder};
use kernel_vmem::{ProcessId, TranslateError};
use std::thread;

const SHARED: PhysicalAddress = PhysicalAddress::new(0x1_a2b3_c000);
const VA_100: VirtualAddress = VirtualAddress::new(0x7f00_0000_0000);
const VA_200: VirtualAddress = VirtualAddress::new(0x7f11_1111_0000);
const VMALLOC_BASE: VirtualAddress = VirtualAddress::new(0xffff_a000_0000_0000);

/// Two processes sharing one page, a kernel region backed by frames
/// 0x100 and 0x101, and a 4-page compound folio at 0x300.
fn host() -> FakeHost {
    let mut b = FakeHostBuilder::default();
    let p100 = b.address_space(Some(ProcessId::new(100))).unwrap();
    let p200 = b.address_space(Some(ProcessId::new(200))).unwrap();
    b.map_page(p100, VA_100, SHARED).unwrap();
    b.map_page(p200, VA_200, SHARED).unwrap();
    b.kernel_region(
        VMALLOC_BASE,
        &[PageFrameNumber::new(0x100), PageFrameNumber::new(0x101)],
    );
    b.compound_folio(PageFrameNumber::new(0x300), 4, true);
    b.online_page(PageFrameNumber::new(0x400));
    b.build()
}

fn drain<H>(endpoint: &Endpoint<'_, H>) -> Vec<String>
where
    H: kernel_rmap::ReverseMap + kernel_rmap::KernelRegionRegistry,
{
    let mut records = Vec::new();
    let mut pos = 0u64;
    let mut buf = [0u8; 4096];
    loop {
        let n = endpoint.read(&mut buf, &mut pos).unwrap();
        if n == 0 {
            break;
        }
        records.push(String::from_utf8(buf[..n].to_vec()).unwrap());
    }
    assert_eq!(pos, records.iter().map(|r| r.len() as u64).sum::<u64>());
    records
}

#[test]
fn shared_page_reports_both_processes() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());

    assert_eq!(endpoint.write(b"1a2b3c000"), Ok(9));

    let mut records = drain(&endpoint);
    records.sort();
    assert_eq!(
        records,
        [
            "Virtual Address of 0x1a2b3c000 is 0x7f0000000000 with pid 100\n",
            "Virtual Address of 0x1a2b3c000 is 0x7f1111110000 with pid 200\n",
        ]
    );
    assert_eq!(drain(&endpoint), Vec::<String>::new());
    assert_eq!(host.gets(), host.puts());
    assert_eq!(host.rmap_walks(), 1);
}

#[test]
fn offset_in_page_is_applied_to_every_mapping() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    let outcome = endpoint.analyzer().analyse(0x1_a2b3_c123);
    assert_eq!(
        outcome,
        QueryOutcome::Mappings {
            resolved: 2,
            skipped: 0
        }
    );

    let mut records = drain(&endpoint);
    records.sort();
    assert_eq!(
        records,
        [
            "Virtual Address of 0x1a2b3c123 is 0x7f0000000123 with pid 100\n",
            "Virtual Address of 0x1a2b3c123 is 0x7f1111110123 with pid 200\n",
        ]
    );
}

#[test]
fn invalid_text_queues_nothing() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());

    assert_eq!(endpoint.write(b"nothex"), Err(Errno::EFAULT));
    assert!(endpoint.queue().is_empty());
    assert_eq!((host.gets(), host.rmap_walks()), (0, 0));
}

#[test]
fn overlong_write_is_rejected() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    let long = vec![b'0'; 5000];
    assert_eq!(endpoint.write(&long), Err(Errno::EINVAL));
    assert!(endpoint.queue().is_empty());
}

#[test]
fn kernel_region_is_reported_without_rmap_walk() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    let linear_alias = HHDM_BASE + 0x101 * PAGE_SIZE + 0x10;

    endpoint
        .write(format!("{linear_alias:x}\n").as_bytes())
        .unwrap();

    assert_eq!(drain(&endpoint), ["VA start: 0xffffa00000000000\n"]);
    assert_eq!((host.gets(), host.puts(), host.rmap_walks()), (0, 0, 0));
}

#[test]
fn backing_frame_policy_matches_physical_frames() {
    let host = host();
    let config = Config {
        region_match: RegionMatch::BackingFrames,
        ..Config::default()
    };
    let endpoint = Endpoint::new(&host, config);

    assert_eq!(
        endpoint.analyzer().analyse(0x10_0800),
        QueryOutcome::KernelRegion(VMALLOC_BASE)
    );
    // The linear alias is not a backing frame under this policy.
    assert_eq!(
        endpoint.analyzer().analyse(HHDM_BASE + 0x100 * PAGE_SIZE),
        QueryOutcome::NotMapped
    );
    assert_eq!(
        drain(&endpoint),
        [
            "VA start: 0xffffa00000000000\n",
            "Physical address 0xffff888000100000 is not mapped to any user process\n",
        ]
    );
    assert_eq!(host.rmap_walks(), 0);
}

#[test]
fn unknown_tail_and_non_lru_frames_are_not_mapped() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    let analyzer = endpoint.analyzer();

    assert_eq!(analyzer.analyse(0x9999_9000), QueryOutcome::NotMapped);
    assert_eq!(analyzer.analyse(0x30_1000), QueryOutcome::NotMapped);
    assert_eq!(analyzer.analyse(0x40_0000), QueryOutcome::NotMapped);
    assert_eq!(
        drain(&endpoint),
        [
            "Physical address 0x99999000 is not mapped to any user process\n",
            "Physical address 0x301000 is not mapped to any user process\n",
            "Physical address 0x400000 is not mapped to any user process\n",
        ]
    );
    assert_eq!((host.gets(), host.puts(), host.rmap_walks()), (0, 0, 0));
}

#[test]
fn lru_folio_without_mappings_is_not_mapped() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());

    assert_eq!(endpoint.analyzer().analyse(0x30_0000), QueryOutcome::NotMapped);
    assert_eq!(
        drain(&endpoint),
        ["Physical address 0x300000 is not mapped to any user process\n"]
    );
    assert_eq!((host.gets(), host.puts(), host.rmap_walks()), (1, 1, 1));
}

#[test]
fn losing_a_reclaim_race_releases_the_folio() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    host.isolate_on_next_get();

    assert_eq!(endpoint.analyzer().analyse(SHARED.as_u64()), QueryOutcome::NotMapped);
    assert_eq!((host.gets(), host.puts(), host.rmap_walks()), (1, 1, 0));
}

#[test]
fn only_unresolvable_mappings_end_as_not_mapped() {
    let mut b = FakeHostBuilder::default();
    let gone = b.address_space(None).unwrap();
    b.map_page(gone, VA_100, SHARED).unwrap();
    let host = b.build();
    let endpoint = Endpoint::new(&host, Config::default());

    assert_eq!(endpoint.analyzer().analyse(SHARED.as_u64()), QueryOutcome::NotMapped);
    assert_eq!(
        drain(&endpoint),
        ["Physical address 0x1a2b3c000 is not mapped to any user process\n"]
    );
    assert_eq!(host.gets(), host.puts());
}

#[test]
fn records_drain_in_query_order() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    endpoint.write(b"9999000").unwrap();
    endpoint
        .write(format!("{:x}", HHDM_BASE + 0x100 * PAGE_SIZE).as_bytes())
        .unwrap();
    endpoint.write(b"0x400000\n").unwrap();

    assert_eq!(
        drain(&endpoint),
        [
            "Physical address 0x9999000 is not mapped to any user process\n",
            "VA start: 0xffffa00000000000\n",
            "Physical address 0x400000 is not mapped to any user process\n",
        ]
    );
}

#[test]
fn short_read_buffer_keeps_the_record() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    endpoint.write(b"400000").unwrap();

    let mut pos = 0;
    let mut small = [0u8; 8];
    assert_eq!(endpoint.read(&mut small, &mut pos), Err(Errno::ENOSPC));
    assert_eq!(pos, 0);
    assert_eq!(endpoint.queue().len(), 1);
    assert_eq!(drain(&endpoint).len(), 1);
}

#[test]
fn read_position_saturates_at_end_of_file() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    endpoint.write(b"400000").unwrap();

    let mut pos = u64::MAX - 1;
    let mut buf = [0u8; 4096];
    let n = endpoint.read(&mut buf, &mut pos).unwrap();
    assert!(n > 1);
    assert_eq!(pos, u64::MAX);
    assert!(endpoint.queue().is_empty());
}

#[test]
fn translate_by_pid() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());
    let analyzer = endpoint.analyzer();

    assert_eq!(
        analyzer.translate_process_address(ProcessId::new(200), VirtualAddress::new(0x7f11_1111_0fff)),
        Ok(PhysicalAddress::new(0x1_a2b3_cfff))
    );
    assert_eq!(
        analyzer.translate_process_address(ProcessId::new(300), VA_100),
        Err(ResolveError::NoSuchProcess(ProcessId::new(300)))
    );
    let unmapped = VirtualAddress::new(0x1000);
    assert_eq!(
        analyzer.translate_process_address(ProcessId::new(100), unmapped),
        Err(ResolveError::Translate(TranslateError::Pml4NotPresent(unmapped)))
    );
}

#[test]
fn concurrent_queries_balance_references() {
    let host = host();
    let endpoint = Endpoint::new(&host, Config::default());

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    endpoint.write(b"1a2b3c000").unwrap();
                }
            });
        }
    });

    let records = drain(&endpoint);
    assert_eq!(records.len(), 4 * 50 * 2);
    assert_eq!(host.gets(), 200);
    assert_eq!(host.puts(), 200);
}
