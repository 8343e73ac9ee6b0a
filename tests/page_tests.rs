//! Tests for Major and Minor pages
//!
//! These tests verify:
//! - Page decoding from a freshly created file
//! - Derived offsets and sizes
//! - Page-level capacity limits
//! - Minor page append algorithm and upward propagation
//! - Minor page end-time behaviour
//! - The live content-size recomputation

use std::io::Cursor;

use logdb::page::{
    Geometry, ParentLink, FILE_HEADER_SIZE, MAJOR_HEADER_SIZE, MINOR_HEADER_SIZE,
    RECORD_HEADER_SIZE,
};
use logdb::{ByteOrder, Codec, LogDbError, MajorPage, MinorPage, Store};

// =============================================================================
// Helper Functions
// =============================================================================

type MemCodec = Codec<Cursor<Vec<u8>>>;

/// Create a store, append the given records, and hand back a codec over the
/// resulting bytes.
fn file_with_records(major: u16, minor: u16, records: &[(u64, &str)]) -> MemCodec {
    let store = Store::create(major, minor, Cursor::new(Vec::new())).unwrap();
    for (ts, payload) in records {
        store.append_bytes(*ts, payload.as_bytes()).unwrap();
    }
    Codec::new(store.into_inner(), ByteOrder::Little)
}

fn first_major(codec: &mut MemCodec, geometry: Geometry) -> MajorPage {
    codec.seek_to(FILE_HEADER_SIZE).unwrap();
    MajorPage::decode(codec, geometry).unwrap()
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_fresh_major_page_is_empty() {
    let geometry = Geometry::new(3, 4);
    let mut codec = file_with_records(3, 4, &[]);

    let major = first_major(&mut codec, geometry);

    assert_eq!(major.offset, FILE_HEADER_SIZE);
    assert_eq!(major.used_entries, 0);
    assert_eq!(major.content_size, 0);
    assert_eq!(major.remaining_capacity(), 3);
    assert!(major.entries.is_empty());
    assert_eq!(major.flags, vec![false; 16]);
    assert!(major.last_minor_page(&mut codec).unwrap().is_none());
}

#[test]
fn test_major_page_derived_offsets() {
    let geometry = Geometry::new(3, 4);
    let mut codec = file_with_records(3, 4, &[(1, "abc")]);

    let major = first_major(&mut codec, geometry);

    assert_eq!(major.table_offset(), FILE_HEADER_SIZE + MAJOR_HEADER_SIZE);
    assert_eq!(major.content_start(), FILE_HEADER_SIZE + 18 + 3 * 26);
    assert_eq!(
        major.content_size,
        geometry.minor_page_size() + RECORD_HEADER_SIZE + 3
    );
    assert_eq!(major.end(), major.content_start() + major.content_size);
    assert_eq!(major.absolute_size(), geometry.major_page_size() + major.content_size);
}

#[test]
fn test_minor_page_decoded_through_index_entry() {
    let geometry = Geometry::new(2, 4);
    let mut codec = file_with_records(2, 4, &[(10, "one"), (20, "three")]);

    let major = first_major(&mut codec, geometry);
    let entry = &major.entries[0];
    assert_eq!(entry.content_offset, 0);
    assert_eq!(entry.referenced_page_offset(), major.content_start());

    let minor = entry.read_referenced_minor_page(&mut codec).unwrap();
    assert_eq!(minor.offset, major.content_start());
    assert_eq!(minor.table_offset(), minor.offset + MINOR_HEADER_SIZE);
    assert_eq!(minor.content_start(), minor.offset + geometry.minor_page_size());
    assert_eq!(minor.used_entries, 2);
    assert_eq!(minor.remaining_capacity(), 2);
    assert_eq!(
        minor.parent,
        ParentLink {
            major_offset: major.offset,
            slot: 0
        }
    );

    let records = minor.read_records(&mut codec).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0].payload[..], b"one");
    assert_eq!(records[1].timestamp, 20);
    assert_eq!(&records[1].payload[..], b"three");
}

#[test]
fn test_record_entries_point_at_consecutive_records() {
    let geometry = Geometry::new(1, 3);
    let mut codec = file_with_records(1, 3, &[(1, "aa"), (2, "bbbb"), (3, "")]);

    let major = first_major(&mut codec, geometry);
    let minor = major.entries[0].read_referenced_minor_page(&mut codec).unwrap();

    let offsets: Vec<u64> = minor.entries.iter().map(|e| e.content_offset).collect();
    assert_eq!(offsets, vec![0, 17, 36]);
    assert_eq!(minor.content_size, 36 + RECORD_HEADER_SIZE);
}

#[test]
fn test_minor_decode_rejects_wrong_tag() {
    let geometry = Geometry::new(1, 1);
    let mut codec = file_with_records(1, 1, &[]);

    // The major page header sits where a minor page was expected
    codec.seek_to(FILE_HEADER_SIZE).unwrap();
    let parent = ParentLink {
        major_offset: 0,
        slot: 0,
    };
    let result = MinorPage::decode(&mut codec, geometry, parent);

    assert!(matches!(
        result,
        Err(LogDbError::Corruption { offset, .. }) if offset == FILE_HEADER_SIZE
    ));
}

#[test]
fn test_major_decode_rejects_overfull_table() {
    let mut codec = file_with_records(4, 1, &[(1, "x"), (2, "y")]);

    // Same bytes read with a smaller geometry: two used rows, capacity one
    codec.seek_to(FILE_HEADER_SIZE).unwrap();
    let result = MajorPage::decode(&mut codec, Geometry::new(1, 1));

    assert!(matches!(result, Err(LogDbError::Corruption { .. })));
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn test_minor_page_fills_to_capacity_then_refuses() {
    let geometry = Geometry::new(1, 3);
    let mut codec = file_with_records(1, 3, &[(1, "a")]);

    let mut major = first_major(&mut codec, geometry);
    let mut minor = major.entries[0].read_referenced_minor_page(&mut codec).unwrap();

    let mut payload: &[u8] = b"bb";
    minor.create_entry(&mut codec, &mut major, 2, &mut payload, None).unwrap();
    let mut payload: &[u8] = b"ccc";
    minor.create_entry(&mut codec, &mut major, 3, &mut payload, None).unwrap();
    assert_eq!(minor.remaining_capacity(), 0);

    let mut payload: &[u8] = b"d";
    let result = minor.create_entry(&mut codec, &mut major, 4, &mut payload, None);
    assert!(matches!(
        result,
        Err(LogDbError::CapacityExceeded { capacity: 3, .. })
    ));

    // The refused append left the file readable with three records
    let store = Store::open(codec.into_inner()).unwrap();
    let records = store.records().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(&records[2].payload[..], b"ccc");
}

#[test]
fn test_major_page_fills_to_capacity_then_refuses() {
    let geometry = Geometry::new(2, 1);
    let mut codec = file_with_records(2, 1, &[]);

    let mut major = first_major(&mut codec, geometry);
    major.create_entry(&mut codec, 5).unwrap();
    major.create_entry(&mut codec, 6).unwrap();
    assert_eq!(major.remaining_capacity(), 0);

    let result = major.create_entry(&mut codec, 7);
    assert!(matches!(
        result,
        Err(LogDbError::CapacityExceeded { capacity: 2, .. })
    ));
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[test]
fn test_major_create_entry_lays_out_empty_minor_page() {
    let geometry = Geometry::new(2, 3);
    let mut codec = file_with_records(2, 3, &[]);

    let mut major = first_major(&mut codec, geometry);
    let entry = major.create_entry(&mut codec, 42).unwrap().clone();

    assert_eq!(entry.slot, 0);
    assert_eq!(entry.start_time, 42);
    assert_eq!(entry.end_time, 42);
    assert_eq!(entry.content_offset, 0);
    assert_eq!(major.used_entries, 1);
    assert_eq!(major.content_size, geometry.minor_page_size());

    let minor = entry.read_referenced_minor_page(&mut codec).unwrap();
    assert_eq!(minor.start_time, 42);
    assert_eq!(minor.end_time, 42);
    assert_eq!(minor.used_entries, 0);
    assert_eq!(minor.content_size, 0);

    // Header changes were committed to disk
    let reread = first_major(&mut codec, geometry);
    assert_eq!(reread, major);
}

#[test]
fn test_second_minor_page_follows_first() {
    let geometry = Geometry::new(2, 1);
    let mut codec = file_with_records(2, 1, &[(1, "12345"), (2, "6789")]);

    let major = first_major(&mut codec, geometry);
    let first = major.entries[0].read_referenced_minor_page(&mut codec).unwrap();
    let second = major.entries[1].read_referenced_minor_page(&mut codec).unwrap();

    assert_eq!(second.offset, first.end());
    assert_eq!(major.entries[1].content_offset, first.absolute_size());
    assert_eq!(major.end(), second.end());
}

// =============================================================================
// Propagation Tests
// =============================================================================

#[test]
fn test_append_propagates_to_major_page() {
    let geometry = Geometry::new(2, 4);
    let mut codec = file_with_records(2, 4, &[(100, "first")]);

    let mut major = first_major(&mut codec, geometry);
    let mut minor = major.entries[0].read_referenced_minor_page(&mut codec).unwrap();
    let before = major.content_size;

    let mut payload: &[u8] = b"second!";
    minor.create_entry(&mut codec, &mut major, 200, &mut payload, None).unwrap();

    let delta = RECORD_HEADER_SIZE + 7;
    assert_eq!(major.content_size, before + delta);

    // On-disk major header and row agree with the in-memory copies
    let reread = first_major(&mut codec, geometry);
    assert_eq!(reread.content_size, before + delta);
    assert_eq!(reread.entries[0].start_time, minor.start_time);
    assert_eq!(reread.entries[0].end_time, minor.end_time);

    let reread_minor = reread.entries[0].read_referenced_minor_page(&mut codec).unwrap();
    assert_eq!(reread_minor, minor);
}

#[test]
fn test_append_to_foreign_major_page_is_refused() {
    let mut codec = file_with_records(1, 2, &[(1, "a"), (2, "b"), (3, "c")]);
    let geometry = Geometry::new(1, 2);

    let mut first = first_major(&mut codec, geometry);
    let second_offset = first.end();
    codec.seek_to(second_offset).unwrap();
    let second = MajorPage::decode(&mut codec, geometry).unwrap();
    let mut minor = second.entries[0].read_referenced_minor_page(&mut codec).unwrap();

    let mut payload: &[u8] = b"z";
    let result = minor.create_entry(&mut codec, &mut first, 4, &mut payload, None);
    assert!(matches!(result, Err(LogDbError::InvalidArgument(_))));
}

// =============================================================================
// End Time Tests
// =============================================================================

#[test]
fn test_end_time_keeps_minimum_for_increasing_timestamps() {
    let geometry = Geometry::new(1, 4);
    let mut codec = file_with_records(1, 4, &[(100, "a"), (200, "b"), (300, "c")]);

    let major = first_major(&mut codec, geometry);
    let minor = major.entries[0].read_referenced_minor_page(&mut codec).unwrap();

    // The end time is the minimum seen, not the maximum
    assert_eq!(minor.start_time, 100);
    assert_eq!(minor.end_time, 100);
    assert_eq!(major.entries[0].start_time, 100);
    assert_eq!(major.entries[0].end_time, 100);
}

#[test]
fn test_end_time_drops_for_earlier_timestamp() {
    let geometry = Geometry::new(1, 4);
    let mut codec = file_with_records(1, 4, &[(100, "a"), (40, "b"), (70, "c")]);

    let major = first_major(&mut codec, geometry);
    let minor = major.entries[0].read_referenced_minor_page(&mut codec).unwrap();

    assert_eq!(minor.start_time, 100);
    assert_eq!(minor.end_time, 40);
    assert_eq!(major.entries[0].end_time, 40);
}

// =============================================================================
// Live Size Tests
// =============================================================================

#[test]
fn test_live_content_size_matches_header_and_restores_position() {
    let geometry = Geometry::new(3, 2);
    let records: Vec<(u64, &str)> = vec![
        (1, "a"),
        (2, "bb"),
        (3, "ccc"),
        (4, "dddd"),
        (5, "eeeee"),
    ];
    let mut codec = file_with_records(3, 2, &records);

    let major = first_major(&mut codec, geometry);
    assert_eq!(major.used_entries, 3);

    codec.seek_to(7).unwrap();
    let live = major.live_content_size(&mut codec).unwrap();

    assert_eq!(live, major.content_size);
    assert_eq!(codec.position().unwrap(), 7);

    let by_entry: u64 = major
        .entries
        .iter()
        .map(|e| e.absolute_size_of_referenced_page(&mut codec).unwrap())
        .sum();
    assert_eq!(by_entry, live);
}
