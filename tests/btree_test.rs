//! Integration tests for the id0 B-tree: search strategies, cursor
//! traversal across page boundaries, and full-tree export.
//!
//! Fixtures are synthetic id0 sections serialized in the on-disk page
//! format, including leaf key front-compression.

use byteorder::{ByteOrder, LittleEndian};

use idadb::idb::constants::*;
use idadb::idb::export::export_entries;
use idadb::idb::id0::{FindStrategy, Id0};
use idadb::IdbError;

const PAGE_SIZE: u16 = 0x200;

/// Serialize an id0 section: header page plus the given pages (page 1
/// onward, in order).
fn build_section(root_page: u32, record_count: u32, pages: &[Vec<u8>]) -> Vec<u8> {
    let ps = PAGE_SIZE as usize;
    let mut buf = vec![0u8; ps * (pages.len() + 1)];
    LittleEndian::write_u16(&mut buf[4..], PAGE_SIZE);
    LittleEndian::write_u32(&mut buf[6..], root_page);
    LittleEndian::write_u32(&mut buf[10..], record_count);
    LittleEndian::write_u32(&mut buf[14..], pages.len() as u32);
    buf[19..28].copy_from_slice(ID0_SIGNATURE);
    for (i, page) in pages.iter().enumerate() {
        buf[(i + 1) * ps..(i + 2) * ps].copy_from_slice(page);
    }
    buf
}

/// Serialize a leaf page, front-compressing keys against their
/// predecessor in scan order.
fn build_leaf(entries: &[(&[u8], &[u8])]) -> Vec<u8> {
    let ps = PAGE_SIZE as usize;
    let mut page = vec![0u8; ps];
    LittleEndian::write_u16(&mut page[4..], entries.len() as u16);
    let mut body_at = ENTRY_POINTER_SIZE + entries.len() * ENTRY_POINTER_SIZE;
    let mut prev: &[u8] = b"";
    for (i, (key, value)) in entries.iter().enumerate() {
        let common = key
            .iter()
            .zip(prev.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = &key[common..];
        let ptr = ENTRY_POINTER_SIZE + i * ENTRY_POINTER_SIZE;
        LittleEndian::write_u16(&mut page[ptr..], common as u16);
        LittleEndian::write_u16(&mut page[ptr + 4..], body_at as u16);
        LittleEndian::write_u16(&mut page[body_at..], suffix.len() as u16);
        page[body_at + 2..body_at + 2 + suffix.len()].copy_from_slice(suffix);
        body_at += 2 + suffix.len();
        LittleEndian::write_u16(&mut page[body_at..], value.len() as u16);
        page[body_at + 2..body_at + 2 + value.len()].copy_from_slice(value);
        body_at += 2 + value.len();
        prev = key;
    }
    page
}

/// Serialize a branch page from (child, key, value) triples.
fn build_branch(ppointer: u32, entries: &[(u32, &[u8], &[u8])]) -> Vec<u8> {
    let ps = PAGE_SIZE as usize;
    let mut page = vec![0u8; ps];
    LittleEndian::write_u32(&mut page[0..], ppointer);
    LittleEndian::write_u16(&mut page[4..], entries.len() as u16);
    let mut body_at = ENTRY_POINTER_SIZE + entries.len() * ENTRY_POINTER_SIZE;
    for (i, (child, key, value)) in entries.iter().enumerate() {
        let ptr = ENTRY_POINTER_SIZE + i * ENTRY_POINTER_SIZE;
        LittleEndian::write_u32(&mut page[ptr..], *child);
        LittleEndian::write_u16(&mut page[ptr + 4..], body_at as u16);
        LittleEndian::write_u16(&mut page[body_at..], key.len() as u16);
        page[body_at + 2..body_at + 2 + key.len()].copy_from_slice(key);
        body_at += 2 + key.len();
        LittleEndian::write_u16(&mut page[body_at..], value.len() as u16);
        page[body_at + 2..body_at + 2 + value.len()].copy_from_slice(value);
        body_at += 2 + value.len();
    }
    page
}

/// The keys of the two-level fixture, in order.
const TWO_LEVEL_KEYS: [&[u8]; 11] = [
    b"aa", b"ab", b"ac", b"ad", b"ae", b"ba", b"bb", b"bc", b"bd", b"ca", b"cb",
];

/// Two-level tree: three leaves under a two-entry root branch.
///
/// ```text
///              [ ad | bc ]
///             /     |     \
///   [aa ab ac] [ae ba bb] [bd ca cb]
/// ```
fn build_two_level_section() -> Vec<u8> {
    let leaf1 = build_leaf(&[(b"aa", b"v01"), (b"ab", b"v02"), (b"ac", b"v03")]);
    let leaf2 = build_leaf(&[(b"ae", b"v05"), (b"ba", b"v06"), (b"bb", b"v07")]);
    let leaf3 = build_leaf(&[(b"bd", b"v09"), (b"ca", b"v10"), (b"cb", b"v11")]);
    let root = build_branch(1, &[(2, b"ad", b"v04"), (3, b"bc", b"v08")]);
    build_section(4, 11, &[leaf1, leaf2, leaf3, root])
}

/// The keys of the three-level fixture, in order.
const THREE_LEVEL_KEYS: [&[u8]; 11] = [
    b"a", b"b", b"c", b"d", b"e", b"f", b"h", b"i", b"j", b"k", b"l",
];

/// Three-level tree, exercising multi-page ascents and descents.
///
/// ```text
///                [ f ]
///               /     \
///         [ c ]        [ j ]
///        /     \      /     \
///     [a b]   [d e] [h i]  [k l]
/// ```
fn build_three_level_section() -> Vec<u8> {
    let leaf1 = build_leaf(&[(b"a", b"v-a"), (b"b", b"v-b")]);
    let leaf2 = build_leaf(&[(b"d", b"v-d"), (b"e", b"v-e")]);
    let leaf3 = build_leaf(&[(b"h", b"v-h"), (b"i", b"v-i")]);
    let leaf4 = build_leaf(&[(b"k", b"v-k"), (b"l", b"v-l")]);
    let mid1 = build_branch(1, &[(2, b"c", b"v-c")]);
    let mid2 = build_branch(3, &[(4, b"j", b"v-j")]);
    let root = build_branch(5, &[(6, b"f", b"v-f")]);
    build_section(7, 11, &[leaf1, leaf2, leaf3, leaf4, mid1, mid2, root])
}

#[test]
fn test_single_leaf_lookups() {
    let section = build_section(
        1,
        3,
        &[build_leaf(&[(b"aa", b"1"), (b"ab", b"2"), (b"bb", b"3")])],
    );
    let id0 = Id0::parse(&section).unwrap();

    assert_eq!(id0.find(b"ab", FindStrategy::Exact).unwrap().value(), b"2");
    assert!(matches!(
        id0.find(b"ac", FindStrategy::Exact),
        Err(IdbError::NotFound)
    ));
    assert_eq!(id0.find_prefix(b"a").unwrap().key(), b"aa");
}

#[test]
fn test_exact_match_finds_every_key() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    for key in TWO_LEVEL_KEYS {
        let cursor = id0.find(key, FindStrategy::Exact).unwrap();
        assert_eq!(cursor.key(), key);
    }
}

#[test]
fn test_exact_match_missing_keys() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    for key in [&b"a"[..], b"az", b"b", b"bba", b"zz"] {
        assert!(
            matches!(id0.find(key, FindStrategy::Exact), Err(IdbError::NotFound)),
            "key {:?} should be absent",
            key
        );
    }
}

#[test]
fn test_exact_match_stops_at_branch_entry() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    let cursor = id0.find(b"ad", FindStrategy::Exact).unwrap();
    assert_eq!(cursor.value(), b"v04");
    // The match sits on the root page: no descent happened.
    assert_eq!(cursor.path().len(), 1);
}

#[test]
fn test_prefix_match_returns_least_matching_key() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    assert_eq!(id0.find_prefix(b"a").unwrap().key(), b"aa");
    assert_eq!(id0.find_prefix(b"b").unwrap().key(), b"ba");
    assert_eq!(id0.find_prefix(b"c").unwrap().key(), b"ca");
    assert_eq!(id0.find_prefix(b"cb").unwrap().key(), b"cb");
    // An exact hit on a branch entry returns that entry.
    assert_eq!(id0.find_prefix(b"ad").unwrap().value(), b"v04");
    // The empty prefix matches the minimum key.
    assert_eq!(id0.find_prefix(b"").unwrap().key(), b"aa");
}

#[test]
fn test_prefix_match_absent_prefixes() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    for key in [&b"d"[..], b"abc", b"bbb", b"z"] {
        assert!(
            matches!(id0.find_prefix(key), Err(IdbError::NotFound)),
            "prefix {:?} should not match",
            key
        );
    }
}

#[test]
fn test_cursor_next_visits_all_keys_in_order() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    let mut cursor = id0.find(b"aa", FindStrategy::Exact).unwrap();
    let mut keys = vec![cursor.key().to_vec()];
    for _ in 0..id0.record_count() - 1 {
        cursor.next().unwrap();
        keys.push(cursor.key().to_vec());
    }
    assert_eq!(keys, TWO_LEVEL_KEYS.map(<[u8]>::to_vec));

    assert!(matches!(cursor.next(), Err(IdbError::OutOfRange)));
}

#[test]
fn test_cursor_prev_visits_all_keys_in_reverse() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    let mut cursor = id0.find(b"cb", FindStrategy::Exact).unwrap();
    let mut keys = vec![cursor.key().to_vec()];
    while cursor.prev().is_ok() {
        keys.push(cursor.key().to_vec());
    }
    keys.reverse();
    assert_eq!(keys, TWO_LEVEL_KEYS.map(<[u8]>::to_vec));
}

#[test]
fn test_cursor_roundtrip_from_middle() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    // Walk down to the minimum, then up to the maximum, from a mid-tree
    // starting point. Both directions must cover the whole key set.
    let mut down = Vec::new();
    let mut cursor = id0.find(b"ba", FindStrategy::Exact).unwrap();
    down.push(cursor.key().to_vec());
    while cursor.prev().is_ok() {
        down.push(cursor.key().to_vec());
    }
    down.reverse();

    let mut up = Vec::new();
    let mut cursor = id0.find(b"ba", FindStrategy::Exact).unwrap();
    while cursor.next().is_ok() {
        up.push(cursor.key().to_vec());
    }

    let mut all = down;
    all.extend(up);
    assert_eq!(all, TWO_LEVEL_KEYS.map(<[u8]>::to_vec));
}

#[test]
fn test_cursor_traversal_across_three_levels() {
    let section = build_three_level_section();
    let id0 = Id0::parse(&section).unwrap();

    let mut cursor = id0.find(b"a", FindStrategy::Exact).unwrap();
    let mut keys = vec![cursor.key().to_vec()];
    while cursor.next().is_ok() {
        keys.push(cursor.key().to_vec());
    }
    assert_eq!(keys, THREE_LEVEL_KEYS.map(<[u8]>::to_vec));

    let mut cursor = id0.find(b"l", FindStrategy::Exact).unwrap();
    let mut keys = vec![cursor.key().to_vec()];
    while cursor.prev().is_ok() {
        keys.push(cursor.key().to_vec());
    }
    keys.reverse();
    assert_eq!(keys, THREE_LEVEL_KEYS.map(<[u8]>::to_vec));
}

#[test]
fn test_cursor_alternating_next_prev() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    let mut cursor = id0.find(b"ba", FindStrategy::Exact).unwrap();
    cursor.prev().unwrap();
    assert_eq!(cursor.key(), b"ae");
    cursor.prev().unwrap();
    assert_eq!(cursor.key(), b"ad");
    cursor.next().unwrap();
    assert_eq!(cursor.key(), b"ae");
    cursor.next().unwrap();
    assert_eq!(cursor.key(), b"ba");
}

#[test]
fn test_export_entries_in_key_order() {
    let section = build_two_level_section();
    let id0 = Id0::parse(&section).unwrap();

    let mut out = Vec::new();
    let count = export_entries(&id0, &mut out).unwrap();
    assert_eq!(count, u64::from(id0.record_count()));

    let lines: Vec<&str> = std::str::from_utf8(&out)
        .unwrap()
        .lines()
        .collect();
    assert_eq!(lines.len(), 11);

    let keys: Vec<String> = lines
        .iter()
        .map(|line| {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            record["key"].as_str().unwrap().to_string()
        })
        .collect();
    let expected: Vec<String> = TWO_LEVEL_KEYS
        .iter()
        .map(|k| k.iter().map(|b| format!("{:02x}", b)).collect())
        .collect();
    assert_eq!(keys, expected);

    // The printable rendering carries the raw key text.
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["key_display"], "aa");
    assert_eq!(first["value"], "763031"); // "v01"
}
