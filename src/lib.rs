//! IDA database (.idb) parsing library.
//!
//! The `idadb-utils` crate (library name `idadb`) provides read-only Rust
//! types and functions for parsing and querying the on-disk database format
//! written by the IDA disassembler: the outer section container, the "id0"
//! B-tree key/value index, the "id1" per-byte flags map, the "nam" named
//! address index, and the "til" type-library stub.
//!
//! The library never touches the filesystem: callers hand it an
//! already-loaded (or memory-mapped) byte buffer, and every parsed view
//! borrows from that buffer.
//!
//! # Quick example
//!
//! ```no_run
//! use idadb::idb::container::Idb;
//!
//! let data = std::fs::read("sample.idb").unwrap();
//! let db = Idb::from_bytes(&data).unwrap();
//!
//! // Look up a key in the B-tree index.
//! let id0 = db.id0().unwrap();
//! let cursor = id0.find_prefix(b"N$ ").unwrap();
//! println!("key: {:?}, value: {:?}", cursor.key(), cursor.value());
//!
//! // Read the flags for an effective address.
//! let id1 = db.id1().unwrap();
//! let flags = id1.get_flags(0x401000).unwrap();
//! println!("flags: 0x{:08x}", flags);
//! ```
//!
//! # Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`Idb`](idb::container::Idb) | Parse the container, reach the typed sections |
//! | [`Id0`](idb::id0::Id0) | B-tree index: `find`, `find_prefix`, `get_page` |
//! | [`Cursor`](idb::cursor::Cursor) | Ordered `next`/`prev` traversal of the index |
//! | [`Id1`](idb::id1::Id1) | Per-byte flags: `get_flags`, head iteration |
//! | [`Nam`](idb::nam::Nam) | Sorted named-address list |
//! | [`Flags`](idb::flags::Flags) | Predicates over the 32-bit flag word |
//! | [`export_entries`](idb::export::export_entries) | Dump every index entry as JSON lines |
//!
//! # Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`idb::container`] | Outer file header, section directory, parse options |
//! | [`idb::id0`] | B-tree pages, entries, search strategies |
//! | [`idb::cursor`] | Tree position with ordered traversal |
//! | [`idb::id1`] | Segment table and flags buffer |
//! | [`idb::nam`] | Named-address section |
//! | [`idb::til`] | Type-library signature check |
//! | [`idb::flags`] | Flag-word masks and predicates |
//! | [`idb::export`] | JSONL entry export |
//! | [`idb::reader`] | Bounded little-endian primitive reads |
//! | [`util::hex`] | Hex and printable-key formatting |

pub mod idb;
pub mod util;

use thiserror::Error;

/// Errors returned by `idadb` operations.
#[derive(Error, Debug)]
pub enum IdbError {
    /// A fixed signature or magic value did not match.
    #[error("bad signature: {0}")]
    BadSignature(String),

    /// The file header's version field is not the supported version (6).
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u16),

    /// A feature the core does not implement, e.g. compressed sections.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Structurally invalid bytes: bad offsets, non-ascending keys,
    /// truncated payloads, or constant fields with unexpected values.
    #[error("corrupt database: {0}")]
    Corrupt(String),

    /// The lookup target is absent: no such key, no segment contains the
    /// address, or a byte has no value.
    #[error("not found")]
    NotFound,

    /// Navigation fell off the ends of the data, or a byte range crossed a
    /// segment boundary.
    #[error("out of range")]
    OutOfRange,
}
