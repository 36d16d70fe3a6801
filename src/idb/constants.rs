//! IDA database file structure constants.
//!
//! Signatures, fixed offsets, and sizes of the outer container and the
//! individual sections. Flag-word masks live in [`crate::idb::flags`].

// ── Outer file header (0x58 bytes) ──────────────────────────────────

/// Magic bytes at the start of every supported database file.
pub const IDB_MAGIC: &[u8; 4] = b"IDA1";
/// Secondary signature stored at offset 0x1A.
pub const IDB_SIG2: u32 = 0xAABBCCDD;
/// The only database version this library parses.
pub const IDB_VERSION: u16 = 6;
/// Total size of the outer file header in bytes.
pub const FILE_HEADER_SIZE: usize = 0x58;
/// Number of section slots in the directory.
pub const SECTION_COUNT: usize = 6;

// ── Section header ──────────────────────────────────────────────────

/// Size of a per-section header: 1-byte compression flag + 8-byte length.
pub const SECTION_HEADER_SIZE: usize = 9;

// ── ID0 (B-tree) section ────────────────────────────────────────────

/// Signature at the end of the id0 section header.
pub const ID0_SIGNATURE: &[u8; 9] = b"B-tree v2";
/// Size of the id0 section header in bytes.
pub const ID0_HEADER_SIZE: usize = 28;
/// Size of one entry pointer within a page (branch and leaf alike).
pub const ENTRY_POINTER_SIZE: usize = 6;

// ── ID1 / NAM sections ──────────────────────────────────────────────

/// Signature shared by the id1 and nam sections.
pub const VA_SIGNATURE: &[u8; 4] = b"VA*\0";
/// Constant stored at offset 4 of id1 and nam headers.
pub const VA_UNK04: u32 = 0x3;
/// Constant stored at offset 0xC of id1 and nam headers.
pub const VA_UNK0C: u32 = 0x800;
/// Fixed page size used by the id1 and nam sections.
pub const VA_PAGE_SIZE: usize = 0x2000;
/// Size of the fixed-width part of the id1 header (before segment bounds).
pub const ID1_HEADER_SIZE: usize = 0x14;
/// Bytes of flags stored per address.
pub const FLAG_BYTES_PER_ADDRESS: u64 = 4;

// ── TIL section ─────────────────────────────────────────────────────

/// Signature at the start of the til section.
pub const TIL_SIGNATURE: &[u8; 6] = b"IDATIL";
