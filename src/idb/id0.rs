//! B-tree index section ("id0") parsing and search.
//!
//! The id0 section is a page-oriented B-tree mapping arbitrary byte-string
//! keys to arbitrary byte-string values. Page 0 of the section holds the
//! [`Id0`] header; every other page is a fixed-size node, either a branch
//! (interior, with child page pointers interleaved between its entries) or
//! a leaf (entries only, keys front-compressed against the previous entry).
//!
//! Use [`Id0::find`] with a [`FindStrategy`] to obtain a
//! [`Cursor`](crate::idb::cursor::Cursor) positioned on a matching entry,
//! then navigate with `next`/`prev`. Key comparisons are unsigned
//! lexicographic over the raw bytes.
//!
//! Branch node layout:
//!
//! ```text
//!                                   +-------------+
//! +---------------------------------+ ppointer    | --> [ keys < entry1.key ]
//! | entry1.key | entry1.value       |-------------+
//! +---------------------------------+ entry1.page | --> [ entry1.key < X < entry2.key ]
//! | entry2.key | entry2.value       |-------------+
//! +---------------------------------+ entry2.page | --> [ keys > entry2.key ]
//!                                   +-------------+
//! ```

use once_cell::sync::OnceCell;
use tracing::warn;

use crate::idb::constants::*;
use crate::idb::cursor::Cursor;
use crate::idb::reader::Reader;
use crate::IdbError;

/// One key/value entry decoded from a page.
///
/// Branch and leaf entries share the key/value projection; branch entries
/// additionally carry the number of the child page holding keys greater
/// than their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Interior entry with a child page pointer.
    Branch {
        /// Child page holding keys greater than this entry's key.
        page: u32,
        /// Full key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Leaf entry; the key has been reconstructed from the shared prefix.
    Leaf {
        /// Full (reconstructed) key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
}

impl Entry {
    /// The entry's full key.
    pub fn key(&self) -> &[u8] {
        match self {
            Entry::Branch { key, .. } | Entry::Leaf { key, .. } => key,
        }
    }

    /// The entry's value.
    pub fn value(&self) -> &[u8] {
        match self {
            Entry::Branch { value, .. } | Entry::Leaf { value, .. } => value,
        }
    }

    /// The child page pointer, for branch entries.
    pub fn child_page(&self) -> Option<u32> {
        match self {
            Entry::Branch { page, .. } => Some(*page),
            Entry::Leaf { .. } => None,
        }
    }
}

/// A single B-tree node.
///
/// Entries are decoded on first access and cached; the cache is
/// initialize-once, so a page shared between readers decodes at most once.
#[derive(Debug)]
pub struct Page<'a> {
    number: u32,
    ppointer: u32,
    entry_count: u16,
    /// Entry area: the page minus its 6-byte header. Entry pointer
    /// `offset` fields are page-relative, so indexing this slice needs
    /// `offset - 6`.
    contents: &'a [u8],
    entries: OnceCell<Vec<Entry>>,
}

impl<'a> Page<'a> {
    fn parse(number: u32, buf: &'a [u8]) -> Result<Self, IdbError> {
        let mut r = Reader::new(buf);
        let ppointer = r.read_u32()?;
        let entry_count = r.read_u16()?;
        Ok(Page {
            number,
            ppointer,
            entry_count,
            contents: &buf[ENTRY_POINTER_SIZE..],
            entries: OnceCell::new(),
        })
    }

    /// This page's number within the section.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Leftmost child page pointer; zero on leaf pages.
    pub fn ppointer(&self) -> u32 {
        self.ppointer
    }

    /// Number of entries stored on this page.
    pub fn entry_count(&self) -> u16 {
        self.entry_count
    }

    /// Whether this is a leaf node (no children).
    pub fn is_leaf(&self) -> bool {
        self.ppointer == 0
    }

    /// All entries on this page, in key order.
    ///
    /// Decoding is deferred to the first call; structural damage surfaces
    /// here as `Corrupt`.
    pub fn entries(&self) -> Result<&[Entry], IdbError> {
        self.entries
            .get_or_try_init(|| self.decode_entries())
            .map(Vec::as_slice)
    }

    /// The entry at `index`, failing with `OutOfRange` past the end.
    pub fn entry(&self, index: usize) -> Result<&Entry, IdbError> {
        self.entries()?.get(index).ok_or(IdbError::OutOfRange)
    }

    /// Find the index of the exact match for `key`, or, on branch pages,
    /// the index of the least entry whose key is strictly greater.
    ///
    /// A linear scan: decoding and allocating entries dominates the cost,
    /// so binary search buys nothing measurable here.
    pub fn find_index(&self, key: &[u8]) -> Result<usize, IdbError> {
        let entries = self.entries()?;
        if self.is_leaf() {
            for (i, entry) in entries.iter().enumerate() {
                if entry.key() == key {
                    return Ok(i);
                }
            }
        } else {
            for (i, entry) in entries.iter().enumerate() {
                if entry.key() == key || key < entry.key() {
                    return Ok(i);
                }
            }
        }
        Err(IdbError::NotFound)
    }

    fn decode_entries(&self) -> Result<Vec<Entry>, IdbError> {
        let count = self.entry_count as usize;
        if count * ENTRY_POINTER_SIZE > self.contents.len() {
            return Err(IdbError::Corrupt(format!(
                "page {}: {} entry pointers exceed the entry area",
                self.number, count
            )));
        }

        let page_size = self.contents.len() + ENTRY_POINTER_SIZE;
        let mut entries = Vec::with_capacity(count);
        let mut prev_key: Vec<u8> = Vec::new();

        for i in 0..count {
            let mut ptr = Reader::new(&self.contents[i * ENTRY_POINTER_SIZE..]);
            let entry = if self.is_leaf() {
                let common_prefix = ptr.read_u16()? as usize;
                let _unused = ptr.read_u16()?;
                let offset = ptr.read_u16()? as usize;
                let mut body = self.entry_body(offset, page_size, i)?;

                if i == 0 && common_prefix != 0 {
                    return Err(IdbError::Corrupt(format!(
                        "page {}: first entry has common prefix {}",
                        self.number, common_prefix
                    )));
                }
                if common_prefix > prev_key.len() {
                    return Err(IdbError::Corrupt(format!(
                        "page {}: entry {} shares {} bytes with a {}-byte predecessor",
                        self.number,
                        i,
                        common_prefix,
                        prev_key.len()
                    )));
                }

                let suffix_len = body.read_u16()? as usize;
                let suffix = body.read_bytes(suffix_len)?;
                let value_len = body.read_u16()? as usize;
                let value = body.read_bytes(value_len)?;

                let mut key = Vec::with_capacity(common_prefix + suffix_len);
                key.extend_from_slice(&prev_key[..common_prefix]);
                key.extend_from_slice(suffix);
                Entry::Leaf {
                    key,
                    value: value.to_vec(),
                }
            } else {
                let page = ptr.read_u32()?;
                let offset = ptr.read_u16()? as usize;
                let mut body = self.entry_body(offset, page_size, i)?;

                let key_len = body.read_u16()? as usize;
                let key = body.read_bytes(key_len)?;
                let value_len = body.read_u16()? as usize;
                let value = body.read_bytes(value_len)?;
                Entry::Branch {
                    page,
                    key: key.to_vec(),
                    value: value.to_vec(),
                }
            };

            if i > 0 && entry.key() <= prev_key.as_slice() {
                return Err(IdbError::Corrupt(format!(
                    "page {}: entry {} out of sort order",
                    self.number, i
                )));
            }
            prev_key = entry.key().to_vec();
            entries.push(entry);
        }

        Ok(entries)
    }

    fn entry_body(&self, offset: usize, page_size: usize, i: usize) -> Result<Reader<'a>, IdbError> {
        if offset < ENTRY_POINTER_SIZE || offset >= page_size {
            return Err(IdbError::Corrupt(format!(
                "page {}: entry {} body offset 0x{:x} outside the page",
                self.number, i, offset
            )));
        }
        Ok(Reader::new(&self.contents[offset - ENTRY_POINTER_SIZE..]))
    }
}

/// How [`Id0::find`] locates an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindStrategy {
    /// Only an entry whose key equals the search key matches.
    Exact,
    /// The first entry (in key order) whose key starts with the search key
    /// matches.
    Prefix,
}

/// The B-tree index section.
///
/// Keys and values are arbitrary byte strings. Use [`Id0::find`] to obtain
/// a cursor on a matching entry and traverse from there.
pub struct Id0<'a> {
    buf: &'a [u8],
    next_free_offset: u32,
    page_size: u16,
    root_page: u32,
    record_count: u32,
    page_count: u32,
    signature: [u8; 9],
}

impl<'a> Id0<'a> {
    /// Parse the section header. Pages decode lazily via [`Id0::get_page`].
    pub fn parse(buf: &'a [u8]) -> Result<Self, IdbError> {
        let mut r = Reader::new(buf);
        let next_free_offset = r.read_u32()?;
        let page_size = r.read_u16()?;
        let root_page = r.read_u32()?;
        let record_count = r.read_u32()?;
        let page_count = r.read_u32()?;
        let _unk12 = r.read_u8()?;
        let mut signature = [0u8; 9];
        signature.copy_from_slice(r.read_bytes(ID0_SIGNATURE.len())?);

        if page_size == 0 {
            return Err(IdbError::Corrupt("id0 page size is zero".to_string()));
        }

        Ok(Id0 {
            buf,
            next_free_offset,
            page_size,
            root_page,
            record_count,
            page_count,
            signature,
        })
    }

    /// Check the `B-tree v2` signature.
    pub fn validate(&self) -> Result<(), IdbError> {
        if &self.signature != ID0_SIGNATURE {
            return Err(IdbError::BadSignature(format!(
                "id0 signature {:02x?}",
                self.signature
            )));
        }
        Ok(())
    }

    /// Offset of the next free byte, from the section header.
    pub fn next_free_offset(&self) -> u32 {
        self.next_free_offset
    }

    /// Size of one page in bytes.
    pub fn page_size(&self) -> u16 {
        self.page_size
    }

    /// Page number of the tree root.
    pub fn root_page(&self) -> u32 {
        self.root_page
    }

    /// Total number of key/value records in the tree.
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Number of pages in the section.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Fetch and decode the page with the given number.
    ///
    /// Page 0 holds the section header, so valid page numbers start at 1;
    /// a request for page 0 is diagnosed and fails with `OutOfRange`, as
    /// does any page whose bytes lie past the end of the section.
    pub fn get_page(&self, page_number: u32) -> Result<Page<'a>, IdbError> {
        if page_number < 1 {
            warn!(page_number, "unexpected page number requested");
            return Err(IdbError::OutOfRange);
        }
        let page_size = self.page_size as usize;
        let start = page_number as usize * page_size;
        let end = start + page_size;
        if end > self.buf.len() {
            return Err(IdbError::OutOfRange);
        }
        Page::parse(page_number, &self.buf[start..end])
    }

    /// Search the tree for `key`, descending from the root.
    ///
    /// Returns a cursor positioned on the matching entry; the match may sit
    /// on a branch page, in which case no further descent happened. Fails
    /// with `NotFound` when no entry satisfies the strategy.
    pub fn find(&self, key: &[u8], strategy: FindStrategy) -> Result<Cursor<'_>, IdbError> {
        match strategy {
            FindStrategy::Exact => self.find_exact(key),
            FindStrategy::Prefix => self.find_prefix_match(key),
        }
    }

    /// Convenience shortcut for `find(key, FindStrategy::Prefix)`.
    pub fn find_prefix(&self, key: &[u8]) -> Result<Cursor<'_>, IdbError> {
        self.find(key, FindStrategy::Prefix)
    }

    fn find_exact(&self, key: &[u8]) -> Result<Cursor<'_>, IdbError> {
        let mut path = Vec::new();
        let mut page_number = self.root_page;

        loop {
            let page = self.get_page(page_number)?;
            let count = page.entry_count() as usize;

            let (entry_number, is_largest) = match page.find_index(key) {
                Ok(i) => (i, false),
                // No entry is >= key, so the match can only live under the
                // final child pointer.
                Err(IdbError::NotFound) => {
                    if count == 0 {
                        if page.is_leaf() {
                            return Err(IdbError::NotFound);
                        }
                        return Err(IdbError::Corrupt(format!(
                            "branch page {} has no entries",
                            page_number
                        )));
                    }
                    (count - 1, true)
                }
                Err(e) => return Err(e),
            };

            let entry = page.entry(entry_number)?.clone();
            if entry.key() == key {
                path.push(page);
                return Ok(Cursor::new(self, path, entry, entry_number));
            }
            if page.is_leaf() {
                return Err(IdbError::NotFound);
            }

            let next = if entry_number == 0 {
                page.ppointer()
            } else if is_largest {
                branch_child(page.entry(count - 1)?)?
            } else {
                branch_child(page.entry(entry_number - 1)?)?
            };
            path.push(page);
            page_number = next;
        }
    }

    fn find_prefix_match(&self, key: &[u8]) -> Result<Cursor<'_>, IdbError> {
        let mut path = Vec::new();
        let mut page_number = self.root_page;

        loop {
            let page = self.get_page(page_number)?;

            if page.is_leaf() {
                let hit = {
                    let entries = page.entries()?;
                    let mut hit = None;
                    for (i, entry) in entries.iter().enumerate() {
                        if entry.key().starts_with(key) {
                            hit = Some((i, entry.clone()));
                            break;
                        }
                        if entry.key() > key {
                            // Greater entries can no longer match.
                            break;
                        }
                    }
                    hit
                };
                return match hit {
                    Some((i, entry)) => {
                        path.push(page);
                        Ok(Cursor::new(self, path, entry, i))
                    }
                    None => Err(IdbError::NotFound),
                };
            }

            // Branch node: matches smaller than an entry live in the
            // sub-tree to its left, tracked here as `next_page`.
            enum Scan {
                Found(usize, Entry),
                Descend(u32),
            }
            let action = {
                let entries = page.entries()?;
                let mut next_page = page.ppointer();
                let mut action = None;
                for (i, entry) in entries.iter().enumerate() {
                    if entry.key() == key {
                        action = Some(Scan::Found(i, entry.clone()));
                        break;
                    }
                    if entry.key().starts_with(key) || entry.key() > key {
                        action = Some(Scan::Descend(next_page));
                        break;
                    }
                    next_page = branch_child(entry)?;
                }
                // Matches, if any, are under the last child pointer seen.
                action.unwrap_or(Scan::Descend(next_page))
            };

            match action {
                Scan::Found(i, entry) => {
                    path.push(page);
                    return Ok(Cursor::new(self, path, entry, i));
                }
                Scan::Descend(next) => {
                    path.push(page);
                    page_number = next;
                }
            }
        }
    }
}

/// The child pointer of a branch entry; `Corrupt` if a leaf entry shows up
/// where the tree shape requires a branch.
pub(crate) fn branch_child(entry: &Entry) -> Result<u32, IdbError> {
    entry
        .child_page()
        .ok_or_else(|| IdbError::Corrupt("leaf entry on a branch page".to_string()))
}
