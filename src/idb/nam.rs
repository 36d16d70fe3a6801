//! Named-address section ("nam") parsing.
//!
//! The nam section lists the effective addresses of all named items as a
//! sorted array of word-sized little-endian integers. The names themselves
//! live in the B-tree index; this section is only the address list.

use crate::idb::constants::*;
use crate::idb::reader::{Reader, WordSize};
use crate::IdbError;

/// The named-address section.
pub struct Nam<'a> {
    word_size: WordSize,
    signature: [u8; 4],
    unk04: u32,
    non_empty: u32,
    unk0c: u32,
    page_count: u32,
    unk14: u64,
    name_count: u32,
    buffer: &'a [u8],
}

impl<'a> Nam<'a> {
    /// Parse the section header and locate the address buffer after the
    /// padding to the fixed 0x2000-byte page boundary.
    pub fn parse(buf: &'a [u8], word_size: WordSize) -> Result<Self, IdbError> {
        let mut r = Reader::new(buf);
        let mut signature = [0u8; 4];
        signature.copy_from_slice(r.read_bytes(4)?);
        let unk04 = r.read_u32()?;
        let non_empty = r.read_u32()?;
        let unk0c = r.read_u32()?;
        let page_count = r.read_u32()?;
        let unk14 = r.read_word(word_size)?;
        let name_count = r.read_u32()?;

        let padding = VA_PAGE_SIZE.checked_sub(r.position()).ok_or_else(|| {
            IdbError::Corrupt("nam header overruns the header page".to_string())
        })?;
        r.skip(padding)?;

        let buffer_len = page_count as usize * VA_PAGE_SIZE;
        let buffer = r.read_bytes(buffer_len)?;

        Ok(Nam {
            word_size,
            signature,
            unk04,
            non_empty,
            unk0c,
            page_count,
            unk14,
            name_count,
            buffer,
        })
    }

    /// Check the signature and the constant header fields.
    pub fn validate(&self) -> Result<(), IdbError> {
        if &self.signature != VA_SIGNATURE {
            return Err(IdbError::BadSignature(format!(
                "nam signature {:02x?}",
                self.signature
            )));
        }
        if self.unk04 != VA_UNK04 {
            return Err(IdbError::Corrupt(format!(
                "nam constant at offset 4 is 0x{:x}",
                self.unk04
            )));
        }
        if self.non_empty > 1 {
            return Err(IdbError::Corrupt(format!(
                "nam non-empty flag is 0x{:x}",
                self.non_empty
            )));
        }
        if self.unk0c != VA_UNK0C {
            return Err(IdbError::Corrupt(format!(
                "nam constant at offset 0xc is 0x{:x}",
                self.unk0c
            )));
        }
        if self.unk14 != 0 {
            return Err(IdbError::Corrupt(format!(
                "nam word at offset 0x14 is 0x{:x}",
                self.unk14
            )));
        }
        Ok(())
    }

    /// Whether the section claims to hold any names.
    pub fn non_empty(&self) -> bool {
        self.non_empty == 1
    }

    /// Number of 0x2000-byte pages in the address buffer.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of named addresses stored.
    pub fn name_count(&self) -> u32 {
        self.name_count
    }

    /// Decode the sorted address list.
    ///
    /// Fails with `Corrupt` when the buffer is too small for
    /// `name_count` words.
    pub fn names(&self) -> Result<Vec<u64>, IdbError> {
        let count = self.name_count as usize;
        let needed = count * self.word_size.bytes();
        if needed > self.buffer.len() {
            return Err(IdbError::Corrupt(format!(
                "nam buffer of {} bytes cannot hold {} addresses",
                self.buffer.len(),
                count
            )));
        }
        let mut r = Reader::new(self.buffer);
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            names.push(r.read_word(self.word_size)?);
        }
        Ok(names)
    }
}
