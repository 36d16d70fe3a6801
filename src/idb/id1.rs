//! Per-byte flags section ("id1") parsing and address queries.
//!
//! The id1 section stores one little-endian 32-bit flag word per byte of
//! the disassembled address space, grouped into segments. The header
//! carries a segment table (start/end address pairs); the flag words for a
//! segment occupy a contiguous run of the flags buffer, located by the
//! cumulative size of all preceding segments.
//!
//! [`Id1::get_flags`] resolves one address to its flag word. The head
//! walkers ([`Id1::head`], [`Id1::next_head`], [`Id1::prev_head`]) step
//! along the address stream between item starts, and
//! [`Id1::get_many_bytes`] extracts raw byte values where they are present.

use serde::Serialize;

use crate::idb::constants::*;
use crate::idb::flags::Flags;
use crate::idb::reader::{Reader, WordSize};
use crate::IdbError;

/// Address range of one segment, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentBounds {
    /// First address of the segment.
    pub start: u64,
    /// One past the last address of the segment.
    pub end: u64,
}

/// A segment plus the position of its flag words in the flags buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentDescriptor {
    /// Address range covered by the segment.
    pub bounds: SegmentBounds,
    /// Byte offset of the segment's first flag word within the flags
    /// buffer: the summed flag-word footprint of all preceding segments.
    pub offset: u64,
}

/// The per-byte flags section.
pub struct Id1<'a> {
    signature: [u8; 4],
    unk04: u32,
    unk0c: u32,
    page_count: u32,
    segments: Vec<SegmentDescriptor>,
    buffer: &'a [u8],
}

impl<'a> Id1<'a> {
    /// Parse the section: header, segment table, then the flags buffer
    /// after padding to the fixed 0x2000-byte page boundary.
    pub fn parse(buf: &'a [u8], word_size: WordSize) -> Result<Self, IdbError> {
        let mut r = Reader::new(buf);
        let mut signature = [0u8; 4];
        signature.copy_from_slice(r.read_bytes(4)?);
        let unk04 = r.read_u32()?;
        let segment_count = r.read_u32()?;
        let unk0c = r.read_u32()?;
        let page_count = r.read_u32()?;

        let mut segments = Vec::with_capacity(segment_count as usize);
        let mut offset = 0u64;
        for _ in 0..segment_count {
            let start = r.read_word(word_size)?;
            let end = r.read_word(word_size)?;
            segments.push(SegmentDescriptor {
                bounds: SegmentBounds { start, end },
                offset,
            });
            offset += FLAG_BYTES_PER_ADDRESS * end.saturating_sub(start);
        }

        // The header page is padded out to the fixed page size; the flags
        // buffer starts on the next page boundary.
        let padding = VA_PAGE_SIZE.checked_sub(r.position()).ok_or_else(|| {
            IdbError::Corrupt(format!(
                "id1 segment table of {} entries overruns the header page",
                segment_count
            ))
        })?;
        r.skip(padding)?;

        let buffer_len = page_count as usize * VA_PAGE_SIZE;
        let buffer = r.read_bytes(buffer_len)?;

        Ok(Id1 {
            signature,
            unk04,
            unk0c,
            page_count,
            segments,
            buffer,
        })
    }

    /// Check the signature, the two constant fields, and that every
    /// segment's bounds are ordered.
    pub fn validate(&self) -> Result<(), IdbError> {
        if &self.signature != VA_SIGNATURE {
            return Err(IdbError::BadSignature(format!(
                "id1 signature {:02x?}",
                self.signature
            )));
        }
        if self.unk04 != VA_UNK04 {
            return Err(IdbError::Corrupt(format!(
                "id1 constant at offset 4 is 0x{:x}",
                self.unk04
            )));
        }
        if self.unk0c != VA_UNK0C {
            return Err(IdbError::Corrupt(format!(
                "id1 constant at offset 0xc is 0x{:x}",
                self.unk0c
            )));
        }
        for segment in &self.segments {
            if segment.bounds.start > segment.bounds.end {
                return Err(IdbError::Corrupt(format!(
                    "segment at 0x{:x} ends before it starts",
                    segment.bounds.start
                )));
            }
        }
        Ok(())
    }

    /// Number of 0x2000-byte pages in the flags buffer.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// All segments, in table order.
    pub fn segments(&self) -> &[SegmentDescriptor] {
        &self.segments
    }

    /// The first segment of the table, if any.
    pub fn first_segment(&self) -> Option<&SegmentDescriptor> {
        self.segments.first()
    }

    /// The segment containing the given effective address.
    ///
    /// Fails with `NotFound` when no segment covers `ea`.
    pub fn get_segment(&self, ea: u64) -> Result<&SegmentDescriptor, IdbError> {
        self.segments
            .iter()
            .find(|s| s.bounds.start <= ea && ea < s.bounds.end)
            .ok_or(IdbError::NotFound)
    }

    /// The segment immediately after the one containing `ea`.
    ///
    /// Fails with `OutOfRange` when `ea` sits in the last segment, and
    /// with `NotFound` when `ea` sits in no segment at all.
    pub fn get_next_segment(&self, ea: u64) -> Result<&SegmentDescriptor, IdbError> {
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.bounds.start <= ea && ea < segment.bounds.end {
                if i == self.segments.len() - 1 {
                    return Err(IdbError::OutOfRange);
                }
                return Ok(&self.segments[i + 1]);
            }
        }
        Err(IdbError::NotFound)
    }

    /// The 32-bit flag word for the given effective address.
    ///
    /// Fails with `NotFound` when no segment covers `ea`.
    pub fn get_flags(&self, ea: u64) -> Result<u32, IdbError> {
        let segment = self.get_segment(ea)?;
        let offset = segment.offset + FLAG_BYTES_PER_ADDRESS * (ea - segment.bounds.start);
        let offset = usize::try_from(offset).map_err(|_| {
            IdbError::Corrupt(format!("flags offset 0x{:x} for address 0x{:x}", offset, ea))
        })?;
        if offset + 4 > self.buffer.len() {
            return Err(IdbError::Corrupt(format!(
                "flags for address 0x{:x} lie past the flags buffer",
                ea
            )));
        }
        let mut r = Reader::new(&self.buffer[offset..]);
        r.read_u32()
    }

    /// The byte value stored for `ea`, when the flag word says one is
    /// present.
    ///
    /// Fails with `NotFound` when `ea` is in no segment or its value bit
    /// is clear.
    pub fn byte_value(&self, ea: u64) -> Result<u8, IdbError> {
        let flags = Flags(self.get_flags(ea)?);
        match flags.byte_value() {
            Some(value) => Ok(value),
            None => Err(IdbError::NotFound),
        }
    }

    /// Walk downward from `ea` to the start of the item containing it.
    ///
    /// Fails with `NotFound` when `ea` is in no segment, and with
    /// `OutOfRange` when the walk falls off the segment (or below
    /// address 0) before reaching a head.
    pub fn head(&self, ea: u64) -> Result<u64, IdbError> {
        let mut ea = ea;
        let mut flags = Flags(self.get_flags(ea)?);
        while !flags.is_head() {
            ea = ea.checked_sub(1).ok_or(IdbError::OutOfRange)?;
            flags = Flags(self.get_flags(ea).map_err(|_| IdbError::OutOfRange)?);
        }
        Ok(ea)
    }

    /// The first head at an address strictly greater than `ea`.
    ///
    /// Fails with `OutOfRange` when the walk leaves the segment before
    /// reaching a head.
    pub fn next_head(&self, ea: u64) -> Result<u64, IdbError> {
        let mut ea = ea
            .checked_add(1)
            .ok_or(IdbError::OutOfRange)?;
        loop {
            let flags = Flags(self.get_flags(ea).map_err(|_| IdbError::OutOfRange)?);
            if flags.is_head() {
                return Ok(ea);
            }
            ea = ea.checked_add(1).ok_or(IdbError::OutOfRange)?;
        }
    }

    /// The last head at an address strictly less than `head(ea)`.
    ///
    /// Fails with `OutOfRange` when the walk leaves the segment.
    pub fn prev_head(&self, ea: u64) -> Result<u64, IdbError> {
        let head = self.head(ea)?;
        let below = head.checked_sub(1).ok_or(IdbError::OutOfRange)?;
        self.head(below).map_err(|e| match e {
            IdbError::NotFound => IdbError::OutOfRange,
            e => e,
        })
    }

    /// The byte values of `[ea, ea + size)`.
    ///
    /// Fails with `OutOfRange` when the range crosses a segment boundary
    /// (or runs past the last segment), and with `NotFound` when any byte
    /// in the range has no stored value.
    pub fn get_many_bytes(&self, ea: u64, size: usize) -> Result<Vec<u8>, IdbError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let first = self.get_segment(ea)?;
        let last_ea = ea
            .checked_add(size as u64 - 1)
            .ok_or(IdbError::OutOfRange)?;
        let last = self.get_segment(last_ea).map_err(|_| IdbError::OutOfRange)?;
        if first.bounds.start != last.bounds.start {
            return Err(IdbError::OutOfRange);
        }

        let mut bytes = Vec::with_capacity(size);
        for addr in ea..=last_ea {
            bytes.push(self.byte_value(addr)?);
        }
        Ok(bytes)
    }
}
