//! Outer container parsing: file header and section directory.
//!
//! Every database file starts with a fixed 0x58-byte [`FileHeader`] holding
//! the magic bytes, six absolute section offsets, and six (unverified)
//! section checksums. Each non-zero offset points at a 9-byte section
//! header (compression flag + payload length) followed by the payload.
//!
//! [`Idb::from_bytes`] parses the header, slices out every present section,
//! and hands each payload to its typed decoder. The section order is fixed:
//! id0, id1, nam, seg, til, id2. The `seg` and `id2` payload formats are
//! not decoded; they are exposed as raw slices.

use serde::Serialize;
use tracing::debug;

use crate::idb::constants::*;
use crate::idb::id0::Id0;
use crate::idb::id1::Id1;
use crate::idb::nam::Nam;
use crate::idb::reader::{Reader, WordSize};
use crate::idb::til::Til;
use crate::IdbError;

/// Knobs accepted by [`Idb::from_bytes_with_options`].
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Width of addresses in id1 segment bounds and nam entries.
    pub word_size: WordSize,
    /// Run the full validation pass as part of parsing.
    pub strict_validate: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            word_size: WordSize::U32,
            strict_validate: true,
        }
    }
}

/// Parsed outer file header (0x58 bytes at offset 0).
///
/// The interleaved layout is inherited from the on-disk format: two section
/// offsets precede the secondary signature and version, three more follow,
/// and the last offset sits between the checksum groups.
#[derive(Debug, Clone, Serialize)]
pub struct FileHeader {
    /// Magic bytes (`IDA1`). Bytes 0-3.
    pub magic: [u8; 4],
    /// Unknown field at offset 4, not validated.
    pub unk04: u16,
    /// Unknown field at offset 0x16, not validated.
    pub unk16: u32,
    /// Secondary signature at offset 0x1A (`0xAABBCCDD`).
    pub sig2: u32,
    /// Format version at offset 0x1E. Must be 6.
    pub version: u16,
    /// Absolute section offsets in directory order; zero means absent.
    pub offsets: [u64; 6],
    /// Per-section checksums in directory order. Not verified.
    pub checksums: [u32; 6],
}

impl FileHeader {
    /// Parse and validate the file header from the start of `buf`.
    ///
    /// Fails with `BadSignature` on a magic or secondary-signature
    /// mismatch, `UnsupportedVersion` for any version other than 6, and
    /// `Corrupt` if the buffer cannot hold the header.
    pub fn parse(buf: &[u8]) -> Result<Self, IdbError> {
        let mut r = Reader::new(buf);

        let mut magic = [0u8; 4];
        magic.copy_from_slice(r.read_bytes(4)?);
        let unk04 = r.read_u16()?;
        let offset1 = r.read_u64()?;
        let offset2 = r.read_u64()?;
        let unk16 = r.read_u32()?;
        let sig2 = r.read_u32()?;
        let version = r.read_u16()?;
        let offset3 = r.read_u64()?;
        let offset4 = r.read_u64()?;
        let offset5 = r.read_u64()?;
        let mut checksums = [0u32; 6];
        for slot in checksums.iter_mut().take(5) {
            *slot = r.read_u32()?;
        }
        let offset6 = r.read_u64()?;
        checksums[5] = r.read_u32()?;

        let header = FileHeader {
            magic,
            unk04,
            unk16,
            sig2,
            version,
            offsets: [offset1, offset2, offset3, offset4, offset5, offset6],
            checksums,
        };
        header.validate()?;
        Ok(header)
    }

    /// Check the magic bytes, the secondary signature, and the version.
    pub fn validate(&self) -> Result<(), IdbError> {
        if &self.magic != IDB_MAGIC {
            return Err(IdbError::BadSignature(format!(
                "file magic {:02x?}",
                self.magic
            )));
        }
        if self.sig2 != IDB_SIG2 {
            return Err(IdbError::BadSignature(format!(
                "secondary signature 0x{:08x}",
                self.sig2
            )));
        }
        if self.version != IDB_VERSION {
            return Err(IdbError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Slice out a section payload from `buf` given its absolute offset.
///
/// Reads the 9-byte section header, rejects compressed sections and
/// zero-length payloads, and bounds-checks the payload against the buffer.
fn section_payload<'a>(buf: &'a [u8], offset: u64, name: &str) -> Result<&'a [u8], IdbError> {
    let start = usize::try_from(offset)
        .map_err(|_| IdbError::Corrupt(format!("{} section offset 0x{:x}", name, offset)))?;
    if buf.len() < SECTION_HEADER_SIZE || start > buf.len() - SECTION_HEADER_SIZE {
        return Err(IdbError::Corrupt(format!(
            "{} section header at 0x{:x} past end of file",
            name, offset
        )));
    }

    let mut r = Reader::new(&buf[start..]);
    let is_compressed = r.read_u8()?;
    let length = r.read_u64()?;

    if is_compressed != 0 {
        return Err(IdbError::Unsupported(format!("compressed {} section", name)));
    }
    if length == 0 {
        return Err(IdbError::Corrupt(format!("zero-length {} section", name)));
    }

    let data_start = start + SECTION_HEADER_SIZE;
    let data_end = (data_start as u64)
        .checked_add(length)
        .filter(|end| *end <= buf.len() as u64)
        .ok_or_else(|| {
            IdbError::Corrupt(format!(
                "{} section of {} bytes at 0x{:x} past end of file",
                name, length, offset
            ))
        })?;

    Ok(&buf[data_start..data_end as usize])
}

/// A parsed database file.
///
/// Borrows the caller's byte buffer; all typed sections borrow from the
/// same buffer and are dropped together with the container.
pub struct Idb<'a> {
    header: FileHeader,
    word_size: WordSize,
    id0: Option<Id0<'a>>,
    id1: Option<Id1<'a>>,
    nam: Option<Nam<'a>>,
    til: Option<Til<'a>>,
    seg: Option<&'a [u8]>,
    id2: Option<&'a [u8]>,
}

impl<'a> Idb<'a> {
    /// Parse a database from a byte buffer with default options
    /// (32-bit word size, strict validation).
    pub fn from_bytes(buf: &'a [u8]) -> Result<Self, IdbError> {
        Self::from_bytes_with_options(buf, ParseOptions::default())
    }

    /// Parse a database with explicit [`ParseOptions`].
    pub fn from_bytes_with_options(buf: &'a [u8], opts: ParseOptions) -> Result<Self, IdbError> {
        let header = FileHeader::parse(buf)?;

        let mut payloads: [Option<&'a [u8]>; SECTION_COUNT] = [None; SECTION_COUNT];
        const NAMES: [&str; SECTION_COUNT] = ["id0", "id1", "nam", "seg", "til", "id2"];
        for (i, &offset) in header.offsets.iter().enumerate() {
            if offset == 0 {
                debug!(section = NAMES[i], "section absent");
                continue;
            }
            payloads[i] = Some(section_payload(buf, offset, NAMES[i])?);
            debug!(section = NAMES[i], offset, "located section");
        }

        let db = Idb {
            header,
            word_size: opts.word_size,
            id0: payloads[0].map(Id0::parse).transpose()?,
            id1: payloads[1].map(|p| Id1::parse(p, opts.word_size)).transpose()?,
            nam: payloads[2].map(|p| Nam::parse(p, opts.word_size)).transpose()?,
            seg: payloads[3],
            til: payloads[4].map(Til::parse).transpose()?,
            id2: payloads[5],
        };

        if opts.strict_validate {
            db.validate()?;
        }
        Ok(db)
    }

    /// Run the signature and constant checks of every present section.
    ///
    /// The file header was already validated during parsing; this re-checks
    /// it together with id0, id1, nam, and til.
    pub fn validate(&self) -> Result<(), IdbError> {
        self.header.validate()?;
        if let Some(id0) = &self.id0 {
            id0.validate()?;
        }
        if let Some(id1) = &self.id1 {
            id1.validate()?;
        }
        if let Some(nam) = &self.nam {
            nam.validate()?;
        }
        if let Some(til) = &self.til {
            til.validate()?;
        }
        Ok(())
    }

    /// The parsed outer file header.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// The configured address width.
    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// The B-tree index section, if present.
    pub fn id0(&self) -> Option<&Id0<'a>> {
        self.id0.as_ref()
    }

    /// The per-byte flags section, if present.
    pub fn id1(&self) -> Option<&Id1<'a>> {
        self.id1.as_ref()
    }

    /// The named-address section, if present.
    pub fn nam(&self) -> Option<&Nam<'a>> {
        self.nam.as_ref()
    }

    /// The type-library section, if present.
    pub fn til(&self) -> Option<&Til<'a>> {
        self.til.as_ref()
    }

    /// Raw payload of the seg section; its format is not decoded.
    pub fn seg(&self) -> Option<&'a [u8]> {
        self.seg
    }

    /// Raw payload of the id2 section; its format is not decoded.
    pub fn id2(&self) -> Option<&'a [u8]> {
        self.id2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};

    fn make_header_bytes(version: u16) -> Vec<u8> {
        let mut buf = vec![0u8; FILE_HEADER_SIZE];
        buf[0..4].copy_from_slice(IDB_MAGIC);
        LittleEndian::write_u32(&mut buf[0x1A..], IDB_SIG2);
        LittleEndian::write_u16(&mut buf[0x1E..], version);
        buf
    }

    #[test]
    fn test_header_parse_roundtrip() {
        let mut buf = make_header_bytes(IDB_VERSION);
        LittleEndian::write_u16(&mut buf[0x04..], 0x1234);
        LittleEndian::write_u64(&mut buf[0x06..], 0x58); // offset1
        LittleEndian::write_u64(&mut buf[0x20..], 0x100); // offset3
        LittleEndian::write_u32(&mut buf[0x38..], 0xDEAD); // checksum1
        LittleEndian::write_u64(&mut buf[0x4C..], 0x200); // offset6
        LittleEndian::write_u32(&mut buf[0x54..], 0xBEEF); // checksum6

        let hdr = FileHeader::parse(&buf).unwrap();
        assert_eq!(hdr.unk04, 0x1234);
        assert_eq!(hdr.offsets, [0x58, 0, 0x100, 0, 0, 0x200]);
        assert_eq!(hdr.checksums[0], 0xDEAD);
        assert_eq!(hdr.checksums[5], 0xBEEF);
        assert_eq!(hdr.version, IDB_VERSION);
    }

    #[test]
    fn test_header_bad_magic() {
        let mut buf = make_header_bytes(IDB_VERSION);
        buf[0] = b'X';
        assert!(matches!(
            FileHeader::parse(&buf),
            Err(IdbError::BadSignature(_))
        ));
    }

    #[test]
    fn test_header_bad_sig2() {
        let mut buf = make_header_bytes(IDB_VERSION);
        LittleEndian::write_u32(&mut buf[0x1A..], 0x11223344);
        assert!(matches!(
            FileHeader::parse(&buf),
            Err(IdbError::BadSignature(_))
        ));
    }

    #[test]
    fn test_header_unsupported_version() {
        let buf = make_header_bytes(7);
        assert!(matches!(
            FileHeader::parse(&buf),
            Err(IdbError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_header_too_short() {
        let buf = vec![0u8; 10];
        assert!(matches!(FileHeader::parse(&buf), Err(IdbError::Corrupt(_))));
    }

    #[test]
    fn test_section_payload_compressed_rejected() {
        let mut buf = vec![0u8; 32];
        buf[0] = 1; // is_compressed
        LittleEndian::write_u64(&mut buf[1..], 4);
        assert!(matches!(
            section_payload(&buf, 0, "id0"),
            Err(IdbError::Unsupported(_))
        ));
    }

    #[test]
    fn test_section_payload_zero_length_rejected() {
        let buf = vec![0u8; 32];
        assert!(matches!(
            section_payload(&buf, 0, "id0"),
            Err(IdbError::Corrupt(_))
        ));
    }

    #[test]
    fn test_section_payload_out_of_bounds() {
        let mut buf = vec![0u8; 16];
        LittleEndian::write_u64(&mut buf[1..], 100);
        assert!(matches!(
            section_payload(&buf, 0, "id0"),
            Err(IdbError::Corrupt(_))
        ));
    }

    #[test]
    fn test_section_payload_slices_data() {
        let mut buf = vec![0u8; 16];
        LittleEndian::write_u64(&mut buf[1..], 4);
        buf[9..13].copy_from_slice(b"data");
        assert_eq!(section_payload(&buf, 0, "seg").unwrap(), b"data");
    }
}
