//! B-tree entry export.
//!
//! Walks the whole id0 index in key order and writes one JSON object per
//! entry, suitable for piping into line-oriented tooling. Keys and values
//! are emitted as lossless lowercase hex, with a best-effort printable
//! rendering of the key alongside.

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use crate::idb::id0::{branch_child, Id0};
use crate::util::hex::{format_bytes, format_key};
use crate::IdbError;

/// Errors produced while exporting entries.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The index itself failed to decode.
    #[error(transparent)]
    Idb(#[from] IdbError),

    /// The output writer failed.
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("serialize error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One exported key/value pair.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedEntry {
    /// Key bytes as lowercase hex.
    pub key: String,
    /// Printable rendering of the key.
    pub key_display: String,
    /// Value bytes as lowercase hex.
    pub value: String,
}

/// Write every entry of the index to `out` as JSON lines, in ascending
/// key order. Returns the number of entries written.
pub fn export_entries<W: Write>(index: &Id0, out: &mut W) -> Result<u64, ExportError> {
    let mut count = 0u64;
    walk_page(index, index.root_page(), out, &mut count)?;
    Ok(count)
}

/// In-order walk: the sub-tree left of each entry first, then the entry,
/// then its own child sub-tree.
fn walk_page<W: Write>(
    index: &Id0,
    page_number: u32,
    out: &mut W,
    count: &mut u64,
) -> Result<(), ExportError> {
    let page = index.get_page(page_number)?;

    if page.is_leaf() {
        for entry in page.entries()? {
            emit(entry.key(), entry.value(), out, count)?;
        }
        return Ok(());
    }

    walk_page(index, page.ppointer(), out, count)?;
    for i in 0..page.entry_count() as usize {
        let (key, value, child) = {
            let entry = page.entry(i)?;
            (
                entry.key().to_vec(),
                entry.value().to_vec(),
                branch_child(entry)?,
            )
        };
        emit(&key, &value, out, count)?;
        walk_page(index, child, out, count)?;
    }
    Ok(())
}

fn emit<W: Write>(key: &[u8], value: &[u8], out: &mut W, count: &mut u64) -> Result<(), ExportError> {
    let record = ExportedEntry {
        key: format_bytes(key),
        key_display: format_key(key),
        value: format_bytes(value),
    };
    serde_json::to_writer(&mut *out, &record)?;
    out.write_all(b"\n")?;
    *count += 1;
    Ok(())
}
