//! Byte-string formatting for index keys and values.
//!
//! B-tree keys mix printable tags (netnode names like `N$ dirtree`) with
//! raw binary (packed node ids and addresses), so diagnostics and exports
//! want both a lossless hex form and a best-effort printable form.

/// Format bytes as a compact lowercase hex string (e.g., "4e24006974").
pub fn format_bytes(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Render a key for humans: printable ASCII passes through, everything
/// else becomes a `\xNN` escape.
pub fn format_key(key: &[u8]) -> String {
    let mut out = String::with_capacity(key.len());
    for &b in key {
        if b.is_ascii_graphic() || b == b' ' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{:02x}", b));
        }
    }
    out
}
