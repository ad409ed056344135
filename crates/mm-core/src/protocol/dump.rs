//! Hex dumps of raw packets for debug logging.

use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;

/// Formats `data` as an offset / hex / ASCII dump, 16 bytes per line.
///
/// ```text
///   0x0000:  4d 4f 56 45 1e 31 1e 32 1e 30 1e 04              MOVE.1.2.0..
/// ```
///
/// Non-printable bytes are shown as `.` in the ASCII column.  An empty
/// slice yields an empty string.
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        if line > 0 {
            out.push('\n');
        }
        let _ = write!(out, "  0x{:04x}:  ", line * BYTES_PER_LINE);
        for b in chunk {
            let _ = write!(out, "{b:02x} ");
        }
        for _ in chunk.len()..BYTES_PER_LINE {
            out.push_str("   ");
        }
        out.push_str("   ");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
