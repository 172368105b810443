//! Leading text samples.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use content_inspector::ContentType;

/// Read up to `max_bytes` from the start of a file and decode them as text.
///
/// Returns an empty string for empty files, binary content or anything that
/// is not UTF-8. A multi-byte character cut off by the limit is dropped.
pub fn read_sample(path: &Path, max_bytes: usize) -> io::Result<String> {
    if max_bytes == 0 {
        return Ok(String::new());
    }

    let mut buffer = Vec::with_capacity(max_bytes.min(64 * 1024));
    File::open(path)?
        .take(max_bytes as u64)
        .read_to_end(&mut buffer)?;

    Ok(decode_sample(&buffer))
}

/// Decode a byte buffer as a text sample.
pub fn decode_sample(buffer: &[u8]) -> String {
    if buffer.is_empty() {
        return String::new();
    }

    let body = match content_inspector::inspect(buffer) {
        ContentType::UTF_8_BOM => &buffer[3..],
        ContentType::UTF_8 => buffer,
        _ => return String::new(),
    };

    match std::str::from_utf8(body) {
        Ok(text) => text.to_owned(),
        // Only a truncated trailing character is tolerated.
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&body[..e.valid_up_to()]).into_owned()
        }
        Err(_) => String::new(),
    }
}
