//! CDG File Loading
//!
//! Reads `.cdg` files from disk with size validation. Files are the raw
//! subchannel stream with no header, so validation is purely structural:
//! the file must be non-empty and a whole number of 24-byte packets.

use crate::subcode::PACKET_SIZE;
use crate::{CdgError, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Load a CDG file from disk.
///
/// In-memory buffers handed to [`crate::CdgPlayer::open`] may carry a
/// ragged tail (it is dropped during processing), but a file that is not
/// packet-aligned is malformed and rejected here.
///
/// # Errors
/// [`CdgError::EmptyInput`] for an empty file, [`CdgError::TruncatedPacket`]
/// for a file whose size is not a multiple of 24 bytes, or a wrapped read
/// error.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = fs::read(path)
        .map_err(|e| format!("failed to read CDG file '{}': {}", path.display(), e))?;

    if data.is_empty() {
        return Err(CdgError::EmptyInput);
    }
    let remainder = data.len() % PACKET_SIZE;
    if remainder != 0 {
        return Err(CdgError::TruncatedPacket { remainder });
    }

    debug!(
        "loaded {} bytes ({} packets) from '{}'",
        data.len(),
        data.len() / PACKET_SIZE,
        path.display()
    );
    Ok(data)
}
