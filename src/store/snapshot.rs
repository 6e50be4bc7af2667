//! Snapshot files
//!
//! Point-in-time dump of a [`super::MemoryStore`].
//!
//! ## File Format
//! ```text
//! ┌───────────┬─────────────┬─────────┬─────────┬──────────────────┐
//! │ Magic (4) │ Version (4) │ CRC (4) │ Len (8) │ bincode payload  │
//! └───────────┴─────────────┴─────────┴─────────┴──────────────────┘
//! ```
//! The CRC covers the payload only. Files are written to a temporary
//! sibling and renamed into place, so a crash never leaves a torn snapshot.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{ParkError, Result};
use crate::item::Item;

/// File magic
pub const MAGIC: &[u8; 4] = b"PKRS";

/// Format version
pub const VERSION: u32 = 1;

/// Magic + version + crc + len
const HEADER_SIZE: usize = 4 + 4 + 4 + 8;

pub(crate) type Contents = BTreeMap<String, Vec<Item>>;

pub(crate) fn write(path: &Path, contents: &Contents) -> Result<()> {
    let payload = bincode::serialize(contents)?;
    let crc = crc32fast::hash(&payload);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&crc.to_le_bytes())?;
        writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    tracing::debug!(path = %path.display(), bytes = payload.len(), "snapshot written");
    Ok(())
}

pub(crate) fn read(path: &Path) -> Result<Contents> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    if bytes.len() < HEADER_SIZE {
        return Err(ParkError::SnapshotCorruption(format!(
            "file is {} bytes, shorter than header",
            bytes.len()
        )));
    }
    if &bytes[0..4] != MAGIC {
        return Err(ParkError::SnapshotCorruption("bad magic".to_string()));
    }

    let version = u32::from_le_bytes(read_array(&bytes[4..8]));
    if version != VERSION {
        return Err(ParkError::SnapshotCorruption(format!(
            "unsupported version {}",
            version
        )));
    }

    let expected_crc = u32::from_le_bytes(read_array(&bytes[8..12]));
    let len = u64::from_le_bytes(read_array(&bytes[12..20])) as usize;
    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != len {
        return Err(ParkError::SnapshotCorruption(format!(
            "payload length {} does not match header {}",
            payload.len(),
            len
        )));
    }

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(ParkError::SnapshotCorruption(format!(
            "checksum mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    Ok(bincode::deserialize(payload)?)
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}
