// Extraction of a gzip-compressed tarball holding the Hermes executable
use flate2::read::GzDecoder;
use std::io::{Read, Write};
use tar::{Archive, EntryType};
use tempfile::TempPath;

use crate::error::{Error, Result};

/// Archive compiled in with the `bundled` feature
#[cfg(feature = "bundled")]
pub(crate) const EMBEDDED: Option<&[u8]> = Some(include_bytes!(env!("HERMES_BUNDLE")).as_slice());

#[cfg(not(feature = "bundled"))]
pub(crate) const EMBEDDED: Option<&[u8]> = None;

const TEMP_PREFIX: &str = "hermes";

/// Read the first regular file out of `archive`
pub(crate) fn unpack(archive: &[u8]) -> Result<Vec<u8>> {
    let mut archive = Archive::new(GzDecoder::new(archive));
    let entries = archive.entries().map_err(Error::extraction)?;

    for entry in entries {
        let mut entry = entry.map_err(Error::extraction)?;
        if entry.header().entry_type() != EntryType::Regular {
            continue;
        }

        let mut binary = Vec::new();
        entry.read_to_end(&mut binary).map_err(Error::extraction)?;
        return Ok(binary);
    }

    Err(Error::extraction("archive contains no executable"))
}

/// Write `archive`'s executable to a private temp file with mode 0755.
///
/// The returned path deletes the file when dropped.
pub(crate) fn extract(archive: &[u8]) -> Result<TempPath> {
    let binary = unpack(archive)?;

    let mut file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile()
        .map_err(Error::extraction)?;
    file.write_all(&binary).map_err(Error::extraction)?;
    file.as_file().sync_all().map_err(Error::extraction)?;

    // Close the write handle so the file can be executed
    let path = file.into_temp_path();
    set_executable(&path)?;
    Ok(path)
}

#[cfg(unix)]
fn set_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(Error::extraction)
}

#[cfg(not(unix))]
fn set_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
