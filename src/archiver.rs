use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::ArchiveError;
use crate::models::ProductRecord;

/// JSON array of records, two-space indented unless `pretty` is false.
pub fn serialize(records: &[ProductRecord], pretty: bool) -> Result<String, ArchiveError> {
    let json = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };
    Ok(json)
}

pub fn write_to<W: Write>(
    mut writer: W,
    records: &[ProductRecord],
    pretty: bool,
) -> Result<(), ArchiveError> {
    let json = serialize(records, pretty)?;
    let io_err = |source| ArchiveError::Io {
        path: "<stdout>".to_string(),
        source,
    };
    writer.write_all(json.as_bytes()).map_err(io_err)?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)
}

pub fn save_to_file(
    records: &[ProductRecord],
    path: &Path,
    pretty: bool,
) -> Result<(), ArchiveError> {
    let json = serialize(records, pretty)?;
    let io_err = |source| ArchiveError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(json.as_bytes()).map_err(io_err)?;
    file.write_all(b"\n").map_err(io_err)?;
    Ok(())
}
