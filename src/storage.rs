//! Newline-delimited JSON persistence for GPS records.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::types::GpsRecord;

fn open_reader(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Parse records from a line-oriented reader.
///
/// Blank lines are ignored. Lines that are not valid UTF-8, or not JSON
/// objects with numeric `lat`/`lng`, are logged with their 1-based line
/// number and skipped.
pub fn read_jsonl<R: Read>(reader: R) -> Vec<GpsRecord> {
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line_num = idx + 1;
        let line = match line {
            Ok(line) => line,
            // `lines()` has already consumed the offending bytes
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                log::warn!("Skipping line {}: {}", line_num, e);
                continue;
            }
            Err(e) => {
                log::error!("Read failed at line {}: {}", line_num, e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<GpsRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping line {}: {}", line_num, e),
        }
    }
    records
}

/// Load every valid record from `path` (`.gz` is decompressed).
///
/// A missing or unreadable file is logged and yields an empty vector.
pub fn load_jsonl(path: &Path) -> Vec<GpsRecord> {
    match open_reader(path) {
        Ok(reader) => {
            let records = read_jsonl(reader);
            log::info!("Loaded {} records from {}", records.len(), path.display());
            records
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::error!("File not found: {}", path.display());
            Vec::new()
        }
        Err(e) => {
            log::error!("Failed to open {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Write one compact JSON object per line.
pub fn write_jsonl<W: Write>(records: &[GpsRecord], writer: W) -> io::Result<()> {
    let mut writer = BufWriter::new(writer);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

pub fn save_jsonl(records: &[GpsRecord], path: &Path) -> io::Result<()> {
    write_jsonl(records, File::create(path)?)?;
    log::info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}
