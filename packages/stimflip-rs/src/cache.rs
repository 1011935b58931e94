//! Flat CSV cache of reconstructed stimulus timestamps.
//!
//! A cache file holds a single `timestamps` column. When it exists the whole
//! reconstruction is skipped, so re-running a conversion does not touch the
//! experiment source for flip data.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{FlipError, Result};
use crate::types::{FlipSequence, ScanKey};

pub const CACHE_COLUMN: &str = "timestamps";

/// Per-user cache directory, falling back to the working directory
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stimflip")
}

pub fn cache_file_name(key: &ScanKey) -> String {
    format!("{}_{}_timestamps.csv", key.session, key.scan_idx)
}

pub fn cache_path(dir: &Path, key: &ScanKey) -> PathBuf {
    dir.join(cache_file_name(key))
}

/// Read a cached timestamps column
pub fn read_cache(path: &Path) -> Result<FlipSequence> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(FlipError::Cache(format!(
            "cache file is empty: {}",
            path.display()
        )));
    }
    // SAFETY: the mapping is read-only and dropped before returning
    let mmap = unsafe { Mmap::map(&file)? };
    let timestamps = parse_cache_bytes(&mmap)
        .map_err(|e| FlipError::Cache(format!("{}: {}", path.display(), e)))?;

    log::info!(
        "Loaded {} cached timestamps from {}",
        timestamps.len(),
        path.display()
    );
    Ok(FlipSequence::from(timestamps))
}

/// Parse the CSV body: a header naming the column, then one float per row.
pub fn parse_cache_bytes(content: &[u8]) -> std::result::Result<Vec<f64>, String> {
    let text = std::str::from_utf8(content).map_err(|e| format!("not UTF-8: {}", e))?;
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    match lines.next() {
        Some((_, header)) if header.trim().trim_matches('"') == CACHE_COLUMN => {}
        Some((_, header)) => {
            return Err(format!(
                "expected '{}' header, found '{}'",
                CACHE_COLUMN,
                header.trim()
            ))
        }
        None => return Err("no header row".to_string()),
    }

    lines
        .map(|(idx, line)| {
            line.trim()
                .parse::<f64>()
                .map_err(|_| format!("line {}: '{}' is not a number", idx + 1, line.trim()))
        })
        .collect()
}

/// Write timestamps to the cache, replacing any previous file.
///
/// The column is written to a sibling temp file first and renamed into place,
/// so concurrent readers never observe a partial cache.
pub fn write_cache(path: &Path, flips: &[f64]) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        writeln!(writer, "{}", CACHE_COLUMN)?;
        for t in flips {
            writeln!(writer, "{}", t)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;

    log::debug!("Cached {} timestamps at {}", flips.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_name() {
        assert_eq!(
            cache_file_name(&ScanKey::new(4, 9)),
            "4_9_timestamps.csv"
        );
    }

    #[test]
    fn test_write_then_read_preserves_bits() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("scan.csv");
        let flips = vec![-0.1, 0.0, 1.0 / 60.0, 12345.678901234567, 1e-7];

        write_cache(&path, &flips).unwrap();
        let cached = read_cache(&path).unwrap();
        assert_eq!(cached.as_slice(), flips.as_slice());
    }

    #[test]
    fn test_parse_accepts_quoted_header_and_blank_lines() {
        let parsed = parse_cache_bytes(b"\"timestamps\"\n0.5\n\n1.5\n").unwrap();
        assert_eq!(parsed, vec![0.5, 1.5]);
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        assert!(parse_cache_bytes(b"time\n0.5\n").is_err());
        let err = parse_cache_bytes(b"timestamps\n0.5\nabc\n").unwrap_err();
        assert!(err.contains("line 3"));
    }

    #[test]
    fn test_empty_cache_file_is_an_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(read_cache(tmp.path()), Err(FlipError::Cache(_))));
    }
}
