use crate::cli::{CacheArgs, EngineArgs};
use crate::exit_codes;
use std::path::{Path, PathBuf};
use stimflip_rs::cache::default_cache_dir;
use stimflip_rs::{FlipError, MemorySource, ReconstructionConfig, SourceConfig};

/// Build the reconstruction config: `--config` file first, then flag overrides.
pub fn build_config(args: &EngineArgs) -> Result<ReconstructionConfig, String> {
    let mut config = match args.config {
        Some(ref path) => ReconstructionConfig::from_json_file(path)
            .map_err(|e| format!("Failed to load config '{}': {}", path, e))?,
        None => ReconstructionConfig::default(),
    };

    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(refresh_rate) = args.refresh_rate {
        config.refresh_rate = refresh_rate;
    }
    if let Some(clip_frame_rate) = args.clip_frame_rate {
        config.clip_frame_rate = clip_frame_rate;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Cache directory for scans read from `source_path`, or None when caching is off.
///
/// Each source file gets its own subdirectory named after the file stem, so
/// equal scan keys from different fixtures never share a cache entry.
pub fn resolve_cache_dir(args: &CacheArgs, source_path: &str) -> Option<PathBuf> {
    let root = match args.cache_dir {
        Some(ref dir) => PathBuf::from(dir),
        None if args.cache => default_cache_dir(),
        None => return None,
    };
    let stem = Path::new(source_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    Some(root.join(stem))
}

/// Validate a fixture path: existence and JSON extension.
pub fn validate_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("Input file not found: {}", file_path));
    }
    if !is_supported_extension(path) {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        return Err(format!(
            "Unsupported file extension '{}'. Supported: json",
            ext
        ));
    }
    Ok(())
}

pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

pub fn open_source(file_path: &str) -> Result<MemorySource, String> {
    validate_file(file_path)?;
    MemorySource::open(&SourceConfig::new(file_path))
        .map_err(|e| format!("Failed to load fixture '{}': {}", file_path, e))
}

/// Bad input maps to INPUT_ERROR; a scan that cannot be reconstructed to EXECUTION_ERROR.
pub fn exit_code_for(error: &FlipError) -> i32 {
    match error {
        FlipError::NotFound(_) | FlipError::Source(_) | FlipError::InvalidParameter(_) => {
            exit_codes::INPUT_ERROR
        }
        _ => exit_codes::EXECUTION_ERROR,
    }
}
