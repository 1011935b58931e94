use crate::cli::{self, BatchArgs};
use crate::engine;
use crate::exit_codes;
use crate::output;
use std::time::Instant;
use stimflip_rs::batch::{convert_scans, summarize, ScanOutcome};
use stimflip_rs::{ExperimentSource, ScanKey};

pub fn execute(args: BatchArgs) -> i32 {
    // Resolve file list
    let files = match resolve_files(&args) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching files found");
        return exit_codes::INPUT_ERROR;
    }

    // Dry-run mode: print file list and exit
    if args.dry_run {
        for f in &files {
            println!("{}", f);
        }
        if !args.quiet {
            eprintln!("Found {} file(s)", files.len());
        }
        return exit_codes::SUCCESS;
    }

    let selection = match resolve_selection(&args.scans) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let config = match engine::build_config(&args.engine) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: Failed to start worker pool: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    // Create output directory if specified
    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let total_files = files.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let start_time = Instant::now();

    for (i, file_path) in files.iter().enumerate() {
        if !args.quiet {
            eprintln!("[{}/{}] {}...", i + 1, total_files, file_path);
        }

        let source = match engine::open_source(file_path) {
            Ok(s) => s,
            Err(msg) => {
                eprintln!("  Error: {}", msg);
                failed += 1;
                if !args.continue_on_error {
                    break;
                }
                continue;
            }
        };

        let keys: Vec<ScanKey> = match source.scan_keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| selection.as_ref().map_or(true, |s| s.contains(k)))
                .collect(),
            Err(e) => {
                eprintln!("  Error: {}", e);
                failed += 1;
                if !args.continue_on_error {
                    break;
                }
                continue;
            }
        };

        let cache_dir = engine::resolve_cache_dir(&args.cache, file_path);
        let outcomes =
            pool.install(|| convert_scans(&source, &keys, cache_dir.as_deref(), &config));

        let (ok, errors) = summarize(&outcomes);
        let written = write_outcomes(&outcomes, &args);
        succeeded += written;
        failed += errors + (ok - written);

        if !args.quiet {
            eprintln!(
                "  {} scan(s): {} converted, {} failed",
                keys.len(),
                written,
                keys.len() - written
            );
        }

        if written < keys.len() && !args.continue_on_error {
            break;
        }
    }

    let elapsed = start_time.elapsed();

    if !args.quiet {
        eprintln!(
            "Batch complete: {} scan(s) succeeded, {} failed, {:.1}s",
            succeeded,
            failed,
            elapsed.as_secs_f64()
        );
    }

    if failed == 0 {
        exit_codes::SUCCESS
    } else if succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

/// Write every successful conversion; returns how many were written.
fn write_outcomes(outcomes: &[ScanOutcome], args: &BatchArgs) -> usize {
    let mut written = 0usize;
    for outcome in outcomes {
        let conversion = match outcome.result {
            Ok(ref c) => c,
            Err(ref e) => {
                eprintln!("  {}: {}", outcome.key, e);
                continue;
            }
        };

        let result = match args.output_dir {
            Some(ref dir) => {
                let path = output::conversion_path(dir, &outcome.key);
                output::to_json(conversion, args.compact)
                    .and_then(|json| output::write_output(&json, path.to_str()))
            }
            // JSONL to stdout
            None => output::to_json(conversion, true)
                .and_then(|json| output::write_output(&json, None)),
        };

        match result {
            Ok(()) => written += 1,
            Err(e) => eprintln!("  {}: Error writing output: {}", outcome.key, e),
        }
    }
    written
}

fn resolve_files(args: &BatchArgs) -> Result<Vec<String>, String> {
    if let Some(ref pattern) = args.glob {
        resolve_glob(pattern)
    } else if let Some(ref files) = args.files {
        Ok(files.clone())
    } else {
        Err("One of --glob or --files must be specified".to_string())
    }
}

fn resolve_glob(pattern: &str) -> Result<Vec<String>, String> {
    let paths = glob::glob(pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<String> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() && engine::is_supported_extension(&path) {
                    if let Some(s) = path.to_str() {
                        files.push(s.to_string());
                    }
                }
            }
            Err(e) => {
                log::warn!("glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn resolve_selection(scans: &Option<Vec<String>>) -> Result<Option<Vec<ScanKey>>, String> {
    let Some(scans) = scans else {
        return Ok(None);
    };
    let keys = scans
        .iter()
        .map(|s| {
            cli::parse_scan_key(s).map(|(session, scan_idx)| ScanKey::new(session, scan_idx))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(keys))
}
