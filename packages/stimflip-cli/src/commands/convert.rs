use crate::cli::ConvertArgs;
use crate::engine;
use crate::exit_codes;
use crate::output;
use stimflip_rs::cache::cache_path;
use stimflip_rs::{convert_scan, ScanKey};

pub fn execute(args: ConvertArgs) -> i32 {
    let config = match engine::build_config(&args.engine) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let source = match engine::open_source(&args.source) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let key = ScanKey::new(args.session, args.scan_idx);
    let cache = engine::resolve_cache_dir(&args.cache, &args.source)
        .map(|dir| cache_path(&dir, &key));

    if !args.quiet {
        eprintln!("Reconstructing stimulus timestamps for {}...", key);
        eprintln!(
            "  Refresh rate: {} Hz, tolerance: {} s",
            config.refresh_rate, config.tolerance
        );
        if let Some(ref path) = cache {
            eprintln!("  Cache: {}", path.display());
        }
    }

    let conversion = match convert_scan(&source, &key, cache.as_deref(), &config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return engine::exit_code_for(&e);
        }
    };

    match output::to_json(&conversion, args.compact) {
        Ok(json) => {
            if let Err(e) = output::write_output(&json, args.output.as_deref()) {
                eprintln!("Error: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    if !args.quiet {
        match conversion.empirical_refresh_rate {
            Some(rate) => eprintln!(
                "Done: {} timestamps, empirical refresh rate {:.4} Hz",
                conversion.stimulus_timestamps.len(),
                rate
            ),
            None => eprintln!(
                "Done: {} timestamps (from cache)",
                conversion.stimulus_timestamps.len()
            ),
        }
    }

    exit_codes::SUCCESS
}
