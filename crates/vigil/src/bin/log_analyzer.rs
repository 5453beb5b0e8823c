//! # Log Analyzer
//!
//! Command-line tool to replay an exported session log and audit the
//! outcome.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::ExitCode;
use vigil::core::{replay, EntryKind, EventLog, ProctorConfig, ViolationChannel};
use vigil::SessionResult;

fn main() -> ExitCode {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         VIGIL LOG ANALYZER                                       ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        println!("Usage: log_analyzer <log.vgl>");
        println!();
        println!("Options:");
        println!("  --config <proctor.toml>  Replay against this policy");
        println!("  --verbose                List every entry");
        return ExitCode::FAILURE;
    }

    let log_path = &args[1];
    let verbose = args.iter().any(|a| a == "--verbose");
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1));

    match analyze(Path::new(log_path), config_path.map(Path::new), verbose) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn analyze(log_path: &Path, config_path: Option<&Path>, verbose: bool) -> SessionResult<()> {
    println!("Loading log: {}", log_path.display());
    let mut reader = BufReader::new(File::open(log_path)?);
    let log = EventLog::read(&mut reader)?;

    let config = match config_path {
        Some(path) => {
            println!("Policy from: {}", path.display());
            ProctorConfig::from_file(path)?
        }
        None => ProctorConfig::default(),
    };

    println!();
    println!("┌─ LOG INFO ─────────────────────────────────────────────────────┐");
    println!("│ Duration:           {} seconds", log.duration_secs());
    println!("│ Started at:         {} ms", log.start_ms());
    println!("│ Entries:            {}", log.len());
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    if verbose {
        println!("┌─ ENTRIES ──────────────────────────────────────────────────────┐");
        for (index, entry) in log.entries().iter().enumerate() {
            let what = match entry.kind {
                EntryKind::Violation(channel) => format!("violation  {channel}"),
                EntryKind::Submission(reason) => format!("submission {reason}"),
            };
            println!(
                "│ #{index:<4} t={:<14} remaining={:<6} {what}",
                entry.timestamp_ms, entry.session_time_remaining_seconds
            );
        }
        println!("└──────────────────────────────────────────────────────────────────┘");
        println!();
    }

    let exam_id = log_path
        .file_stem()
        .map_or_else(|| "unknown".to_owned(), |s| s.to_string_lossy().into_owned());
    let outcome = replay(&exam_id, &log, config.policy);

    println!("┌─ REPLAY RESULTS ───────────────────────────────────────────────┐");
    for channel in ViolationChannel::ALL {
        println!("│ {:<20} {}", channel.as_str(), outcome.count(channel));
    }
    println!("│");
    println!("│ Combined count:     {}", outcome.combined_count());
    println!("│ Late violations:    {}", outcome.late_violations());
    println!("│ Final status:       {:?}", outcome.status());
    match outcome.reason() {
        Some(reason) => println!("│ Reason:             {reason}"),
        None => println!("│ Reason:             (session still active)"),
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    if outcome.reason().is_some_and(|r| r.is_violation()) {
        println!("⚠ Session ended on a violation limit - manual review recommended");
    } else {
        println!("✓ No violation limit reached");
    }
    Ok(())
}
