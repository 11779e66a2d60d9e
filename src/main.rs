mod cli;

use clap::Parser;
use cli::{AnalysisArgs, Cli, Command};
use pktlens::analysis::report;
use pktlens::analysis::{self, AnalysisOptions, AnalysisReport};
use pktlens::capture::SimulatedCapture;
use pktlens::error::{PktlensError, Result};
use pktlens::logger::{Event, Logger, SharedLogger};
use pktlens::storage::{CaptureInfo, CaptureStore};
use pktlens::{FilterEngine, PacketRecord, Thresholds};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger with optional JSON output and file logging
    let logger = match Logger::new(cli.json, cli.log_file.as_deref()) {
        Ok(l) => l.shared(),
        Err(e) => {
            eprintln!("pktlens: cannot open log file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.log(&Event::Info { message: &format!("Error: {}", e) });
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, logger: &SharedLogger) -> Result<()> {
    let store = CaptureStore::new(&cli.storage_dir, Arc::clone(logger))?;

    match &cli.command {
        // ── Simulated capture ─────────────────────────────────────────────────
        Command::Simulate { count, seed, save, analysis } => {
            let mut source = SimulatedCapture::new(*seed);
            let packets = source.capture(*count);
            logger.log(&Event::CaptureSimulated { packets: packets.len(), seed: source.seed() });

            if let Some(name) = save {
                store.try_save(&packets, name)?;
                logger.log(&Event::CaptureSaved { file: name, packets: packets.len() });
            }

            analyse_and_print(cli, &packets, analysis, logger)
        }

        // ── Saved capture ─────────────────────────────────────────────────────
        Command::Analyze { file, analysis } => {
            let packets = store.try_load(file)?;
            logger.log(&Event::CaptureLoaded { file, packets: packets.len() });
            analyse_and_print(cli, &packets, analysis, logger)
        }

        Command::List => {
            print_captures(cli.json, &store.list_captures())
        }

        Command::Delete { file } => {
            store.try_delete(file)?;
            logger.log(&Event::CaptureDeleted { file });
            Ok(())
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn analyse_and_print(
    cli:     &Cli,
    packets: &[PacketRecord],
    args:    &AnalysisArgs,
    logger:  &SharedLogger,
) -> Result<()> {
    let opts = AnalysisOptions {
        filters:    build_filters(args),
        thresholds: build_thresholds(args)?,
        logger:     Arc::clone(logger),
    };

    let result = analysis::run(packets, &opts);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&opts.filters, &result, args.show_packets);
    }
    Ok(())
}

/// Builds the filter engine from command-line arguments
fn build_filters(args: &AnalysisArgs) -> FilterEngine {
    let mut engine = FilterEngine::new();
    for protocol in &args.protocols {
        engine.add_protocol_filter(protocol);
    }
    if args.src_ip.is_some() || args.dst_ip.is_some() {
        engine.add_address_filter(args.src_ip.as_deref(), args.dst_ip.as_deref());
    }
    if args.port.is_some() || args.src_port.is_some() || args.dst_port.is_some() {
        engine.add_port_filter(args.port, args.src_port, args.dst_port);
    }
    engine
}

/// Builds threshold configuration from command-line arguments
fn build_thresholds(args: &AnalysisArgs) -> Result<Thresholds> {
    if !(0.0..=100.0).contains(&args.dominance_percent) {
        return Err(PktlensError::Config(format!(
            "--dominance-percent must be between 0 and 100, got {}",
            args.dominance_percent
        )));
    }
    Ok(Thresholds {
        small_packet_bytes: args.small_packet_bytes,
        small_run:          args.small_run,
        probe_repeat:       args.probe_repeat,
        oversize_bytes:     args.oversize_bytes,
        reset_burst:        args.reset_burst,
        dominance_percent:  args.dominance_percent,
    })
}

fn print_report(filters: &FilterEngine, result: &AnalysisReport, show_packets: bool) {
    println!("{}\n", report::format_filters(filters));

    if show_packets {
        for analysis in &result.analyses {
            println!("{}\n", report::format_analysis(analysis));
        }
    }

    println!("{}\n", report::format_statistics(&result.statistics));
    println!("{}", report::format_issues(&result.issues));
}

/// Prints saved captures in tabular format with columns for name, packets, size, and modification time
fn print_captures(json: bool, captures: &[CaptureInfo]) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(captures)?);
        return Ok(());
    }

    if captures.is_empty() {
        println!("No saved captures.");
        return Ok(());
    }

    println!("{:<32} {:>8} {:>10}  {:<25}", "Name", "Packets", "Bytes", "Modified");
    println!("{}", "-".repeat(80));
    for c in captures {
        let packets = c.packet_count.map_or_else(|| "?".to_string(), |n| n.to_string());
        println!(
            "{:<32} {:>8} {:>10}  {:<25}",
            c.filename,
            packets,
            c.size_bytes,
            c.modified.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
