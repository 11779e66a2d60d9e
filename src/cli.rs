use clap::{Args, Parser, Subcommand};

/// pktlens: protocol analysis, traffic statistics and issue detection for
/// packet captures.
///
/// Works on batches of per-packet metadata records, either generated by the
/// built-in simulator or loaded from JSON capture files.
#[derive(Parser, Debug, Clone)]
#[command(
    name    = "pktlens",
    version,
    about   = "Educational packet analysis: protocol layers, traffic statistics and issue detection",
    long_about = None,
)]
pub struct Cli {
    // ── Logging ──────────────────────────────────────────────────────────────

    /// Write log output to this file in addition to stderr.
    ///
    /// The file is created if it does not exist and appended to if it does.
    /// JSON mode (--json) affects the format written to this file as well.
    #[arg(short = 'o', long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<String>,

    /// Emit log entries and reports as JSON.
    ///
    /// Log events become newline-delimited JSON on stderr; the report on
    /// stdout becomes a single JSON document.
    #[arg(short = 'j', long = "json", global = true)]
    pub json: bool,

    // ── Storage ──────────────────────────────────────────────────────────────

    /// Directory holding saved capture files.
    #[arg(short = 'd', long = "storage-dir", value_name = "DIR", default_value = "captures", global = true)]
    pub storage_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a synthetic capture, analyse it, and optionally save it.
    Simulate {
        /// Number of packets to generate.
        #[arg(short = 'c', long = "count", value_name = "N", default_value_t = 20)]
        count: usize,

        /// Seed for the packet generator; the same seed yields the same batch.
        #[arg(long = "seed", value_name = "SEED", default_value_t = pktlens::capture::DEFAULT_SEED)]
        seed: u64,

        /// Save the generated batch under this name in the storage directory.
        #[arg(short = 's', long = "save", value_name = "NAME")]
        save: Option<String>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Analyse a saved capture.
    Analyze {
        /// Capture file name inside the storage directory.
        #[arg(value_name = "NAME")]
        file: String,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// List saved captures.
    List,

    /// Delete a saved capture.
    Delete {
        #[arg(value_name = "NAME")]
        file: String,
    },
}

/// Filter, threshold and output options shared by the analysing subcommands.
#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    // ── Filters ──────────────────────────────────────────────────────────────

    /// Keep only these protocols (repeatable; any of them matches).
    #[arg(short = 'p', long = "protocol", value_name = "PROTO")]
    pub protocols: Vec<String>,

    /// Keep only packets from this source address.
    #[arg(long = "src-ip", value_name = "IP")]
    pub src_ip: Option<String>,

    /// Keep only packets to this destination address.
    #[arg(long = "dst-ip", value_name = "IP")]
    pub dst_ip: Option<String>,

    /// Keep only packets with this port on either side.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Keep only packets from this source port.
    #[arg(long = "src-port", value_name = "PORT")]
    pub src_port: Option<u16>,

    /// Keep only packets to this destination port.
    #[arg(long = "dst-port", value_name = "PORT")]
    pub dst_port: Option<u16>,

    // ── Output ───────────────────────────────────────────────────────────────

    /// Print the layer breakdown of every packet, not just the summary report.
    #[arg(short = 'v', long = "packets")]
    pub show_packets: bool,

    // ── Detection Thresholds (overrides config.rs defaults) ──────────────────

    /// TCP/HTTP packets below this many bytes count as small.
    #[arg(long = "small-packet-bytes", value_name = "BYTES", default_value_t = 60)]
    pub small_packet_bytes: u64,

    /// Minimum number of small TCP/HTTP packets before a SMALL PACKETS issue.
    #[arg(long = "small-run", value_name = "N", default_value_t = 2)]
    pub small_run: usize,

    /// Repetitions of an identical small packet before a REPEATED PROBE issue.
    #[arg(long = "probe-repeat", value_name = "N", default_value_t = 3)]
    pub probe_repeat: usize,

    /// Packets above this many bytes are reported as oversized.
    #[arg(long = "oversize-bytes", value_name = "BYTES", default_value_t = 1514)]
    pub oversize_bytes: u64,

    /// TCP resets in one batch before a CONNECTION RESETS issue.
    #[arg(long = "reset-burst", value_name = "N", default_value_t = 3)]
    pub reset_burst: usize,

    /// Share (percent) of one protocol before a PROTOCOL DOMINANCE issue.
    #[arg(long = "dominance-percent", value_name = "PCT", default_value_t = 90.0)]
    pub dominance_percent: f64,
}
