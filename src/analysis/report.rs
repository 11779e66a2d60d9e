//! Plain-text rendering of computed results.
//!
//! Nothing here prints; every function returns a `String` so the CLI, a
//! log sink or a web handler can decide where it goes.

use crate::analysis::filter::FilterEngine;
use crate::analysis::types::{Issue, ProtocolAnalysis, StatisticsSnapshot};
use serde_json::Value;
use std::fmt::{self, Write};

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Runs a writer against a fresh `String`. Writing to a `String` never
/// fails, so the `fmt::Result` carries no information here.
fn render(write: impl FnOnce(&mut String) -> fmt::Result) -> String {
    let mut out = String::new();
    let _ = write(&mut out);
    out
}

/// Multi-section traffic overview.
pub fn format_statistics(stats: &StatisticsSnapshot) -> String {
    render(|out| write_statistics(out, stats))
}

/// Issue list, one block per finding.
pub fn format_issues(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "No network issues detected; all packets look normal.".to_string();
    }
    render(|out| write_issues(out, issues)).trim_end().to_string()
}

/// Layer-by-layer view of a single packet.
pub fn format_analysis(analysis: &ProtocolAnalysis) -> String {
    render(|out| write_analysis(out, analysis)).trim_end().to_string()
}

/// Active filters, numbered.
pub fn format_filters(engine: &FilterEngine) -> String {
    if engine.is_empty() {
        return "No active filters".to_string();
    }
    render(|out| write_filters(out, engine))
}

// ── Writers ──────────────────────────────────────────────────────────────────

fn write_statistics<W: Write>(out: &mut W, stats: &StatisticsSnapshot) -> fmt::Result {
    writeln!(out, "{}", rule())?;
    writeln!(out, "NETWORK TRAFFIC STATISTICS")?;
    writeln!(out, "{}", rule())?;

    writeln!(out, "\nCAPTURE OVERVIEW")?;
    writeln!(out, "  Total packets : {}", stats.total_packets)?;
    writeln!(out, "  Total data    : {} bytes", stats.total_bytes)?;
    writeln!(out, "  Duration      : {:.2} s", stats.capture_duration)?;
    writeln!(out, "  Traffic rate  : {:.1} packets/s", stats.traffic_rate)?;

    writeln!(out, "\nPROTOCOL DISTRIBUTION")?;
    if stats.protocol_distribution.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for (protocol, share) in &stats.protocol_distribution {
        writeln!(out, "  {:<10} {:>6} packets ({}%)", protocol, share.count, share.percentage)?;
    }

    let sizes = &stats.packet_size_distribution;
    writeln!(out, "\nPACKET SIZES")?;
    writeln!(out, "  Small  (<100 B)    : {}", sizes.small)?;
    writeln!(out, "  Medium (100 B-1 KB): {}", sizes.medium)?;
    writeln!(out, "  Large  (>=1 KB)    : {}", sizes.large)?;
    writeln!(out, "  Average size       : {:.1} bytes", sizes.average_size)?;
    writeln!(out, "  Size range         : {}-{} bytes", sizes.min_size, sizes.max_size)?;

    writeln!(out, "\nTOP CONVERSATIONS")?;
    if stats.top_conversations.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for (i, conv) in stats.top_conversations.iter().enumerate() {
        writeln!(out, "  {}. {} ({} packets)", i + 1, conv.conversation, conv.packets)?;
    }

    writeln!(out, "\nTRAFFIC TIMELINE")?;
    // First second wins on ties.
    let busiest = stats
        .traffic_timeline
        .iter()
        .fold(None, |best: Option<(&i64, &u64)>, (sec, count)| match best {
            Some((_, c)) if c >= count => best,
            _ => Some((sec, count)),
        });
    match busiest {
        Some((second, count)) => writeln!(out, "  Busiest second: {} packets at t={}", count, second)?,
        None => writeln!(out, "  No timeline data available")?,
    }
    write!(out, "{}", rule())
}

fn write_issues<W: Write>(out: &mut W, issues: &[Issue]) -> fmt::Result {
    writeln!(out, "NETWORK ISSUES DETECTED ({})", issues.len())?;
    for (i, issue) in issues.iter().enumerate() {
        writeln!(
            out,
            "\n{}. [{}] {}: {}",
            i + 1,
            issue.severity.to_string().to_uppercase(),
            issue.kind,
            issue.description
        )?;
        writeln!(out, "   Details : {}", issue.details)?;
        writeln!(out, "   Learn   : {}", issue.educational_note)?;
    }
    Ok(())
}

fn write_analysis<W: Write>(out: &mut W, analysis: &ProtocolAnalysis) -> fmt::Result {
    writeln!(out, "Packet #{} [{}]", analysis.sequence_number, analysis.protocol)?;
    if !analysis.summary.is_empty() {
        writeln!(out, "  {}", analysis.summary)?;
    }
    for (name, layer) in &analysis.layers {
        writeln!(out, "  {}:", name)?;
        for (field, value) in layer {
            writeln!(out, "    {:<16} {}", field, display_value(value))?;
        }
    }
    Ok(())
}

fn write_filters<W: Write>(out: &mut W, engine: &FilterEngine) -> fmt::Result {
    write!(out, "Active filters:")?;
    for (i, line) in engine.describe().iter().enumerate() {
        write!(out, "\n  {}. {}", i + 1, line)?;
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::PacketRecord;
    use crate::analysis::{detection, parser, statistics};

    #[test]
    fn test_format_statistics_sections() {
        let batch = [
            PacketRecord::new(1, "TCP", "10.0.0.1:1 > 10.0.0.2:80").with_length(100).with_timestamp(5.0),
            PacketRecord::new(2, "TCP", "10.0.0.1:1 > 10.0.0.2:80").with_length(200).with_timestamp(5.5),
        ];
        let text = format_statistics(&statistics::generate(&batch));
        assert!(text.contains("Total packets : 2"));
        assert!(text.contains("TCP"));
        assert!(text.contains("1. 10.0.0.1:1 → 10.0.0.2:80 (2 packets)"));
        assert!(text.contains("Busiest second: 2 packets at t=5"));
    }

    #[test]
    fn test_format_empty_statistics() {
        let text = format_statistics(&StatisticsSnapshot::default());
        assert!(text.contains("Total packets : 0"));
        assert!(text.contains("No timeline data available"));
    }

    #[test]
    fn test_format_issues() {
        assert!(format_issues(&[]).starts_with("No network issues"));

        let batch = [
            PacketRecord::new(1, "TCP", "a").with_length(54),
            PacketRecord::new(2, "TCP", "b").with_length(54),
        ];
        let text = format_issues(&detection::analyze(&batch));
        assert!(text.contains("[MEDIUM] small_packets"));
        assert!(text.contains("Learn"));
    }

    #[test]
    fn test_format_analysis_lists_layers() {
        let record = PacketRecord::new(3, "TCP", "TCP 1.1.1.1:1 > 2.2.2.2:2 SA");
        let text = format_analysis(&parser::parse(&record));
        assert!(text.starts_with("Packet #3 [TCP]"));
        assert!(text.contains("simulated:"));
        assert!(text.contains("SYN, ACK"));
    }

    #[test]
    fn test_format_issues_layout() {
        let batch = [
            PacketRecord::new(1, "TCP", "a").with_length(54),
            PacketRecord::new(2, "TCP", "b").with_length(54),
        ];
        let issues = detection::analyze(&batch);
        let text = format_issues(&issues);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("NETWORK ISSUES DETECTED ({})", issues.len()));
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("1. [MEDIUM] small_packets: "));
        assert!(lines[3].starts_with("   Details : {"));
        assert!(lines[4].starts_with("   Learn   : "));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_statistics_framed_by_rules() {
        let text = format_statistics(&StatisticsSnapshot::default());
        assert!(text.starts_with(&format!("{}\nNETWORK TRAFFIC STATISTICS\n{}\n", rule(), rule())));
        assert!(text.ends_with(&format!("available\n{}", rule())));
        assert!(text.contains("PROTOCOL DISTRIBUTION\n  (none)"));
    }

    #[test]
    fn test_format_filters() {
        let mut engine = FilterEngine::new();
        assert_eq!(format_filters(&engine), "No active filters");
        engine.add_protocol_filter("udp");
        assert_eq!(format_filters(&engine), "Active filters:\n  1. Protocol: UDP");
    }
}
