//! Packet analysis pipeline.
//!
//! The four stages live in their own modules and are pure functions of the
//! batch they are given:
//!
//! - [`parser`] expands one record into per-layer fields.
//! - [`filter`] narrows a batch with composable predicates.
//! - [`statistics`] aggregates a batch into a snapshot.
//! - [`detection`] runs independent heuristics and reports issues.
//!
//! [`run`] strings them together for one batch and is the only place in this
//! module tree that logs.

pub mod config;
pub mod detection;
pub mod extract;
pub mod filter;
pub mod parser;
pub mod report;
pub mod statistics;
pub mod types;

use crate::analysis::detection::IssueDetector;
use crate::analysis::filter::FilterEngine;
use crate::analysis::types::*;
use crate::logger::{Event, Logger, SharedLogger};

use serde::Serialize;
use std::time::Instant;

/// Configuration bundle passed from `main` into the pipeline.
pub struct AnalysisOptions {
    /// Filters applied before any other stage. An empty engine keeps
    /// every record.
    pub filters:    FilterEngine,
    /// Detector tuning from CLI args.
    pub thresholds: Thresholds,
    /// Shared structured logger.
    pub logger:     SharedLogger,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            filters:    FilterEngine::new(),
            thresholds: Thresholds::default(),
            logger:     Logger::silent().shared(),
        }
    }
}

/// Everything computed for one batch.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// The records that survived the filter stage, in input order.
    pub packets:    Vec<PacketRecord>,
    pub analyses:   Vec<ProtocolAnalysis>,
    pub statistics: StatisticsSnapshot,
    pub issues:     Vec<Issue>,
}

/// Runs filter, parser, statistics and detector over `batch`.
///
/// Statistics and issues are computed over the filtered batch, so a
/// protocol filter scopes the whole report.
pub fn run(batch: &[PacketRecord], opts: &AnalysisOptions) -> AnalysisReport {
    let started = Instant::now();

    let packets = if opts.filters.is_empty() {
        batch.to_vec()
    } else {
        let kept = opts.filters.apply(batch);
        opts.logger.log(&Event::FiltersApplied {
            before:  batch.len(),
            after:   kept.len(),
            filters: opts.filters.len(),
        });
        kept
    };

    let analyses: Vec<ProtocolAnalysis> = packets.iter().map(parser::parse).collect();
    let statistics = statistics::generate(&packets);
    let issues = IssueDetector::new(opts.thresholds).analyze(&packets);

    for issue in &issues {
        opts.logger.log(&Event::IssueDetected {
            kind:        issue.kind.label(),
            severity:    &issue.severity.to_string(),
            description: &issue.description,
        });
    }

    opts.logger.log(&Event::AnalysisSummary {
        packets_in:  batch.len(),
        packets_out: packets.len(),
        total_bytes: statistics.total_bytes,
        issues:      issues.len(),
        elapsed_ms:  started.elapsed().as_millis(),
    });

    AnalysisReport { packets, analyses, statistics, issues }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Vec<PacketRecord> {
        vec![
            PacketRecord::new(1, "TCP", "TCP 10.0.0.1:4000 > 10.0.0.2:80 S").with_length(54).with_timestamp(10.0),
            PacketRecord::new(2, "UDP", "UDP 10.0.0.3:53 > 10.0.0.1:5000").with_length(120).with_timestamp(10.5),
            PacketRecord::new(3, "TCP", "TCP 10.0.0.1:4000 > 10.0.0.2:80 A").with_length(54).with_timestamp(11.0),
        ]
    }

    #[test]
    fn test_run_without_filters_keeps_everything() {
        let report = run(&batch(), &AnalysisOptions::default());
        assert_eq!(report.packets, batch());
        assert_eq!(report.analyses.len(), 3);
        assert_eq!(report.statistics.total_packets, 3);
        assert_eq!(report.statistics.total_bytes, 228);
    }

    #[test]
    fn test_run_scopes_report_to_filtered_batch() {
        let mut opts = AnalysisOptions::default();
        opts.filters.add_protocol_filter("udp");
        let report = run(&batch(), &opts);
        assert_eq!(report.packets.len(), 1);
        assert_eq!(report.analyses[0].sequence_number, 2);
        assert_eq!(report.statistics.total_packets, 1);
        assert!(report.issues.iter().all(|i| i.kind != IssueKind::SmallPackets));
    }

    #[test]
    fn test_run_reports_issues_with_default_thresholds() {
        let report = run(&batch(), &AnalysisOptions::default());
        assert!(report.issues.iter().any(|i| i.kind == IssueKind::SmallPackets));
    }

    #[test]
    fn test_report_serializes() {
        let report = run(&batch(), &AnalysisOptions::default());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["statistics"]["total_packets"], 3);
        assert_eq!(value["analyses"][0]["packet_number"], 1);
        assert_eq!(value["packets"][1]["src_ip"], serde_json::Value::Null);
    }

    #[test]
    fn test_empty_batch() {
        let report = run(&[], &AnalysisOptions::default());
        assert!(report.packets.is_empty());
        assert!(report.issues.is_empty());
        assert_eq!(report.statistics.total_packets, 0);
    }
}
