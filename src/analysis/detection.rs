//! Heuristic issue detection over a packet batch.
//!
//! Each check looks at the whole batch on its own and emits at most one
//! [`Issue`]. Checks never consult each other's results, so a packet that
//! trips several heuristics is reported by each of them. Every call to
//! [`IssueDetector::analyze`] is a fresh pass; nothing is remembered between
//! batches.

use crate::analysis::config::{DETAIL_SAMPLE_LIMIT, DOMINANCE_MIN_PACKETS};
use crate::analysis::extract;
use crate::analysis::statistics::{effective_length, round_to};
use crate::analysis::types::{Issue, IssueKind, PacketRecord, Severity, Thresholds, UNKNOWN_PROTOCOL};
use serde_json::json;
use std::collections::HashMap;

/// Runs every heuristic with the default [`Thresholds`].
pub fn analyze(batch: &[PacketRecord]) -> Vec<Issue> {
    IssueDetector::default().analyze(batch)
}

/// Threshold-driven issue detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueDetector {
    thresholds: Thresholds,
}

impl IssueDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Analyses a batch and returns the findings in heuristic order.
    ///
    /// An empty batch, or one where nothing stands out, yields an empty list.
    pub fn analyze(&self, batch: &[PacketRecord]) -> Vec<Issue> {
        if batch.is_empty() {
            return Vec::new();
        }

        let t = &self.thresholds;
        [
            detect_small_packets(batch, t),
            detect_repeated_probe(batch, t),
            detect_oversized_packets(batch, t),
            detect_connection_resets(batch, t),
            detect_protocol_dominance(batch, t),
            detect_unknown_protocol(batch),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Protocols that normally carry application payload over TCP.
fn carries_payload(record: &PacketRecord) -> bool {
    matches!(
        record.protocol.to_ascii_uppercase().as_str(),
        "TCP" | "HTTP" | "HTTPS"
    )
}

fn sample_sequence_numbers<'a>(records: impl Iterator<Item = &'a PacketRecord>) -> Vec<u64> {
    records.map(|r| r.sequence_number).take(DETAIL_SAMPLE_LIMIT).collect()
}

// ── Small Payload Packets ─────────────────────────────────────────────────────

fn detect_small_packets(batch: &[PacketRecord], t: &Thresholds) -> Option<Issue> {
    let small: Vec<&PacketRecord> = batch
        .iter()
        .filter(|r| carries_payload(r) && effective_length(r) < t.small_packet_bytes)
        .collect();

    if small.is_empty() || small.len() < t.small_run {
        return None;
    }

    Some(Issue {
        kind: IssueKind::SmallPackets,
        severity: Severity::Medium,
        description: format!(
            "{} TCP packets smaller than {} bytes",
            small.len(),
            t.small_packet_bytes
        ),
        details: json!({
            "count": small.len(),
            "threshold_bytes": t.small_packet_bytes,
            "sequence_numbers": sample_sequence_numbers(small.iter().copied()),
        }),
        educational_note: "A TCP segment with IP and TCP headers but no data is about 54 bytes \
            on Ethernet. Lots of these can be normal handshakes and ACKs, but many of them \
            with no bulk transfer around them often point at connection probing or a \
            chatty application sending tiny writes."
            .to_string(),
    })
}

// ── Repeated Identical Probes ─────────────────────────────────────────────────

fn detect_repeated_probe(batch: &[PacketRecord], t: &Thresholds) -> Option<Issue> {
    // (protocol, effective length, summary) → sequence numbers, in first-seen order.
    let mut order: Vec<(&str, u64, &str)> = Vec::new();
    let mut groups: HashMap<(&str, u64, &str), Vec<u64>> = HashMap::new();

    for record in batch {
        let size = effective_length(record);
        if size >= t.small_packet_bytes {
            continue;
        }
        let key = (record.protocol_or_unknown(), size, record.summary.as_str());
        let seqs = groups.entry(key).or_default();
        if seqs.is_empty() {
            order.push(key);
        }
        seqs.push(record.sequence_number);
    }

    let repeated: Vec<(&str, u64, &str)> = order
        .into_iter()
        .filter(|key| groups[key].len() >= t.probe_repeat.max(2))
        .collect();

    // Largest group first; ties go to the one seen earliest.
    let worst = repeated
        .iter()
        .copied()
        .reduce(|best, key| if groups[&key].len() > groups[&best].len() { key } else { best })?;
    let (protocol, size, summary) = worst;
    let seqs = &groups[&worst];

    Some(Issue {
        kind: IssueKind::RepeatedProbe,
        severity: Severity::High,
        description: format!(
            "Identical {}-byte {} packet seen {} times",
            size,
            protocol,
            seqs.len()
        ),
        details: json!({
            "repetitions": seqs.len(),
            "protocol": protocol,
            "length": size,
            "summary": summary,
            "repeated_groups": repeated.len(),
            "sequence_numbers": seqs.iter().copied().take(DETAIL_SAMPLE_LIMIT).collect::<Vec<_>>(),
        }),
        educational_note: "Real conversations vary: sizes, flags and endpoints change as data \
            flows. The same tiny packet sent again and again is what scanners and \
            health-check probes look like, because they ask one short question and do not \
            care about the answer."
            .to_string(),
    })
}

// ── Oversized Frames ──────────────────────────────────────────────────────────

fn detect_oversized_packets(batch: &[PacketRecord], t: &Thresholds) -> Option<Issue> {
    let oversized: Vec<&PacketRecord> = batch
        .iter()
        .filter(|r| effective_length(r) > t.oversize_bytes)
        .collect();

    let largest = oversized.iter().map(|r| effective_length(r)).max()?;

    Some(Issue {
        kind: IssueKind::OversizedPackets,
        severity: Severity::Low,
        description: format!(
            "{} packets larger than {} bytes (largest {} bytes)",
            oversized.len(),
            t.oversize_bytes,
            largest
        ),
        details: json!({
            "count": oversized.len(),
            "threshold_bytes": t.oversize_bytes,
            "largest": largest,
            "sequence_numbers": sample_sequence_numbers(oversized.iter().copied()),
        }),
        educational_note: "A standard Ethernet frame carries at most 1500 bytes of payload. \
            Bigger packets usually mean jumbo frames, or that the capture happened before \
            the network card split large segments (TSO/GRO offload). They are rarely a \
            problem on their own but can hide fragmentation issues."
            .to_string(),
    })
}

// ── TCP Reset Bursts ──────────────────────────────────────────────────────────

fn detect_connection_resets(batch: &[PacketRecord], t: &Thresholds) -> Option<Issue> {
    let resets: Vec<&PacketRecord> = batch
        .iter()
        .filter(|r| carries_payload(r))
        .filter(|r| {
            extract::flag_codes(&r.summary)
                .iter()
                .any(|code| code == "R" || code == "RST")
        })
        .collect();

    if resets.is_empty() || resets.len() < t.reset_burst {
        return None;
    }

    Some(Issue {
        kind: IssueKind::ConnectionResets,
        severity: Severity::Medium,
        description: format!("{} TCP connections were reset", resets.len()),
        details: json!({
            "count": resets.len(),
            "threshold": t.reset_burst,
            "sequence_numbers": sample_sequence_numbers(resets.iter().copied()),
        }),
        educational_note: "A RST tells the other side to drop the connection immediately. A \
            closed port answers a SYN with a RST, so many resets in a short capture often \
            mean someone is knocking on ports that are not listening, or a firewall is \
            tearing connections down."
            .to_string(),
    })
}

// ── Protocol Dominance ────────────────────────────────────────────────────────

fn detect_protocol_dominance(batch: &[PacketRecord], t: &Thresholds) -> Option<Issue> {
    if batch.len() < DOMINANCE_MIN_PACKETS {
        return None;
    }

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in batch {
        let protocol = record.protocol_or_unknown();
        let count = counts.entry(protocol).or_insert(0);
        if *count == 0 {
            order.push(protocol);
        }
        *count += 1;
    }

    let top = order
        .into_iter()
        .reduce(|best, p| if counts[p] > counts[best] { p } else { best })?;
    let share = counts[top] as f64 / batch.len() as f64 * 100.0;
    if share < t.dominance_percent {
        return None;
    }

    Some(Issue {
        kind: IssueKind::ProtocolDominance,
        severity: Severity::Low,
        description: format!("{} makes up {:.1}% of the capture", top, share),
        details: json!({
            "protocol": top,
            "count": counts[top],
            "percentage": round_to(share, 1),
            "threshold_percent": t.dominance_percent,
        }),
        educational_note: "Everyday traffic is a mix of DNS lookups, TCP sessions and a few \
            control messages. When one protocol is almost everything, you are looking at a \
            single bulk transfer, a flood, or a capture filter that hides the rest."
            .to_string(),
    })
}

// ── Unclassified Traffic ──────────────────────────────────────────────────────

fn detect_unknown_protocol(batch: &[PacketRecord]) -> Option<Issue> {
    let unknown: Vec<&PacketRecord> = batch
        .iter()
        .filter(|r| r.protocol_or_unknown().eq_ignore_ascii_case(UNKNOWN_PROTOCOL))
        .collect();

    if unknown.is_empty() {
        return None;
    }

    Some(Issue {
        kind: IssueKind::UnknownProtocol,
        severity: Severity::Low,
        description: format!("{} packets could not be classified", unknown.len()),
        details: json!({
            "count": unknown.len(),
            "sequence_numbers": sample_sequence_numbers(unknown.iter().copied()),
        }),
        educational_note: "The capture tool names a protocol only when it recognises the \
            headers. Unclassified packets may be a less common protocol (ARP, STP, a vendor \
            discovery protocol) or something deliberately using non-standard framing."
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp(seq: u64, len: u64, summary: &str) -> PacketRecord {
        PacketRecord::new(seq, "TCP", summary).with_length(len)
    }

    fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_analyze_empty_batch() {
        assert!(analyze(&[]).is_empty());
    }

    #[test]
    fn test_normal_packets_raise_nothing() {
        let batch = [
            tcp(1, 100, "Normal TCP packet"),
            PacketRecord::new(2, "UDP", "Normal UDP packet").with_length(150),
        ];
        assert!(analyze(&batch).is_empty());
    }

    #[test]
    fn test_small_tcp_packets() {
        let batch = [tcp(1, 54, "Small TCP packet"), tcp(2, 55, "Another small TCP packet")];
        let issues = analyze(&batch);
        assert_eq!(kinds(&issues), vec![IssueKind::SmallPackets]);

        let issue = &issues[0];
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.details["count"], 2);
        assert_eq!(issue.details["sequence_numbers"], json!([1, 2]));
        assert!(!issue.educational_note.is_empty());
    }

    #[test]
    fn test_small_udp_is_not_payload_protocol() {
        let batch = [
            PacketRecord::new(1, "UDP", "a").with_length(40),
            PacketRecord::new(2, "UDP", "b").with_length(41),
        ];
        assert!(analyze(&batch).is_empty());
    }

    #[test]
    fn test_repeated_probe_and_small_packets_both_fire() {
        let probe = "TCP 10.0.0.66:40000 > 10.0.0.1:22 S";
        let batch: Vec<PacketRecord> = (1..=4).map(|n| tcp(n, 54, probe)).collect();
        let issues = analyze(&batch);
        assert_eq!(kinds(&issues), vec![IssueKind::SmallPackets, IssueKind::RepeatedProbe]);

        let probe_issue = &issues[1];
        assert_eq!(probe_issue.severity, Severity::High);
        assert_eq!(probe_issue.details["repetitions"], 4);
        assert_eq!(probe_issue.details["summary"], probe);
    }

    #[test]
    fn test_repeated_probe_picks_largest_group() {
        let mut batch = Vec::new();
        for n in 1..=3 {
            batch.push(PacketRecord::new(n, "ICMP", "ping a").with_length(42));
        }
        for n in 4..=7 {
            batch.push(PacketRecord::new(n, "ICMP", "ping b").with_length(42));
        }
        let issues = IssueDetector::default().analyze(&batch);
        let probe = issues.iter().find(|i| i.kind == IssueKind::RepeatedProbe).unwrap();
        assert_eq!(probe.details["summary"], "ping b");
        assert_eq!(probe.details["repeated_groups"], 2);
    }

    #[test]
    fn test_oversized_packets() {
        let batch = [
            PacketRecord::new(1, "UDP", "jumbo").with_length(9000),
            PacketRecord::new(2, "UDP", "normal").with_length(1500),
        ];
        let issues = analyze(&batch);
        assert_eq!(kinds(&issues), vec![IssueKind::OversizedPackets]);
        assert_eq!(issues[0].severity, Severity::Low);
        assert_eq!(issues[0].details["largest"], 9000);
    }

    #[test]
    fn test_connection_resets() {
        let batch = [
            tcp(1, 60, "TCP 10.0.0.1:80 > 10.0.0.2:4000 R"),
            tcp(2, 60, "TCP 10.0.0.1:81 > 10.0.0.2:4001 RA"),
            tcp(3, 60, "TCP 10.0.0.1:82 > 10.0.0.2:4002 RST"),
            tcp(4, 60, "TCP 10.0.0.1:83 > 10.0.0.2:4003 SA"),
        ];
        let issues = analyze(&batch);
        assert_eq!(kinds(&issues), vec![IssueKind::ConnectionResets]);
        assert_eq!(issues[0].details["count"], 3);
    }

    #[test]
    fn test_connection_resets_with_layer_suffix() {
        let batch: Vec<PacketRecord> = (1..=3)
            .map(|n| {
                tcp(n, 60, &format!("Ether / IP / TCP 10.0.0.1:500{} > 10.0.0.2:80 R / Raw", n))
            })
            .collect();
        let issues = analyze(&batch);
        assert!(kinds(&issues).contains(&IssueKind::ConnectionResets));
        let resets = issues.iter().find(|i| i.kind == IssueKind::ConnectionResets).unwrap();
        assert_eq!(resets.details["count"], 3);
    }

    #[test]
    fn test_protocol_dominance() {
        let batch: Vec<PacketRecord> = (1..=10)
            .map(|n| PacketRecord::new(n, "UDP", format!("stream {}", n)).with_length(512))
            .collect();
        let issues = analyze(&batch);
        assert_eq!(kinds(&issues), vec![IssueKind::ProtocolDominance]);
        assert_eq!(issues[0].details["percentage"], 100.0);
    }

    #[test]
    fn test_unknown_protocol() {
        let batch = [PacketRecord::new(1, "", "odd frame").with_length(300)];
        let issues = analyze(&batch);
        assert_eq!(kinds(&issues), vec![IssueKind::UnknownProtocol]);
    }

    #[test]
    fn test_custom_thresholds() {
        let batch = [tcp(1, 54, "x"), tcp(2, 54, "y")];
        let strict = IssueDetector::new(Thresholds { small_run: 3, ..Thresholds::default() });
        assert_eq!(strict.thresholds().small_run, 3);
        assert_eq!(strict.thresholds().reset_burst, Thresholds::default().reset_burst);
        assert!(strict.analyze(&batch).is_empty());
        assert_eq!(IssueDetector::default().thresholds().small_run, Thresholds::default().small_run);
    }

    #[test]
    fn test_issue_serializes_with_type_key() {
        let issues = analyze(&[tcp(1, 54, "a"), tcp(2, 54, "b")]);
        let value = serde_json::to_value(&issues[0]).unwrap();
        assert_eq!(value["type"], "small_packets");
        assert_eq!(value["severity"], "medium");
        for key in ["description", "details", "educational_note"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_repeated_calls_are_independent() {
        let detector = IssueDetector::default();
        let noisy = [tcp(1, 54, "a"), tcp(2, 54, "b")];
        assert_eq!(detector.analyze(&noisy).len(), 1);
        assert!(detector.analyze(&[tcp(3, 400, "c")]).is_empty());
    }
}
