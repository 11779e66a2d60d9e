use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Treats an explicit JSON `null` the same as a missing field.
///
/// Capture sources emit `"length": null` or `"timestamp": null` when a value
/// is unknown; those records must still load with the documented defaults.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// One unit of captured or simulated traffic metadata.
///
/// Every field has a documented default so that partially populated records
/// coming from the capture source or from disk are usable without per-site
/// fallbacks. Records are never mutated by the analysis components; each
/// component produces a new derived structure.
///
/// The JSON names follow the capture source's wire format (`number`,
/// `src_ip`, `dst_ip`, `real_packet`). The descriptive names are accepted as
/// aliases when reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketRecord {
    /// Position assigned at capture time. Unique within a batch, not
    /// necessarily contiguous. `0` only for an empty record.
    #[serde(rename = "number", alias = "sequence_number", deserialize_with = "null_as_default")]
    pub sequence_number: u64,

    /// Capture time in seconds (epoch or capture-relative). `0.0` when unknown.
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: f64,

    /// Short uppercase protocol token (`TCP`, `UDP`, `DNS`, ...). Empty when
    /// the capture source did not classify the packet.
    #[serde(deserialize_with = "null_as_default")]
    pub protocol: String,

    /// Free-text one-line description. May be the only place endpoints and
    /// flags appear.
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,

    /// Byte count on the wire. `0` means unknown and is estimated downstream.
    #[serde(deserialize_with = "null_as_default")]
    pub length: u64,

    #[serde(rename = "src_ip", alias = "source_address", skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,

    #[serde(rename = "dst_ip", alias = "destination_address", skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,

    /// `true` for packets taken off a real interface, `false` for synthetic
    /// ones. Carried through untouched by the analysis components.
    #[serde(rename = "real_packet", alias = "is_real", deserialize_with = "null_as_default")]
    pub is_real: bool,
}

impl PacketRecord {
    pub fn new(sequence_number: u64, protocol: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            sequence_number,
            protocol: protocol.into(),
            summary: summary.into(),
            ..Self::default()
        }
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = length;
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_addresses(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.source_address = Some(source.into());
        self.destination_address = Some(destination.into());
        self
    }

    pub fn captured(mut self) -> Self {
        self.is_real = true;
        self
    }

    /// Protocol token, or `"Unknown"` when the capture source left it blank.
    pub fn protocol_or_unknown(&self) -> &str {
        if self.protocol.trim().is_empty() {
            UNKNOWN_PROTOCOL
        } else {
            &self.protocol
        }
    }

    /// `true` when no field carries any information at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Structured source address, ignoring empty strings.
    pub fn source(&self) -> Option<&str> {
        self.source_address.as_deref().filter(|s| !s.is_empty())
    }

    /// Structured destination address, ignoring empty strings.
    pub fn destination(&self) -> Option<&str> {
        self.destination_address.as_deref().filter(|s| !s.is_empty())
    }
}

pub const UNKNOWN_PROTOCOL: &str = "Unknown";

/// Decoded fields of one layer, keyed by field name.
pub type Layer = BTreeMap<String, Value>;

/// Per-packet protocol breakdown produced by [`crate::analysis::parser::parse`].
///
/// Always well formed: when the input record carries no data the layer map
/// holds a single `"error"` layer instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolAnalysis {
    #[serde(rename = "packet_number")]
    pub sequence_number: u64,
    pub protocol: String,
    pub summary: String,
    pub layers: BTreeMap<String, Layer>,
}

/// Count and share of one protocol within a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolShare {
    pub count: u64,
    /// Percentage of the batch, one decimal place.
    pub percentage: f64,
}

/// Packet size buckets over effective (measured or estimated) lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeDistribution {
    /// Packets under 100 bytes.
    pub small: u64,
    /// Packets in `[100, 1000)` bytes.
    pub medium: u64,
    /// Packets of 1000 bytes or more.
    pub large: u64,
    pub average_size: f64,
    pub min_size: u64,
    pub max_size: u64,
}

/// One source→destination pair and how often it appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation: String,
    pub packets: u64,
}

/// Aggregate metrics computed fresh from a single batch.
///
/// `Default` is the canonical empty snapshot returned for an empty batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_packets: u64,
    /// Measured bytes plus estimates for zero-length records.
    pub total_bytes: u64,
    /// Seconds between first and last timestamped packet (see the
    /// statistics module for the small-batch rules).
    pub capture_duration: f64,
    /// Packets per second, two decimal places.
    pub traffic_rate: f64,
    pub protocol_distribution: BTreeMap<String, ProtocolShare>,
    pub packet_size_distribution: SizeDistribution,
    pub average_packet_size: f64,
    /// Whole second → packet count. Seconds without traffic are absent.
    pub traffic_timeline: BTreeMap<i64, u64>,
    pub top_conversations: Vec<Conversation>,
}

/// Severity tier of a detected [`Issue`], ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

/// Category tag of a detected [`Issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Many tiny packets on a protocol that normally carries payload.
    SmallPackets,
    /// The same small packet sent over and over, typical of scans and probes.
    RepeatedProbe,
    /// Packets larger than a standard Ethernet frame.
    OversizedPackets,
    /// A burst of TCP resets.
    ConnectionResets,
    /// A single protocol accounts for nearly all traffic.
    ProtocolDominance,
    /// Traffic the capture source could not classify.
    UnknownProtocol,
}

impl IssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::SmallPackets => "small_packets",
            IssueKind::RepeatedProbe => "repeated_probe",
            IssueKind::OversizedPackets => "oversized_packets",
            IssueKind::ConnectionResets => "connection_resets",
            IssueKind::ProtocolDominance => "protocol_dominance",
            IssueKind::UnknownProtocol => "unknown_protocol",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single heuristic finding with a learner-oriented explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
    /// Structured context (counts, offending sequence numbers, ...).
    pub details: Value,
    pub educational_note: String,
}

/// Tunable thresholds for the issue detector.
///
/// Defaults live in [`crate::analysis::config`]; the CLI overrides them per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// TCP/HTTP packets below this many bytes count as "small".
    pub small_packet_bytes: u64,
    /// Minimum number of small payload-protocol packets to report.
    pub small_run: usize,
    /// Minimum repetitions of an identical small packet to report a probe.
    pub probe_repeat: usize,
    /// Packets above this many bytes are oversized.
    pub oversize_bytes: u64,
    /// Minimum number of TCP resets to report.
    pub reset_burst: usize,
    /// Share (percent) at which one protocol is considered dominant.
    pub dominance_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_from_sparse_json() {
        let record: PacketRecord = serde_json::from_str(r#"{"number": 4}"#).unwrap();
        assert_eq!(record.sequence_number, 4);
        assert_eq!(record.timestamp, 0.0);
        assert_eq!(record.length, 0);
        assert_eq!(record.protocol_or_unknown(), UNKNOWN_PROTOCOL);
        assert_eq!(record.source(), None);
        assert!(!record.is_real);
    }

    #[test]
    fn test_record_serializes_wire_names() {
        let record = PacketRecord::new(1, "UDP", "u")
            .with_addresses("10.0.0.1", "")
            .captured();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["number"], 1);
        assert_eq!(value["src_ip"], "10.0.0.1");
        assert_eq!(value["real_packet"], true);
        assert!(value.get("sequence_number").is_none());
        assert_eq!(record.destination(), None);
    }

    #[test]
    fn test_empty_record() {
        assert!(PacketRecord::default().is_empty());
        assert!(!PacketRecord::new(1, "", "").is_empty());
    }

    #[test]
    fn test_severity_order_and_names() {
        assert!(Severity::Low < Severity::Medium && Severity::Medium < Severity::High);
        assert_eq!(serde_json::to_value(Severity::High).unwrap(), "high");
        assert_eq!(
            serde_json::to_value(IssueKind::ConnectionResets).unwrap(),
            IssueKind::ConnectionResets.label()
        );
    }
}
