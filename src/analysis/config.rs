use crate::analysis::types::Thresholds;

/// Packets strictly below this many bytes fall in the "small" bucket.
pub const SMALL_PACKET_LIMIT: u64 = 100;

/// Packets at or above this many bytes fall in the "large" bucket.
/// Everything in between is "medium".
pub const LARGE_PACKET_LIMIT: u64 = 1000;

/// Size assumed for a zero-length record whose protocol is not in
/// [`PROTOCOL_SIZE_ESTIMATES`] and whose summary carries no `len=` hint.
pub const FALLBACK_PACKET_SIZE: u64 = 256;

/// Typical on-the-wire size per protocol, used to estimate unknown lengths.
///
/// Keys are lowercase; lookups lowercase the record's protocol first.
pub const PROTOCOL_SIZE_ESTIMATES: &[(&str, u64)] = &[
    ("tcp", 1500),
    ("udp", 512),
    ("dns", 128),
    ("http", 1400),
    ("icmp", 84),
    ("icmpv6", 84),
    ("ip", 576),
    ("ipv6", 1280),
];

/// Number of conversations reported in a statistics snapshot.
pub const TOP_CONVERSATIONS: usize = 5;

/// Duration used when fewer than two packets carry a usable timestamp, so the
/// traffic rate degrades to the packet count.
pub const NOMINAL_DURATION: f64 = 1.0;

/// Floor for a measured capture duration; keeps the rate finite when every
/// timestamp is identical.
pub const MIN_DURATION: f64 = 0.1;

/// Smallest batch on which protocol dominance is meaningful.
pub const DOMINANCE_MIN_PACKETS: usize = 10;

/// Maximum number of sequence numbers listed in an issue's details.
pub const DETAIL_SAMPLE_LIMIT: usize = 20;

/// Largest standard Ethernet frame without FCS.
pub const ETHERNET_MAX_FRAME: u64 = 1514;

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            small_packet_bytes: 60,
            small_run: 2,
            probe_repeat: 3,
            oversize_bytes: ETHERNET_MAX_FRAME,
            reset_burst: 3,
            dominance_percent: 90.0,
        }
    }
}
