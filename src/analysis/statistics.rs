//! Batch traffic statistics.
//!
//! [`generate`] folds one batch into a [`StatisticsSnapshot`]. Every call
//! starts from scratch; nothing is carried between batches.
//!
//! Rounding is half away from zero: rates and averages to two decimal
//! places, protocol percentages to one.

use crate::analysis::config::*;
use crate::analysis::extract;
use crate::analysis::types::{
    Conversation, PacketRecord, ProtocolShare, SizeDistribution, StatisticsSnapshot,
};
use std::collections::{BTreeMap, HashMap};

/// Computes aggregate metrics for a batch.
///
/// An empty batch yields [`StatisticsSnapshot::default`].
pub fn generate(batch: &[PacketRecord]) -> StatisticsSnapshot {
    if batch.is_empty() {
        return StatisticsSnapshot::default();
    }

    let sizes: Vec<u64> = batch.iter().map(effective_length).collect();
    let total_packets = batch.len() as u64;
    let total_bytes = byte_total(&sizes);
    let duration = capture_duration(batch);

    let rate = if duration > 0.0 {
        total_packets as f64 / duration
    } else {
        total_packets as f64
    };

    StatisticsSnapshot {
        total_packets,
        total_bytes,
        capture_duration: duration,
        traffic_rate: round_to(rate, 2),
        protocol_distribution: protocol_distribution(batch),
        packet_size_distribution: size_distribution(&sizes),
        average_packet_size: round_to(total_bytes as f64 / total_packets as f64, 2),
        traffic_timeline: traffic_timeline(batch),
        top_conversations: top_conversations(batch),
    }
}

/// Length used for byte accounting: the measured length, or an estimate
/// when the record reports `0`.
pub fn effective_length(record: &PacketRecord) -> u64 {
    if record.length > 0 {
        record.length
    } else {
        estimate_length(record)
    }
}

/// Estimates a packet's size: a `len=` hint in the summary, then the
/// per-protocol table, then [`FALLBACK_PACKET_SIZE`].
pub fn estimate_length(record: &PacketRecord) -> u64 {
    if let Some(len) = extract::length_hint(&record.summary) {
        return len;
    }

    let protocol = record.protocol.to_ascii_lowercase();
    PROTOCOL_SIZE_ESTIMATES
        .iter()
        .find(|(name, _)| *name == protocol)
        .map(|(_, size)| *size)
        .unwrap_or(FALLBACK_PACKET_SIZE)
}

/// Sum of packet sizes, clamped at `u64::MAX`. A `len=` hint is free text
/// and can be arbitrarily large.
fn byte_total(sizes: &[u64]) -> u64 {
    sizes.iter().fold(0u64, |acc, size| acc.saturating_add(*size))
}

/// Rounds half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Capture duration in seconds.
///
/// - a single-packet batch has no observable elapsed time: `0.0`;
/// - fewer than two positive timestamps: [`NOMINAL_DURATION`];
/// - otherwise the timestamp span, floored at [`MIN_DURATION`].
fn capture_duration(batch: &[PacketRecord]) -> f64 {
    if batch.len() == 1 {
        return 0.0;
    }

    let stamps: Vec<f64> = batch
        .iter()
        .map(|r| r.timestamp)
        .filter(|t| *t > 0.0)
        .collect();

    if stamps.len() < 2 {
        return NOMINAL_DURATION;
    }

    let first = stamps.iter().copied().fold(f64::INFINITY, f64::min);
    let last = stamps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (last - first).max(MIN_DURATION)
}

fn protocol_distribution(batch: &[PacketRecord]) -> BTreeMap<String, ProtocolShare> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for record in batch {
        *counts.entry(record.protocol_or_unknown().to_string()).or_insert(0) += 1;
    }

    let total = batch.len() as f64;
    counts
        .into_iter()
        .map(|(protocol, count)| {
            let share = ProtocolShare {
                count,
                percentage: round_to(count as f64 / total * 100.0, 1),
            };
            (protocol, share)
        })
        .collect()
}

fn size_distribution(sizes: &[u64]) -> SizeDistribution {
    if sizes.is_empty() {
        return SizeDistribution::default();
    }

    let mut dist = SizeDistribution {
        min_size: u64::MAX,
        ..SizeDistribution::default()
    };
    for &size in sizes {
        if size < SMALL_PACKET_LIMIT {
            dist.small += 1;
        } else if size < LARGE_PACKET_LIMIT {
            dist.medium += 1;
        } else {
            dist.large += 1;
        }
        dist.min_size = dist.min_size.min(size);
        dist.max_size = dist.max_size.max(size);
    }

    dist.average_size = round_to(byte_total(sizes) as f64 / sizes.len() as f64, 2);
    dist
}

/// Packets per whole second. Records without a timestamp land in second 0.
fn traffic_timeline(batch: &[PacketRecord]) -> BTreeMap<i64, u64> {
    let mut timeline = BTreeMap::new();
    for record in batch {
        *timeline.entry(record.timestamp.floor() as i64).or_insert(0) += 1;
    }
    timeline
}

/// Most frequent conversations, highest count first. Ties keep the order in
/// which the conversations were first seen.
fn top_conversations(batch: &[PacketRecord]) -> Vec<Conversation> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();

    for label in batch.iter().filter_map(|r| extract::conversation(&r.summary)) {
        let count = counts.entry(label.clone()).or_insert(0);
        if *count == 0 {
            order.push(label);
        }
        *count += 1;
    }

    let mut ranked: Vec<Conversation> = order
        .into_iter()
        .map(|label| {
            let packets = counts[&label];
            Conversation { conversation: label, packets }
        })
        .collect();
    // Stable sort preserves first-seen order among equal counts.
    ranked.sort_by(|a, b| b.packets.cmp(&a.packets));
    ranked.truncate(TOP_CONVERSATIONS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packets() -> Vec<PacketRecord> {
        vec![
            PacketRecord::new(1, "TCP", "TCP packet 1").with_length(100).with_timestamp(1000.0),
            PacketRecord::new(2, "UDP", "UDP packet 1").with_length(50).with_timestamp(1001.0),
            PacketRecord::new(3, "TCP", "TCP packet 2").with_length(150).with_timestamp(1002.0),
            PacketRecord::new(4, "ICMP", "ICMP packet 1").with_length(80).with_timestamp(1003.0),
            PacketRecord::new(5, "TCP", "TCP packet 3").with_length(200).with_timestamp(1004.0),
        ]
    }

    #[test]
    fn test_generate_statistics() {
        let stats = generate(&sample_packets());

        assert_eq!(stats.total_packets, 5);
        assert_eq!(stats.total_bytes, 580);
        assert_eq!(stats.capture_duration, 4.0);
        assert_eq!(stats.traffic_rate, 1.25);
        assert_eq!(stats.average_packet_size, 116.0);

        let tcp = stats.protocol_distribution["TCP"];
        assert_eq!(tcp.count, 3);
        assert_eq!(tcp.percentage, 60.0);
        assert_eq!(stats.protocol_distribution["UDP"].percentage, 20.0);
        assert_eq!(stats.protocol_distribution["ICMP"].count, 1);

        let sizes = stats.packet_size_distribution;
        assert_eq!((sizes.small, sizes.medium, sizes.large), (2, 3, 0));
        assert_eq!(sizes.average_size, 116.0);
        assert_eq!(sizes.min_size, 50);
        assert_eq!(sizes.max_size, 200);

        assert_eq!(stats.traffic_timeline.len(), 5);
        assert_eq!(stats.traffic_timeline[&1000], 1);
    }

    #[test]
    fn test_empty_batch() {
        let stats = generate(&[]);
        assert_eq!(stats, StatisticsSnapshot::default());
        assert_eq!(stats.total_packets, 0);
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.capture_duration, 0.0);
        assert!(stats.protocol_distribution.is_empty());
        assert!(stats.traffic_timeline.is_empty());
    }

    #[test]
    fn test_single_packet() {
        let batch = [PacketRecord::new(1, "TCP", "").with_length(100).with_timestamp(1000.0)];
        let stats = generate(&batch);
        assert_eq!(stats.total_packets, 1);
        assert_eq!(stats.total_bytes, 100);
        assert_eq!(stats.capture_duration, 0.0);
        assert_eq!(stats.traffic_rate, 1.0);
    }

    #[test]
    fn test_duration_without_timestamps_is_nominal() {
        let batch = [
            PacketRecord::new(1, "TCP", "").with_length(10),
            PacketRecord::new(2, "TCP", "").with_length(10).with_timestamp(5.0),
            PacketRecord::new(3, "TCP", "").with_length(10),
        ];
        let stats = generate(&batch);
        assert_eq!(stats.capture_duration, 1.0);
        assert_eq!(stats.traffic_rate, 3.0);
    }

    #[test]
    fn test_duration_floor() {
        let batch = [
            PacketRecord::new(1, "UDP", "").with_length(10).with_timestamp(42.0),
            PacketRecord::new(2, "UDP", "").with_length(10).with_timestamp(42.0),
        ];
        let stats = generate(&batch);
        assert_eq!(stats.capture_duration, 0.1);
        assert_eq!(stats.traffic_rate, 20.0);
    }

    #[test]
    fn test_length_estimation_order() {
        assert_eq!(estimate_length(&PacketRecord::new(1, "TCP", "IP / TCP len=321")), 321);
        assert_eq!(estimate_length(&PacketRecord::new(1, "TCP", "")), 1500);
        assert_eq!(estimate_length(&PacketRecord::new(1, "dns", "")), 128);
        assert_eq!(estimate_length(&PacketRecord::new(1, "ICMPv6", "")), 84);
        assert_eq!(estimate_length(&PacketRecord::new(1, "ARP", "")), 256);
    }

    #[test]
    fn test_estimates_shared_by_totals_and_buckets() {
        let batch = [
            PacketRecord::new(1, "DNS", "").with_timestamp(1.0),
            PacketRecord::new(2, "HTTP", "").with_timestamp(2.0),
            PacketRecord::new(3, "ARP", "who-has len=42").with_timestamp(3.0),
        ];
        let stats = generate(&batch);
        assert_eq!(stats.total_bytes, 128 + 1400 + 42);
        let sizes = stats.packet_size_distribution;
        assert_eq!((sizes.small, sizes.medium, sizes.large), (1, 1, 1));
        assert_eq!(sizes.min_size, 42);
        assert_eq!(sizes.max_size, 1400);
        assert_eq!(sizes.average_size, 523.33);
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        // 1 of 16 packets is 6.25%, which rounds to 6.3 (half-even would give 6.2).
        let mut batch = vec![PacketRecord::new(1, "ICMP", "").with_length(84)];
        batch.extend((2..=16).map(|n| PacketRecord::new(n, "TCP", "").with_length(60)));
        let stats = generate(&batch);
        assert_eq!(stats.protocol_distribution["ICMP"].percentage, 6.3);
        assert_eq!(stats.protocol_distribution["TCP"].percentage, 93.8);
    }

    #[test]
    fn test_oversized_length_hints_saturate() {
        let batch = [
            PacketRecord::new(1, "TCP", "IP / TCP len=18446744073709551615"),
            PacketRecord::new(2, "TCP", "IP / TCP len=18446744073709551615"),
            PacketRecord::new(3, "TCP", "IP / TCP len=10"),
        ];
        let stats = generate(&batch);
        assert_eq!(stats.total_bytes, u64::MAX);
        assert_eq!(stats.packet_size_distribution.max_size, u64::MAX);
        assert_eq!(stats.packet_size_distribution.min_size, 10);
        assert!(stats.average_packet_size > 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.345, 1), 2.3);
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(-0.125, 2), -0.13);
        assert_eq!(round_to(33.333_333, 1), 33.3);
    }

    #[test]
    fn test_timeline_skips_quiet_seconds() {
        let batch = [
            PacketRecord::new(1, "TCP", "").with_timestamp(10.2),
            PacketRecord::new(2, "TCP", "").with_timestamp(10.9),
            PacketRecord::new(3, "TCP", "").with_timestamp(13.0),
        ];
        let timeline = generate(&batch).traffic_timeline;
        assert_eq!(timeline.into_iter().collect::<Vec<_>>(), vec![(10, 2), (13, 1)]);
    }

    #[test]
    fn test_top_conversations_ranking() {
        let mut batch = Vec::new();
        let mut seq = 0;
        let mut push = |summary: &str, times: usize| {
            for _ in 0..times {
                seq += 1;
                batch.push(PacketRecord::new(seq, "TCP", summary).with_length(60));
            }
        };
        push("a > b", 1);
        push("c > d / Raw", 3);
        push("e > f", 1);
        push("g > h", 2);
        push("i > j", 1);
        push("k > l", 1);
        push("no arrow here", 4);

        let top = generate(&batch).top_conversations;
        let labels: Vec<(&str, u64)> =
            top.iter().map(|c| (c.conversation.as_str(), c.packets)).collect();
        assert_eq!(
            labels,
            vec![("c → d", 3), ("g → h", 2), ("a → b", 1), ("e → f", 1), ("i → j", 1)]
        );
    }
}
