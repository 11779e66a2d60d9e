//! Simulated capture source.
//!
//! Produces synthetic [`PacketRecord`]s shaped like the ones a live sniffer
//! would hand over: scapy-style one-line summaries, plausible lengths and
//! monotonically increasing timestamps. Output is fully determined by the
//! seed, so a run can be reproduced exactly.

use crate::analysis::types::PacketRecord;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// First timestamp of every simulated capture (2023-11-14T22:13:20Z).
pub const BASE_EPOCH: f64 = 1_700_000_000.0;

/// Default seed used by the CLI when `--seed` is not given.
pub const DEFAULT_SEED: u64 = 42;

const CLIENTS: &[&str] = &["192.168.1.10", "192.168.1.23", "192.168.1.42", "192.168.1.77"];
const SERVERS: &[&str] = &["10.0.0.5", "93.184.216.34", "142.250.72.14", "151.101.1.69"];
const RESOLVER: &str = "8.8.8.8";
const DOMAINS: &[&str] = &["example.com", "rust-lang.org", "crates.io", "docs.rs"];
const TCP_FLAGS: &[&str] = &["S", "SA", "A", "PA", "FA", "R"];
const HTTP_PATHS: &[&str] = &["/", "/index.html", "/api/status", "/login"];

/// Protocol mix of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Tcp,
    Udp,
    Dns,
    Http,
    Icmp,
}

impl Kind {
    const ALL: [Kind; 5] = [Kind::Tcp, Kind::Udp, Kind::Dns, Kind::Http, Kind::Icmp];

    fn token(self) -> &'static str {
        match self {
            Kind::Tcp => "TCP",
            Kind::Udp => "UDP",
            Kind::Dns => "DNS",
            Kind::Http => "HTTP",
            Kind::Icmp => "ICMP",
        }
    }
}

/// Seeded generator of synthetic packet batches.
pub struct SimulatedCapture {
    rng:  StdRng,
    seed: u64,
    /// Timestamp of the next packet.
    clock: f64,
}

impl SimulatedCapture {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            clock: BASE_EPOCH,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates `count` records numbered `1..=count`.
    pub fn capture(&mut self, count: usize) -> Vec<PacketRecord> {
        (1..=count as u64).map(|n| self.next_packet(n)).collect()
    }

    fn next_packet(&mut self, number: u64) -> PacketRecord {
        let kind = *Kind::ALL.choose(&mut self.rng).unwrap_or(&Kind::Tcp);
        let client = self.pick(CLIENTS);
        let server = self.pick(SERVERS);
        let ephemeral: u16 = self.rng.random_range(49152..=65535);

        let (summary, length) = match kind {
            Kind::Tcp => {
                let flags = self.pick(TCP_FLAGS);
                let port = *[22u16, 80, 443, 8080].choose(&mut self.rng).unwrap_or(&443);
                // Bare handshake and reset segments carry no payload.
                let length = match flags {
                    "S" | "SA" | "A" | "R" => self.rng.random_range(54..=66),
                    _ => self.rng.random_range(66..=1514),
                };
                (format!("TCP {}:{} > {}:{} {}", client, ephemeral, server, port, flags), length)
            }
            Kind::Udp => {
                let port = *[123u16, 443, 5353].choose(&mut self.rng).unwrap_or(&123);
                let length = self.rng.random_range(60..=600);
                (format!("UDP {}:{} > {}:{}", client, ephemeral, server, port), length)
            }
            Kind::Dns => {
                let domain = self.pick(DOMAINS);
                let length = self.rng.random_range(70..=140);
                (
                    format!("DNS {}:{} > {}:53 Qry \"b'{}.'\"", client, ephemeral, RESOLVER, domain),
                    length,
                )
            }
            Kind::Http => {
                let method = if self.rng.random_bool(0.8) { "GET" } else { "POST" };
                let path = self.pick(HTTP_PATHS);
                let length = self.rng.random_range(300..=1400);
                (
                    format!("HTTP {}:{} > {}:80 PA / Raw {} {}", client, ephemeral, server, method, path),
                    length,
                )
            }
            Kind::Icmp => {
                let message = if self.rng.random_bool(0.5) { "echo-request" } else { "echo-reply" };
                (format!("ICMP {} > {} {} 0", client, server, message), 98)
            }
        };

        let record = PacketRecord::new(number, kind.token(), summary)
            .with_length(length)
            .with_timestamp(self.clock)
            .with_addresses(client, server);

        self.clock += self.rng.random_range(0.001..0.25);
        record
    }

    fn pick(&mut self, options: &[&'static str]) -> &'static str {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parser;

    #[test]
    fn test_simulated_capture_count_and_numbering() {
        let packets = SimulatedCapture::new(7).capture(3);
        assert_eq!(packets.len(), 3);
        let numbers: Vec<u64> = packets.iter().map(|p| p.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(packets.iter().all(|p| !p.protocol.is_empty() && !p.summary.is_empty()));
        assert!(packets.iter().all(|p| !p.is_real));
    }

    #[test]
    fn test_same_seed_same_batch() {
        let a = SimulatedCapture::new(99).capture(50);
        let b = SimulatedCapture::new(99).capture(50);
        assert_eq!(a, b);
        assert_ne!(a, SimulatedCapture::new(100).capture(50));
    }

    #[test]
    fn test_timestamps_increase() {
        let packets = SimulatedCapture::new(1).capture(20);
        assert_eq!(packets[0].timestamp, BASE_EPOCH);
        assert!(packets.windows(2).all(|w| w[1].timestamp > w[0].timestamp));
    }

    #[test]
    fn test_seed_is_kept_after_capture() {
        let mut source = SimulatedCapture::new(7);
        let _ = source.capture(10);
        assert_eq!(source.seed(), 7);
        assert_eq!(SimulatedCapture::new(source.seed()).capture(10), SimulatedCapture::new(7).capture(10));
    }

    #[test]
    fn test_zero_count() {
        assert!(SimulatedCapture::new(1).capture(0).is_empty());
    }

    #[test]
    fn test_summaries_parse_into_layers() {
        for packet in SimulatedCapture::new(5).capture(40) {
            let analysis = parser::parse(&packet);
            assert!(analysis.layers.contains_key("simulated"));
            match packet.protocol.as_str() {
                "TCP" | "HTTP" => assert!(analysis.layers.contains_key("tcp")),
                "UDP" | "DNS" => assert!(analysis.layers.contains_key("udp")),
                "ICMP" => assert!(analysis.layers.contains_key("icmp")),
                other => panic!("unexpected protocol {}", other),
            }
        }
    }
}
