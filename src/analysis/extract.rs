//! Best-effort extraction of structured values from packet summary text.
//!
//! Summaries are free text written by the capture source, e.g.
//! `"TCP 192.168.1.10:51234 > 10.0.0.5:80 PA"`. Nothing here is a protocol
//! decoder: every function either recognises a pattern or returns `None`.

use crate::analysis::types::PacketRecord;
use regex::Regex;
use std::sync::LazyLock;

static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,3}(?:\.\d{1,3}){3}\b").expect("valid ipv4 pattern"));

static ENDPOINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}(?:\.\d{1,3}){3}):(\d{1,5})\s*>\s*(\d{1,3}(?:\.\d{1,3}){3}):(\d{1,5})")
        .expect("valid endpoint pattern")
});

static LEN_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"len=(\d+)").expect("valid len pattern"));

static DNS_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Qry\s+"?(?:b')?([A-Za-z0-9_.\-]+)"#).expect("valid dns pattern")
});

/// TCP flag codes as single letters, in the order scapy prints them.
const FLAG_LETTERS: &str = "FSRPAUECN";

/// Spelled-out flag names that may appear as separate summary words.
const FLAG_WORDS: &[&str] = &["SYN", "ACK", "FIN", "RST", "PSH", "URG", "ECE", "CWR"];

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH", "CONNECT"];

const ICMP_MESSAGES: &[&str] = &[
    "echo-request",
    "echo-reply",
    "dest-unreach",
    "time-exceeded",
    "redirect",
    "source-quench",
];

/// `ip:port > ip:port` endpoints found in a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub source_ip: String,
    pub source_port: u16,
    pub destination_ip: String,
    pub destination_port: u16,
}

/// All IPv4 literals in `text`, left to right.
pub fn ipv4_literals(text: &str) -> Vec<&str> {
    IPV4.find_iter(text).map(|m| m.as_str()).collect()
}

/// First `ip:port > ip:port` group in `text`.
pub fn endpoints(text: &str) -> Option<Endpoints> {
    let caps = ENDPOINTS.captures(text)?;
    Some(Endpoints {
        source_ip: caps[1].to_string(),
        source_port: caps[2].parse().ok()?,
        destination_ip: caps[3].to_string(),
        destination_port: caps[4].parse().ok()?,
    })
}

/// Value of a `len=<N>` token.
pub fn length_hint(text: &str) -> Option<u64> {
    LEN_HINT.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Resolves a record's endpoints.
///
/// Structured addresses win. A missing source falls back to the first IPv4
/// literal in the summary, a missing destination to the second.
pub fn resolve_addresses(record: &PacketRecord) -> (Option<String>, Option<String>) {
    let mut source = record.source().map(str::to_string);
    let mut destination = record.destination().map(str::to_string);

    if source.is_none() || destination.is_none() {
        let literals = ipv4_literals(&record.summary);
        if source.is_none() {
            source = literals.first().map(|s| s.to_string());
        }
        if destination.is_none() {
            destination = literals.get(1).map(|s| s.to_string());
        }
    }

    (source, destination)
}

/// `"source → destination"` label for a summary containing exactly one `>`.
///
/// The destination is cut at the first `/`, which drops scapy-style layer
/// suffixes such as `" / Raw"`.
pub fn conversation(text: &str) -> Option<String> {
    let (src, rest) = text.split_once('>')?;
    if rest.contains('>') {
        return None;
    }
    let dst = rest.split('/').next().unwrap_or(rest);
    Some(format!("{} → {}", src.trim(), dst.trim()))
}

/// The transport part of a layered summary: from the `>` up to the next
/// `/`. `"Ether / IP / TCP a:1 > b:2 R / Raw"` gives `" b:2 R "`. Text
/// without a `>` is returned whole.
fn transport_segment(text: &str) -> &str {
    match text.split_once('>') {
        Some((_, rest)) => rest.split('/').next().unwrap_or(rest),
        None => text,
    }
}

/// TCP flag codes carried by a summary.
///
/// Only the transport segment is read, so layer suffixes such as
/// `" / Raw"` do not hide the flags. A trailing compact token (`"S"`,
/// `"SA"`, `"PA"`) yields one code per letter. Otherwise spelled-out flag
/// words (`"SYN"`, `"ACK"`) are returned in order of appearance.
pub fn flag_codes(text: &str) -> Vec<String> {
    let text = transport_segment(text);
    if let Some(last) = text.split_whitespace().last() {
        if last.len() <= FLAG_LETTERS.len() && last.chars().all(|c| FLAG_LETTERS.contains(c)) {
            return last.chars().map(String::from).collect();
        }
    }

    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| FLAG_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// First HTTP request method named in a summary.
pub fn http_method(text: &str) -> Option<&'static str> {
    text.split_whitespace()
        .find_map(|word| HTTP_METHODS.iter().copied().find(|m| *m == word))
}

/// Queried name in a DNS summary (`Qry "b'example.com.'"` or `Qry example.com`).
pub fn dns_query(text: &str) -> Option<String> {
    let name = DNS_QUERY.captures(text)?.get(1)?.as_str();
    let name = name.trim_end_matches('.');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// ICMP message type named in a summary.
pub fn icmp_message(text: &str) -> Option<&'static str> {
    let lower = text.to_ascii_lowercase();
    ICMP_MESSAGES.iter().copied().find(|m| lower.contains(m))
}
