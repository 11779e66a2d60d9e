//! Per-packet protocol breakdown.
//!
//! [`parse`] turns one [`PacketRecord`] into a [`ProtocolAnalysis`]: a map of
//! layer name to decoded fields. It never fails. Records that carry no data
//! at all produce an analysis holding a single `"error"` layer.

use crate::analysis::extract;
use crate::analysis::types::{Layer, PacketRecord, ProtocolAnalysis, UNKNOWN_PROTOCOL};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const NOT_AVAILABLE: &str = "N/A";

/// Expands a packet record into its layer breakdown.
///
/// Synthetic records get a `"simulated"` layer, captured ones an `"ip"`
/// layer. A transport or application layer (`"tcp"`, `"udp"`, `"icmp"`,
/// `"dns"`, `"http"`) is added when the protocol calls for one and the
/// summary carries something to decode.
pub fn parse(record: &PacketRecord) -> ProtocolAnalysis {
    if record.is_empty() {
        let mut layers = BTreeMap::new();
        layers.insert("error".to_string(), error_layer("packet record carries no data"));
        return ProtocolAnalysis {
            sequence_number: 0,
            protocol: UNKNOWN_PROTOCOL.to_string(),
            summary: String::new(),
            layers,
        };
    }

    let mut layers = BTreeMap::new();
    let (source, destination) = extract::resolve_addresses(record);

    if record.is_real {
        layers.insert("ip".to_string(), ip_layer(source, destination));
    } else {
        layers.insert("simulated".to_string(), simulated_layer(record, source, destination));
    }

    let protocol = record.protocol_or_unknown();
    match protocol.to_ascii_uppercase().as_str() {
        "TCP" | "HTTP" | "HTTPS" => {
            insert_non_empty(&mut layers, "tcp", tcp_layer(&record.summary));
            if protocol.eq_ignore_ascii_case("HTTP") {
                insert_non_empty(&mut layers, "http", http_layer(&record.summary));
            }
        }
        "UDP" | "DNS" => {
            insert_non_empty(&mut layers, "udp", port_fields(&record.summary));
            if protocol.eq_ignore_ascii_case("DNS") {
                insert_non_empty(&mut layers, "dns", dns_layer(&record.summary));
            }
        }
        "ICMP" | "ICMPV6" => {
            insert_non_empty(&mut layers, "icmp", icmp_layer(&record.summary));
        }
        _ => {}
    }

    ProtocolAnalysis {
        sequence_number: record.sequence_number,
        protocol: protocol.to_string(),
        summary: record.summary.clone(),
        layers,
    }
}

/// Maps single-letter TCP flag codes to their names.
///
/// The output has one entry per input code, in the same order. Codes that
/// are not recognised are passed through unchanged.
pub fn parse_tcp_flags<S: AsRef<str>>(codes: &[S]) -> Vec<String> {
    codes
        .iter()
        .map(|code| {
            let code = code.as_ref();
            match code {
                "S" => "SYN",
                "A" => "ACK",
                "F" => "FIN",
                "R" => "RST",
                "P" => "PSH",
                "U" => "URG",
                "E" => "ECE",
                "C" => "CWR",
                other => other,
            }
            .to_string()
        })
        .collect()
}

fn error_layer(message: &str) -> Layer {
    let mut layer = Layer::new();
    layer.insert("message".to_string(), Value::from(message));
    layer
}

fn insert_non_empty(layers: &mut BTreeMap<String, Layer>, name: &str, layer: Layer) {
    if !layer.is_empty() {
        layers.insert(name.to_string(), layer);
    }
}

fn simulated_layer(record: &PacketRecord, source: Option<String>, destination: Option<String>) -> Layer {
    let mut layer = Layer::new();
    layer.insert("source".to_string(), json!(source.unwrap_or_else(|| NOT_AVAILABLE.to_string())));
    layer.insert(
        "destination".to_string(),
        json!(destination.unwrap_or_else(|| NOT_AVAILABLE.to_string())),
    );
    layer.insert("length".to_string(), json!(record.length));
    layer.insert(
        "note".to_string(),
        json!("Synthetic packet generated for learning; no bytes were captured"),
    );
    layer
}

fn ip_layer(source: Option<String>, destination: Option<String>) -> Layer {
    let version = match (&source, &destination) {
        (Some(a), _) | (None, Some(a)) if a.contains(':') => 6,
        _ => 4,
    };

    let mut layer = Layer::new();
    layer.insert("source".to_string(), json!(source.unwrap_or_else(|| NOT_AVAILABLE.to_string())));
    layer.insert(
        "destination".to_string(),
        json!(destination.unwrap_or_else(|| NOT_AVAILABLE.to_string())),
    );
    layer.insert("version".to_string(), json!(version));
    layer
}

fn port_fields(summary: &str) -> Layer {
    let mut layer = Layer::new();
    if let Some(ep) = extract::endpoints(summary) {
        layer.insert("source_port".to_string(), json!(ep.source_port));
        layer.insert("destination_port".to_string(), json!(ep.destination_port));
    }
    layer
}

fn tcp_layer(summary: &str) -> Layer {
    let mut layer = port_fields(summary);
    let codes = extract::flag_codes(summary);
    if !codes.is_empty() {
        layer.insert("flags".to_string(), json!(parse_tcp_flags(codes.as_slice())));
    }
    layer
}

fn http_layer(summary: &str) -> Layer {
    let mut layer = Layer::new();
    if let Some(method) = extract::http_method(summary) {
        layer.insert("method".to_string(), json!(method));
    }
    layer
}

fn dns_layer(summary: &str) -> Layer {
    let mut layer = Layer::new();
    if let Some(query) = extract::dns_query(summary) {
        layer.insert("query".to_string(), json!(query));
    }
    layer
}

fn icmp_layer(summary: &str) -> Layer {
    let mut layer = Layer::new();
    if let Some(message) = extract::icmp_message(summary) {
        layer.insert("message".to_string(), json!(message));
    }
    layer
}
