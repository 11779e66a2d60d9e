//! Composable packet filters.
//!
//! A [`FilterEngine`] holds two groups of predicates:
//! - protocol filters, OR-combined: a packet passes if its protocol matches
//!   any registered token;
//! - every other filter, AND-combined in registration order.
//!
//! The engine owns its filter lists. It does no locking of its own; callers
//! that share one engine between threads wrap it in a `RwLock` and take the
//! read side for [`FilterEngine::apply`] and the write side for the `add_*`
//! methods and [`FilterEngine::clear`].
//!
//! Port matching reads the summary text (see [`Filter::Port`]). It is a
//! best-effort textual match, not a decode of transport headers.

use crate::analysis::extract;
use crate::analysis::types::PacketRecord;

/// A non-protocol predicate over a [`PacketRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Accepts a record whose resolved endpoints equal every given address.
    ///
    /// Addresses come from the structured fields when present, otherwise
    /// from IPv4 literals in the summary (first = source, second =
    /// destination).
    Address {
        source: Option<String>,
        destination: Option<String>,
    },

    /// Accepts a record whose summary shows every given port.
    ///
    /// When the summary has an `ip:port > ip:port` group, the ports are
    /// compared directly. Otherwise the raw text is searched for `":<p> "`
    /// or `"><p>"` (any port), `":<p> >"` (source) and `"><p>"`
    /// (destination).
    Port {
        port: Option<u16>,
        source_port: Option<u16>,
        destination_port: Option<u16>,
    },
}

impl Filter {
    pub fn matches(&self, record: &PacketRecord) -> bool {
        match self {
            Filter::Address { source, destination } => {
                let (rec_src, rec_dst) = extract::resolve_addresses(record);
                if let Some(want) = source {
                    if rec_src.as_deref() != Some(want.as_str()) {
                        return false;
                    }
                }
                if let Some(want) = destination {
                    if rec_dst.as_deref() != Some(want.as_str()) {
                        return false;
                    }
                }
                true
            }
            Filter::Port { port, source_port, destination_port } => {
                port_matches(&record.summary, *port, *source_port, *destination_port)
            }
        }
    }

    /// Short human-readable description, e.g. `"Address: source 10.0.0.1"`.
    pub fn describe(&self) -> String {
        match self {
            Filter::Address { source, destination } => {
                let mut parts = Vec::new();
                if let Some(s) = source {
                    parts.push(format!("source {}", s));
                }
                if let Some(d) = destination {
                    parts.push(format!("destination {}", d));
                }
                if parts.is_empty() {
                    parts.push("any".to_string());
                }
                format!("Address: {}", parts.join(", "))
            }
            Filter::Port { port, source_port, destination_port } => {
                let mut parts = Vec::new();
                if let Some(p) = port {
                    parts.push(format!("port {}", p));
                }
                if let Some(p) = source_port {
                    parts.push(format!("source port {}", p));
                }
                if let Some(p) = destination_port {
                    parts.push(format!("destination port {}", p));
                }
                if parts.is_empty() {
                    parts.push("any".to_string());
                }
                format!("Port: {}", parts.join(", "))
            }
        }
    }
}

fn port_matches(
    summary: &str,
    port: Option<u16>,
    source_port: Option<u16>,
    destination_port: Option<u16>,
) -> bool {
    if let Some(ep) = extract::endpoints(summary) {
        return port.map_or(true, |p| ep.source_port == p || ep.destination_port == p)
            && source_port.map_or(true, |p| ep.source_port == p)
            && destination_port.map_or(true, |p| ep.destination_port == p);
    }

    let text = summary.to_lowercase();
    port.map_or(true, |p| {
        text.contains(&format!(":{} ", p)) || text.contains(&format!(">{}", p))
    }) && source_port.map_or(true, |p| text.contains(&format!(":{} >", p)))
        && destination_port.map_or(true, |p| text.contains(&format!(">{}", p)))
}

/// Instance-scoped, ordered set of packet filters.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    protocols: Vec<String>,
    filters: Vec<Filter>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a protocol to the OR-group. Tokens are uppercased; registering
    /// the same protocol twice has no further effect.
    pub fn add_protocol_filter(&mut self, protocol: &str) {
        let token = protocol.trim().to_uppercase();
        if !self.protocols.contains(&token) {
            self.protocols.push(token);
        }
    }

    /// Adds an address filter. With both endpoints given, both must match.
    ///
    /// Blank addresses count as not given. A filter left with no constraint
    /// is not registered.
    pub fn add_address_filter(&mut self, source: Option<&str>, destination: Option<&str>) {
        let given = |addr: Option<&str>| {
            addr.map(str::trim).filter(|a| !a.is_empty()).map(str::to_string)
        };
        let (source, destination) = (given(source), given(destination));
        if source.is_none() && destination.is_none() {
            return;
        }
        self.filters.push(Filter::Address { source, destination });
    }

    /// Adds a port filter. Every supplied constraint must match.
    ///
    /// Port `0` counts as not given. A filter left with no constraint is not
    /// registered.
    pub fn add_port_filter(
        &mut self,
        port: Option<u16>,
        source_port: Option<u16>,
        destination_port: Option<u16>,
    ) {
        let given = |p: Option<u16>| p.filter(|p| *p != 0);
        let (port, source_port, destination_port) =
            (given(port), given(source_port), given(destination_port));
        if port.is_none() && source_port.is_none() && destination_port.is_none() {
            return;
        }
        self.filters.push(Filter::Port { port, source_port, destination_port });
    }

    /// Returns the records accepted by every filter group, in input order.
    ///
    /// With no protocol filters registered the protocol stage accepts all
    /// records. Neither the input nor the engine is modified.
    pub fn apply(&self, batch: &[PacketRecord]) -> Vec<PacketRecord> {
        batch
            .iter()
            .filter(|record| self.accepts(record))
            .cloned()
            .collect()
    }

    /// Evaluates a single record: protocol group first, then each remaining
    /// filter, stopping at the first rejection.
    pub fn accepts(&self, record: &PacketRecord) -> bool {
        if !self.protocols.is_empty() {
            let protocol = record.protocol.to_uppercase();
            if !self.protocols.iter().any(|p| *p == protocol) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(record))
    }

    /// Removes every registered filter from both groups.
    pub fn clear(&mut self) {
        self.protocols.clear();
        self.filters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty() && self.filters.is_empty()
    }

    /// Total number of registered filters across both groups.
    pub fn len(&self) -> usize {
        self.protocols.len() + self.filters.len()
    }

    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Active filters as display lines: protocols first, then the others in
    /// registration order.
    pub fn describe(&self) -> Vec<String> {
        self.protocols
            .iter()
            .map(|p| format!("Protocol: {}", p))
            .chain(self.filters.iter().map(Filter::describe))
            .collect()
    }
}
