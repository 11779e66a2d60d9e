//! pktlens turns batches of per-packet metadata into protocol breakdowns,
//! traffic statistics and heuristic issue reports.
//!
//! The four core operations are plain functions over a slice of
//! [`PacketRecord`]s and never fail:
//!
//! - [`parse`] expands one record into per-layer fields;
//! - [`FilterEngine::apply`] selects a subset by protocol, address or port;
//! - [`generate`] aggregates a batch into a [`StatisticsSnapshot`];
//! - [`analyze`] / [`IssueDetector::analyze`] flag suspicious patterns.
//!
//! [`analysis::run`] chains them for one batch. The [`capture`] and
//! [`storage`] modules supply batches; [`logger`] records what happened.

pub mod analysis;
pub mod capture;
pub mod error;
pub mod logger;
pub mod storage;

pub use analysis::detection::{analyze, IssueDetector};
pub use analysis::filter::{Filter, FilterEngine};
pub use analysis::parser::{parse, parse_tcp_flags};
pub use analysis::statistics::generate;
pub use analysis::types::{
    Conversation, Issue, IssueKind, PacketRecord, ProtocolAnalysis, ProtocolShare, Severity,
    SizeDistribution, StatisticsSnapshot, Thresholds,
};
pub use analysis::{run, AnalysisOptions, AnalysisReport};
pub use error::{PktlensError, Result};
