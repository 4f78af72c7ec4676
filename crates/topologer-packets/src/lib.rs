//! Packet I/O for network-topologer.
//!
//! Provides the socket interfaces used to send UDP probes and receive the
//! ICMP replies they provoke, plus the parser for those replies.

pub mod parser;
pub mod platform;
pub mod sink;
pub mod source;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use parser::{
    parse_icmp_reply, parse_udp_first_bytes, IcmpReply, QuotedDatagram, UdpInfo,
};
pub use sink::Sink;
pub use source::Source;

/// Handle containing both source and sink for one trace.
pub struct SourceSinkHandle {
    /// ICMP reply source.
    pub source: Box<dyn Source>,
    /// UDP probe sink.
    pub sink: Box<dyn Sink>,
}

/// Creates a Source and Sink appropriate for the current platform.
pub async fn new_source_sink() -> Result<SourceSinkHandle, topologer_core::TopologyError> {
    platform::new_source_sink().await
}
