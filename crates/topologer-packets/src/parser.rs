//! Parsing of inbound ICMP replies.
//!
//! Raw ICMPv4 sockets deliver the packet starting at the IPv4 header. The
//! header length comes from the low nibble of the first byte, and the four
//! bytes after the header are the ICMP type, code and checksum.

use pnet_packet::icmp::IcmpPacket;
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;
use std::net::Ipv4Addr;
use topologer_core::{ReplyKind, TopologyError, ICMP_DEST_UNREACHABLE, ICMP_TIME_EXCEEDED};

/// Smallest valid IPv4 header.
pub const MIN_IPV4_HEADER_LEN: usize = 20;
/// Type, code and checksum.
pub const ICMP_HEADER_LEN: usize = 4;
/// Offset of the quoted datagram inside an ICMP error message.
pub const ICMP_QUOTE_OFFSET: usize = 8;
/// Bytes of the original transport header routers are required to quote.
pub const QUOTED_TRANSPORT_LEN: usize = 8;

/// Parsed ICMP reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpReply {
    /// ICMP type.
    pub icmp_type: u8,
    /// ICMP code.
    pub icmp_code: u8,
    /// The datagram that triggered the error, if it was quoted in full.
    pub quoted: Option<QuotedDatagram>,
}

impl IcmpReply {
    /// Classifies the reply.
    ///
    /// Only time-exceeded and destination-unreachable are answers to a UDP
    /// probe; anything else is reported as [`TopologyError::UnexpectedIcmpType`]
    /// so the receiver keeps waiting.
    pub fn kind(&self) -> Result<ReplyKind, TopologyError> {
        match self.icmp_type {
            ICMP_TIME_EXCEEDED | ICMP_DEST_UNREACHABLE => {
                Ok(ReplyKind::from_icmp_type(self.icmp_type))
            }
            other => Err(TopologyError::UnexpectedIcmpType(other)),
        }
    }
}

/// The IPv4 header and transport ports quoted in an ICMP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedDatagram {
    /// Destination of the original datagram.
    pub destination: Ipv4Addr,
    /// IP protocol number of the original datagram.
    pub protocol: u8,
    /// UDP ports, when the original was UDP and was quoted far enough.
    pub udp: Option<UdpInfo>,
}

/// UDP header info parsed from ICMP payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpInfo {
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
    /// UDP length.
    pub length: u16,
    /// UDP checksum.
    pub checksum: u16,
}

/// Parse the first 8 bytes of a UDP header from an ICMP payload.
pub fn parse_udp_first_bytes(buf: &[u8]) -> Result<UdpInfo, TopologyError> {
    if buf.len() < QUOTED_TRANSPORT_LEN {
        return Err(TopologyError::PacketTooShort {
            expected: QUOTED_TRANSPORT_LEN,
            actual: buf.len(),
        });
    }

    Ok(UdpInfo {
        src_port: u16::from_be_bytes([buf[0], buf[1]]),
        dst_port: u16::from_be_bytes([buf[2], buf[3]]),
        length: u16::from_be_bytes([buf[4], buf[5]]),
        checksum: u16::from_be_bytes([buf[6], buf[7]]),
    })
}

/// Parses a packet read from a raw ICMPv4 socket.
///
/// Short or malformed packets are reported with retryable errors.
pub fn parse_icmp_reply(buf: &[u8]) -> Result<IcmpReply, TopologyError> {
    let ip = Ipv4Packet::new(buf).ok_or(TopologyError::PacketTooShort {
        expected: MIN_IPV4_HEADER_LEN,
        actual: buf.len(),
    })?;

    let header_len = ip.get_header_length() as usize * 4;
    if header_len < MIN_IPV4_HEADER_LEN {
        return Err(TopologyError::MalformedPacket(format!(
            "IPv4 header length {} is below the minimum",
            header_len
        )));
    }
    if buf.len() < header_len + ICMP_HEADER_LEN {
        return Err(TopologyError::PacketTooShort {
            expected: header_len + ICMP_HEADER_LEN,
            actual: buf.len(),
        });
    }

    let icmp = IcmpPacket::new(&buf[header_len..]).ok_or(TopologyError::PacketTooShort {
        expected: header_len + ICMP_HEADER_LEN,
        actual: buf.len(),
    })?;
    let icmp_type = icmp.get_icmp_type().0;
    let icmp_code = icmp.get_icmp_code().0;

    let quoted = match icmp_type {
        ICMP_TIME_EXCEEDED | ICMP_DEST_UNREACHABLE => buf
            .get(header_len + ICMP_QUOTE_OFFSET..)
            .and_then(parse_quoted_datagram),
        _ => None,
    };

    Ok(IcmpReply {
        icmp_type,
        icmp_code,
        quoted,
    })
}

fn parse_quoted_datagram(payload: &[u8]) -> Option<QuotedDatagram> {
    let inner = Ipv4Packet::new(payload)?;
    let header_len = inner.get_header_length() as usize * 4;
    if header_len < MIN_IPV4_HEADER_LEN {
        return None;
    }

    let protocol = inner.get_next_level_protocol();
    let udp = if protocol == IpNextHeaderProtocols::Udp {
        payload
            .get(header_len..)
            .and_then(|transport| parse_udp_first_bytes(transport).ok())
    } else {
        None
    };

    Some(QuotedDatagram {
        destination: inner.get_destination(),
        protocol: protocol.0,
        udp,
    })
}
