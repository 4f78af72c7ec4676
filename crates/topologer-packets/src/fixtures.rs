//! Builders for ICMP replies as a raw socket would deliver them.

use pnet_packet::icmp::{IcmpCode, IcmpPacket, IcmpType, MutableIcmpPacket};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::{self, MutableIpv4Packet};
use pnet_packet::udp::MutableUdpPacket;
use std::net::Ipv4Addr;

const IPV4_LEN: usize = 20;
const ICMP_ERROR_LEN: usize = 8;
const UDP_LEN: usize = 8;

/// The probe datagram a router quotes back.
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

/// Builds an IPv4 packet from `responder` carrying an ICMP message.
pub fn icmp_reply(
    responder: Ipv4Addr,
    icmp_type: u8,
    icmp_code: u8,
    quote: Option<Quote>,
) -> Vec<u8> {
    let quote_len = if quote.is_some() { IPV4_LEN + UDP_LEN } else { 0 };
    let total = IPV4_LEN + ICMP_ERROR_LEN + quote_len;
    let mut buf = vec![0u8; total];

    if let Some(q) = quote {
        let inner = &mut buf[IPV4_LEN + ICMP_ERROR_LEN..];
        write_ipv4(
            &mut inner[..IPV4_LEN],
            q.source,
            q.destination,
            IPV4_LEN + UDP_LEN,
            1,
            true,
        );
        let mut udp = MutableUdpPacket::new(&mut inner[IPV4_LEN..]).expect("udp buffer");
        udp.set_source(q.src_port);
        udp.set_destination(q.dst_port);
        udp.set_length(UDP_LEN as u16);
    }

    {
        let mut icmp = MutableIcmpPacket::new(&mut buf[IPV4_LEN..]).expect("icmp buffer");
        icmp.set_icmp_type(IcmpType::new(icmp_type));
        icmp.set_icmp_code(IcmpCode::new(icmp_code));
    }
    let checksum = {
        let icmp = IcmpPacket::new(&buf[IPV4_LEN..]).expect("icmp buffer");
        pnet_packet::icmp::checksum(&icmp)
    };
    MutableIcmpPacket::new(&mut buf[IPV4_LEN..])
        .expect("icmp buffer")
        .set_checksum(checksum);

    let source = quote.map(|q| q.source).unwrap_or(Ipv4Addr::LOCALHOST);
    write_ipv4(&mut buf[..IPV4_LEN], responder, source, total, 64, false);
    buf
}

fn write_ipv4(
    buf: &mut [u8],
    source: Ipv4Addr,
    destination: Ipv4Addr,
    total_len: usize,
    ttl: u8,
    udp: bool,
) {
    let mut ip = MutableIpv4Packet::new(buf).expect("ipv4 buffer");
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_total_length(total_len as u16);
    ip.set_ttl(ttl);
    ip.set_next_level_protocol(if udp {
        IpNextHeaderProtocols::Udp
    } else {
        IpNextHeaderProtocols::Icmp
    });
    ip.set_source(source);
    ip.set_destination(destination);
    let checksum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);
}
