//! UDP probing for network-topologer.
//!
//! [`UdpProbeEngine`] sends empty UDP datagrams to high ports and reads the
//! ICMP time-exceeded and port-unreachable replies they provoke.
//! [`SystemNetwork`] opens one engine per trace against the host's sockets.

pub mod driver;
pub mod network;

pub use driver::UdpProbeEngine;
pub use network::SystemNetwork;
