//! Random public IPv4 destinations.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::Ipv4Addr;

/// Generates `count` random public IPv4 addresses.
///
/// The first octet stays in `1..=223` (no "this network", multicast or
/// reserved space) and the last in `1..=254`. Private, loopback and
/// link-local ranges are redrawn. The same seed always yields the same list.
pub fn generate_public_ips(count: usize, seed: Option<u64>) -> Vec<String> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut ips = Vec::with_capacity(count);
    while ips.len() < count {
        let ip = Ipv4Addr::new(
            rng.gen_range(1..=223),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254),
        );
        if is_reserved(ip) {
            continue;
        }
        ips.push(ip.to_string());
    }
    ips
}

fn is_reserved(ip: Ipv4Addr) -> bool {
    let [first, second, ..] = ip.octets();
    first == 10
        || (first == 172 && (16..=31).contains(&second))
        || (first == 192 && second == 168)
        || first == 127
        || (first == 169 && second == 254)
}
