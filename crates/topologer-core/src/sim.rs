//! Scripted network used by the tracer and orchestrator tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{Network, ProbeEngine, ProbeReply, ReplyKind, TopologyError};

/// What the network does with the probe sent at one TTL.
#[derive(Debug, Clone, Copy)]
pub enum SimReply {
    Answer {
        from: Ipv4Addr,
        kind: ReplyKind,
        rtt_ms: f64,
    },
    Silent,
    ReceiveError,
}

impl SimReply {
    pub fn exceeded(from: Ipv4Addr, rtt_ms: f64) -> Self {
        SimReply::Answer {
            from,
            kind: ReplyKind::HopLimitExceeded,
            rtt_ms,
        }
    }

    pub fn unreachable(from: Ipv4Addr, rtt_ms: f64) -> Self {
        SimReply::Answer {
            from,
            kind: ReplyKind::DestinationUnreachable,
            rtt_ms,
        }
    }
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    open_now: AtomicUsize,
    peak_open: AtomicUsize,
    sent: Mutex<HashMap<Ipv4Addr, Vec<u16>>>,
}

/// A network whose routes are fixed per target. TTLs past the end of a route
/// are never answered.
#[derive(Default)]
pub struct SimNetwork {
    names: HashMap<String, Ipv4Addr>,
    routes: HashMap<Ipv4Addr, Arc<Vec<SimReply>>>,
    deny_raw: bool,
    fail_send_at: Option<u8>,
    counters: Arc<Counters>,
}

impl SimNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, name: &str, target: Ipv4Addr, replies: Vec<SimReply>) -> Self {
        self.names.insert(name.to_string(), target);
        self.routes.insert(target, Arc::new(replies));
        self
    }

    pub fn deny_raw_sockets(mut self) -> Self {
        self.deny_raw = true;
        self
    }

    pub fn fail_send_at(mut self, ttl: u8) -> Self {
        self.fail_send_at = Some(ttl);
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Most engines that were open at the same time.
    pub fn peak_open(&self) -> usize {
        self.counters.peak_open.load(Ordering::SeqCst)
    }

    pub fn sent_ports(&self, target: Ipv4Addr) -> Vec<u16> {
        self.counters
            .sent
            .lock()
            .unwrap()
            .get(&target)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Network for SimNetwork {
    type Engine = SimEngine;

    async fn resolve(&self, destination: &str) -> Result<Ipv4Addr, TopologyError> {
        self.names
            .get(destination)
            .copied()
            .ok_or_else(|| TopologyError::NameResolution {
                destination: destination.to_string(),
                reason: "unknown host".to_string(),
            })
    }

    async fn open(&self, target: Ipv4Addr) -> Result<SimEngine, TopologyError> {
        if self.deny_raw {
            return Err(TopologyError::PermissionDenied(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let open_now = self.counters.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak_open.fetch_max(open_now, Ordering::SeqCst);
        Ok(SimEngine {
            route: self.routes.get(&target).cloned().unwrap_or_default(),
            fail_send_at: self.fail_send_at,
            in_flight: None,
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct SimEngine {
    route: Arc<Vec<SimReply>>,
    fail_send_at: Option<u8>,
    in_flight: Option<u8>,
    counters: Arc<Counters>,
}

#[async_trait]
impl ProbeEngine for SimEngine {
    async fn send_probe(
        &mut self,
        destination: Ipv4Addr,
        port: u16,
        ttl: u8,
    ) -> Result<(), TopologyError> {
        if self.fail_send_at == Some(ttl) {
            return Err(TopologyError::ProbeSend {
                ttl,
                source: std::io::Error::other("network is unreachable"),
            });
        }
        self.counters
            .sent
            .lock()
            .unwrap()
            .entry(destination)
            .or_default()
            .push(port);
        self.in_flight = Some(ttl);
        Ok(())
    }

    async fn await_reply(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<ProbeReply>, TopologyError> {
        let reply = self
            .in_flight
            .take()
            .and_then(|ttl| self.route.get(ttl as usize - 1).copied())
            .unwrap_or(SimReply::Silent);

        match reply {
            SimReply::Answer { from, kind, rtt_ms } => Ok(Some(ProbeReply {
                responder: from,
                kind,
                rtt: Duration::from_micros((rtt_ms * 1000.0) as u64),
            })),
            SimReply::Silent => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
            SimReply::ReceiveError => Err(TopologyError::ReceiveFailed(std::io::Error::other(
                "network is down",
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), TopologyError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.counters.open_now.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
