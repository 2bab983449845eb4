//! Link event dispatch
//!
//! Send results and ESP-NOW message arrivals are modelled as [`LinkEvent`]s
//! handled by a [`LinkMonitor`], which owns the peer-reported name and
//! decides when the display must be redrawn. Sniffed frames skip the event
//! queue: the sniffer callback writes the locally measured signal strength
//! straight into a [`SignalCell`] from the driver's context.
//!
//! The name and the signal strength come from unrelated sources. With
//! [`SignalFilter::AnyFrame`] the value shown next to a peer's name is the
//! RSSI of whatever frame was sniffed last, not necessarily one sent by that
//! peer. [`SignalFilter::PeerOnly`] restricts updates to frames transmitted by
//! the configured peer.

use crate::config;
use crate::display::StatusLine;
use crate::frame::FrameSample;
use crate::packet::{MacAddress, Packet, PeerName};
use core::cell::Cell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Vec;
use log::{info, warn};

/// Largest ESP-NOW payload
pub const MAX_PAYLOAD_LEN: usize = 250;

/// Which sniffed frames may update the signal strength
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFilter {
    /// Every frame on the channel, whoever sent it
    AnyFrame,
    /// Only frames whose transmitter address is the configured peer
    PeerOnly,
}

#[derive(Debug, Clone, Copy)]
struct SignalState {
    filter: SignalFilter,
    peer: Option<MacAddress>,
    latest: Option<i8>,
}

/// Last measured signal strength, shared between the sniffer callback and the dispatcher
pub struct SignalCell {
    state: Mutex<CriticalSectionRawMutex, Cell<SignalState>>,
}

impl SignalCell {
    pub const fn new(filter: SignalFilter) -> Self {
        Self {
            state: Mutex::new(Cell::new(SignalState {
                filter,
                peer: None,
                latest: None,
            })),
        }
    }

    /// Set the peer used by [`SignalFilter::PeerOnly`]
    pub fn set_peer(&self, peer: MacAddress) {
        self.state.lock(|state| {
            let mut current = state.get();
            current.peer = Some(peer);
            state.set(current);
        });
    }

    pub fn filter(&self) -> SignalFilter {
        self.state.lock(|state| state.get().filter)
    }

    /// Store a sample if the filter accepts it. Returns whether it was stored.
    pub fn record(&self, sample: FrameSample) -> bool {
        self.state.lock(|state| {
            let mut current = state.get();
            let accepted = match current.filter {
                SignalFilter::AnyFrame => true,
                SignalFilter::PeerOnly => {
                    current.peer.is_some() && sample.transmitter == current.peer
                }
            };
            if accepted {
                current.latest = Some(sample.rssi);
                state.set(current);
            }
            accepted
        })
    }

    /// Most recent accepted RSSI, `None` until the first frame
    pub fn latest(&self) -> Option<i8> {
        self.state.lock(|state| state.get().latest)
    }
}

/// Delivery result reported by the messaging layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Delivered,
    Failed,
}

/// Activity reported by the radio tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The driver refused a send request
    SubmitFailed { peer: MacAddress },
    /// A previously submitted send resolved
    SendComplete { peer: MacAddress, status: SendStatus },
    /// An ESP-NOW payload arrived
    MessageReceived {
        source: MacAddress,
        payload: Vec<u8, MAX_PAYLOAD_LEN>,
    },
}

impl LinkEvent {
    /// Build a receive event, truncating anything past the ESP-NOW payload limit
    pub fn received(source: MacAddress, data: &[u8]) -> Self {
        let len = data.len().min(MAX_PAYLOAD_LEN);
        let mut payload = Vec::new();
        // Cannot fail after truncation
        let _ = payload.extend_from_slice(&data[..len]);
        LinkEvent::MessageReceived { source, payload }
    }
}

/// Diagnostic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub submit_failures: u32,
    pub delivered: u32,
    pub delivery_failures: u32,
    pub received: u32,
    pub rejected: u32,
}

impl LinkStats {
    pub fn completed(&self) -> u32 {
        self.delivered + self.delivery_failures
    }
}

/// What the peer last told us plus what we measured ourselves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    /// Peer-reported name
    pub name: Option<PeerName>,
    /// Sender of the last accepted message
    pub source: Option<MacAddress>,
    /// Locally measured signal strength
    pub signal_strength: Option<i8>,
}

/// Handles link events and produces display updates
pub struct LinkMonitor<'a> {
    signal: &'a SignalCell,
    name: Option<PeerName>,
    source: Option<MacAddress>,
    stats: LinkStats,
}

impl<'a> LinkMonitor<'a> {
    pub fn new(signal: &'a SignalCell) -> Self {
        Self {
            signal,
            name: None,
            source: None,
            stats: LinkStats::default(),
        }
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot {
            name: self.name.clone(),
            source: self.source,
            signal_strength: self.signal.latest(),
        }
    }

    /// Handle one event; returns the line to draw when the display must be refreshed
    pub fn handle_event(&mut self, event: LinkEvent) -> Option<StatusLine> {
        match event {
            LinkEvent::SubmitFailed { .. } => {
                self.stats.submit_failures += 1;
                None
            }
            // Outcomes are logged where the send happens
            LinkEvent::SendComplete { status, .. } => {
                match status {
                    SendStatus::Delivered => self.stats.delivered += 1,
                    SendStatus::Failed => self.stats.delivery_failures += 1,
                }
                if self.stats.completed() % config::STATS_LOG_EVERY == 0 {
                    self.log_stats();
                }
                None
            }
            LinkEvent::MessageReceived { source, payload } => {
                match Packet::decode_name(&payload) {
                    Ok(name) => {
                        self.stats.received += 1;
                        info!("[LINK] Packet from {}: {} ({} bytes)", source, name, payload.len());
                        self.name = Some(name);
                        self.source = Some(source);
                        Some(self.status_line())
                    }
                    Err(e) => {
                        self.stats.rejected += 1;
                        warn!(
                            "[LINK] Dropping {} byte packet from {}: {}",
                            payload.len(),
                            source,
                            e
                        );
                        None
                    }
                }
            }
        }
    }

    /// Line for the current peer name and last measured signal strength
    pub fn status_line(&self) -> StatusLine {
        let name = self.name.as_ref().map(PeerName::as_str).unwrap_or("");
        // Nothing sniffed yet reads as 0, the zeroed signal slot
        StatusLine::new(name, self.signal.latest().unwrap_or(0))
    }

    pub fn log_stats(&self) {
        let s = self.stats;
        info!(
            "[LINK] Stats: delivered={} delivery_failed={} submit_failed={} received={} rejected={}",
            s.delivered, s.delivery_failures, s.submit_failures, s.received, s.rejected
        );
    }
}
