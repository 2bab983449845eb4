//! Periodic broadcast step
//!
//! One pass of the broadcast loop: ask the schedule whether a send is due,
//! send the outgoing packet, log the outcome. A failed send is reported and
//! the loop carries on with the next slot; nothing is retried.

use crate::link::{LinkEvent, SendStatus};
use crate::packet::{MacAddress, Packet};
use crate::schedule::BroadcastSchedule;
use core::future::Future;
use embassy_time::Instant;
use log::{error, info, warn};

/// Transmits one packet to a peer and reports the result
pub trait PacketSender {
    fn send(&mut self, peer: MacAddress, packet: &Packet) -> impl Future<Output = LinkEvent>;
}

impl<S: PacketSender> PacketSender for &mut S {
    fn send(&mut self, peer: MacAddress, packet: &Packet) -> impl Future<Output = LinkEvent> {
        (**self).send(peer, packet)
    }
}

pub struct Broadcaster<S> {
    sender: S,
    schedule: BroadcastSchedule,
    peer: MacAddress,
    outgoing: Packet,
}

impl<S: PacketSender> Broadcaster<S> {
    pub fn new(sender: S, schedule: BroadcastSchedule, peer: MacAddress, outgoing: Packet) -> Self {
        Self {
            sender,
            schedule,
            peer,
            outgoing,
        }
    }

    pub fn peer(&self) -> MacAddress {
        self.peer
    }

    pub fn outgoing(&self) -> &Packet {
        &self.outgoing
    }

    pub fn next_deadline(&self) -> Instant {
        self.schedule.next_deadline()
    }

    /// Send if a broadcast is due at `now`.
    ///
    /// The outcome is logged before it is returned, so the log line does not
    /// depend on anyone consuming the event.
    pub async fn tick(&mut self, now: Instant) -> Option<LinkEvent> {
        if !self.schedule.poll(now) {
            return None;
        }

        let event = self.sender.send(self.peer, &self.outgoing).await;
        log_outcome(&event);
        Some(event)
    }
}

fn log_outcome(event: &LinkEvent) {
    match event {
        LinkEvent::SubmitFailed { .. } => error!("[NOW] Error Sending Data"),
        LinkEvent::SendComplete { peer, status } => {
            info!("[NOW] Sent With Success");
            match status {
                SendStatus::Delivered => {
                    info!("[NOW] Last packet send status to {}: Delivery Success", peer)
                }
                SendStatus::Failed => {
                    warn!("[NOW] Last packet send status to {}: Delivery Failed", peer)
                }
            }
        }
        LinkEvent::MessageReceived { .. } => {}
    }
}
