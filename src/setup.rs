//! Radio bring-up order
//!
//! Station mode, ESP-NOW, optional channel, the peer, then the frame
//! monitor. Each step runs only if every earlier one succeeded, so a board
//! whose radio fails to come up never registers the peer or the sniffer
//! callback.

use crate::BoardError;
use crate::link::SignalCell;
use crate::packet::MacAddress;
use log::info;

/// Individual radio bring-up steps; implementations log their own failures
pub trait RadioSetup {
    /// Put the WiFi driver in station mode and start it
    fn start_station(&mut self) -> Result<(), BoardError>;
    /// Confirm ESP-NOW is up and report its version
    fn espnow_version(&mut self) -> Result<u32, BoardError>;
    fn set_channel(&mut self, channel: u8) -> Result<(), BoardError>;
    fn add_peer(&mut self, peer: MacAddress) -> Result<(), BoardError>;
    /// Install the sniffer callback and enable promiscuous mode
    fn start_frame_monitor(&mut self) -> Result<(), BoardError>;
}

pub fn bring_up<R: RadioSetup>(
    radio: &mut R,
    signal: &SignalCell,
    peer: MacAddress,
    channel: Option<u8>,
) -> Result<(), BoardError> {
    radio.start_station()?;
    info!("[RADIO] Station mode started");

    let version = radio.espnow_version()?;
    info!("[NOW] ESP-NOW version {}", version);

    if let Some(channel) = channel {
        radio.set_channel(channel)?;
        info!("[NOW] Using channel {}", channel);
    }

    radio.add_peer(peer)?;
    info!("[NOW] Peer {} registered", peer);
    signal.set_peer(peer);

    radio.start_frame_monitor()?;
    info!("[SNIFF] Promiscuous mode enabled, filter {:?}", signal.filter());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameSample;
    use crate::link::SignalFilter;
    use std::vec::Vec;

    const PEER: MacAddress = MacAddress::new([0xC8, 0xC9, 0xA3, 0x61, 0xCF, 0xEA]);

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Station,
        Version,
        Channel(u8),
        AddPeer(MacAddress),
        FrameMonitor,
    }

    #[derive(Default)]
    struct FakeRadio {
        steps: Vec<Step>,
        fail_at: Option<Step>,
    }

    impl FakeRadio {
        fn failing_at(step: Step) -> Self {
            Self {
                fail_at: Some(step),
                ..Default::default()
            }
        }

        fn run(&mut self, step: Step) -> Result<(), BoardError> {
            self.steps.push(step);
            if self.fail_at == Some(step) {
                Err(BoardError::RadioError)
            } else {
                Ok(())
            }
        }
    }

    impl RadioSetup for FakeRadio {
        fn start_station(&mut self) -> Result<(), BoardError> {
            self.run(Step::Station)
        }

        fn espnow_version(&mut self) -> Result<u32, BoardError> {
            self.run(Step::Version).map(|_| 1)
        }

        fn set_channel(&mut self, channel: u8) -> Result<(), BoardError> {
            self.run(Step::Channel(channel))
        }

        fn add_peer(&mut self, peer: MacAddress) -> Result<(), BoardError> {
            self.run(Step::AddPeer(peer))
        }

        fn start_frame_monitor(&mut self) -> Result<(), BoardError> {
            self.run(Step::FrameMonitor)
        }
    }

    fn peer_frame() -> FrameSample {
        FrameSample {
            rssi: -50,
            transmitter: Some(PEER),
        }
    }

    #[test]
    fn runs_every_step_in_order() {
        let signal = SignalCell::new(SignalFilter::PeerOnly);
        let mut radio = FakeRadio::default();

        assert_eq!(bring_up(&mut radio, &signal, PEER, Some(6)), Ok(()));
        assert_eq!(
            radio.steps,
            [
                Step::Station,
                Step::Version,
                Step::Channel(6),
                Step::AddPeer(PEER),
                Step::FrameMonitor,
            ]
        );
        assert!(signal.record(peer_frame()));
    }

    #[test]
    fn keeps_current_channel_when_none_is_configured() {
        let signal = SignalCell::new(SignalFilter::AnyFrame);
        let mut radio = FakeRadio::default();

        bring_up(&mut radio, &signal, PEER, None).unwrap();
        assert!(!radio.steps.iter().any(|s| matches!(s, Step::Channel(_))));
    }

    #[test]
    fn station_failure_registers_nothing() {
        let signal = SignalCell::new(SignalFilter::PeerOnly);
        let mut radio = FakeRadio::failing_at(Step::Station);

        assert_eq!(
            bring_up(&mut radio, &signal, PEER, None),
            Err(BoardError::RadioError)
        );
        assert_eq!(radio.steps, [Step::Station]);
        assert!(!signal.record(peer_frame()));
    }

    #[test]
    fn espnow_failure_registers_neither_peer_nor_frame_monitor() {
        let signal = SignalCell::new(SignalFilter::PeerOnly);
        let mut radio = FakeRadio::failing_at(Step::Version);

        assert!(bring_up(&mut radio, &signal, PEER, Some(1)).is_err());
        assert_eq!(radio.steps, [Step::Station, Step::Version]);
        assert!(!signal.record(peer_frame()));
    }

    #[test]
    fn peer_failure_skips_frame_monitor() {
        let signal = SignalCell::new(SignalFilter::PeerOnly);
        let mut radio = FakeRadio::failing_at(Step::AddPeer(PEER));

        assert!(bring_up(&mut radio, &signal, PEER, None).is_err());
        assert_eq!(radio.steps.last(), Some(&Step::AddPeer(PEER)));
        assert!(!radio.steps.contains(&Step::FrameMonitor));
        assert!(!signal.record(peer_frame()));
    }
}
