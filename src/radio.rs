//! Radio module for ESP32-C3 board
//!
//! Brings up the WiFi driver in station mode, ESP-NOW with the single static
//! peer, and promiscuous mode whose callback feeds [`SIGNAL`].

use crate::broadcast::PacketSender;
use crate::frame::FrameSample;
use crate::link::{LinkEvent, SendStatus, SignalCell};
use crate::packet::{MacAddress, Packet};
use crate::setup::{RadioSetup, bring_up};
use crate::{BoardError, config};
use esp_wifi::esp_now::{
    EspNow, EspNowError, EspNowManager, EspNowReceiver, EspNowSender, EspNowWifiInterface,
    PeerInfo,
};
use esp_wifi::wifi::{Configuration, Interfaces, PromiscuousPkt, Sniffer, WifiController};
use log::error;

/// Locally measured signal strength, written from the sniffer callback
pub static SIGNAL: SignalCell = SignalCell::new(config::SIGNAL_FILTER);

/// Radio handles that must stay alive for the lifetime of the firmware
pub struct RadioLink<'d> {
    pub controller: WifiController<'d>,
    pub manager: EspNowManager<'d>,
    pub sender: EspNowSender<'d>,
    pub receiver: EspNowReceiver<'d>,
    pub sniffer: Sniffer,
}

/// Driver handles while the radio is being brought up
struct EspRadio<'d> {
    controller: WifiController<'d>,
    esp_now: EspNow<'d>,
    sniffer: Sniffer,
}

impl RadioSetup for EspRadio<'_> {
    fn start_station(&mut self) -> Result<(), BoardError> {
        self.controller
            .set_configuration(&Configuration::Client(Default::default()))
            .map_err(|e| {
                error!("[RADIO] Failed to set station mode: {:?}", e);
                BoardError::RadioError
            })?;

        self.controller.start().map_err(|e| {
            error!("[RADIO] Failed to start WiFi: {:?}", e);
            BoardError::RadioError
        })
    }

    fn espnow_version(&mut self) -> Result<u32, BoardError> {
        self.esp_now.version().map_err(|e| {
            error!("[NOW] Error initializing ESP-NOW: {:?}", e);
            BoardError::RadioError
        })
    }

    fn set_channel(&mut self, channel: u8) -> Result<(), BoardError> {
        self.esp_now.set_channel(channel).map_err(|e| {
            error!("[NOW] Failed to set channel {}: {:?}", channel, e);
            BoardError::RadioError
        })
    }

    fn add_peer(&mut self, peer: MacAddress) -> Result<(), BoardError> {
        self.esp_now
            .add_peer(PeerInfo {
                interface: EspNowWifiInterface::Sta,
                peer_address: peer.octets(),
                lmk: None,
                // Current channel
                channel: None,
                encrypt: false,
            })
            .map_err(|e| {
                error!("[NOW] Failed to add peer {}: {:?}", peer, e);
                BoardError::RadioError
            })
    }

    fn start_frame_monitor(&mut self) -> Result<(), BoardError> {
        self.sniffer.set_receive_cb(on_frame);
        self.sniffer.set_promiscuous_mode(true).map_err(|e| {
            error!("[SNIFF] Failed to enable promiscuous mode: {:?}", e);
            BoardError::RadioError
        })
    }
}

/// Start the radio, register the peer and enable the frame monitor.
///
/// Any failure stops the bring-up at that step; nothing after it is registered.
pub fn start<'d>(
    controller: WifiController<'d>,
    interfaces: Interfaces<'d>,
    peer: MacAddress,
) -> Result<RadioLink<'d>, BoardError> {
    let mut radio = EspRadio {
        controller,
        esp_now: interfaces.esp_now,
        sniffer: interfaces.sniffer,
    };
    bring_up(&mut radio, &SIGNAL, peer, config::ESPNOW_CHANNEL)?;

    let EspRadio {
        controller,
        esp_now,
        sniffer,
    } = radio;
    let (manager, sender, receiver) = esp_now.split();

    Ok(RadioLink {
        controller,
        manager,
        sender,
        receiver,
        sniffer,
    })
}

/// Frame monitor; runs in the WiFi driver's context for every sniffed frame
fn on_frame(packet: PromiscuousPkt<'_>) {
    SIGNAL.record(FrameSample::from_raw(packet.rx_cntl.rssi, packet.data));
}

impl PacketSender for EspNowSender<'_> {
    async fn send(&mut self, peer: MacAddress, packet: &Packet) -> LinkEvent {
        let bytes = packet.encode();
        match self.send_async(&peer.octets(), &bytes).await {
            Ok(()) => LinkEvent::SendComplete {
                peer,
                status: SendStatus::Delivered,
            },
            Err(EspNowError::SendFailed) => LinkEvent::SendComplete {
                peer,
                status: SendStatus::Failed,
            },
            Err(e) => {
                error!("[NOW] Send rejected: {:?}", e);
                LinkEvent::SubmitFailed { peer }
            }
        }
    }
}

/// Wait for the next ESP-NOW message
pub async fn receive(receiver: &mut EspNowReceiver<'_>) -> LinkEvent {
    let data = receiver.receive_async().await;
    LinkEvent::received(MacAddress::from(data.info.src_address), data.data())
}
