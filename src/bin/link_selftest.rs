//! On-device link self-test
//!
//! Runs the packet codec, signal filtering and display formatting on the
//! target without touching the radio, printing progress over serial.

#![no_std]
#![no_main]

use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_println::println;
use peer_board::display::StatusLine;
use peer_board::frame::FrameSample;
use peer_board::link::{LinkEvent, LinkMonitor, SendStatus, SignalCell, SignalFilter};
use peer_board::packet::{MacAddress, PACKET_LEN, Packet, PeerName};

// Add app descriptor for espflash compatibility
esp_bootloader_esp_idf::esp_app_desc!();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("❌ {}", info);
    loop {}
}

const PEER: MacAddress = MacAddress::new([0xC8, 0xC9, 0xA3, 0x61, 0xCF, 0xEA]);
const STRANGER: MacAddress = MacAddress::new([0x24, 0x0A, 0xC4, 0x00, 0x00, 0x01]);

static ANY_SIGNAL: SignalCell = SignalCell::new(SignalFilter::AnyFrame);
static PEER_SIGNAL: SignalCell = SignalCell::new(SignalFilter::PeerOnly);

#[esp_hal::main]
fn main() -> ! {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let _peripherals = esp_hal::init(config);

    println!("=== Link self-test ===");

    // 1. Wire format
    println!("\n1. Wire format");
    let alice = Packet::outgoing(PeerName::new("Alice").unwrap());
    let wire = alice.encode();
    assert_eq!(wire.len(), PACKET_LEN);
    assert_eq!(Packet::decode_name(&wire).unwrap().as_str(), "Alice");
    assert!(Packet::decode_name(&wire[..10]).is_err());
    println!("✅ Name survives encode/decode, short payload rejected");

    // 2. Unfiltered signal source
    println!("\n2. Any-frame signal source");
    let mut monitor = LinkMonitor::new(&ANY_SIGNAL);
    assert!(ANY_SIGNAL.record(FrameSample {
        rssi: -47,
        transmitter: Some(STRANGER),
    }));
    let line = monitor
        .handle_event(LinkEvent::received(PEER, &wire))
        .unwrap();
    assert_eq!(line, StatusLine::new("Alice", -47));
    println!("✅ Display line: {}", line.as_str());

    // 3. Peer-only signal source
    println!("\n3. Peer-only signal source");
    PEER_SIGNAL.set_peer(PEER);
    let mut monitor = LinkMonitor::new(&PEER_SIGNAL);
    assert!(PEER_SIGNAL.record(FrameSample {
        rssi: -52,
        transmitter: Some(PEER),
    }));
    assert!(!PEER_SIGNAL.record(FrameSample {
        rssi: -47,
        transmitter: Some(STRANGER),
    }));
    let line = monitor
        .handle_event(LinkEvent::received(PEER, &wire))
        .unwrap();
    assert_eq!(line, StatusLine::new("Alice", -52));
    println!("✅ Display line: {}", line.as_str());

    // 4. Send outcomes
    println!("\n4. Send outcomes");
    monitor.handle_event(LinkEvent::SubmitFailed { peer: PEER });
    monitor.handle_event(LinkEvent::SendComplete {
        peer: PEER,
        status: SendStatus::Failed,
    });
    let stats = monitor.stats();
    assert_eq!(stats.submit_failures, 1);
    assert_eq!(stats.delivery_failures, 1);
    println!("✅ Failures counted: {:?}", stats);

    println!("\n=== All tests passed! ===");

    let delay = Delay::new();
    loop {
        delay.delay_millis(1000);
    }
}
