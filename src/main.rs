#![no_std]
#![no_main]

use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_println::println;
use log::{error, info, warn};

// WiFi imports
use esp_wifi::EspWifiController;
use esp_wifi::esp_now::{EspNowReceiver, EspNowSender};

// Embassy imports
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Instant, Timer};
use esp_hal_embassy::Executor;
use static_cell::StaticCell;

// Import our library modules
use peer_board::broadcast::Broadcaster;
use peer_board::config;
use peer_board::display::{PeerDisplay, Ssd1306Panel};
use peer_board::link::{LinkEvent, LinkMonitor};
use peer_board::packet::{Packet, PeerName};
use peer_board::radio::{self, RadioLink, SIGNAL};
use peer_board::schedule::BroadcastSchedule;

// Add app descriptor for espflash compatibility
esp_bootloader_esp_idf::esp_app_desc!();

type BoardDisplay = PeerDisplay<Ssd1306Panel<I2c<'static, esp_hal::Blocking>>>;

// Static cells for embassy components
static WIFI_INIT_CELL: StaticCell<EspWifiController<'static>> = StaticCell::new();
static RADIO_CELL: StaticCell<RadioLink<'static>> = StaticCell::new();

// Link events from the radio tasks to the dispatcher
static EVENTS: Channel<CriticalSectionRawMutex, LinkEvent, { config::EVENT_QUEUE_DEPTH }> =
    Channel::new();

// Static executor for embassy tasks
static EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("[PANIC] {}", info);
    loop {}
}

/// Broadcast the outgoing packet to the peer once per interval
#[embassy_executor::task]
async fn broadcast_task(mut broadcaster: Broadcaster<&'static mut EspNowSender<'static>>) -> ! {
    println!(
        "[NOW] Broadcasting as \"{}\" to {}",
        broadcaster.outgoing().name,
        broadcaster.peer()
    );

    loop {
        Timer::at(broadcaster.next_deadline()).await;
        let Some(event) = broadcaster.tick(Instant::now()).await else {
            continue;
        };

        // Never hold up the next broadcast on a busy dispatcher; the outcome is already logged
        if EVENTS.try_send(event).is_err() {
            warn!("[NOW] Event queue full, send result left out of stats");
        }
    }
}

/// Forward every received ESP-NOW message to the dispatcher
#[embassy_executor::task]
async fn receive_task(receiver: &'static mut EspNowReceiver<'static>) -> ! {
    loop {
        let event = radio::receive(receiver).await;
        EVENTS.send(event).await;
    }
}

/// Single owner of the peer name and the display
#[embassy_executor::task]
async fn dispatcher_task(mut display: Option<BoardDisplay>) -> ! {
    let mut monitor = LinkMonitor::new(&SIGNAL);

    loop {
        let event = EVENTS.receive().await;
        if let Some(line) = monitor.handle_event(event) {
            if let Some(display) = display.as_mut() {
                display.render(&line);
            }
        }
    }
}

#[esp_hal::main]
fn main() -> ! {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_println::logger::init_logger_from_env();

    // Initialize heap allocator for WiFi (72KB)
    esp_alloc::heap_allocator!(size: 72 * 1024);

    println!("[MAIN] peer-board-rs {}", peer_board::VERSION);

    // Initialize embassy time system
    let timer_group0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timer_group0.timer0);

    // Display first; a missing panel is not fatal
    info!(
        "[DISPLAY] Setting up I2C on SDA GPIO{} / SCL GPIO{}",
        config::I2C_SDA_PIN,
        config::I2C_SCL_PIN
    );
    let i2c_config = I2cConfig::default().with_frequency(Rate::from_khz(config::I2C_FREQUENCY_KHZ));
    let mut display = match I2c::new(peripherals.I2C0, i2c_config) {
        Ok(i2c) => {
            let i2c = i2c.with_sda(peripherals.GPIO5).with_scl(peripherals.GPIO6);
            Some(PeerDisplay::start(Ssd1306Panel::new(i2c)))
        }
        Err(e) => {
            error!("[DISPLAY] Failed to configure I2C: {:?}", e);
            None
        }
    };

    Delay::new().delay_millis(config::DISPLAY_SETTLE_MS as u32);
    if let Some(display) = display.as_mut() {
        display.flush();
    }

    // Radio bring-up; any failure stops here and leaves the board idle
    let peer = match config::peer_address() {
        Ok(peer) => peer,
        Err(e) => {
            error!("[RADIO] Invalid peer address {:?}: {}", config::PEER_ADDRESS, e);
            idle();
        }
    };

    let timer_group1 = TimerGroup::new(peripherals.TIMG1);
    let rng = Rng::new(peripherals.RNG);
    let wifi_init = match esp_wifi::init(timer_group1.timer0, rng, peripherals.RADIO_CLK) {
        Ok(wifi_init) => wifi_init,
        Err(e) => {
            error!("[RADIO] Error initializing WiFi driver: {:?}", e);
            idle();
        }
    };
    println!("[RADIO] WiFi driver initialized successfully");

    // Store wifi_init in static cell for 'static lifetime
    let wifi_init = WIFI_INIT_CELL.init(wifi_init);

    let (controller, interfaces) = match esp_wifi::wifi::new(wifi_init, peripherals.WIFI) {
        Ok(parts) => parts,
        Err(e) => {
            error!("[RADIO] Error creating WiFi controller: {:?}", e);
            idle();
        }
    };

    let link = match radio::start(controller, interfaces, peer) {
        Ok(link) => link,
        Err(e) => {
            error!("[RADIO] Error initializing ESP-NOW: {}", e);
            idle();
        }
    };
    println!("[RADIO] ESP-NOW link ready");

    let outgoing = match PeerName::new(config::DEVICE_NAME) {
        Ok(name) => Packet::outgoing(name),
        Err(e) => {
            error!("[MAIN] Invalid device name {:?}: {}", config::DEVICE_NAME, e);
            idle();
        }
    };

    if let Some(display) = display.as_mut() {
        display.show_waiting();
    }

    // Driver handles stay in the static cell; tasks borrow the two halves they need
    let RadioLink {
        sender, receiver, ..
    } = RADIO_CELL.init(link);

    // Initialize embassy executor and run tasks
    let executor = EXECUTOR.init(Executor::new());
    executor.run(move |spawner| {
        println!("[MAIN] Spawning dispatcher task...");
        spawner.spawn(dispatcher_task(display)).ok();

        println!("[MAIN] Spawning receive task...");
        spawner.spawn(receive_task(receiver)).ok();

        println!("[MAIN] Spawning broadcast task...");
        let schedule = BroadcastSchedule::new(Instant::now(), config::BROADCAST_INTERVAL);
        let broadcaster = Broadcaster::new(sender, schedule, peer, outgoing);
        match spawner.spawn(broadcast_task(broadcaster)) {
            Ok(_) => println!("[MAIN] ✅ Broadcast task spawned successfully"),
            Err(e) => println!("[MAIN] ❌ Failed to spawn broadcast task: {:?}", e),
        }
    });
}

/// Park the board after a setup failure; no tasks or callbacks are running
fn idle() -> ! {
    error!("[MAIN] Setup aborted, restart the board to retry");
    let delay = Delay::new();
    loop {
        delay.delay_millis(1000);
    }
}
