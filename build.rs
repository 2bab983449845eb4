fn main() {
    // Load .env file for link configuration
    load_env_config();

    // Linker scripts only exist for the chip target; host unit tests link normally
    if std::env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("riscv32") {
        linker_be_nice();
        // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
        println!("cargo:rustc-link-arg=-Tlinkall.x");
    }
}

const DEFAULT_PEER_ADDRESS: &str = "C8:C9:A3:61:CF:EA";
const DEFAULT_DEVICE_NAME: &str = "UserName";
const DEFAULT_SIGNAL_FILTER: &str = "any";

/// Longest name that still leaves room for the NUL terminator in the 32-byte wire field
const MAX_DEVICE_NAME_LEN: usize = 31;

/// Load link configuration from .env file
/// Environment variables take priority over .env file values
fn load_env_config() {
    use std::path::Path;

    // Tell cargo to rerun this build script if .env file changes
    println!("cargo:rerun-if-changed=.env");

    // Tell cargo to rerun if environment variables change
    println!("cargo:rerun-if-env-changed=PEER_ADDRESS");
    println!("cargo:rerun-if-env-changed=DEVICE_NAME");
    println!("cargo:rerun-if-env-changed=SIGNAL_FILTER");

    // Try to load .env file if it exists
    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {}", e),
        }
    }

    let peer_address = env_or_default("PEER_ADDRESS", DEFAULT_PEER_ADDRESS).to_ascii_uppercase();
    let device_name = env_or_default("DEVICE_NAME", DEFAULT_DEVICE_NAME);
    let signal_filter = env_or_default("SIGNAL_FILTER", DEFAULT_SIGNAL_FILTER).to_ascii_lowercase();

    if !is_mac_address(&peer_address) {
        panic!(
            "PEER_ADDRESS must look like AA:BB:CC:DD:EE:FF, got {:?}",
            peer_address
        );
    }

    if device_name.len() > MAX_DEVICE_NAME_LEN || device_name.bytes().any(|b| b == 0) {
        panic!(
            "DEVICE_NAME must be at most {} bytes without NUL characters, got {:?}",
            MAX_DEVICE_NAME_LEN, device_name
        );
    }

    if signal_filter != "any" && signal_filter != "peer" {
        panic!(
            "SIGNAL_FILTER must be \"any\" or \"peer\", got {:?}",
            signal_filter
        );
    }

    // Set environment variables for the compilation
    println!("cargo:rustc-env=PEER_ADDRESS={}", peer_address);
    println!("cargo:rustc-env=DEVICE_NAME={}", device_name);
    println!("cargo:rustc-env=SIGNAL_FILTER={}", signal_filter);

    println!("cargo:warning=Peer address: {}", peer_address);
    println!("cargo:warning=Device name: {}", device_name);
    println!("cargo:warning=Signal filter: {}", signal_filter);
}

/// Read a variable, falling back when it is unset or empty
fn env_or_default(key: &str, default: &str) -> String {
    let value = std::env::var(key).unwrap_or_default().trim().to_string();
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn is_mac_address(value: &str) -> bool {
    let octets: Vec<&str> = value.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => match what.as_str() {
                "_stack_start" => {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
                "esp_wifi_preempt_enable"
                | "esp_wifi_preempt_yield_task"
                | "esp_wifi_preempt_task_create" => {
                    eprintln!();
                    eprintln!("💡 `esp-wifi` has no scheduler enabled. Make sure you have the `builtin-scheduler` feature enabled, or that you provide an external scheduler.");
                    eprintln!();
                }
                _ => (),
            },
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    println!(
        "cargo:rustc-link-arg=--error-handling-script={}",
        std::env::current_exe().unwrap().display()
    );
}
