//! Example: Discovering Hue Bluetooth Lights
//!
//! Scans for lights advertising the Hue BLE service, connects to each one
//! and prints the descriptor the bridge would register.
//!
//! Run with: `cargo run --example discover_lights`

use std::time::Duration;

use huebl_core::{Driver, DriverConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Scanning for Hue Bluetooth lights...");
    println!();

    let config = DriverConfig::new().scan_duration(Duration::from_secs(10));
    let driver = Driver::bluetooth(&config).await?;

    let mut lights = Vec::new();
    driver.discover(&mut lights).await;

    if lights.is_empty() {
        println!("No lights found.");
        println!();
        println!("Make sure:");
        println!("  - The light is powered on");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - The light is in pairing mode or already paired with this computer");
    } else {
        println!("Found {} light(s):", lights.len());
        println!();
        for light in &lights {
            println!("{}", serde_json::to_string_pretty(light)?);
        }
    }

    driver.shutdown().await;
    Ok(())
}
