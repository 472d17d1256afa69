//! Example: Reading and Setting Light State
//!
//! Connects to one light, prints its capabilities and state, then applies a
//! command given as JSON.
//!
//! Run with: `cargo run --example light_state -- <ADDRESS> ['{"on": true, "bri": 200}']`

use std::env;
use std::sync::Arc;

use huebl_core::{BtleplugTransport, Driver, LightSession};
use huebl_types::LightCommand;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let Some(address) = args.next() else {
        eprintln!("Usage: light_state <ADDRESS> [COMMAND_JSON]");
        std::process::exit(2);
    };
    let command: Option<LightCommand> = args.next().map(|s| serde_json::from_str(&s)).transpose()?;

    let transport = Arc::new(BtleplugTransport::new().await?);

    let session = LightSession::connect(transport.as_ref(), &address).await?;
    println!("Name:         {}", session.name());
    println!("Model:        {}", session.model());
    println!(
        "Manufacturer: {}",
        session.manufacturer().unwrap_or("unknown")
    );
    println!("Capabilities: {:?}", session.capabilities());
    session.disconnect().await;

    let driver = Driver::new(transport);
    if let Some(command) = command {
        let report = driver.try_apply(&address, &command).await?;
        println!("Applied: {:?}", report.applied);
        if !report.unsupported.is_empty() {
            println!("Unsupported: {:?}", report.unsupported);
        }
    }

    let state = driver.try_read_state(&address).await?;
    println!("State: {}", serde_json::to_string(&state)?);

    driver.shutdown().await;
    Ok(())
}
