//! Audio device listing command.

use clap::Args;

use pulso_io::{CpalHost, RenderHost};

#[derive(Args)]
pub struct DevicesArgs {}

pub fn run(_args: DevicesArgs) -> anyhow::Result<()> {
    let host = CpalHost::new();
    let devices = host.list_devices()?;

    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    println!("Output Devices");
    println!("==============");
    for (index, device) in devices.iter().enumerate() {
        println!(
            "  [{index}] {} ({} Hz)",
            device.name, device.default_sample_rate
        );
    }
    Ok(())
}
