mod rx;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, eyre};
use ironwave_hackrf::Device;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Open one specific HackRF, chosen by serial number
    #[arg(short = 'd', long)]
    serial: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List attached devices
    Devices,
    /// Show identity information for one device
    Info,
    /// Receive and report amplitude statistics
    Rx(rx::Cmd),
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();

    if let Commands::Devices = args.command {
        let devices = ironwave_hackrf::list_devices().wrap_err("couldn't list HackRF devices")?;
        if devices.is_empty() {
            println!("no HackRF devices found");
        }
        for device in &devices {
            println!("{}  {}", device.serial, device.board);
        }
        return Ok(());
    }

    let device = open(args.serial.as_deref())?;
    match &args.command {
        Commands::Devices => unreachable!("handled before opening a device"),
        Commands::Info => info(&device),
        Commands::Rx(cmd) => cmd.run(&device),
    }?;

    device.close().wrap_err("failed closing the device")?;
    ironwave_hackrf::shutdown().wrap_err("failed shutting down the driver")?;
    Ok(())
}

fn open(serial: Option<&str>) -> color_eyre::Result<Device> {
    match serial {
        Some(serial) => ironwave_hackrf::list_devices()
            .wrap_err("couldn't list HackRF devices")?
            .into_iter()
            .find(|d| d.serial == serial)
            .ok_or_else(|| eyre!("couldn't locate HackRF serial {serial}"))?
            .open()
            .wrap_err("couldn't open the selected HackRF"),
        None => ironwave_hackrf::open_first().wrap_err("failed to open a HackRF"),
    }
}

fn info(device: &Device) -> color_eyre::Result<()> {
    let info = device.info();
    println!("serial:   {}", device.serial());
    println!("board:    {}", info.board_id()?);
    println!("firmware: {}", info.version_string()?);
    println!("USB API:  {:#06x}", info.usb_api_version()?);
    Ok(())
}
