#![warn(clippy::all)]

#[macro_use]
extern crate log;

use clap::Parser;
use libdaqcap::{CaptureDevice, Config, DeviceRegistry, Session, ALL_PACKETS};
use rustyline::Editor;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Captures miniDAQ data from a network device and writes it to a .dat file.
///
/// DAT files are binary files containing raw miniDAQ data with no padding or
/// metadata.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output directory for the .dat file
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Network device to listen on
    #[arg(short, long)]
    device: Option<String>,

    /// Stop after capturing this many packets
    #[arg(short, long)]
    max_packets: Option<usize>,

    /// Configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<String>,
}

fn load_config(config: &mut Config, filename: &str) -> Result<(), io::Error> {
    debug!("Loading configuration {}", filename);
    let path = Path::new(&filename);
    let file = File::open(path)?;
    config.load_config(file)
}

fn run_file_name(out_dir: &Path) -> PathBuf {
    let now = time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let format =
        time::format_description::parse("[year][month][day]_[hour][minute][second]")
            .expect("time: invalid format description");
    let stamp = now.format(&format).expect("time: could not format timestamp");
    out_dir.join(format!("run_{}.dat", stamp))
}

fn print_device_list(devices: &[Arc<dyn CaptureDevice>]) {
    println!("Available network devices:");
    for (i, device) in devices.iter().enumerate() {
        println!("  {}: {} -- {}", i + 1, device.name(), device.description());
    }
}

// Prompt until the user picks a device index or gives up with an empty line.
fn prompt_for_device(
    devices: &[Arc<dyn CaptureDevice>],
) -> Option<Arc<dyn CaptureDevice>> {
    let mut repl = Editor::<()>::new().expect("could not create prompt editor");
    loop {
        let line = match repl.readline("Select a device (empty to quit): ") {
            Ok(line) => line,
            Err(_) => return None,
        };
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match line.parse::<usize>() {
            Ok(n) if n >= 1 && n <= devices.len() => {
                return Some(Arc::clone(&devices[n - 1]));
            }
            _ => println!(
                "Please enter a number between 1 and {}.",
                devices.len()
            ),
        }
    }
}

fn select_device(session: &Session, requested: Option<&str>) -> Option<Arc<dyn CaptureDevice>> {
    if let Some(name) = requested {
        if let Some(device) = session.device_by_name(name) {
            return Some(device);
        }
        println!("No device found with name: {}", name);
    }

    let devices = session.all_devices();
    if devices.is_empty() {
        println!("No network devices found. Check your permissions.");
        return None;
    }
    print_device_list(&devices);
    prompt_for_device(&devices)
}

fn main() -> Result<(), io::Error> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_env("DAQCAP_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(Level::INFO.into()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();

    let mut config = Config::default();
    if let Some(filename) = &args.config {
        load_config(&mut config, filename)?;
    }

    let mut session = Session::with_registry(DeviceRegistry::with_config(&config));

    let device = match select_device(&session, args.device.as_deref()) {
        Some(device) => device,
        None => {
            println!("No device selected. Exiting...");
            return Ok(());
        }
    };

    if let Err(e) = session.start(&device) {
        eprintln!("{}", e);
        process::exit(1);
    }
    if !device.is_open() {
        eprintln!(
            "Could not open device {}. Check your permissions.",
            device.name()
        );
        process::exit(1);
    }
    info!("listening on {}", device.name());

    let out_path = run_file_name(&args.out);
    let out_file = File::create(&out_path)?;
    let mut writer = BufWriter::new(out_file);
    info!("writing to {}", out_path.display());

    let mut packets: usize = 0;
    let mut words: usize = 0;
    loop {
        match session.fetch(Some(Duration::from_secs(10)), ALL_PACKETS) {
            Ok(blob) => {
                for warning in blob.warnings() {
                    warn!("{}", warning);
                }
                blob.write_to(&mut writer)?;
                packets += blob.packet_count();
                words += blob.word_count();
                debug!(
                    "fetched {} packets, {} words total",
                    blob.packet_count(),
                    words
                );
            }
            Err(libdaqcap::Error::TimeoutExpired) => {
                warn!("no data received in 10 seconds");
                continue;
            }
            Err(e) => {
                error!("fetch failed: {}", e);
                break;
            }
        }
        if let Some(max) = args.max_packets {
            if packets >= max {
                info!("reached {} packets, stopping", packets);
                break;
            }
        }
    }

    writer.flush()?;
    session.end();
    println!(
        "Captured {} packets ({} words) to {}",
        packets,
        words,
        out_path.display()
    );

    Ok(())
}
