use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use pcd_converter::{ConvertOptions, Converter, DEFAULT_CHUNK_SIZE};
use pcd_exporter::OutputFormat;
use pcd_parser::{OusterGeometry, OusterScanReader, SensorInfo};

#[derive(Parser, Debug)]
#[command(
    name = "pcap2las",
    about = "Convert Ouster lidar PCAP captures to LAS/LAZ",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
struct Cli {
    /// Path to the pcap file
    #[arg(value_name = "PCAP")]
    pcap_path: PathBuf,

    /// Path to the sensor metadata json
    #[arg(value_name = "METADATA")]
    metadata_path: PathBuf,

    /// Scans reserved per allocation; larger values are faster for large captures
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Standard (las) or compressed (laz) format
    #[arg(long, default_value = "laz")]
    format: String,

    /// UDP port of the lidar stream, overriding the metadata
    #[arg(long)]
    port: Option<u16>,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn init_logger(level: LevelFilter) {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();
}

/// Checks the arguments before any file is opened.
fn validate(args: &Cli) -> Result<ConvertOptions, String> {
    if args.chunk_size == 0 {
        return Err("chunk size must be a positive integer, got 0".to_string());
    }
    let format: OutputFormat = args.format.parse().map_err(|e| format!("{}", e))?;
    if !args.pcap_path.exists() {
        return Err(format!(
            "PCAP file does not exist: {}",
            args.pcap_path.display()
        ));
    }
    if !args.metadata_path.exists() {
        return Err(format!(
            "Metadata file does not exist: {}",
            args.metadata_path.display()
        ));
    }
    Ok(ConvertOptions {
        chunk_size: args.chunk_size,
        format,
    })
}

fn run(args: Cli) -> Result<(), String> {
    let options = validate(&args)?;

    log::info!("input pcap: {}", args.pcap_path.display());
    log::info!("metadata: {}", args.metadata_path.display());
    log::info!("chunk size: {}", args.chunk_size);
    log::info!("output format: {}", options.format);

    let start = std::time::Instant::now();

    let info = SensorInfo::from_path(&args.metadata_path).map_err(|e| e.to_string())?;
    log::info!(
        "sensor {} ({}), {}x{} with {} profile",
        info.prod_line,
        info.prod_sn,
        info.rows(),
        info.columns(),
        info.format.udp_profile_lidar
    );
    if let Some(mode) = info.lidar_mode {
        log::info!("lidar mode: {}x{} Hz", mode.columns, mode.frequency);
    }

    let reader =
        OusterScanReader::open(&args.pcap_path, &info, args.port).map_err(|e| e.to_string())?;
    let geometry = OusterGeometry::new(info);

    let summary = Converter::new(options)
        .with_progress(|progress| {
            log::debug!("Extracting pcap lidar packet #{}", progress.index + 1);
            if (progress.index + 1) % 100 == 0 {
                log::info!("extracted {} scans", progress.index + 1);
            }
        })
        .convert(reader, &geometry, &args.pcap_path)
        .map_err(|e| e.to_string())?;

    log::info!(
        "wrote {} points from {} scans to {}",
        summary.points,
        summary.scans,
        summary.output.display()
    );
    log::info!("Elapsed: {:?}", start.elapsed());
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();
    init_logger(args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("{}", message);
            ExitCode::FAILURE
        }
    }
}
