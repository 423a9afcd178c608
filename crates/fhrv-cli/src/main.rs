use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use fhrv_lib::{
    config::PipelineConfig,
    features::{ExtractionReport, FeatureExtractor},
    io::{save_table, DataType, Ingestor, OutputFormat, UserRange},
    metrics::NativeHrv,
};
use log::{info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Environment variable naming an optional TOML pipeline configuration.
const CONFIG_ENV: &str = "FHRV_CONFIG";

const ECG_FIRST_30: &str = "dataset_ecg_first_30_users.csv";
const ECG_LAST_30: &str = "dataset_ecg_last_30_users.csv";
const EDA_EMG: &str = "dataset_eda_emg.csv";
const REPORT: &str = "extraction_report.json";

#[derive(Parser)]
#[command(
    name = "fhrv",
    version,
    about = "Turn raw per-user ECG/EDA/EMG recordings into per-condition HRV feature tables"
)]
struct Cli {
    /// Folder containing the raw user<N>/ recordings
    #[arg(short = 'i', long = "input-filepath", alias = "input_filepath")]
    input_filepath: PathBuf,
    /// Folder the per-condition feature tables are written to
    #[arg(short = 'o', long = "output-filepath", alias = "output_filepath")]
    output_filepath: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = load_config()?;
    run(&cli.input_filepath, &cli.output_filepath, &config)
}

fn load_config() -> Result<PipelineConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!("Loading pipeline configuration from {}", path.display());
            PipelineConfig::read(&path)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn run(input: &Path, output: &Path, config: &PipelineConfig) -> Result<()> {
    let format = config.validate().context("invalid pipeline configuration")?;
    if !input.is_dir() {
        bail!("input folder {} does not exist", input.display());
    }

    let ingestor = Ingestor::new(input);
    let interim = &config.interim_dir;

    info!("Making interim ECG dataset for first 30 users from raw data ...");
    let ecg_first = interim.join(ECG_FIRST_30);
    ingestor
        .process(DataType::Ecg, config.ecg_delimiter, UserRange::First30)?
        .write_csv(&ecg_first)?;

    info!("Making interim ECG dataset for last 30 users from raw data ...");
    ingestor
        .process(DataType::Ecg, config.ecg_delimiter, UserRange::Last30)?
        .write_csv(&interim.join(ECG_LAST_30))?;

    info!("Making interim EDA-EMG dataset for first 30 users from raw data ...");
    ingestor
        .process(DataType::EdaEmg, config.eda_emg_delimiter, UserRange::First30)?
        .write_csv(&interim.join(EDA_EMG))?;

    info!("Making final ECG features dataset for first 30 users from interim data ...");
    let extractor = FeatureExtractor::new(config.clone(), NativeHrv::default());
    let report = extractor.run_file(&ecg_first)?;

    write_tables(&report, format, output)?;

    let report_path = interim.join(REPORT);
    let file = fs::File::create(&report_path)
        .with_context(|| format!("creating {}", report_path.display()))?;
    serde_json::to_writer_pretty(file, &report)?;

    if report.skipped_windows() > 0 {
        warn!(
            "{} window(s) skipped in total; per-user counts in {}",
            report.skipped_windows(),
            report_path.display()
        );
    }
    Ok(())
}

fn write_tables(report: &ExtractionReport, format: OutputFormat, output: &Path) -> Result<()> {
    for table in &report.tables {
        let path = save_table(table, &table.condition, format, output)?;
        info!(
            "{}: wrote {} feature row(s), skipped {} window(s) -> {}",
            table.condition,
            table.len(),
            report.skipped_in(&table.condition),
            path.display()
        );
    }
    Ok(())
}
