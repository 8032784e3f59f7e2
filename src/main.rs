//! skin-diagnose - run one analysis from the command line

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use skin_diagnostic_core::constants::{APP_NAME, APP_VERSION};
use skin_diagnostic_core::{
    DiagnosticError, DiagnosticPipeline, DiagnosticReport, DiagnosticResult, ImageInput, PipelineConfig,
    ProfileInput,
};

/// Fuse lesion detections, skin type and patient context into one report
#[derive(Parser, Debug)]
#[command(name = "skin-diagnose")]
#[command(version)]
#[command(about = "Analyze a skin image and print the diagnostic report as JSON", long_about = None)]
struct Args {
    /// Image to analyze
    #[arg(short, long)]
    image: PathBuf,

    /// Patient profile as inline JSON
    #[arg(short, long, conflicts_with = "profile_file")]
    profile: Option<String>,

    /// Patient profile JSON file
    #[arg(long)]
    profile_file: Option<PathBuf>,

    /// Pipeline configuration file (JSON). Environment variables are used otherwise.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the models directory
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Override the annotation output directory
    #[arg(long)]
    annotation_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    match run(args).await {
        Ok(report) => match report.to_json_pretty() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to serialize report: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}: {}", e.kind(), e);
            if e.is_fatal() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(args: Args) -> DiagnosticResult<DiagnosticReport> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::from_env(),
    };
    if let Some(dir) = args.models_dir {
        config.models_dir = dir;
    }
    if let Some(dir) = args.annotation_dir {
        config.annotation_dir = dir;
    }

    let profile = match (args.profile, args.profile_file) {
        (Some(json), _) => Some(ProfileInput::from_json_str(&json)?),
        (None, Some(path)) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| DiagnosticError::InvalidProfile(format!("{}: {}", path.display(), e)))?;
            Some(ProfileInput::from_json_str(&json)?)
        }
        (None, None) => None,
    };

    let pipeline = DiagnosticPipeline::from_config(&config)?;
    pipeline
        .analyze(&ImageInput::Path(args.image), profile.as_ref())
        .await
}
