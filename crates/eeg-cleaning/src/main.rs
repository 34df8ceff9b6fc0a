//! EEG cleaning runner: simulated recording → ICA auto-clean → summary

mod cleaning_service;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use eeg_processing::{CleaningConfig, CleaningProfile, ErrorHandling};
use eeg_simulation::SimulationConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Profile {
    Standard,
    Quick,
    Thorough,
}

impl From<Profile> for CleaningProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Standard => CleaningProfile::Standard,
            Profile::Quick => CleaningProfile::Quick,
            Profile::Thorough => CleaningProfile::Thorough,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "eeg-cleaning", about = "Remove eye and electrode artifacts from EEG with ICA")]
struct Args {
    /// Configuration preset
    #[arg(long, value_enum, default_value = "standard")]
    profile: Profile,

    /// JSON configuration file; overrides --profile
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the simulated recording and the decomposition
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Length of the simulated recording in seconds
    #[arg(long, default_value_t = 20.0)]
    duration: f64,

    /// Add a popping electrode to the simulation
    #[arg(long)]
    pops: bool,

    /// Continue when an analyzer fails
    #[arg(long)]
    bypass: bool,

    /// Name of the reference electrode
    #[arg(long)]
    reference: Option<String>,

    /// Low-pass cutoff of the display filter in Hz
    #[arg(long, default_value_t = 40.0)]
    display_lowpass: f64,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(args: &Args) -> anyhow::Result<CleaningConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            CleaningConfig::from_json(&json)?
        }
        None => CleaningConfig::for_profile(args.profile.into()),
    };

    config.decomposer.seed = args.seed;
    if args.bypass {
        config.error_handling = ErrorHandling::BypassMode;
    }
    if let Some(reference) = &args.reference {
        config.electrode.reference_lead = Some(reference.clone());
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let mut simulation = if args.pops {
        SimulationConfig::with_electrode_pops()
    } else {
        SimulationConfig::default()
    };
    simulation.seed = Some(args.seed);

    println!("Cleaning profile: {}", config.name);
    println!("Signal flow: EEG simulator → ICA decomposition → artifact analyzers → recomposition");

    let run = cleaning_service::run(config, simulation, args.duration).await?;
    cleaning_service::report(&run, args.display_lowpass)
}
