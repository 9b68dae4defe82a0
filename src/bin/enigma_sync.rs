use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use enigma_genome_sync::catalog::JsonGenomeCatalog;
use enigma_genome_sync::config::{JsonConfigStore, MetadataSettings};
use enigma_genome_sync::error::SyncError;
use enigma_genome_sync::isolates::{IsolateHttpClient, MetadataFetcher};
use enigma_genome_sync::output::{JsonOutput, TextOutput};
use enigma_genome_sync::repository::HttpConnector;
use enigma_genome_sync::sync::GenomeSyncer;

#[derive(Parser)]
#[command(name = "enigma-sync")]
#[command(about = "Import ENIGMA isolate metadata and new genome assemblies")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download strain metadata from the isolate browser")]
    Metadata(MetadataArgs),
    #[command(about = "Download genomes that are missing from the catalog")]
    Genomes(GenomesArgs),
}

#[derive(Args)]
struct MetadataArgs {
    /// JSON list of {"param", "value"} pairs
    #[arg(long)]
    config: String,
}

#[derive(Args)]
struct GenomesArgs {
    /// JSON list of {"param", "value"} pairs
    #[arg(long)]
    config: String,

    /// JSON list of catalog genomes
    #[arg(long)]
    catalog: String,

    #[arg(long)]
    username: String,

    #[arg(long, env = "ENIGMA_PASSWORD", hide_env_values = true)]
    password: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::MissingConfigKey(_)
        | SyncError::InvalidConfigValue { .. }
        | SyncError::ConfigRead(_)
        | SyncError::ConfigParse(_) => 2,
        SyncError::IsolateHttp(_)
        | SyncError::IsolateStatus { .. }
        | SyncError::IsolateDecode(_)
        | SyncError::RepositoryHttp(_)
        | SyncError::RepositoryStatus { .. }
        | SyncError::Manifest { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Metadata(args) => {
            let settings = MetadataSettings::load(&JsonConfigStore::new(&args.config))?;
            let client = IsolateHttpClient::new(&settings.isolates_api_url)?;
            let metadata = MetadataFetcher::new(client, &settings).fetch_all()?;
            JsonOutput::print_metadata(&metadata).into_diagnostic()?;
            Ok(())
        }
        Commands::Genomes(args) => {
            let syncer = GenomeSyncer::new(
                JsonConfigStore::new(&args.config),
                JsonGenomeCatalog::new(&args.catalog),
                HttpConnector,
            );
            let report = syncer.sync(&args.username, &args.password)?;
            TextOutput::print_sync(&report).into_diagnostic()?;
            Ok(())
        }
    }
}
