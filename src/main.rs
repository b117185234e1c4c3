use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use firma_json::{ConfigSource, Pipeline};

/// Sign a local JSON document with the remote signing service.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// JSON document to sign
    document: PathBuf,
    /// JSON file with default configuration values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "ENTITY")]
    entity: Option<String>,
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,
    #[arg(long, env = "RUN")]
    run: Option<String>,
    #[arg(long, env = "PURPOSE")]
    purpose: Option<String>,
    #[arg(long, env = "API_TOKEN_KEY", hide_env_values = true)]
    api_token_key: Option<String>,
    /// Signing endpoint URL
    #[arg(long, env = "ENDPOINT_API")]
    endpoint: Option<String>,
    /// Timeout for the signing call, in seconds
    #[arg(long, env = "SIGN_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

impl Args {
    fn config_source(&self) -> ConfigSource {
        ConfigSource {
            entity: self.entity.clone(),
            secret_key: self.secret_key.clone(),
            run: self.run.clone(),
            purpose: self.purpose.clone(),
            api_token_key: self.api_token_key.clone(),
            endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let file_source = match &args.config {
        Some(path) => ConfigSource::load(path)?,
        None => ConfigSource::default(),
    };
    let config = file_source.merge(args.config_source()).validate()?;
    log::debug!("Using {config:?}");

    let pipeline = Pipeline::new(&config).context("Failed to create signing client")?;
    let outcome = pipeline
        .run(&args.document)
        .with_context(|| format!("Failed to sign {}", args.document.display()))?;

    println!("{}", outcome.output_path.display());

    Ok(())
}
