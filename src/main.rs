//! request-mapper
//!
//! Loads a deployment descriptor and answers routing questions against it.
//!
//! ```text
//! request-mapper check descriptor.toml
//! request-mapper resolve descriptor.toml http://www.example.com/shop/cart --version 2
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use url::Url;

use request_mapper::config::deploy::ConfiguredMapper;
use request_mapper::config::schema::{LogFormat, MapperConfig};
use request_mapper::config::{build_mapper, load_config};
use request_mapper::mapping::table::Named;
use request_mapper::mapping::{MappingResult, MatchKind};
use request_mapper::observability::init_logging;

#[derive(Parser)]
#[command(name = "request-mapper")]
#[command(about = "Resolve requests against a deployment descriptor", long_about = None)]
struct Cli {
    /// Log level, overriding the descriptor (RUST_LOG still wins).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format, overriding the descriptor.
    #[arg(long, global = true, value_enum)]
    log_format: Option<FormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a descriptor and summarise what it deploys
    Check {
        config: PathBuf,
    },
    /// Resolve a URL against a descriptor
    Resolve {
        config: PathBuf,
        url: String,
        /// Application version to prefer when several are deployed
        #[arg(long)]
        version: Option<String>,
    },
}

/// JSON view of a mapping result.
#[derive(Serialize)]
struct Resolution<'a> {
    host: Option<&'a str>,
    application: Option<&'a str>,
    versions: Vec<&'a str>,
    handler: Option<&'a str>,
    match_kind: Option<MatchKind>,
    template_match: bool,
    application_path: &'a str,
    request_path: &'a str,
    handler_path: &'a str,
    extra_path: &'a str,
    redirect: Option<&'a str>,
}

impl<'a> From<&'a MappingResult<String, String, String>> for Resolution<'a> {
    fn from(result: &'a MappingResult<String, String, String>) -> Self {
        Self {
            host: result.host.as_deref().map(String::as_str),
            application: result.application.as_deref().map(String::as_str),
            versions: result.applications.iter().map(|a| a.as_str()).collect(),
            handler: result.handler.as_deref().map(String::as_str),
            match_kind: result.match_kind,
            template_match: result.template_match,
            application_path: &result.application_path,
            request_path: &result.request_path,
            handler_path: &result.handler_path,
            extra_path: &result.extra_path,
            redirect: result.redirect_path.as_deref(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Commands::Check { config } => {
            let config = load(&cli, config)?;
            let mapper = build_mapper(&config)?;
            println!("{}", serde_json::to_string_pretty(&summary(&config, &mapper))?);
        }
        Commands::Resolve {
            config,
            url,
            version,
        } => {
            let config = load(&cli, config)?;
            let mapper = build_mapper(&config)?;
            let url = Url::parse(url)?;
            let result = mapper.lookup(url.host_str().unwrap_or(""), url.path(), version.as_deref());
            tracing::debug!(url = %url, result = ?result, "Resolved");
            println!("{}", serde_json::to_string_pretty(&Resolution::from(&result))?);
        }
    }
    Ok(())
}

/// Load the descriptor, then start logging with CLI overrides applied.
fn load(cli: &Cli, path: &Path) -> Result<MapperConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(path)?;
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.observability.log_format = match format {
            FormatArg::Pretty => LogFormat::Pretty,
            FormatArg::Json => LogFormat::Json,
        };
    }
    init_logging(&config.observability)?;
    // Logged here: nothing is listening while the descriptor is read.
    tracing::debug!(
        path = %path.display(),
        hosts = config.hosts.len(),
        applications = config.applications().count(),
        "Descriptor loaded"
    );
    Ok(config)
}

fn summary(config: &MapperConfig, mapper: &ConfiguredMapper) -> serde_json::Value {
    let hosts: Vec<_> = mapper
        .hosts()
        .iter()
        .filter(|h| !h.is_alias())
        .map(|host| {
            let applications: Vec<_> = host
                .applications()
                .applications()
                .iter()
                .map(|app| {
                    let versions: Vec<_> = app
                        .versions()
                        .iter()
                        .map(|v| json!({ "version": v.version(), "paused": v.is_paused() }))
                        .collect();
                    json!({ "path": app.path(), "versions": versions })
                })
                .collect();
            json!({
                "name": host.name(),
                "aliases": host.alias_names(),
                "applications": applications,
            })
        })
        .collect();

    json!({
        "valid": true,
        "default_host": config.default_host,
        "hosts": hosts,
    })
}
