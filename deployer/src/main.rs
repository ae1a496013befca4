//! Stackable Deployer - Entry Point
//!
//! Renders the Terraform workspace for a deployment payload and runs
//! `terraform init/destroy/plan/apply` against it.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use tracing::{error, info};

use stackable::app::run::{run_job, JobOutcome, JobRequest};
use stackable::errors::DeployError;
use stackable::filesys::file::File;
use stackable::logs::{init_logging, LogOptions};
use stackable::storage::layout::StorageLayout;
use stackable::storage::settings::Settings;
use stackable::utils::version_info;

const USAGE: &str = "Usage: stackable --payload=<payload.json> [--key=<id_rsa>] [--settings=<settings.json>] [--provider=<name>] [--templates=<dir>] [--log-file] [--render-only]";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to encode version info: {}", e),
        }
        return ExitCode::SUCCESS;
    }

    if cli_args.contains_key("help") {
        println!("{}", version_info());
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let Some(payload_path) = cli_args.get("payload").map(PathBuf::from) else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    let settings = match load_settings(&cli_args).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        json_format: settings.log_json,
        log_dir: settings.log_dir.clone(),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let request = JobRequest {
        payload_path,
        private_key_path: cli_args
            .get("key")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("id_rsa")),
        render_only: cli_args.contains_key("render-only"),
    };

    info!(
        "Running deployment with tool={} provider={} templates={}",
        settings.tool,
        settings.provider,
        settings.template_root.display()
    );

    match run_job(&settings, &request).await {
        Ok(JobOutcome::Rendered(artifacts)) => {
            for artifact in artifacts {
                println!("{}", format!("# --- {} ---", artifact.file_name).cyan());
                println!("{}", artifact.content);
            }
            ExitCode::SUCCESS
        }
        Ok(JobOutcome::Provisioned(summary)) => {
            println!("{} Deployment applied", "[SUCCESS]".green().bold());
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to encode summary: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Deployment job failed: {:?}", e);
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn load_settings(cli_args: &HashMap<String, String>) -> Result<Settings, DeployError> {
    let layout = StorageLayout::from_env();
    let mut settings = match cli_args.get("settings") {
        Some(path) => Settings::load(&File::new(path)).await?,
        None => {
            let default_file = layout.settings_file();
            if default_file.exists().await {
                Settings::load(&default_file).await?
            } else {
                Settings::default()
            }
        }
    };

    // Relative template root missing from the working directory: use the installed copy
    let installed = layout.templates_dir();
    if settings.template_root.is_relative()
        && !tokio::fs::try_exists(&settings.template_root)
            .await
            .unwrap_or(false)
        && installed.exists().await
    {
        settings.template_root = installed.path().to_path_buf();
    }
    if cli_args.contains_key("log-file") && settings.log_dir.is_none() {
        settings.log_dir = Some(layout.logs_dir().path().to_path_buf());
    }

    settings.apply_env_overrides();
    if let Some(provider) = cli_args.get("provider") {
        settings.provider = provider.clone();
    }
    if let Some(root) = cli_args.get("templates") {
        settings.template_root = PathBuf::from(root);
    }
    settings.validate()?;
    Ok(settings)
}
