//! catsinit - Main CLI Entry Point

use anyhow::Result;
use catsinit::{
    artifacts::FsArtifacts,
    bootstrap::{BootstrapController, Outcome, RunMode},
    cli::{Args, Commands},
    config::Config,
    gate,
    host::RedisHost,
    telemetry,
};
use clap::Parser;
use colored::Colorize;
use serde_json::json;

/// Exit status for errors that are not bootstrap outcomes
const EXIT_CODE_ERROR: i32 = 1;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    telemetry::init(args.verbosity());

    let code = match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "bootstrap aborted");
            if args.json {
                println!("{}", json!({ "outcome": "error", "error": format!("{:#}", e) }));
            } else {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            }
            EXIT_CODE_ERROR
        }
    };

    std::process::exit(code);
}

async fn run(args: &Args) -> Result<i32> {
    let config = Config::load(args.config.as_deref())?.with_url(args.url.clone());

    let mode = match args.command() {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            return Ok(0);
        }
        Commands::Check => RunMode::DryRun,
        Commands::Run => RunMode::Apply,
    };

    let mut host = RedisHost::open(&config.service.url)?;
    tracing::info!(url = %host.url(), ?mode, "starting bootstrap");

    let artifacts = FsArtifacts::new(config.model.clone(), config.script.clone());
    let mut controller = BootstrapController::new(config.flag.clone()).with_mode(mode);
    let outcome = controller.run(&mut host, &artifacts).await?;

    if args.json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        report(&outcome, host.url());
    }

    Ok(outcome.exit_code())
}

/// Print a human-readable summary of the outcome
fn report(outcome: &Outcome, url: &str) {
    match outcome {
        Outcome::Done {
            model,
            script,
            flag_written,
        } => {
            println!("Loading model - {}", model);
            println!("Loading gear - {}", script);
            if *flag_written {
                println!("{}", "✓ Flag initialization as done".green());
            } else {
                println!(
                    "{}",
                    "✓ Installed; flag was already set by another run".yellow()
                );
            }
        }
        Outcome::AlreadyInitialized => {
            println!("Discovered evidence of a previous initialization - skipping.");
        }
        Outcome::GateFailed(failure) => {
            println!("{}", failure.to_string().yellow());
            println!(
                "  Upgrade {} and run catsinit again.",
                gate::display_name(&failure.module)
            );
        }
        Outcome::Pending => {
            println!(
                "{}",
                "Module versions OK and no previous initialization found; run will install."
                    .cyan()
            );
        }
        Outcome::InstallFailed(failure) => {
            eprintln!(
                "{} failed to install {}: {}",
                "✗".red(),
                failure.artifact,
                failure.reason
            );
            eprintln!("  Initialization flag not set; a rerun installs both artifacts again.");
        }
        Outcome::ConnectivityFailed { reason } => {
            eprintln!("{} Redis unavailable at {}", "✗".red(), url);
            eprintln!("  {}", reason);
        }
    }
}
