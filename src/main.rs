//! `license-audit`: inventory dependency manifests and audit their licenses.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load and layer the configuration, then apply flag overrides ([`config::load`]).
//! 3. Walk the scan paths, dispatching manifests to analyzers ([`scanner`], [`analyzer`]).
//! 4. Optionally enrich unknown licenses from package registries (`--online`, [`registry`]).
//! 5. Classify licenses against the configured lists ([`audit`]).
//! 6. Render the requested report ([`report`]).
//! 7. Exit `0` (clean), `1` (audit found issues) or `2` (fatal error).

mod analyzer;
mod audit;
mod cli;
mod config;
mod ignore;
mod license;
mod models;
mod registry;
mod report;
mod scanner;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use cli::{Cli, Command};
use config::OutputFormat;
use models::Dependency;
use scanner::Scanner;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

/// Initialize tracing on stderr so reports on stdout stay clean.
fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if let Some(Command::Init { dir, force }) = &cli.command {
        init(dir, *force)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = config::load(cli.config.as_deref())?;

    // Command-line flags win over every config layer
    if let Some(format) = cli.format {
        config.output_format = format;
    }
    if let Some(output) = &cli.output {
        config.output_file = Some(output.clone());
    }
    if let Some(path) = &cli.path {
        config.scan_paths = vec![path.clone()];
    }
    if let Some(enabled) = cli.audit {
        config.enable_audit = enabled;
    }
    config.validate()?;

    let scanner = Scanner::new(&config);
    let mut result = scanner.scan()?;
    info!("found {} dependencies", result.dependencies.len());

    if cli.online {
        enrich_online(&mut result.dependencies, cli.quiet).await?;
        // Overrides always win over registry data
        scanner.apply_overrides(&mut result.dependencies);
        result.summary = scanner::summarize(&result.dependencies);
    }

    if config.enable_audit {
        let auditor = audit::Auditor::new(&config);
        result.issues = auditor.audit(&result.dependencies);
        result.summary.issue_breakdown = audit::issue_breakdown(&result.issues);
        info!("audit raised {} issues", result.issues.len());
    }

    // Render report
    let rendered = match config.output_format {
        OutputFormat::Json => Some(report::json::render(&result)?),
        OutputFormat::Markdown => Some(report::markdown::render(&result)),
        OutputFormat::Terminal => {
            report::terminal::render(&result, cli.verbose, cli.quiet);
            None
        }
    };

    if let Some(content) = rendered {
        let target = config
            .output_file
            .clone()
            .or_else(|| config.output_format.default_output_file().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("-"));
        report::write_output(&content, &target)?;

        if target.as_os_str() != "-" && !cli.quiet {
            eprintln!(
                "{} Report written to {}",
                "License audit completed.".green(),
                target.display()
            );
        }
    }

    // Exit code: 1 if the audit raised anything
    if config.enable_audit && !result.issues.is_empty() {
        return Ok(ExitCode::from(1));
    }

    Ok(ExitCode::SUCCESS)
}

/// Write the default config and ignore file into `dir`.
fn init(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(config::CONFIG_FILE_NAME);
    let ignore_path = dir.join(ignore::DEFAULT_IGNORE_FILE);

    if !force {
        for path in [&config_path, &ignore_path] {
            if path.exists() {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
        }
    }

    config::write_default(&config_path)?;
    ignore::write_default_ignore_file(&ignore_path)?;

    println!("{} {}", "Created".green(), config_path.display());
    println!("{} {}", "Created".green(), ignore_path.display());
    Ok(())
}

/// Look up licenses still at `UNKNOWN` in the matching package registry.
async fn enrich_online(deps: &mut [Dependency], quiet: bool) -> Result<()> {
    use futures::future::join_all;

    const BATCH_SIZE: usize = 75;

    let mut pending: Vec<&mut Dependency> = deps
        .iter_mut()
        .filter(|d| d.has_unknown_license() && registry::supports(d.package_type))
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let pb = if !quiet {
        let pb = ProgressBar::new(pending.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut resolved = 0usize;
    for batch in pending.chunks_mut(BATCH_SIZE) {
        let futures: Vec<_> = batch
            .iter()
            .map(|dep| {
                let client = client.clone();
                let name = dep.name.clone();
                let version = dep.version.clone();
                let ecosystem = dep.package_type;
                async move { registry::fetch_license(&client, ecosystem, &name, &version).await }
            })
            .collect();

        let results = join_all(futures).await;

        for (dep, result) in batch.iter_mut().zip(results) {
            match result {
                Ok(Some(license)) => {
                    dep.set_license(&license);
                    resolved += 1;
                }
                Ok(None) => {}
                Err(e) => debug!("registry lookup failed for {}: {:#}", dep.name, e),
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }
    info!("resolved {} licenses online", resolved);

    Ok(())
}
