mod cli;

use anyhow::{Context, Result};
use aura_install::staging::StagingMode;
use aura_install::{InstallConfig, pipeline, platform};
use clap::Parser;
use log::error;

fn main() {
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match real_main() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn real_main() -> Result<i32> {
    let args = cli::Args::parse();
    let mut config = InstallConfig::load(args.config.as_deref())?;

    match args.sub.unwrap_or_else(cli::Cmd::default_install) {
        cli::Cmd::Install {
            source_dir,
            link,
            strict,
        } => {
            if let Some(dir) = source_dir {
                config.artifacts.source_dir = Some(dir);
            }
            if link {
                config.artifacts.staging = StagingMode::Link;
            }
            run_install(config, strict)
        }
        cli::Cmd::Info => handle_info(config),
    }
}

/// Run the pipeline. Step failures are logged by the pipeline and only
/// change the exit status under `--strict`.
fn run_install(config: InstallConfig, strict: bool) -> Result<i32> {
    let source_dir = config.source_dir()?;
    let host = platform::native(config, source_dir);
    let report = pipeline::install(host.as_ref()).context("Installation aborted")?;
    Ok(report.exit_code(strict))
}

/// Print what an install would do on this host.
fn handle_info(config: InstallConfig) -> Result<i32> {
    let source_dir = config.source_dir()?;
    let host = platform::native(config, source_dir);
    let (ctx, layout) = pipeline::inspect(host.as_ref()).context("Failed to resolve host")?;

    println!("family:       {}", host.family());
    println!("user:         {}", ctx.user_name);
    println!("os:           {}", ctx.os_name);
    println!("elevated:     {}", ctx.is_superuser);
    println!("install dir:  {}", layout.install_dir);
    println!(
        "binary:       {} -> {}",
        layout.binary.source.display(),
        layout.binary.dest.display()
    );
    for (label, artifact) in [("service:", &layout.service), ("timer:", &layout.timer)] {
        if let Some(artifact) = artifact {
            println!(
                "{label:<13} {} -> {}",
                artifact.source.display(),
                artifact.dest.display()
            );
        }
    }
    Ok(0)
}
