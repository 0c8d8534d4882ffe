use std::io::{self, Write};

use anyhow::bail;
use clap::Parser;
use cpkg::{
    cli::{
        args::{CliArgs, Command},
        render,
    },
    reconcile::LockStatus,
    Cpkg, TidyMode,
};
use log::warn;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = tokio::select! {
        result = run() => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("Interrupted")),
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();

    let mut builder = Cpkg::builder()
        .manifest_file_name(cli_args.manifest_location)
        .lock_file_name(cli_args.lockfile_location);
    if let Some(root) = cli_args.root {
        builder = builder.root(root);
    }
    if let Some(dep_root) = cli_args.dep_root {
        builder = builder.dep_root(dep_root);
    }
    if let Some(protocol) = cli_args.protocol {
        builder = builder.protocol(protocol);
    }
    if let Some(jobs) = cli_args.jobs {
        builder = builder.jobs(jobs);
    }
    let cpkg = builder.try_build()?;

    let mut out = io::stdout().lock();
    match cli_args.cmd {
        Command::Init { module } => {
            let manifest = cpkg.init(module, None)?;
            writeln!(
                out,
                "Created manifest for {} (dep root {})",
                manifest.module,
                manifest.dep_root()
            )?;
        }
        Command::Add { modules } => {
            let edits = cpkg.add(&modules)?;
            render::edits(&mut out, &edits)?;
            writeln!(out, "Run `cpkg tidy` to update the lockfile.")?;
        }
        Command::Tidy { check: true } => {
            let outcome = cpkg.tidy(TidyMode::Check).await?;
            if outcome.status != LockStatus::UpToDate {
                bail!("{}", outcome.status);
            }
            writeln!(out, "{}", outcome.status)?;
        }
        Command::Tidy { check: false } => {
            let outcome = cpkg.tidy(TidyMode::Write).await?;
            render::tidy(&mut out, &outcome)?;
            if outcome.written.is_none() {
                writeln!(out, "{}", outcome.status)?;
            }
        }
        Command::Upgrade { all } => {
            let outcome = cpkg.upgrade(all).await?;
            for (module, error) in &outcome.plan.skipped {
                warn!("Could not check {module} for updates: {error}");
            }
            render::upgrade_plan(&mut out, &outcome.plan)?;
            if let Some(tidy) = &outcome.tidy {
                writeln!(out)?;
                render::tidy(&mut out, tidy)?;
            }
        }
        Command::List => {
            let (rows, has_lock_file) = cpkg.list()?;
            if !has_lock_file {
                warn!("No lockfile found. Run `cpkg tidy` to lock versions.");
            }
            render::list(&mut out, &rows, has_lock_file)?;
        }
        Command::Check => {
            let rows = cpkg.check().await?;
            render::outdated(&mut out, &rows)?;
        }
        Command::Graph => {
            let graph = cpkg.graph()?;
            render::graph(&mut out, &graph)?;
        }
        Command::Explain { module } => {
            let explanation = cpkg.explain(&module)?;
            render::explanation(&mut out, &explanation)?;
        }
        Command::Status => match cpkg.status()? {
            Some(rows) => render::status(&mut out, &rows)?,
            None => writeln!(out, "No lockfile found. Run `cpkg tidy` to create one.")?,
        },
    }
    out.flush()?;
    Ok(())
}
