//! ufdrfs - Mount ZIP and UFDR archives as a read-only filesystem.
//!
//! Opens the archive, indexes its entries into a directory tree, and
//! serves filesystem calls at the mountpoint until unmounted (e.g. via
//! `umount` or `fusermount -u`).

mod cli;
mod error;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ufdrfs_core::MountSession;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let session = MountSession::new(&cli.archive)
        .map_err(|e| error::convert_mount_error(e, &cli.archive))?;
    validate_mountpoint(&cli.mountpoint)?;

    info!(
        archive = %cli.archive.display(),
        mountpoint = %cli.mountpoint.display(),
        "mounting; unmount to exit"
    );
    ufdrfs_core::mount(session, &cli.mountpoint, cli.allow_other)
        .with_context(|| format!("failed to mount at '{}'", cli.mountpoint.display()))?;
    Ok(())
}

/// The mountpoint must be an existing, empty directory.
fn validate_mountpoint(mountpoint: &Path) -> Result<()> {
    let meta = fs::metadata(mountpoint).with_context(|| {
        format!(
            "mountpoint '{}' does not exist\nHINT: create it first: mkdir -p '{}'",
            mountpoint.display(),
            mountpoint.display()
        )
    })?;
    if !meta.is_dir() {
        bail!("mountpoint '{}' is not a directory", mountpoint.display());
    }
    if fs::read_dir(mountpoint)?.next().is_some() {
        bail!(
            "mountpoint '{}' is not empty\n\
             HINT: mounting would shadow its contents; use an empty directory.",
            mountpoint.display()
        );
    }
    Ok(())
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
