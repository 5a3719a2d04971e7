//! CLI argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ufdrfs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the ZIP or UFDR archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Empty directory to mount the archive at
    #[arg(value_name = "MOUNTPOINT")]
    pub mountpoint: PathBuf,

    /// Allow other users to access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_positional_args() {
        let cli = Cli::parse_from(["ufdrfs", "export.ufdr", "/mnt/case"]);
        assert_eq!(cli.archive, PathBuf::from("export.ufdr"));
        assert_eq!(cli.mountpoint, PathBuf::from("/mnt/case"));
        assert!(!cli.allow_other);
        assert!(!cli.verbose);
    }
}
