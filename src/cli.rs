use clap::{ArgAction, Parser, Subcommand};
use mirrorhash_mirror::Distro;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "mirrorhash", version)]
#[command(about = "Crawl Linux package mirrors and hash every package and every file inside it")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to config.toml in the platform config directory).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving one folder of tables per distribution.
    #[arg(long, global = true, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// More logging; repeat for more detail. Ignored when RUST_LOG is set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List supported distributions, their package format and mirror roots.
    Distros,
    /// Walk the mirror listings and queue every package found.
    Discover {
        #[arg(value_parser = parse_distro)]
        distro: Distro,

        /// Only count packages; leave the queue alone.
        #[arg(long)]
        dry_run: bool,
    },
    /// Hash queued packages until the queue is drained or interrupted.
    Hash {
        #[arg(value_parser = parse_distro)]
        distro: Distro,

        #[arg(short, long, value_name = "N")]
        workers: Option<usize>,
    },
    /// Discover, then hash.
    Run {
        #[arg(value_parser = parse_distro)]
        distro: Distro,

        #[arg(short, long, value_name = "N")]
        workers: Option<usize>,
    },
    /// Show how many packages are pending, in progress, done and failed.
    Status {
        #[arg(value_parser = parse_distro)]
        distro: Distro,

        /// Show attempts and the last failure of one package instead.
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
    /// Write the queue as a url,state table.
    Export {
        #[arg(value_parser = parse_distro)]
        distro: Distro,

        /// Defaults to urls.csv in the distribution's output directory.
        #[arg(long, value_name = "FILE")]
        to: Option<PathBuf>,
    },
    /// Queue the URLs of an existing url,state table.
    Import {
        #[arg(value_parser = parse_distro)]
        distro: Distro,

        #[arg(value_name = "CSV")]
        csv: PathBuf,
    },
}

fn parse_distro(value: &str) -> Result<Distro, String> {
    value.parse::<Distro>().map_err(|err| (*err).to_string())
}

impl Cli {
    /// The log filter `-v` flags ask for.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["mirrorhash", "discover", "ubuntu"], Commands::Discover { distro: Distro::Ubuntu, dry_run: false })]
    #[case(&["mirrorhash", "discover", "--dry-run", "archlinux"], Commands::Discover { distro: Distro::Arch, dry_run: true })]
    #[case(&["mirrorhash", "hash", "rocky", "-w", "4"], Commands::Hash { distro: Distro::Rocky, workers: Some(4) })]
    #[case(&["mirrorhash", "run", "alpine"], Commands::Run { distro: Distro::Alpine, workers: None })]
    #[case(&["mirrorhash", "status", "fedora"], Commands::Status { distro: Distro::Fedora, url: None })]
    #[case(
        &["mirrorhash", "status", "alpine", "--url", "https://example.org/apk-tools-2.14.4-r0.apk"],
        Commands::Status { distro: Distro::Alpine, url: Some("https://example.org/apk-tools-2.14.4-r0.apk".to_string()) },
    )]
    #[case(
        &["mirrorhash", "export", "debian", "--to", "/tmp/urls.csv"],
        Commands::Export { distro: Distro::Debian, to: Some(PathBuf::from("/tmp/urls.csv")) },
    )]
    #[case(
        &["mirrorhash", "import", "centos", "old/urls.csv"],
        Commands::Import { distro: Distro::Centos, csv: PathBuf::from("old/urls.csv") },
    )]
    fn test_commands(#[case] args: &[&str], #[case] expected: Commands) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(format!("{:?}", cli.command), format!("{expected:?}"));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["mirrorhash", "status", "ubuntu", "-vv", "--output", "/srv/hashes"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_level(), "trace");
        assert_eq!(cli.output, Some(PathBuf::from("/srv/hashes")));
    }

    #[test]
    fn test_unknown_distro() {
        let err = Cli::try_parse_from(["mirrorhash", "hash", "gentoo"]).unwrap_err();
        assert!(err.to_string().contains("gentoo"));
    }
}
