use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

use crate::restore::RestoreOptions;

#[derive(Parser, Debug)]
#[command(name = "tts-restore")]
#[command(version)]
#[command(about = "Restore a TTS mod or save file to cache from a backup .zip", long_about = None)]
#[command(after_help = "Examples:\n  \
  tts-restore backup.zip                     restore into the default game data directory\n  \
  tts-restore -n backup.zip                  only print which files would be restored\n  \
  tts-restore --restorename Copy backup.zip  list the restored item as 'Copy'")]
pub struct Cli {
    /// The backup file in zip format
    #[arg(value_name = "FILENAME")]
    pub file: PathBuf,

    /// The path to the TTS game data directory
    #[arg(long, value_name = "PATH", env = "TTS_GAMEDATA")]
    pub gamedata: Option<PathBuf>,

    /// The name to use for the mod inside TTS (if different from the one in the backup)
    #[arg(long, value_name = "RESTORENAME")]
    pub restorename: Option<String>,

    /// Rewrite objects that already exist in the cache
    #[arg(short = 'r', long)]
    pub rewrite: bool,

    /// Only print which files would be restored
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// More output (-vv => debug and trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Quiet mode (-qq => errors only)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        match (self.verbose, self.quiet) {
            (0, 0) => Level::INFO,
            (0, 1) => Level::WARN,
            (0, _) => Level::ERROR,
            (1, _) => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    pub fn restore_options(&self) -> RestoreOptions {
        RestoreOptions {
            archive: self.file.clone(),
            restore_name: self.restorename.clone(),
            rewrite: self.rewrite,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from([
            "tts-restore",
            "-rn",
            "--gamedata",
            "/games/tts",
            "--restorename",
            "Custom",
            "backup.zip",
        ])
        .unwrap();

        let options = cli.restore_options();
        assert!(options.rewrite && options.dry_run);
        assert_eq!(options.archive, PathBuf::from("backup.zip"));
        assert_eq!(options.restore_name.as_deref(), Some("Custom"));
        assert_eq!(cli.gamedata, Some(PathBuf::from("/games/tts")));
    }

    #[test]
    fn verbosity_maps_to_level() {
        let level = |args: &[&str]| {
            let mut argv = vec!["tts-restore", "backup.zip"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap().log_level()
        };

        assert_eq!(level(&[]), Level::INFO);
        assert_eq!(level(&["-q"]), Level::WARN);
        assert_eq!(level(&["-qq"]), Level::ERROR);
        assert_eq!(level(&["-vv"]), Level::TRACE);
        assert!(Cli::try_parse_from(["tts-restore", "-v", "-q", "backup.zip"]).is_err());
    }
}
