//! CLI argument definitions for Settings Vault.

use crate::cache::CachePolicy;
use crate::config::ConfigOverrides;
use crate::format::Format;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Settings Vault - inspect and maintain stored settings files.
#[derive(Parser, Debug)]
#[command(name = "svault")]
#[command(author, version, about = "Inspect and maintain typed settings storage", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding stored settings files.
    /// Can also be set via SVAULT_DIR environment variable.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Stored format: json or toml
    #[arg(long, global = true, value_parser = parse_format)]
    pub format: Option<Format>,

    /// Cache policy: strong, weak or none.
    /// Applies to stores opened from this configuration; subcommands only
    /// report it through `config`.
    #[arg(long, global = true, value_parser = parse_cache)]
    pub cache: Option<CachePolicy>,

    /// Encryption passphrase (defaults to the built-in key).
    /// Can also be set via SVAULT_KEY environment variable.
    #[arg(long = "key", global = true)]
    pub passphrase: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration overrides carried by the global flags.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            dir: self.dir.clone(),
            format: self.format,
            cache: self.cache,
            passphrase: self.passphrase.clone(),
        }
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encrypt a value the way encrypted properties are stored
    Encrypt {
        /// Plaintext value
        value: String,
    },

    /// Decrypt a stored value (plaintext is returned unchanged)
    Decrypt {
        /// Stored value, possibly carrying the encryption marker
        value: String,
    },

    /// Check whether stored settings are in canonical layout
    Check {
        /// Settings key (file name without extension)
        name: String,

        /// Rewrite drifted settings, keeping a backup
        #[arg(long)]
        fix: bool,
    },

    /// Remove stored settings
    Purge {
        /// Settings key (file name without extension)
        name: String,

        /// Keep the removed data as a backup file
        #[arg(long)]
        backup: bool,
    },

    /// List stored settings keys
    List,

    /// Show resolved configuration and where each value came from
    Config,
}

fn parse_format(s: &str) -> Result<Format, String> {
    Format::parse(s).ok_or_else(|| format!("unknown format '{}', expected json or toml", s))
}

fn parse_cache(s: &str) -> Result<CachePolicy, String> {
    CachePolicy::parse(s)
        .ok_or_else(|| format!("unknown cache policy '{}', expected strong, weak or none", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "svault", "list", "-H", "--format", "TOML", "--cache", "off", "--dir", "/tmp/v",
        ])
        .unwrap();
        assert!(cli.human_readable);
        assert_eq!(cli.format, Some(Format::Toml));
        assert_eq!(cli.cache, Some(CachePolicy::None));
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/v")));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_parse_check_fix() {
        let cli = Cli::try_parse_from(["svault", "check", "AppSettings", "--fix"]).unwrap();
        match cli.command {
            Commands::Check { name, fix } => {
                assert_eq!(name, "AppSettings");
                assert!(fix);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["svault", "--format", "yaml", "list"]).is_err());
    }
}
