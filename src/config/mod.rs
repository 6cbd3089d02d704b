//! Configuration for the `svault` tool.
//!
//! ## config.toml - User preferences
//!
//! Located at `~/.config/settings-vault/config.toml`, or in
//! `$SVAULT_CONFIG_DIR` when set.
//!
//! Contains:
//! - `dir` - Directory holding stored settings files
//! - `format` - "json" or "toml"
//! - `cache` - "strong", "weak" or "none"
//! - `max-depth` - Traversal bound when looking for encrypted properties
//!
//! `cache` and `max-depth` configure stores built with
//! [`ResolvedConfig::open_store`]. The `svault` subcommands each work on a
//! single file per run, so they only report these two values.
//!
//! The encryption passphrase is not a config file value. It comes from
//! `--key` or `SVAULT_KEY`, otherwise the built-in key is used.
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, SVAULT_CACHE_ENV, SVAULT_CONFIG_DIR_ENV,
    SVAULT_DIR_ENV, SVAULT_FORMAT_ENV, SVAULT_KEY_ENV, ValueSource, config_file_path,
    resolve_config, resolve_config_with,
};
pub use schema::{CONFIG_FILE, MAX_DEPTH_LIMIT, VaultConfig};
