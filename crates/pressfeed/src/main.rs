// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! pressfeed - a private Composer registry for installed WordPress plugins
//! and themes.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;
mod shutdown;
mod watcher;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pressfeed_config::PressfeedConfig;

/// pressfeed - serve installed plugins and themes as a Composer repository.
#[derive(Parser, Debug)]
#[command(name = "pressfeed", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the registry server.
    Serve,
    /// List the packages the feed exposes and their versions.
    List,
    /// Build release archives for the installed version of every visible package.
    Archive,
    /// Manage API keys.
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Validate the configuration and exit.
    Check,
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Generate a key and print it as a `[[keys]]` entry for the key file.
    New {
        /// Name of the key's owner.
        user: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<PressfeedConfig, ExitCode> {
    let loaded = match path {
        Some(path) => pressfeed_config::load_and_validate_path(path),
        None => pressfeed_config::load_and_validate(),
    };
    loaded.map_err(|errors| {
        pressfeed_config::render_errors(&errors);
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Keys {
        action: KeysAction::New { user },
    } = &cli.command
    {
        return commands::new_key(user);
    }

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::List => commands::list(config).await,
        Commands::Archive => commands::archive(config).await,
        Commands::Check => {
            commands::check(&config);
            Ok(())
        }
        Commands::Keys { .. } => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["pressfeed", "list", "--config", "/tmp/p.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(cli.command, Commands::List));

        let cli = Cli::try_parse_from(["pressfeed", "keys", "new", "alice"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Keys { action: KeysAction::New { ref user } } if user == "alice"
        ));
    }
}
