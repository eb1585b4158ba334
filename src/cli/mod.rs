pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "postdeck")]
#[command(about = "A terminal browser for blog posts, local or over the network", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/postdeck/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of parallel workers for downloading posts
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the TUI (default)
    Tui {
        /// Open the newest post as soon as posts load
        #[arg(long)]
        latest: bool,
    },
    /// Serve the TUI to remote terminals over TCP
    Serve {
        /// Port to listen on (default: server.port from the config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (default: server.host from the config)
        #[arg(long)]
        host: Option<String>,

        /// Open the newest post as soon as posts load
        #[arg(long)]
        latest: bool,
    },
    /// Fetch posts and print them, newest first
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_tui() {
        let cli = Cli::parse_from(["postdeck"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_serve_with_global_config() {
        let cli = Cli::parse_from(["postdeck", "serve", "--port", "2222", "--config", "alt.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        match cli.command {
            Some(Commands::Serve { port, host, latest }) => {
                assert_eq!(port, Some(2222));
                assert!(host.is_none());
                assert!(!latest);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_tui_latest() {
        let cli = Cli::parse_from(["postdeck", "-w", "8", "tui", "--latest"]);
        assert_eq!(cli.workers, Some(8));
        assert!(matches!(cli.command, Some(Commands::Tui { latest: true })));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
