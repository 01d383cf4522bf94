//! CLI module for the key server
//!
//! - `serve`: run the HTTP server
//! - `check-config`: load and validate configuration, then exit

pub mod serve;

use clap::{Args, Parser, Subcommand};

/// Keybind - identity-bound access key server
#[derive(Parser)]
#[command(name = "keybind")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the key server
    Serve(ServeArgs),

    /// Validate configuration and the admin secret without serving
    CheckConfig,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Listen port, overriding configuration and PORT
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["keybind", "serve", "--port", "8080"]).unwrap();

        match cli.command {
            Command::Serve(args) => assert_eq!(args.port, Some(8080)),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_check_config() {
        let cli = Cli::try_parse_from(["keybind", "check-config"]).unwrap();
        assert!(matches!(cli.command, Command::CheckConfig));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["keybind", "serve", "--port", "http"]).is_err());
    }
}
