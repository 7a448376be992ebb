//! Command-line surface.
//!
//! Only the leading command name is structured; everything after it is
//! forwarded untouched so command plugins own their flag vocabulary
//! (including `--help`).

use clap::Parser;

/// Pluggable build tooling for front-end projects.
#[derive(Debug, Parser)]
#[command(name = "forgepack", version, disable_help_flag = true)]
pub struct Cli {
    /// Command to run (serve, build, inspect, help)
    #[arg(allow_hyphen_values = true)]
    pub command: Option<String>,

    /// Arguments forwarded to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// The full token stream the command dispatcher parses: the command name
    /// followed by its arguments.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        if let Some(command) = &self.command {
            tokens.push(command.clone());
        }
        tokens.extend(self.args.iter().cloned());
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_and_forwarded_args() {
        let cli = Cli::parse_from(["forgepack", "build", "--target", "lib", "src/index.js"]);
        assert_eq!(cli.command.as_deref(), Some("build"));
        assert_eq!(cli.tokens(), ["build", "--target", "lib", "src/index.js"]);
    }

    #[test]
    fn test_help_flag_is_forwarded_not_consumed() {
        let cli = Cli::parse_from(["forgepack", "build", "--help"]);
        assert_eq!(cli.args, ["--help"]);
    }

    #[test]
    fn test_no_command() {
        let cli = Cli::parse_from(["forgepack"]);
        assert!(cli.command.is_none());
        assert!(cli.tokens().is_empty());
    }
}
