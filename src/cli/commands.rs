use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Advances a multi-stage CI pipeline in reaction to check-run events
#[derive(Parser, Debug)]
#[command(
    name = "checkrun-cascade",
    about = "Advances a multi-stage CI pipeline in reaction to check-run events",
    version,
    long_about = "checkrun-cascade reads a GitHub `check_run` webhook payload and, when a \
                  pipeline stage completed, starts the next stage exactly once. All \
                  coordination state is recovered from check-run text fields, so \
                  re-delivered events are harmless."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Handle a check-run webhook payload",
        long_about = "Runs the cascade for one check_run webhook delivery against the GitHub \
                      API and prints the outcome.\n\n\
                      Examples:\n  \
                      checkrun-cascade handle payload.json\n  \
                      cat payload.json | checkrun-cascade handle"
    )]
    Handle(PayloadArgs),

    #[command(
        about = "Show how a payload would be classified",
        long_about = "Parses a check_run webhook payload and prints the stage it resolves to, \
                      without contacting GitHub.\n\n\
                      Examples:\n  \
                      checkrun-cascade resolve payload.json"
    )]
    Resolve(PayloadArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PayloadArgs {
    #[arg(
        value_name = "PAYLOAD",
        help = "Path to the webhook JSON payload (reads stdin when omitted or '-')"
    )]
    pub payload: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_handle_with_path() {
        let args = CliArgs::parse_from(["checkrun-cascade", "handle", "/tmp/event.json"]);
        match args.command {
            Commands::Handle(payload) => {
                assert_eq!(payload.payload, Some(PathBuf::from("/tmp/event.json")));
            }
            _ => panic!("Expected Handle command"),
        }
    }

    #[test]
    fn test_resolve_defaults_to_stdin() {
        let args = CliArgs::parse_from(["checkrun-cascade", "resolve"]);
        match args.command {
            Commands::Resolve(payload) => assert!(payload.payload.is_none()),
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from([
            "checkrun-cascade",
            "handle",
            "-v",
            "--log-level",
            "trace",
        ]);
        assert!(args.verbose);
        assert_eq!(args.log_level.as_deref(), Some("trace"));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = CliArgs::try_parse_from(["checkrun-cascade", "handle", "-v", "-q"]);
        assert!(result.is_err());
    }
}
