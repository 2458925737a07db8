//! CLI argument parsing for bridges.

use std::path::PathBuf;

/// Common CLI arguments for all bridges.
///
/// Flatten into a bridge's own `clap::Parser` struct with
/// `#[command(flatten)]`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BridgeArgs {
    /// Path to configuration file (JSON5). Built-in defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        common: BridgeArgs,
    }

    #[test]
    fn test_args_flatten() {
        let cli = TestCli::parse_from(["bridge", "-c", "gate.json5", "--log-level", "debug"]);
        assert_eq!(cli.common.config, Some(PathBuf::from("gate.json5")));
        assert_eq!(cli.common.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_args_default_config() {
        let cli = TestCli::parse_from(["bridge"]);
        assert!(cli.common.config.is_none());
        assert!(cli.common.log_level.is_none());
    }
}
