//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use crate::domain::StandbyPromoMode;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Level Zero sysman control tool
///
/// Query and control Level Zero devices: power, frequency, temperature,
/// fans, standby and reset.
#[derive(Parser, Debug)]
#[command(name = "zesctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "ZESCTL_CONFIG")]
    pub config: Option<String>,

    /// Level Zero loader library to try first
    #[arg(long, global = true, env = "ZESCTL_LIBRARY")]
    pub library: Option<PathBuf>,

    /// Target driver by index (0-based)
    #[arg(long, global = true)]
    pub driver: Option<u32>,

    /// Target device by index within the driver (0-based)
    #[arg(short, long, global = true)]
    pub device: Option<u32>,

    /// Dry run mode - don't actually apply changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Run against the simulated backend
    #[cfg(feature = "mock")]
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether the simulated backend was requested
    pub fn use_mock(&self) -> bool {
        #[cfg(feature = "mock")]
        {
            self.mock
        }
        #[cfg(not(feature = "mock"))]
        {
            false
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all detected devices
    List,

    /// Show everything a device reports
    Info,

    /// Show which sysman operations the backend implements
    Caps(CapsArgs),

    /// Power readings and energy threshold
    Power(PowerArgs),

    /// Frequency domains
    Freq(FreqArgs),

    /// Temperature sensors
    Temp,

    /// Fan control
    Fan(FanArgs),

    /// Standby promotion mode
    Standby(StandbyArgs),

    /// Reset the device
    Reset(ResetArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the caps command
#[derive(Parser, Debug)]
pub struct CapsArgs {
    /// Only show operations the backend does not implement
    #[arg(long)]
    pub missing: bool,

    /// Only show one category (e.g. `power`, `fan`)
    #[arg(long)]
    pub category: Option<String>,
}

/// Arguments for power commands
#[derive(Parser, Debug)]
pub struct PowerArgs {
    #[command(subcommand)]
    pub command: PowerCommands,
}

/// Power subcommands
#[derive(Subcommand, Debug)]
pub enum PowerCommands {
    /// Show power domains and average draw
    Status {
        /// Sampling window for the average, in milliseconds
        #[arg(long, default_value = "500")]
        sample_ms: u64,
    },

    /// Arm the energy threshold of a power domain
    Threshold {
        /// Threshold in joules
        joules: f64,

        /// Power domain index
        #[arg(long, default_value = "0")]
        domain: usize,
    },
}

/// Arguments for frequency commands
#[derive(Parser, Debug)]
pub struct FreqArgs {
    #[command(subcommand)]
    pub command: FreqCommands,
}

/// Frequency subcommands
#[derive(Subcommand, Debug)]
pub enum FreqCommands {
    /// Show frequency domains
    Status,

    /// List the clocks a domain supports
    Clocks {
        /// Frequency domain index
        #[arg(long, default_value = "0")]
        domain: usize,
    },

    /// Restrict a domain's frequency range
    Range {
        /// Minimum in MHz
        min: f64,

        /// Maximum in MHz
        max: f64,

        /// Frequency domain index
        #[arg(long, default_value = "0")]
        domain: usize,
    },
}

/// Arguments for fan control commands
#[derive(Parser, Debug)]
pub struct FanArgs {
    #[command(subcommand)]
    pub command: FanCommands,
}

/// Fan subcommands
#[derive(Subcommand, Debug)]
pub enum FanCommands {
    /// Show current fan status
    Status,

    /// Hand fan control back to the hardware
    Auto {
        /// Target specific fan index
        #[arg(long)]
        fan_index: Option<usize>,
    },

    /// Pin fan speed
    Speed {
        /// Fan speed percentage (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        speed: u8,

        /// Target specific fan index
        #[arg(long)]
        fan_index: Option<usize>,
    },
}

/// Arguments for standby commands
#[derive(Parser, Debug)]
pub struct StandbyArgs {
    #[command(subcommand)]
    pub command: StandbyCommands,
}

/// Standby subcommands
#[derive(Subcommand, Debug)]
pub enum StandbyCommands {
    /// Show standby domains
    Status,

    /// Set the promotion mode of every standby domain
    Set {
        #[arg(value_enum)]
        mode: StandbyModeArg,
    },
}

/// Standby promotion mode argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StandbyModeArg {
    /// Let the hardware enter standby
    Default,
    /// Never enter standby
    Never,
}

impl From<StandbyModeArg> for StandbyPromoMode {
    fn from(arg: StandbyModeArg) -> Self {
        match arg {
            StandbyModeArg::Default => StandbyPromoMode::Default,
            StandbyModeArg::Never => StandbyPromoMode::Never,
        }
    }
}

/// Arguments for the reset command
#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Terminate processes still using the device
    #[arg(long)]
    pub force: bool,
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_list() {
        let args = Cli::try_parse_from(["zesctl", "list"]).unwrap();
        assert!(matches!(args.command, Commands::List));
        assert!(!args.use_mock() || cfg!(feature = "mock"));
    }

    #[test]
    fn test_cli_parse_verbose() {
        let args = Cli::try_parse_from(["zesctl", "-v", "temp"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::Temp));
    }

    #[test]
    fn test_cli_parse_device_selection() {
        let args =
            Cli::try_parse_from(["zesctl", "--driver", "1", "info", "--device", "2"]).unwrap();
        assert_eq!(args.driver, Some(1));
        assert_eq!(args.device, Some(2));
    }

    #[test]
    fn test_cli_parse_fan_speed() {
        let args = Cli::try_parse_from(["zesctl", "fan", "speed", "75"]).unwrap();
        let Commands::Fan(fan_args) = args.command else {
            panic!("Expected Fan command");
        };
        let FanCommands::Speed { speed, fan_index } = fan_args.command else {
            panic!("Expected Speed command");
        };
        assert_eq!(speed, 75);
        assert_eq!(fan_index, None);
    }

    #[test]
    fn test_cli_fan_speed_validation() {
        let result = Cli::try_parse_from(["zesctl", "fan", "speed", "150"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_freq_range() {
        let args =
            Cli::try_parse_from(["zesctl", "--dry-run", "freq", "range", "300", "1200"]).unwrap();
        assert!(args.dry_run);
        let Commands::Freq(freq) = args.command else {
            panic!("Expected Freq command");
        };
        let FreqCommands::Range { min, max, domain } = freq.command else {
            panic!("Expected Range command");
        };
        assert_eq!((min, max, domain), (300.0, 1200.0, 0));
    }

    #[test]
    fn test_cli_parse_standby_mode() {
        let args = Cli::try_parse_from(["zesctl", "standby", "set", "never"]).unwrap();
        let Commands::Standby(standby) = args.command else {
            panic!("Expected Standby command");
        };
        let StandbyCommands::Set { mode } = standby.command else {
            panic!("Expected Set command");
        };
        assert_eq!(StandbyPromoMode::from(mode), StandbyPromoMode::Never);
    }

    #[test]
    fn test_cli_parse_reset_force() {
        let args = Cli::try_parse_from(["zesctl", "reset", "--force"]).unwrap();
        assert!(matches!(args.command, Commands::Reset(ResetArgs { force: true })));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
