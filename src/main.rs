//! zesctl - Level Zero sysman control tool
//!
//! A command-line tool for querying and controlling Level Zero devices:
//! power, frequency, temperature, fans, standby and reset.

use clap::Parser;
use zesctl::cli::args::{generate_completions, Cli, Commands};
use zesctl::commands::{
    open_gate, run_caps, run_fan, run_freq, run_info, run_list, run_power, run_reset,
    run_standby, run_temp,
};
use zesctl::config::{Config, ConfigBuilder};
use zesctl::error::{AppError, ZesError};
use zesctl::sysman::SysmanGate;

fn main() {
    // Initialize logging; without RUST_LOG the max level starts at warn
    // and verbose mode raises it
    let rust_log = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format_timestamp(None)
        .init();
    if !rust_log {
        log::set_max_level(max_level(false));
    }

    // Parse CLI arguments
    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|config| {
        // Set log level based on verbose flag
        if !rust_log {
            log::set_max_level(max_level(config.general.verbose));
        }
        run(&cli, &config)
    });

    SysmanGate::teardown_global();

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

/// Effective log level when `RUST_LOG` is not set
fn max_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    }
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let config = ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_verbose(cli.verbose.then_some(true))
        .with_dry_run(cli.dry_run.then_some(true))
        .with_library_path(cli.library.clone())
        .with_driver_index(cli.driver)
        .with_device_index(cli.device)
        .build()?;
    Ok(config)
}

fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    if let Commands::Completions { shell } = &cli.command {
        generate_completions(*shell);
        return Ok(());
    }

    let gate = open_gate(config, cli.use_mock())?;
    let device = &config.device;
    let dry_run = config.general.dry_run;

    match &cli.command {
        Commands::List => run_list(gate, cli.format),

        Commands::Info => run_info(gate, cli.format, device),

        Commands::Caps(args) => run_caps(gate, args, cli.format),

        Commands::Power(args) => run_power(gate, args, cli.format, device, dry_run),

        Commands::Freq(args) => run_freq(gate, args, cli.format, device, dry_run),

        Commands::Temp => run_temp(gate, cli.format, device),

        Commands::Fan(args) => run_fan(gate, args, cli.format, device, dry_run),

        Commands::Standby(args) => run_standby(gate, args, cli.format, device, dry_run),

        Commands::Reset(args) => run_reset(gate, args, cli.format, device, dry_run),

        Commands::Completions { .. } => Ok(()),
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Sysman(ZesError::Uninitialized) => {
            eprintln!();
            eprintln!("Hint: Make sure the Level Zero loader is installed.");
            eprintln!("      On Linux, install the level-zero package, or point");
            eprintln!("      ZESCTL_LIBRARY at libze_loader.so.1.");
        }
        AppError::Sysman(ZesError::InsufficientPermissions) => {
            eprintln!();
            eprintln!("Hint: Try running with sudo or as root.");
        }
        AppError::Sysman(ZesError::UnsupportedFeature) => {
            eprintln!();
            eprintln!("Hint: Run 'zesctl caps' to see what the driver implements.");
        }
        AppError::NoDriversFound => {
            eprintln!();
            eprintln!("Hint: Make sure a Level Zero GPU driver is installed.");
            eprintln!("      Check that ZES_ENABLE_SYSMAN is not set to 0.");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_level_defaults_to_warn() {
        assert_eq!(max_level(false), log::LevelFilter::Warn);
        assert_eq!(max_level(true), log::LevelFilter::Debug);
    }
}
