//! Wish Energy entry point
//!
//! On native this is a small CLI over a file-backed record. The web build is
//! driven from JavaScript through `WishEnergy` instead.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use anyhow::{Context, Result};
    use clap::{Parser, Subcommand};

    use wish_energy::persistence::FileStorage;
    use wish_energy::{EnergySettings, EnergyStore, SystemClock};

    #[derive(Parser)]
    #[command(name = "wish-energy", about = "Inspect and spend wish energy")]
    struct Cli {
        /// File holding the persisted record
        #[arg(long, default_value = "wish_energy.json")]
        file: PathBuf,
        #[command(subcommand)]
        command: Option<Commands>,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Show energy, stability and time to the next point (default)
        Status,
        /// Spend one energy point
        Consume,
        /// Give back one energy point
        Refund,
        /// Lose one stability point
        Destabilize,
        /// Refill stability
        Stabilize,
        /// Refill everything and clear the recovery timer
        Reset,
    }

    pub fn run() -> Result<ExitCode> {
        env_logger::init();
        let cli = Cli::parse();

        if let Some(parent) = cli.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory: {}", parent.display()))?;
        }

        let settings = EnergySettings::from_env();
        let mut store = EnergyStore::open(FileStorage::new(&cli.file), SystemClock, settings);

        let mut code = ExitCode::SUCCESS;
        match cli.command.unwrap_or(Commands::Status) {
            Commands::Status => {}
            Commands::Consume => {
                if !store.consume() {
                    eprintln!("Out of energy");
                    code = ExitCode::FAILURE;
                }
            }
            Commands::Refund => store.refund(),
            Commands::Destabilize => store.decrease_stability(),
            Commands::Stabilize => store.recover_stability(),
            Commands::Reset => store.reset(),
        }

        let settings = store.settings();
        let countdown = store.countdown();
        println!(
            "energy {}/{}  stability {}/{}{}",
            store.energy(),
            settings.max_energy,
            store.stability(),
            settings.max_stability,
            if countdown.is_empty() {
                String::new()
            } else {
                format!("  next in {}", countdown)
            }
        );
        Ok(code)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<std::process::ExitCode> {
    cli::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is `wish_energy::web::start`, this is just to satisfy the compiler
}
