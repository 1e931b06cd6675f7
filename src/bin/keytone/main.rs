//! keytone - terminal keyboard synthesizer
//!
//! Run with: cargo run [-- path/to/config.toml]
//!
//! Set `KEYTONE_LOG=keytone.log` to write diagnostics to a file; the
//! terminal itself belongs to the UI. Filter with `RUST_LOG` as usual.

mod app;
mod keymap;
mod ui;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use keytone::SynthConfig;
use std::{fs::File, sync::Mutex};
use tracing_subscriber::EnvFilter;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    init_tracing()?;

    let config = match std::env::args().nth(1) {
        Some(path) => SynthConfig::load(&path)
            .wrap_err_with(|| format!("failed to load config '{path}'"))?,
        None => SynthConfig::default(),
    };

    app::run(config)
}

fn init_tracing() -> EyreResult<()> {
    let Ok(path) = std::env::var("KEYTONE_LOG") else {
        return Ok(());
    };
    let file = File::create(&path).wrap_err_with(|| format!("failed to create log file '{path}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
