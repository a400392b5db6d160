//! Observability bootstrap: logging and panic capture.

pub mod logging;
pub mod panic;

/// Everything `init_all` needs to bring observability up.
#[derive(Clone, Debug, Default)]
pub struct O11yConfig {
    pub logging: logging::Config,
    pub install_panic_hook: bool,
}

/// Initialize logging and (optionally) the panic hook. Idempotent.
pub fn init_all(cfg: &O11yConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&cfg.logging)?;
    if cfg.install_panic_hook {
        panic::install_hook();
    }
    Ok(())
}
