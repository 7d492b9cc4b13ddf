use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Installs the stderr subscriber; stdout stays reserved for the two output
/// lines. Warnings and errors are always shown, `verbose` adds debug output.
pub fn init(verbose: bool) -> Result<()> {
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_max_level(max_level(verbose))
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}

fn max_level(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { Level::WARN }
}
