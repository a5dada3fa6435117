//! File logger setup for the engine binary.
//!
//! Standard output carries the text protocol, so diagnostics go to a file
//! through `simplelog`. Library code only talks to the `log` facade.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{Config, WriteLogger};

use crate::errors::EngineResult;

/// Install a file logger at `path`. Calling this twice keeps the first logger.
pub fn init_logging(path: &Path, level: LevelFilter) -> EngineResult<()> {
    let file = File::create(path)?;
    if WriteLogger::init(level, Config::default(), file).is_err() {
        log::warn!("logger already installed; ignoring {}", path.display());
        return Ok(());
    }
    log::info!(
        "session started {} ({} {})",
        chrono::Local::now().to_rfc3339(),
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

/// Parse a level name as accepted on the command line.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_level;
    use log::LevelFilter;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(parse_level("DEBUG"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }
}
