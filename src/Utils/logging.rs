//! Terminal logging for the binaries and long-running drivers. Library code
//! only uses the `log` macros; nothing is printed unless a logger is
//! installed here (or by the embedding application).
use log::{LevelFilter, info};
use simplelog::{ColorChoice, Config, SimpleLogger, TermLogger, TerminalMode};

/// Installs a terminal logger with the given level. Falls back to a plain
/// stdout logger when no terminal is attached. Returns `false` if a logger
/// was already installed, which is not treated as an error.
pub fn init_logger(level: LevelFilter) -> bool {
    let installed = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .is_ok()
        || SimpleLogger::init(level, Config::default()).is_ok();
    if installed {
        info!("logger initialized at level {}", level);
    }
    installed
}
