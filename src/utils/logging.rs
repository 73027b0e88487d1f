use std::str::FromStr;

use tracing::Level;

/// Map a `--log-level` value to a tracing level. Case and surrounding
/// whitespace are ignored and `warning` is taken as `warn`. Whatever
/// tracing cannot parse falls back to `INFO`.
pub fn parse_level(name: &str) -> Level {
    let name = name.trim();
    if name.eq_ignore_ascii_case("warning") {
        return Level::WARN;
    }
    Level::from_str(name).unwrap_or(Level::INFO)
}

/// Install the process-wide fmt subscriber and return the level it filters at.
///
/// Log lines go to stderr so that client results printed on stdout stay
/// clean. Only the first call installs anything; later calls (tests, an
/// embedding application) leave the existing subscriber in place.
pub fn init(level: &str) -> Level {
    let level = parse_level(level);
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if !installed {
        tracing::debug!("Subscriber already installed, keeping it");
    }
    level
}
