//! Logging setup shared by the shield simulator and the host binary

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global fmt subscriber at `level` (falls back to INFO).
///
/// Logs go to stderr so they do not interleave with frame or status output
/// on stdout.
pub fn init_logging(level: &str) {
    let level = parse_level(level);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already installed");
    }
}

fn parse_level(level: &str) -> Level {
    level.parse::<Level>().unwrap_or(Level::INFO)
}
