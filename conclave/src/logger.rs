use logforth::append;

/// Initialize stderr logging.
///
/// stdout belongs to the MCP transport; every log line must go to stderr or
/// the host's framing breaks.
pub fn init(level: &str) {
    let filter = parse_level(level);

    logforth::builder()
        .dispatch(|dispatch| dispatch.filter(filter).append(append::Stderr::default()))
        .apply();

    log::debug!("Logger initialized at {filter}");
}

fn parse_level(raw: &str) -> log::LevelFilter {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" | "warning" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        "info" => log::LevelFilter::Info,
        other => {
            // Not logged yet at this point in bootstrap; stderr directly.
            eprintln!("Unknown log level '{other}', using INFO");
            log::LevelFilter::Info
        }
    }
}
