use simplelog::{ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Log to stderr so that stdout stays free for documents.
pub fn start_logger(level: LevelFilter) -> anyhow::Result<()> {
    let config = ConfigBuilder::new()
        .set_location_level(LevelFilter::Error)
        .build();
    TermLogger::init(level, config, TerminalMode::Stderr)
        .map_err(|e| anyhow::anyhow!("could not start logger: {}", e))
}
