use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes logging with a plain console layer and a verbose JSON file.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    // Daily-rotated debug log; the console stays at the level set by RUST_LOG
    let file_appender = tracing_appender::rolling::daily("logs", "extractor.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("lab_extractor=info".parse().unwrap()))
        .with(file_layer)
        .with(console_layer)
        .init();

    // Keep the guard alive for the process lifetime so file logs flush on exit
    std::mem::forget(_guard);
}
