use std::{fs, path::Path, sync::OnceLock};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::*;
pub use writer::*;

use crate::configs::Config;

pub(crate) static GLOBAL_FILE_WRITER: OnceLock<CircularFileWriter> = OnceLock::new();

/// `println!` that is mirrored into the log file when one is configured.
#[macro_export]
macro_rules! log_println {
    () => {{
        std::println!();
        $crate::common::logger::append_to_file_raw("\n");
    }};
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        std::println!("{}", msg);
        $crate::common::logger::append_to_file_raw(&format!("{}\n", msg));
    }};
}

pub fn append_to_file_raw(msg: &str) {
    if let Some(mut writer) = GLOBAL_FILE_WRITER.get().cloned() {
        use std::io::Write;
        let _ = writer.write_all(strip_ansi_escapes(msg).as_bytes());
    }
}

/// Builds the filter directive string from the logging section.
///
/// `debug` raises the default level when no explicit level is configured.
pub fn filter_directives(config: &Config) -> String {
    let default_level = if config.bot.debug { "debug" } else { "info" };
    let level = config
        .logging
        .level
        .as_deref()
        .unwrap_or(default_level);

    // Dependencies are noisy at debug level.
    let base = format!("{level},hyper=warn,reqwest=warn,symphonia=warn,tower_http=info");
    match config.logging.filters.as_deref() {
        Some(extra) if !extra.is_empty() => format!("{base},{extra}"),
        _ => base,
    }
}

pub fn init(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let stdout_layer = fmt::layer()
        .event_format(CustomFormatter::new(true))
        .with_ansi(true);

    let file_layer = config.logging.file.as_ref().map(|file_config| {
        if let Some(parent) = Path::new(&file_config.path).parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Failed to create log directory: {}", e);
            }
        }

        let writer = CircularFileWriter::new(file_config.path.clone(), file_config.max_lines);
        let _ = GLOBAL_FILE_WRITER.set(writer.clone());
        fmt::layer()
            .with_writer(writer)
            .event_format(CustomFormatter::new(false))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_debug_mode() {
        let mut config = Config::default();
        config.bot.debug = true;
        assert!(filter_directives(&config).starts_with("debug,"));

        config.logging.level = Some("warn".into());
        assert!(filter_directives(&config).starts_with("warn,"));
    }

    #[test]
    fn test_filter_directives_appends_extra_filters() {
        let mut config = Config::default();
        config.logging.filters = Some("project_em::player=trace".into());
        let directives = filter_directives(&config);
        assert!(directives.starts_with("info,"));
        assert!(directives.ends_with(",project_em::player=trace"));
    }
}
