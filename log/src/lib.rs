//! A small, configurable logger for the Latticec compiler middle-end.
//!
//! Designed for use with [`log`](https://docs.rs/log). Log level directives
//! are read from the `LATTICEC_LOG` environment variable using the familiar
//! `env_logger`-style grammar:
//!
//! ```text
//! LATTICEC_LOG := directive ("," directive)*
//! directive    := level | target "=" level
//! ```
//!
//! e.g. `LATTICEC_LOG=irgen=debug,hir=trace` enables `debug` logging for the
//! `irgen` target and `trace` logging for `hir`, leaving everything else at
//! the default (`warn`).
//!
//! ```
//! use log::{debug, error, info};
//!
//! latticec_log::init();
//!
//! debug!(target: "irgen", "lowering function body");
//! error!("this is printed by default");
//! ```

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct Directive {
    target: Option<String>,
    level: LevelFilter,
}

struct Filter {
    directives: Vec<Directive>,
    default: LevelFilter,
}

impl Filter {
    fn parse(spec: &str) -> Self {
        let mut directives = Vec::new();
        let mut default = LevelFilter::Warn;
        for part in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match part.split_once('=') {
                Some((target, level)) => {
                    if let Some(level) = parse_level(level) {
                        directives.push(Directive { target: Some(target.to_string()), level });
                    }
                }
                None => {
                    if let Some(level) = parse_level(part) {
                        default = level;
                    }
                }
            }
        }
        Self { directives, default }
    }

    fn enabled(&self, metadata: &Metadata) -> bool {
        let level = metadata.level();
        for directive in self.directives.iter().rev() {
            match &directive.target {
                Some(target) if metadata.target().starts_with(target.as_str()) => {
                    return level <= directive.level;
                }
                _ => continue,
            }
        }
        level <= self.default
    }
}

fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

struct Logger {
    filter: Filter,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "{}",
            format_args!(
                "[{level:<5} {target}] {args}",
                level = color_level(record.level()),
                target = record.target(),
                args = record.args(),
            )
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(feature = "color")]
fn color_level(level: Level) -> String {
    use anstyle::{AnsiColor, Style};

    let color = match level {
        Level::Error => AnsiColor::Red,
        Level::Warn => AnsiColor::Yellow,
        Level::Info => AnsiColor::Green,
        Level::Debug => AnsiColor::Blue,
        Level::Trace => AnsiColor::Magenta,
    };
    let style = Style::new().fg_color(Some(color.into()));
    format!("{style}{level}{style:#}")
}

#[cfg(not(feature = "color"))]
fn color_level(level: Level) -> String {
    level.to_string()
}

/// Initializes the global logger from the `LATTICEC_LOG` environment variable.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    let spec = std::env::var("LATTICEC_LOG").unwrap_or_default();
    let filter = Filter::parse(&spec);
    let max_level = filter
        .directives
        .iter()
        .map(|d| d.level)
        .chain(std::iter::once(filter.default))
        .max()
        .unwrap_or(LevelFilter::Warn);
    let logger = Box::new(Logger { filter });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(max_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_warn() {
        let filter = Filter::parse("");
        assert_eq!(filter.default, LevelFilter::Warn);
    }

    #[test]
    fn target_directive_overrides_default() {
        let filter = Filter::parse("irgen=trace");
        let metadata = Metadata::builder().level(Level::Trace).target("irgen::stmt").build();
        assert!(filter.enabled(&metadata));

        let other = Metadata::builder().level(Level::Trace).target("hir::pool").build();
        assert!(!filter.enabled(&other));
    }

    #[test]
    fn bare_level_directive_sets_default() {
        let filter = Filter::parse("debug");
        assert_eq!(filter.default, LevelFilter::Debug);
    }
}
