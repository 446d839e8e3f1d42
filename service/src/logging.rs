//! Terminal logging for the workspace.

use crate::config::Config;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// HTTP stack crates whose logs drown out login traces. Matched by prefix, so `tower`
/// covers `tower_http` and `tower_sessions`.
const DEPENDENCY_MODULES: &[&str] = &["hyper", "h2", "reqwest", "tower", "tracing", "axum"];

/// Crates of this workspace. Their records always pass.
const WORKSPACE_MODULES: &[&str] = &["auth_utils_rs", "auth_flows", "service", "web"];

pub struct Logger;

impl Logger {
    /// Installs a `TermLogger` at the configured level. Dependency logs only show at Trace.
    pub fn init_logger(config: &Config) {
        let level = config.log_level_filter;

        TermLogger::init(
            level,
            Self::build_log_config(level),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
        .expect("Failed to start simplelog");
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for module in Self::ignored_modules(level, DEPENDENCY_MODULES) {
            builder.add_filter_ignore_str(module);
        }

        builder.build()
    }

    /// Prefixes to silence at `level`. A candidate that would also match one of the
    /// workspace crates is dropped.
    fn ignored_modules(level: LevelFilter, candidates: &[&'static str]) -> Vec<&'static str> {
        if level == LevelFilter::Trace {
            return Vec::new();
        }

        candidates
            .iter()
            .copied()
            .filter(|prefix| {
                !WORKSPACE_MODULES
                    .iter()
                    .any(|module| module.starts_with(prefix))
            })
            .collect()
    }
}
