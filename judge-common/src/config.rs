// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Slave tuning knobs, read from the environment once and cached.
//!
//! Mirrors the `FromEnv` + `LazyLock<Config>` shape used throughout the
//! rest of this workspace's ancestry: a handful of named env vars, parsed
//! with sane fallbacks, exposed through `Config::get()`.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

pub mod parse_env {
    use std::{env, str::FromStr, time::Duration};

    pub fn duration_secs(name: &str) -> Option<Duration> {
        Some(Duration::from_secs_f64(env::var(name).ok()?.parse::<f64>().ok()?))
    }

    pub fn int<T: FromStr>(name: &str) -> Option<T> {
        env::var(name).ok()?.parse::<T>().ok()
    }

    pub fn str_not_empty(name: &str) -> Option<String> {
        env::var(name).ok().filter(|s| !s.is_empty())
    }
}

const ENV_IDLE_TIMEOUT_SECS: &str = "JUDGE_SLAVE_IDLE_TIMEOUT_SECS";
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_CHECK_WALL_CLOCK_BUDGET_SECS: &str = "JUDGE_SLAVE_CHECK_TIMEOUT_SECS";
const DEFAULT_CHECK_WALL_CLOCK_BUDGET: Duration = Duration::from_secs(10);

const ENV_FLUSH_DEADLINE_SECS: &str = "JUDGE_SLAVE_FLUSH_DEADLINE_SECS";
const DEFAULT_FLUSH_DEADLINE: Duration = Duration::from_secs(2);

const ENV_LOG_FILE: &str = "JUDGE_SLAVE_LOG_FILE";
const ENV_LOG_LEVEL: &str = "JUDGE_SLAVE_LOG_LEVEL";

const ENV_MAX_SOURCE_BYTES: &str = "JUDGE_SLAVE_MAX_SOURCE_BYTES";
/// Guards against a submission whose "source" is just gigabytes of bytes
/// the wasm parser would otherwise happily spend CPU time rejecting.
const DEFAULT_MAX_SOURCE_BYTES: usize = 8 * 1024 * 1024;

const ENV_MAX_MEMORY_BYTES: &str = "JUDGE_SLAVE_MAX_MEMORY_BYTES";
/// Memory ceiling installed on every sandbox store, generous enough for
/// a correct submission's working set while still bounding a deliberate
/// allocation bomb.
const DEFAULT_MAX_MEMORY_BYTES: usize = 64 * 1024 * 1024;

/// Slave-wide configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long the slave waits for `CompileAndCheckSubmission` before
    /// emitting `SlaveTimedOut`.
    pub idle_timeout: Duration,
    /// Default per-invocation wall-clock budget for a check.
    pub check_wall_clock_budget: Duration,
    /// Bounded deadline for flushing queued outbound messages on shutdown.
    pub flush_deadline: Duration,
    /// Destination for the slave's own logs; `None` disables file logging
    /// and falls back to stderr.
    pub log_file: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_level: String,
    /// Upper bound on the total size of a submission's source text before
    /// the in-memory compiler rejects it outright.
    pub max_source_bytes: usize,
    /// Memory ceiling applied to every sandboxed invocation.
    pub max_memory_bytes: usize,
}

static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_env);

impl Config {
    pub fn get() -> &'static Config {
        &CONFIG
    }

    fn from_env() -> Config {
        Config {
            idle_timeout: parse_env::duration_secs(ENV_IDLE_TIMEOUT_SECS)
                .unwrap_or(DEFAULT_IDLE_TIMEOUT),
            check_wall_clock_budget: parse_env::duration_secs(ENV_CHECK_WALL_CLOCK_BUDGET_SECS)
                .unwrap_or(DEFAULT_CHECK_WALL_CLOCK_BUDGET),
            flush_deadline: parse_env::duration_secs(ENV_FLUSH_DEADLINE_SECS)
                .unwrap_or(DEFAULT_FLUSH_DEADLINE),
            log_file: parse_env::str_not_empty(ENV_LOG_FILE).map(PathBuf::from),
            log_level: parse_env::str_not_empty(ENV_LOG_LEVEL).unwrap_or_else(|| "info".into()),
            max_source_bytes: parse_env::int(ENV_MAX_SOURCE_BYTES)
                .unwrap_or(DEFAULT_MAX_SOURCE_BYTES),
            max_memory_bytes: parse_env::int(ENV_MAX_MEMORY_BYTES)
                .unwrap_or(DEFAULT_MAX_MEMORY_BYTES),
        }
    }
}
