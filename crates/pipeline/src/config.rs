use std::time::Duration;

/// Timing and sizing of the simulated processing stages.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Time spent in the parsing stage.
    pub parse_delay: Duration,
    /// Time spent on each page.
    pub page_delay: Duration,
    /// Time spent generating the final result.
    pub finalize_delay: Duration,
    /// Page count reported for every document (at least 1).
    pub pages: u32,
}

impl SimulationConfig {
    /// Load the simulation settings from environment variables.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `SIM_PARSE_DELAY_MS`    | `2000`  |
    /// | `SIM_PAGE_DELAY_MS`     | `1000`  |
    /// | `SIM_FINALIZE_DELAY_MS` | `2000`  |
    /// | `SIM_PAGES`             | `20`    |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            parse_delay: env_millis("SIM_PARSE_DELAY_MS", defaults.parse_delay),
            page_delay: env_millis("SIM_PAGE_DELAY_MS", defaults.page_delay),
            finalize_delay: env_millis("SIM_FINALIZE_DELAY_MS", defaults.finalize_delay),
            pages: std::env::var("SIM_PAGES")
                .ok()
                .map(|v| v.parse::<u32>().expect("SIM_PAGES must be a valid u32"))
                .unwrap_or(defaults.pages)
                .max(1),
        }
    }

    /// No delays at all; used by tests.
    pub fn instant(pages: u32) -> Self {
        Self {
            parse_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            finalize_delay: Duration::ZERO,
            pages: pages.max(1),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            parse_delay: Duration::from_millis(2000),
            page_delay: Duration::from_millis(1000),
            finalize_delay: Duration::from_millis(2000),
            pages: 20,
        }
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    match std::env::var(key) {
        Ok(v) => Duration::from_millis(
            v.parse()
                .unwrap_or_else(|_| panic!("{key} must be a valid u64")),
        ),
        Err(_) => default,
    }
}
