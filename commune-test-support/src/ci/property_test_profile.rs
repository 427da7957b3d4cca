//! Property-test run profile for CI and local overrides.
//!
//! Every property suite in the workspace reads its case count and fork mode
//! through [`ProptestRunProfile`], so one pair of environment variables scales
//! all of them.

use std::env;

/// Environment variable overriding the number of proptest cases.
pub const PROGTEST_CASES_ENV_KEY: &str = "PROGTEST_CASES";
/// Environment variable toggling forked proptest execution.
pub const COMMUNE_PBT_FORK_ENV_KEY: &str = "COMMUNE_PBT_FORK";

/// Case count and fork mode for one property suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
}

impl ProptestRunProfile {
    /// Reads overrides from the environment, keeping the suite defaults for
    /// unset or malformed values.
    ///
    /// # Examples
    ///
    /// ```
    /// use commune_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(32, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        Self {
            cases: Override::read(PROGTEST_CASES_ENV_KEY, parse_cases).unwrap_or(default_cases),
            fork: Override::read(COMMUNE_PBT_FORK_ENV_KEY, parse_switch).unwrap_or(default_fork),
        }
    }

    /// Cases to run per property.
    #[must_use]
    pub const fn cases(&self) -> u32 {
        self.cases
    }

    /// Whether cases run in forked subprocesses.
    #[must_use]
    pub const fn fork(&self) -> bool {
        self.fork
    }
}

struct Override;

impl Override {
    fn read<T>(key: &'static str, parse: fn(&str) -> Result<T, &'static str>) -> Option<T> {
        let raw = env::var(key).ok()?;
        parse(raw.trim())
            .inspect_err(|reason| {
                tracing::warn!(
                    env = key,
                    raw = %raw,
                    reason,
                    "ignoring malformed property-test override",
                );
            })
            .ok()
    }
}

fn parse_cases(raw: &str) -> Result<u32, &'static str> {
    match raw.parse::<u32>() {
        Ok(0) => Err("case count must be positive"),
        Ok(cases) => Ok(cases),
        Err(_) => Err("case count must be an unsigned integer"),
    }
}

fn parse_switch(raw: &str) -> Result<bool, &'static str> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected true/false, 1/0, yes/no or on/off"),
    }
}
