//! Harness configuration: defaults, `Q4DOT_*` environment overrides, validation.

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_SWEEP_SIZES: [usize; 11] = [128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65536, 131072];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("tolerance must be a finite non-negative number, got {0}")]
    BadTolerance(f64),
    #[error("sweep needs at least one size")]
    EmptySweep,
    #[error("invalid value '{value}' for {var}")]
    BadEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchConfig {
    /// Elements per vector; rounded down to a multiple of 32.
    pub n: usize,
    pub iterations: usize,
    pub warmup: usize,
    pub sweep_iterations: usize,
    pub sweep_sizes: Vec<usize>,
    /// Use seeded random operands instead of the deterministic pattern.
    pub random: bool,
    pub seed: u64,
    pub tolerance: f64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            n: 4096,
            iterations: 100_000,
            warmup: 1000,
            sweep_iterations: 50_000,
            sweep_sizes: DEFAULT_SWEEP_SIZES.to_vec(),
            random: false,
            seed: 0x5eed,
            tolerance: crate::verify::DEFAULT_TOLERANCE,
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(s) => s.trim().parse().map(Some).map_err(|_| ConfigError::BadEnv { var, value: s.clone() }),
        Err(_) => Ok(None),
    }
}

/// Comma separated sizes, e.g. `"32,64,4096"`.
pub fn parse_sizes(s: &str) -> Option<Vec<usize>> {
    s.split(',').filter(|t| !t.trim().is_empty()).map(|t| t.trim().parse().ok()).collect()
}

impl BenchConfig {
    /// Defaults overlaid with `Q4DOT_N`, `Q4DOT_ITERATIONS`, `Q4DOT_WARMUP`, `Q4DOT_SEED`, `Q4DOT_SIZES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut c = Self::default();
        if let Some(v) = env_parse("Q4DOT_N")? { c.n = v; }
        if let Some(v) = env_parse("Q4DOT_ITERATIONS")? { c.iterations = v; c.sweep_iterations = v; }
        if let Some(v) = env_parse("Q4DOT_WARMUP")? { c.warmup = v; }
        if let Some(v) = env_parse("Q4DOT_SEED")? { c.seed = v; c.random = true; }
        if let Ok(s) = std::env::var("Q4DOT_SIZES") {
            c.sweep_sizes = parse_sizes(&s).ok_or(ConfigError::BadEnv { var: "Q4DOT_SIZES", value: s })?;
        }
        Ok(c)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 { return Err(ConfigError::Zero("n")); }
        if self.iterations == 0 { return Err(ConfigError::Zero("iterations")); }
        if self.sweep_iterations == 0 { return Err(ConfigError::Zero("sweep iterations")); }
        if self.sweep_sizes.is_empty() { return Err(ConfigError::EmptySweep); }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) { return Err(ConfigError::BadTolerance(self.tolerance)); }
        Ok(())
    }
}
