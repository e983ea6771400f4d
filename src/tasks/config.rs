use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::core::errors::{CalcError, Result};
use crate::expr::token::BinaryOp;

/// Cost used for operators without a configured entry
pub const DEFAULT_OPERATION_COST: Duration = Duration::from_millis(1000);

/// Runtime settings for the orchestrator and the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Simulated operation costs
    pub time_addition_ms: u64,
    pub time_subtraction_ms: u64,
    pub time_multiplication_ms: u64,
    pub time_division_ms: u64,

    // Agent
    /// Number of concurrent workers
    pub computing_power: usize,
    /// Back-off between claims when no task is available
    pub poll_interval_ms: u64,
    /// Fractional jitter applied to the poll interval (0.1 = ±10%)
    pub poll_jitter: f64,
    /// Whether workers sleep for the task's cost before computing it
    pub simulate_latency: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let cost = DEFAULT_OPERATION_COST.as_millis() as u64;
        Self {
            time_addition_ms: cost,
            time_subtraction_ms: cost,
            time_multiplication_ms: cost,
            time_division_ms: cost,
            computing_power: 2,
            poll_interval_ms: 500,
            poll_jitter: 0.1,
            simulate_latency: true,
        }
    }
}

impl Settings {
    /// Create a new builder for Settings
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Read settings from environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let computing_power = parse_or(
            &lookup,
            "COMPUTING_POWER",
            defaults.computing_power as i64,
        );

        Self {
            time_addition_ms: parse_or(&lookup, "TIME_ADDITION_MS", defaults.time_addition_ms),
            time_subtraction_ms: parse_or(
                &lookup,
                "TIME_SUBTRACTION_MS",
                defaults.time_subtraction_ms,
            ),
            time_multiplication_ms: parse_or(
                &lookup,
                "TIME_MULTIPLICATIONS_MS",
                defaults.time_multiplication_ms,
            ),
            time_division_ms: parse_or(&lookup, "TIME_DIVISIONS_MS", defaults.time_division_ms),
            // Anything below one worker, negatives included, means one
            computing_power: usize::try_from(computing_power.max(1)).unwrap_or(usize::MAX),
            poll_interval_ms: parse_or(&lookup, "POLL_INTERVAL_MS", defaults.poll_interval_ms),
            ..defaults
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CalcError::io(format!("reading {}", path.display()), e))?;
        Self::from_yaml_str(&raw)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.computing_power == 0 {
            return Err(CalcError::configuration_field(
                "computing_power must be greater than 0",
                "computing_power",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(CalcError::configuration_field(
                "poll_interval_ms must be greater than 0",
                "poll_interval_ms",
            ));
        }
        if !(0.0..1.0).contains(&self.poll_jitter) {
            return Err(CalcError::configuration_field(
                "poll_jitter must be in [0, 1)",
                "poll_jitter",
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-operator cost table derived from these settings
    pub fn operation_costs(&self) -> OperationCosts {
        OperationCosts::default()
            .with_cost(BinaryOp::Add, Duration::from_millis(self.time_addition_ms))
            .with_cost(BinaryOp::Sub, Duration::from_millis(self.time_subtraction_ms))
            .with_cost(BinaryOp::Mul, Duration::from_millis(self.time_multiplication_ms))
            .with_cost(BinaryOp::Div, Duration::from_millis(self.time_division_ms))
    }
}

/// Parse the variable `key`, keeping `default` when unset or unparsable
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

/// Builder for Settings
pub struct SettingsBuilder {
    settings: Settings,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
        }
    }

    /// Start from existing settings
    pub fn from_settings(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn operation_cost(mut self, op: BinaryOp, millis: u64) -> Self {
        match op {
            BinaryOp::Add => self.settings.time_addition_ms = millis,
            BinaryOp::Sub => self.settings.time_subtraction_ms = millis,
            BinaryOp::Mul => self.settings.time_multiplication_ms = millis,
            BinaryOp::Div => self.settings.time_division_ms = millis,
        }
        self
    }

    /// Set the same cost for every operator
    pub fn uniform_cost(self, millis: u64) -> Self {
        BinaryOp::ALL
            .into_iter()
            .fold(self, |builder, op| builder.operation_cost(op, millis))
    }

    pub fn computing_power(mut self, workers: usize) -> Self {
        self.settings.computing_power = workers;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn poll_jitter(mut self, jitter: f64) -> Self {
        self.settings.poll_jitter = jitter;
        self
    }

    pub fn simulate_latency(mut self, enabled: bool) -> Self {
        self.settings.simulate_latency = enabled;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

/// Simulated execution cost per operator
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCosts {
    costs: HashMap<BinaryOp, Duration>,
    default: Duration,
}

impl Default for OperationCosts {
    fn default() -> Self {
        Self {
            costs: HashMap::new(),
            default: DEFAULT_OPERATION_COST,
        }
    }
}

impl OperationCosts {
    pub fn with_cost(mut self, op: BinaryOp, cost: Duration) -> Self {
        self.costs.insert(op, cost);
        self
    }

    pub fn with_default(mut self, cost: Duration) -> Self {
        self.default = cost;
        self
    }

    pub fn cost(&self, op: BinaryOp) -> Duration {
        self.costs.get(&op).copied().unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.computing_power, 2);
        assert_eq!(
            settings.operation_costs().cost(BinaryOp::Div),
            DEFAULT_OPERATION_COST
        );
    }

    #[test]
    fn test_from_lookup() {
        let env = HashMap::from([
            ("TIME_ADDITION_MS", "25"),
            ("TIME_MULTIPLICATIONS_MS", "not a number"),
            ("COMPUTING_POWER", "0"),
        ]);
        let settings = Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.time_addition_ms, 25);
        assert_eq!(settings.time_multiplication_ms, 1000);
        assert_eq!(settings.time_subtraction_ms, 1000);
        // Clamped to a single worker
        assert_eq!(settings.computing_power, 1);

    }

    #[test]
    fn test_computing_power_clamp() {
        let power = |raw: &str| {
            Settings::from_lookup(|key| (key == "COMPUTING_POWER").then(|| raw.to_string()))
                .computing_power
        };
        assert_eq!(power("-3"), 1);
        assert_eq!(power("0"), 1);
        assert_eq!(power(" 6 "), 6);
        assert_eq!(power("lots"), 2);
    }

    #[test]
    fn test_yaml() {
        let settings = Settings::from_yaml_str(
            "time_division_ms: 5\ncomputing_power: 8\nsimulate_latency: false\n",
        )
        .unwrap();
        assert_eq!(settings.time_division_ms, 5);
        assert_eq!(settings.time_addition_ms, 1000);
        assert_eq!(settings.computing_power, 8);
        assert!(!settings.simulate_latency);

        let invalid = Settings::from_yaml_str("computing_power: 0\n");
        assert!(matches!(invalid, Err(CalcError::Configuration { .. })));
        assert!(matches!(
            Settings::from_yaml_str("computing_power: [1"),
            Err(CalcError::Yaml(_))
        ));
    }

    #[test]
    fn test_builder() {
        let settings = Settings::builder()
            .uniform_cost(10)
            .operation_cost(BinaryOp::Mul, 30)
            .computing_power(4)
            .poll_interval(Duration::from_millis(20))
            .build()
            .unwrap();

        let costs = settings.operation_costs();
        assert_eq!(costs.cost(BinaryOp::Add), Duration::from_millis(10));
        assert_eq!(costs.cost(BinaryOp::Mul), Duration::from_millis(30));
        assert_eq!(settings.poll_interval(), Duration::from_millis(20));

        assert!(Settings::builder().poll_jitter(1.5).build().is_err());
    }

    #[test]
    fn test_missing_cost_falls_back() {
        let costs = OperationCosts::default()
            .with_cost(BinaryOp::Add, Duration::from_millis(3))
            .with_default(Duration::from_millis(7));
        assert_eq!(costs.cost(BinaryOp::Add), Duration::from_millis(3));
        assert_eq!(costs.cost(BinaryOp::Sub), Duration::from_millis(7));
    }
}
