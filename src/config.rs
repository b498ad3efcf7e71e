use serde::{Deserialize, Serialize};

use crate::Result;

/// Gradient-descent hyperparameters of a backpropagation calculator.
///
/// No range validation is done. Sane values are a learning rate in `(0, 1]`, momentum in
/// `[0, 1)` and a non-negative weight decay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Hyperparameters {
    pub learning_rate: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    pub dispatch: Dispatch,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            momentum: 0.0,
            weight_decay: 0.0,
            dispatch: Dispatch::default(),
        }
    }
}

impl Hyperparameters {
    pub fn new(learning_rate: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
            ..Self::default()
        }
    }

    /// Parses a TOML table, missing keys take their default values.
    ///
    /// ```toml
    /// learning_rate = 0.05
    /// momentum = 0.9
    /// weight_decay = 1e-4
    /// dispatch = "sequential"
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// How the per-unit kernel is scheduled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    /// One rayon task per unit.
    #[default]
    Parallel,
    /// All units on the calling thread, in ascending order.
    Sequential,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn parses_full_table() {
        let h = Hyperparameters::from_toml_str(
            r#"
            learning_rate = 0.05
            momentum = 0.9
            weight_decay = 0.0001
            dispatch = "sequential"
            "#,
        )
        .unwrap();
        assert_eq!(h.learning_rate, 0.05);
        assert_eq!(h.momentum, 0.9);
        assert_eq!(h.weight_decay, 0.0001);
        assert_eq!(h.dispatch, Dispatch::Sequential);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let h = Hyperparameters::from_toml_str("momentum = 0.5").unwrap();
        assert_eq!(h.momentum, 0.5);
        assert_eq!(h.learning_rate, Hyperparameters::default().learning_rate);
        assert_eq!(h.dispatch, Dispatch::Parallel);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Hyperparameters::from_toml_str("learning_rat = 0.5").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
