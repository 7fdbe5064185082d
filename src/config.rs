//! Network configuration.

use crate::errors::Result;
use crate::layers::LayerSpec;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything needed to build a `Network`.
///
/// ```json
/// {
///     "input_architecture": [2],
///     "learning_rate": 0.01,
///     "seed": 42,
///     "layers": [
///         {"type": "FULLY_CONNECTED",
///          "options": {"architecture": [3], "rectifier": "relu"}},
///         {"type": "FULLY_CONNECTED",
///          "options": {"architecture": [1], "rectifier": "step"}}
///     ]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Architecture of the input layer.
    pub input_architecture: Vec<usize>,
    pub learning_rate: f64,
    /// Layers following the input, in order.
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
    /// Seed for weight initialisation. Unseeded networks draw one from the
    /// thread RNG.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl NetworkConfig {
    /// Creates a config with no layers beyond the input.
    pub fn new(input_architecture: &[usize], learning_rate: f64) -> Self {
        NetworkConfig {
            input_architecture: input_architecture.to_vec(),
            learning_rate,
            layers: Vec::new(),
            seed: None,
        }
    }

    /// Appends a layer.
    pub fn layer(mut self, spec: LayerSpec) -> Self {
        self.layers.push(spec);
        self
    }

    /// Fixes the weight initialisation seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NetError;
    use crate::rectifier::Rectifier;

    #[test]
    fn parses_json() {
        let config = NetworkConfig::from_json(r#"{
            "input_architecture": [9, 9, 3],
            "learning_rate": 0.000001,
            "layers": [
                {"type": "CONVOLUTIONAL",
                 "options": {"depth": 3, "filter_architecture": [3, 3, 1],
                             "stride": 1, "rectifier": "relu"}},
                {"type": "FULLY_CONNECTED",
                 "options": {"architecture": [2], "rectifier": "relu"}}
            ]
        }"#)
            .unwrap();
        assert_eq!(config.input_architecture, vec![9, 9, 3]);
        assert_eq!(config.layers.len(), 2);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn builder_matches_json() {
        let built = NetworkConfig::new(&[2], 0.01)
            .layer(LayerSpec::FullyConnected {
                architecture: vec![3],
                rectifier: Rectifier::ReLU,
            })
            .seed(4);
        let json = serde_json::to_string(&built).unwrap();
        assert_eq!(NetworkConfig::from_json(&json).unwrap(), built);
    }

    #[test]
    fn rejects_unknown_layer_type() {
        let result = NetworkConfig::from_json(r#"{
            "input_architecture": [2],
            "learning_rate": 0.1,
            "layers": [{"type": "RECURRENT", "options": {}}]
        }"#);
        assert!(matches!(result, Err(NetError::Config(_))));
    }
}
