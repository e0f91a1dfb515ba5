//! Feed-forward network over a flattened window

use crate::error::{ForecastError, Result};
use crate::models::{check_chain, DenseLayer, DenseSpec, InputTopology, ModelInput, Predictor};
use serde::{Deserialize, Serialize};

/// Exported weights of a feed-forward network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub layers: Vec<DenseSpec>,
}

/// Stack of dense layers consuming the window as one flat vector
#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    /// Name of the model
    name: String,
    layers: Vec<DenseLayer>,
}

impl FeedForwardNetwork {
    /// Create a network from layers, checking their widths chain
    pub fn new(name: impl Into<String>, layers: Vec<DenseLayer>) -> Result<Self> {
        let first = layers.first().ok_or_else(|| {
            ForecastError::ModelError("Feed-forward network needs at least one layer".to_string())
        })?;
        check_chain(&layers, first.inputs())?;

        Ok(Self {
            name: name.into(),
            layers,
        })
    }

    /// Create a network from exported weights
    pub fn from_spec(spec: FeedForwardSpec) -> Result<Self> {
        let layers = spec
            .layers
            .iter()
            .map(DenseLayer::from_spec)
            .collect::<Result<Vec<_>>>()?;
        Self::new(spec.name.unwrap_or_else(|| "feed_forward".to_string()), layers)
    }
}

impl Predictor for FeedForwardNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn topology(&self) -> InputTopology {
        InputTopology::Flat
    }

    fn input_size(&self) -> usize {
        self.layers[0].inputs()
    }

    fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].units()
    }

    fn predict(&self, input: ModelInput<'_>) -> Result<Vec<f64>> {
        let x = match input {
            ModelInput::Flat(x) => x,
            ModelInput::Sequence(_) => {
                return Err(ForecastError::ModelError(format!(
                    "{} expects flat input",
                    self.name
                )))
            }
        };
        if x.len() != self.input_size() {
            return Err(ForecastError::ModelError(format!(
                "{} expects {} inputs, got {}",
                self.name,
                self.input_size(),
                x.len()
            )));
        }

        let mut activations = self.layers[0].forward(x);
        for layer in &self.layers[1..] {
            activations = layer.forward(activations.view());
        }
        Ok(activations.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Activation;
    use ndarray::array;

    #[test]
    fn test_from_spec_and_predict() {
        let spec: FeedForwardSpec = serde_json::from_str(
            r#"{
                "name": "ann",
                "layers": [
                    {"kernel": [[1.0, -1.0], [1.0, -1.0]], "bias": [0.0, 0.0], "activation": "relu"},
                    {"kernel": [[2.0], [1.0]], "bias": [1.0]}
                ]
            }"#,
        )
        .unwrap();
        let network = FeedForwardNetwork::from_spec(spec).unwrap();

        assert_eq!(network.name(), "ann");
        assert_eq!(network.input_size(), 2);
        assert_eq!(network.output_size(), 1);

        // relu([3, -3]) = [3, 0]; 3 * 2 + 0 + 1 = 7
        let out = network.predict(ModelInput::Flat(array![1.0, 2.0].view())).unwrap();
        assert_eq!(out, vec![7.0]);
    }

    #[test]
    fn test_rejects_wrong_input() {
        let layer = DenseLayer::new(array![[1.0], [1.0]], array![0.0], Activation::Linear).unwrap();
        let network = FeedForwardNetwork::new("ann", vec![layer]).unwrap();

        assert!(network.predict(ModelInput::Flat(array![1.0].view())).is_err());
        assert!(network
            .predict(ModelInput::Sequence(array![[1.0, 2.0]].view()))
            .is_err());
    }

    #[test]
    fn test_rejects_mismatched_layers() {
        let a = DenseLayer::new(array![[1.0, 1.0]], array![0.0, 0.0], Activation::Linear).unwrap();
        let b = DenseLayer::new(array![[1.0]], array![0.0], Activation::Linear).unwrap();
        assert!(FeedForwardNetwork::new("bad", vec![a, b]).is_err());
        assert!(FeedForwardNetwork::new("empty", Vec::new()).is_err());
    }
}
