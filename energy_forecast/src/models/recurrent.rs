//! Recurrent (LSTM) network over a window sequence

use crate::error::{ForecastError, Result};
use crate::models::{
    check_chain, sigmoid, to_matrix, DenseLayer, DenseSpec, InputTopology, ModelInput, Predictor,
};
use ndarray::{s, Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Exported weights of one LSTM layer.
///
/// Gates are packed in the order input, forget, cell, output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmSpec {
    /// `inputs × 4 units`
    pub kernel: Vec<Vec<f64>>,
    /// `units × 4 units`
    pub recurrent_kernel: Vec<Vec<f64>>,
    /// `4 units`
    pub bias: Vec<f64>,
}

/// Exported weights of a recurrent network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub lstm: LstmSpec,
    #[serde(default)]
    pub head: Vec<DenseSpec>,
}

/// Single LSTM layer returning its last hidden state
#[derive(Debug, Clone)]
pub struct LstmLayer {
    kernel: Array2<f64>,
    recurrent_kernel: Array2<f64>,
    bias: Array1<f64>,
    units: usize,
}

impl LstmLayer {
    /// Create a layer, checking the packed gate dimensions
    pub fn new(kernel: Array2<f64>, recurrent_kernel: Array2<f64>, bias: Array1<f64>) -> Result<Self> {
        let units = recurrent_kernel.nrows();
        let gates = 4 * units;
        if units == 0
            || kernel.nrows() == 0
            || kernel.ncols() != gates
            || recurrent_kernel.ncols() != gates
            || bias.len() != gates
        {
            return Err(ForecastError::ModelError(format!(
                "LSTM weights inconsistent: kernel {:?}, recurrent kernel {:?}, bias {}",
                kernel.dim(),
                recurrent_kernel.dim(),
                bias.len()
            )));
        }

        Ok(Self {
            kernel,
            recurrent_kernel,
            bias,
            units,
        })
    }

    /// Create a layer from exported weights
    pub fn from_spec(spec: &LstmSpec) -> Result<Self> {
        Self::new(
            to_matrix(&spec.kernel)?,
            to_matrix(&spec.recurrent_kernel)?,
            Array1::from(spec.bias.clone()),
        )
    }

    /// Per-step input width
    pub fn inputs(&self) -> usize {
        self.kernel.nrows()
    }

    /// Hidden state width
    pub fn units(&self) -> usize {
        self.units
    }

    fn forward(&self, sequence: ArrayView2<'_, f64>) -> Array1<f64> {
        let u = self.units;
        let mut h = Array1::<f64>::zeros(u);
        let mut c = Array1::<f64>::zeros(u);

        for x in sequence.rows() {
            let z = x.dot(&self.kernel) + h.dot(&self.recurrent_kernel) + &self.bias;
            let i = z.slice(s![..u]).mapv(sigmoid);
            let f = z.slice(s![u..2 * u]).mapv(sigmoid);
            let g = z.slice(s![2 * u..3 * u]).mapv(f64::tanh);
            let o = z.slice(s![3 * u..]).mapv(sigmoid);

            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f64::tanh);
        }
        h
    }
}

/// LSTM over the window rows followed by a dense head
#[derive(Debug, Clone)]
pub struct RecurrentNetwork {
    /// Name of the model
    name: String,
    lstm: LstmLayer,
    head: Vec<DenseLayer>,
}

impl RecurrentNetwork {
    /// Create a network, checking the head consumes the LSTM state
    pub fn new(name: impl Into<String>, lstm: LstmLayer, head: Vec<DenseLayer>) -> Result<Self> {
        check_chain(&head, lstm.units())?;
        Ok(Self {
            name: name.into(),
            lstm,
            head,
        })
    }

    /// Create a network from exported weights
    pub fn from_spec(spec: RecurrentSpec) -> Result<Self> {
        let lstm = LstmLayer::from_spec(&spec.lstm)?;
        let head = spec
            .head
            .iter()
            .map(DenseLayer::from_spec)
            .collect::<Result<Vec<_>>>()?;
        Self::new(spec.name.unwrap_or_else(|| "recurrent".to_string()), lstm, head)
    }
}

impl Predictor for RecurrentNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn topology(&self) -> InputTopology {
        InputTopology::Sequence
    }

    fn input_size(&self) -> usize {
        self.lstm.inputs()
    }

    fn output_size(&self) -> usize {
        self.head.last().map_or(self.lstm.units(), DenseLayer::units)
    }

    fn predict(&self, input: ModelInput<'_>) -> Result<Vec<f64>> {
        let sequence = match input {
            ModelInput::Sequence(sequence) => sequence,
            ModelInput::Flat(_) => {
                return Err(ForecastError::ModelError(format!(
                    "{} expects sequence input",
                    self.name
                )))
            }
        };
        if sequence.nrows() == 0 || sequence.ncols() != self.input_size() {
            return Err(ForecastError::ModelError(format!(
                "{} expects steps of {} features, got {:?}",
                self.name,
                self.input_size(),
                sequence.dim()
            )));
        }

        let mut activations = self.lstm.forward(sequence);
        for layer in &self.head {
            activations = layer.forward(activations.view());
        }
        Ok(activations.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Activation;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// One unit, one input; only the cell gate sees the input
    fn single_unit() -> LstmLayer {
        LstmLayer::new(
            array![[0.0, 0.0, 1.0, 0.0]],
            array![[0.0, 0.0, 0.0, 0.0]],
            array![0.0, 0.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_single_step_matches_gate_equations() {
        let network = RecurrentNetwork::new("lstm", single_unit(), Vec::new()).unwrap();
        let out = network
            .predict(ModelInput::Sequence(array![[2.0]].view()))
            .unwrap();

        // i = o = sigmoid(0) = 0.5, c = 0.5 * tanh(2)
        let c = 0.5 * 2.0_f64.tanh();
        assert_relative_eq!(out[0], 0.5 * c.tanh(), epsilon = 1e-12);
    }

    #[test]
    fn test_state_carries_across_steps() {
        let network = RecurrentNetwork::new("lstm", single_unit(), Vec::new()).unwrap();
        let one = network.predict(ModelInput::Sequence(array![[1.0]].view())).unwrap();
        let two = network
            .predict(ModelInput::Sequence(array![[1.0], [1.0]].view()))
            .unwrap();

        // f = 0.5 keeps half the previous cell
        let c1 = 0.5 * 1.0_f64.tanh();
        let c2 = 0.5 * c1 + 0.5 * 1.0_f64.tanh();
        assert_relative_eq!(one[0], 0.5 * c1.tanh(), epsilon = 1e-12);
        assert_relative_eq!(two[0], 0.5 * c2.tanh(), epsilon = 1e-12);
    }

    #[test]
    fn test_dense_head() {
        let head = DenseLayer::new(array![[2.0, -2.0]], array![1.0, 1.0], Activation::Linear).unwrap();
        let network = RecurrentNetwork::new("lstm", single_unit(), vec![head]).unwrap();
        assert_eq!(network.output_size(), 2);

        let out = network.predict(ModelInput::Sequence(array![[0.0]].view())).unwrap();
        assert_eq!(out, vec![1.0, 1.0]);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(LstmLayer::new(Array2::zeros((1, 4)), Array2::zeros((1, 4)), Array1::zeros(3)).is_err());

        let network = RecurrentNetwork::new("lstm", single_unit(), Vec::new()).unwrap();
        assert!(network
            .predict(ModelInput::Sequence(array![[1.0, 2.0]].view()))
            .is_err());
        assert!(network.predict(ModelInput::Flat(array![1.0].view())).is_err());
    }

    #[test]
    fn test_spec_round_trip_through_model_file() {
        let json = r#"{
            "kind": "recurrent",
            "name": "lstm",
            "lstm": {
                "kernel": [[0.0, 0.0, 1.0, 0.0]],
                "recurrent_kernel": [[0.0, 0.0, 0.0, 0.0]],
                "bias": [0.0, 0.0, 0.0, 0.0]
            },
            "head": [{"kernel": [[1.0]], "bias": [0.0]}]
        }"#;
        let file: crate::models::ModelFile = serde_json::from_str(json).unwrap();
        let predictor = file.into_predictor().unwrap();

        assert_eq!(predictor.topology(), InputTopology::Sequence);
        assert_eq!(predictor.input_size(), 1);
        assert_eq!(predictor.output_size(), 1);
    }
}
