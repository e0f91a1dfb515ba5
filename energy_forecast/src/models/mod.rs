//! Predictors evaluated over a normalized window

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

pub mod feed_forward;
pub mod recurrent;

pub use feed_forward::{FeedForwardNetwork, FeedForwardSpec};
pub use recurrent::{LstmLayer, LstmSpec, RecurrentNetwork, RecurrentSpec};

/// Shape a predictor expects its window in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTopology {
    /// All rows concatenated into one vector
    Flat,
    /// One row per time step
    Sequence,
}

/// A window presented in one of the two topologies
#[derive(Debug, Clone, Copy)]
pub enum ModelInput<'a> {
    Flat(ArrayView1<'a, f64>),
    Sequence(ArrayView2<'a, f64>),
}

impl ModelInput<'_> {
    /// Topology of this input
    pub fn topology(&self) -> InputTopology {
        match self {
            ModelInput::Flat(_) => InputTopology::Flat,
            ModelInput::Sequence(_) => InputTopology::Sequence,
        }
    }
}

/// A trained model mapping a window to one output vector
pub trait Predictor: Debug + Send + Sync {
    /// Name of the model
    fn name(&self) -> &str;

    /// Topology the model consumes
    fn topology(&self) -> InputTopology;

    /// Width of one input: the flat length, or the per-step width of a sequence
    fn input_size(&self) -> usize;

    /// Length of the output vector
    fn output_size(&self) -> usize;

    /// Evaluate the model once
    fn predict(&self, input: ModelInput<'_>) -> Result<Vec<f64>>;
}

/// Element-wise activation of a dense layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
        }
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Exported weights of one dense layer; `kernel` is `inputs × units`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseSpec {
    pub kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

/// Fully connected layer `y = act(x · W + b)`
#[derive(Debug, Clone)]
pub struct DenseLayer {
    kernel: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    /// Create a layer from an `inputs × units` kernel and a `units` bias
    pub fn new(kernel: Array2<f64>, bias: Array1<f64>, activation: Activation) -> Result<Self> {
        if kernel.ncols() != bias.len() || kernel.is_empty() {
            return Err(ForecastError::ModelError(format!(
                "Dense kernel {:?} does not match bias of {} units",
                kernel.dim(),
                bias.len()
            )));
        }
        Ok(Self {
            kernel,
            bias,
            activation,
        })
    }

    /// Create a layer from exported weights
    pub fn from_spec(spec: &DenseSpec) -> Result<Self> {
        Self::new(
            to_matrix(&spec.kernel)?,
            Array1::from(spec.bias.clone()),
            spec.activation,
        )
    }

    /// Number of inputs
    pub fn inputs(&self) -> usize {
        self.kernel.nrows()
    }

    /// Number of outputs
    pub fn units(&self) -> usize {
        self.kernel.ncols()
    }

    pub(crate) fn forward(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let activation = self.activation;
        (x.dot(&self.kernel) + &self.bias).mapv_into(|v| activation.apply(v))
    }
}

/// Check that consecutive dense layers agree on their widths
pub(crate) fn check_chain(layers: &[DenseLayer], input_size: usize) -> Result<()> {
    let mut width = input_size;
    for (i, layer) in layers.iter().enumerate() {
        if layer.inputs() != width {
            return Err(ForecastError::ModelError(format!(
                "Layer {} expects {} inputs but receives {}",
                i,
                layer.inputs(),
                width
            )));
        }
        width = layer.units();
    }
    Ok(())
}

/// Convert nested rows into a matrix, rejecting ragged input
pub(crate) fn to_matrix(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(ForecastError::ModelError("Ragged weight matrix".to_string()));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), ncols), flat)
        .map_err(|e| ForecastError::ModelError(e.to_string()))
}

/// A model weights file, tagged by architecture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelFile {
    FeedForward(FeedForwardSpec),
    Recurrent(RecurrentSpec),
}

impl ModelFile {
    /// Read a weights file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Build the predictor described by the file
    pub fn into_predictor(self) -> Result<Box<dyn Predictor>> {
        Ok(match self {
            ModelFile::FeedForward(spec) => Box::new(FeedForwardNetwork::from_spec(spec)?),
            ModelFile::Recurrent(spec) => Box::new(RecurrentNetwork::from_spec(spec)?),
        })
    }
}

/// Load a predictor from a JSON weights file and check it consumes `topology`
pub fn load_predictor<P: AsRef<Path>>(path: P, topology: InputTopology) -> Result<Box<dyn Predictor>> {
    let path = path.as_ref();
    let predictor = ModelFile::read(path)?.into_predictor()?;
    if predictor.topology() != topology {
        return Err(ForecastError::ModelError(format!(
            "{} consumes {:?} input, expected {:?}",
            predictor.name(),
            predictor.topology(),
            topology
        )));
    }
    info!(path = %path.display(), model = predictor.name(), "model loaded");
    Ok(predictor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_activation() {
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Linear.apply(-2.0), -2.0);
        assert_eq!(Activation::Sigmoid.apply(0.0), 0.5);
        assert_eq!(Activation::Tanh.apply(0.0), 0.0);
    }

    #[test]
    fn test_dense_forward() {
        let layer = DenseLayer::new(
            array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]],
            array![0.5, -10.0],
            Activation::Relu,
        )
        .unwrap();

        let out = layer.forward(array![1.0, 2.0, 3.0].view());
        assert_eq!(out.to_vec(), vec![4.5, 0.0]);
    }

    #[test]
    fn test_to_matrix_rejects_ragged() {
        assert!(to_matrix(&[vec![1.0, 2.0], vec![3.0]]).is_err());
        assert_eq!(to_matrix(&[vec![1.0, 2.0]]).unwrap().dim(), (1, 2));
    }

    #[test]
    fn test_check_chain() {
        let a = DenseLayer::new(Array2::zeros((4, 3)), Array1::zeros(3), Activation::Relu).unwrap();
        let b = DenseLayer::new(Array2::zeros((3, 2)), Array1::zeros(2), Activation::Linear).unwrap();
        assert!(check_chain(&[a.clone(), b.clone()], 4).is_ok());
        assert!(check_chain(&[b, a], 4).is_err());
    }
}
