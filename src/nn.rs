//! TorchScript model loading and tensor conversion helpers.

use std::path::Path;

use opencv::{core::Mat, prelude::*};
use tch::{CModule, Device, IValue, Kind, Tensor};

use crate::error::{Error, Result};

/// A TorchScript module pinned to a device.
pub struct TorchModel {
    module: CModule,
    device: Device,
    name: String,
}

impl TorchModel {
    pub fn load(path: &Path, device: Device) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelLoad(format!(
                "model not found: {}",
                path.display()
            )));
        }

        log::info!("Loading model from {} on {:?}", path.display(), device);
        let mut module = CModule::load_on_device(path, device)?;
        module.set_eval();

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            module,
            device,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the module on a single input, returning all of its outputs in order.
    ///
    /// Modules returning a tuple or list of tensors yield one entry per element.
    pub fn forward(&self, input: &Tensor) -> Result<Vec<Tensor>> {
        let input = IValue::Tensor(input.to_device(self.device));
        let output = tch::no_grad(|| self.module.forward_is(&[input]))?;
        let outputs = flatten_outputs(output)?;
        log::trace!(
            "{}: {:?}",
            self.name,
            outputs.iter().map(|t| t.size()).collect::<Vec<_>>()
        );
        Ok(outputs)
    }
}

fn flatten_outputs(value: IValue) -> Result<Vec<Tensor>> {
    match value {
        IValue::Tensor(tensor) => Ok(vec![tensor]),
        IValue::TensorList(tensors) => Ok(tensors),
        IValue::Tuple(items) | IValue::GenericList(items) => items
            .into_iter()
            .map(|item| match item {
                IValue::Tensor(tensor) => Ok(tensor),
                other => Err(Error::Inference(format!(
                    "unexpected model output element: {other:?}"
                ))),
            })
            .collect(),
        other => Err(Error::Inference(format!(
            "unexpected model output: {other:?}"
        ))),
    }
}

/// Copies a tensor to the CPU and flattens it into a `Vec<f32>`.
pub fn to_vec(tensor: &Tensor) -> Result<Vec<f32>> {
    let flat = tensor
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .flatten(0, -1);
    Ok(Vec::<f32>::try_from(&flat)?)
}

/// Converts an 8-bit matrix with `channels` channels into a `[1, C, H, W]` float tensor in
/// `0.0..=1.0`.
pub fn mat_to_tensor(mat: &Mat) -> Result<Tensor> {
    let (rows, cols, channels) = (mat.rows(), mat.cols(), mat.channels());
    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };

    let bytes = mat.data_bytes()?;
    let tensor = Tensor::from_slice(bytes)
        .view([i64::from(rows), i64::from(cols), i64::from(channels)])
        .permute([2, 0, 1])
        .to_kind(Kind::Float)
        / 255.0;
    Ok(tensor.unsqueeze(0))
}

/// Index of the highest score, the first one on ties.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}

/// The logistic function.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
