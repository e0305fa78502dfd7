//! Hand landmark estimation inside a region of interest.

use opencv::{core::Mat, prelude::*};

use crate::error::{Error, Result};
use crate::nn::{self, TorchModel};

use super::landmarks::{HandLandmarks, Landmark, NUM_LANDMARKS};
use super::roi::HandRoi;

pub struct LandmarkEstimator {
    model: TorchModel,
}

impl LandmarkEstimator {
    pub const INPUT_SIZE: i32 = 224;

    pub fn new(model: TorchModel) -> Self {
        Self { model }
    }

    /// Estimates the landmarks of the hand inside `roi` of an RGB frame.
    ///
    /// The network outputs are, in order: 63 screen landmark values (x, y, z in crop pixels), the
    /// hand presence score and the handedness score.
    pub fn estimate(&self, rgb: &Mat, roi: &HandRoi) -> Result<HandLandmarks> {
        let crop = roi.crop(rgb, Self::INPUT_SIZE)?;
        let outputs = self.model.forward(&nn::mat_to_tensor(&crop)?)?;
        if outputs.len() < 3 {
            return Err(Error::Inference(format!(
                "landmark model returned {} outputs, expected 3",
                outputs.len()
            )));
        }

        let raw = nn::to_vec(&outputs[0])?;
        let presence = first_value(&outputs[1])?;
        let handedness = first_value(&outputs[2])?;

        Ok(HandLandmarks::new(
            map_landmarks(&raw, roi, rgb.cols(), rgb.rows())?,
            presence,
            handedness,
        ))
    }
}

fn first_value(tensor: &tch::Tensor) -> Result<f32> {
    nn::to_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| Error::Inference("empty landmark model output".to_string()))
}

/// Maps crop-space landmark triples back to normalized frame coordinates.
fn map_landmarks(
    raw: &[f32],
    roi: &HandRoi,
    frame_width: i32,
    frame_height: i32,
) -> Result<[Landmark; NUM_LANDMARKS]> {
    if raw.len() < NUM_LANDMARKS * 3 {
        return Err(Error::Inference(format!(
            "landmark model returned {} values, expected {}",
            raw.len(),
            NUM_LANDMARKS * 3
        )));
    }

    let (w, h) = (frame_width as f32, frame_height as f32);
    let z_scale = roi.size / LandmarkEstimator::INPUT_SIZE as f32 / w;
    let mut landmarks = [Landmark::default(); NUM_LANDMARKS];
    for (out, xyz) in landmarks.iter_mut().zip(raw.chunks_exact(3)) {
        let (x, y) = roi.map_to_frame(LandmarkEstimator::INPUT_SIZE, xyz[0], xyz[1]);
        *out = Landmark {
            x: x / w,
            y: y / h,
            z: xyz[2] * z_scale,
        };
    }
    Ok(landmarks)
}
