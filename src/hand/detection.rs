//! Palm detection.
//!
//! The palm detector is a single-shot multibox detector operating on a square 192x192 RGB input.
//! Each of its 2016 anchors predicts a box, seven palm keypoints and a score.

use opencv::{
    core::{Mat, Rect, Scalar, Size, CV_8UC3},
    imgproc,
    prelude::*,
};

use crate::error::{Error, Result};
use crate::nn::{self, TorchModel};

/// Keypoints predicted alongside each palm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmKeypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

const NUM_KEYPOINTS: usize = 7;
const VALUES_PER_ANCHOR: usize = 4 + 2 * NUM_KEYPOINTS;

/// Axis-aligned box stored by its center and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection over union of two boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let left = (self.x_center - self.width / 2.0).max(other.x_center - other.width / 2.0);
        let right = (self.x_center + self.width / 2.0).min(other.x_center + other.width / 2.0);
        let top = (self.y_center - self.height / 2.0).max(other.y_center - other.height / 2.0);
        let bottom =
            (self.y_center + self.height / 2.0).min(other.y_center + other.height / 2.0);

        let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// A detected palm in frame pixel coordinates.
#[derive(Debug, Clone)]
pub struct PalmDetection {
    pub confidence: f32,
    pub rect: BoundingBox,
    pub keypoints: [(f32, f32); NUM_KEYPOINTS],
}

impl PalmDetection {
    pub fn new(confidence: f32, rect: BoundingBox, keypoints: [(f32, f32); NUM_KEYPOINTS]) -> Self {
        Self {
            confidence,
            rect,
            keypoints,
        }
    }

    pub fn keypoint(&self, keypoint: PalmKeypoint) -> (f32, f32) {
        self.keypoints[keypoint as usize]
    }
}

/// SSD anchor centers, relative to the input size.
pub struct Anchors {
    centers: Vec<(f32, f32)>,
}

impl Anchors {
    /// Anchors for feature layers given as `(boxes_per_cell, grid_size)`.
    pub fn calculate(layers: &[(u32, u32)]) -> Self {
        let mut centers = Vec::new();
        for &(boxes_per_cell, grid) in layers {
            for y in 0..grid {
                for x in 0..grid {
                    let center = (
                        (x as f32 + 0.5) / grid as f32,
                        (y as f32 + 0.5) / grid as f32,
                    );
                    for _ in 0..boxes_per_cell {
                        centers.push(center);
                    }
                }
            }
        }
        Self { centers }
    }

    pub fn palm() -> Self {
        Self::calculate(&[(2, 24), (6, 12)])
    }

    /// Anchor centers in `0.0..1.0` input coordinates, in model output order.
    pub fn centers(&self) -> &[(f32, f32)] {
        &self.centers
    }
}

/// Decodes raw box regressors and logits into detections in input pixel coordinates.
pub fn decode(
    anchors: &Anchors,
    input_size: f32,
    boxes: &[f32],
    logits: &[f32],
    threshold: f32,
) -> Result<Vec<PalmDetection>> {
    let centers = anchors.centers();
    if logits.len() != centers.len() || boxes.len() != centers.len() * VALUES_PER_ANCHOR {
        return Err(Error::Inference(format!(
            "palm detector output mismatch: {} boxes, {} scores for {} anchors",
            boxes.len(),
            logits.len(),
            centers.len()
        )));
    }

    let mut detections = Vec::new();
    for (index, &logit) in logits.iter().enumerate() {
        let confidence = nn::sigmoid(logit);
        if confidence < threshold {
            continue;
        }

        let params = &boxes[index * VALUES_PER_ANCHOR..(index + 1) * VALUES_PER_ANCHOR];
        let (ax, ay) = centers[index];
        let (ax, ay) = (ax * input_size, ay * input_size);

        let mut keypoints = [(0.0, 0.0); NUM_KEYPOINTS];
        for (k, keypoint) in keypoints.iter_mut().enumerate() {
            *keypoint = (params[4 + 2 * k] + ax, params[5 + 2 * k] + ay);
        }

        detections.push(PalmDetection::new(
            confidence,
            BoundingBox::from_center(params[0] + ax, params[1] + ay, params[2], params[3]),
            keypoints,
        ));
    }
    Ok(detections)
}

/// Merges overlapping detections into their confidence-weighted average.
///
/// Detections are processed by descending confidence; each seed absorbs every remaining detection
/// whose IoU with it is at least `iou_thresh`. The merged detection keeps the seed's confidence.
pub fn weighted_nms(mut detections: Vec<PalmDetection>, iou_thresh: f32) -> Vec<PalmDetection> {
    detections.sort_by(|a, b| a.confidence.total_cmp(&b.confidence));

    let mut out = Vec::new();
    while let Some(seed) = detections.pop() {
        let mut group = vec![seed.clone()];
        detections.retain(|other| {
            if seed.rect.iou(&other.rect) >= iou_thresh {
                group.push(other.clone());
                false
            } else {
                true
            }
        });

        let divisor: f32 = group.iter().map(|det| det.confidence).sum();
        let mut rect = BoundingBox::from_center(0.0, 0.0, 0.0, 0.0);
        let mut keypoints = [(0.0, 0.0); NUM_KEYPOINTS];
        for det in &group {
            let factor = det.confidence / divisor;
            rect.x_center += det.rect.x_center * factor;
            rect.y_center += det.rect.y_center * factor;
            rect.width += det.rect.width * factor;
            rect.height += det.rect.height * factor;
            for (acc, kp) in keypoints.iter_mut().zip(&det.keypoints) {
                acc.0 += kp.0 * factor;
                acc.1 += kp.1 * factor;
            }
        }
        out.push(PalmDetection::new(seed.confidence, rect, keypoints));
    }
    out
}

/// Runs the palm detection network on whole frames.
pub struct PalmDetector {
    model: TorchModel,
    anchors: Anchors,
    threshold: f32,
    iou_thresh: f32,
}

impl PalmDetector {
    pub const INPUT_SIZE: i32 = 192;
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    pub fn new(model: TorchModel, threshold: f32) -> Self {
        Self {
            model,
            anchors: Anchors::palm(),
            threshold,
            iou_thresh: Self::DEFAULT_IOU_THRESH,
        }
    }

    /// Detects palms in an RGB frame, sorted by descending confidence.
    pub fn detect(&self, rgb: &Mat) -> Result<Vec<PalmDetection>> {
        let (w, h) = (rgb.cols(), rgb.rows());
        let side = w.max(h);
        let (pad_x, pad_y) = ((side - w) / 2, (side - h) / 2);

        // Letterbox into a square so the aspect ratio survives the resize.
        let mut square = Mat::new_rows_cols_with_default(side, side, CV_8UC3, Scalar::all(0.0))?;
        {
            let mut target = Mat::roi_mut(&mut square, Rect::new(pad_x, pad_y, w, h))?;
            rgb.copy_to(&mut target)?;
        }
        let mut input = Mat::default();
        imgproc::resize(
            &square,
            &mut input,
            Size::new(Self::INPUT_SIZE, Self::INPUT_SIZE),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let outputs = self.model.forward(&nn::mat_to_tensor(&input)?)?;
        if outputs.len() < 2 {
            return Err(Error::Inference(format!(
                "palm detector returned {} outputs, expected 2",
                outputs.len()
            )));
        }
        let boxes = nn::to_vec(&outputs[0])?;
        let logits = nn::to_vec(&outputs[1])?;

        let raw = decode(
            &self.anchors,
            Self::INPUT_SIZE as f32,
            &boxes,
            &logits,
            self.threshold,
        )?;
        log::trace!("palm detector: {} raw detections", raw.len());

        let scale = side as f32 / Self::INPUT_SIZE as f32;
        let (dx, dy) = (pad_x as f32, pad_y as f32);
        let mut palms = weighted_nms(raw, self.iou_thresh);
        for palm in &mut palms {
            palm.rect = BoundingBox::from_center(
                palm.rect.x_center * scale - dx,
                palm.rect.y_center * scale - dy,
                palm.rect.width * scale,
                palm.rect.height * scale,
            );
            for kp in &mut palm.keypoints {
                *kp = (kp.0 * scale - dx, kp.1 * scale - dy);
            }
        }
        Ok(palms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn palm_anchor_count() {
        let anchors = Anchors::palm();
        let centers = anchors.centers();
        assert_eq!(centers.len(), 2016);
        assert_eq!(centers[0], centers[1]);
        assert_abs_diff_eq!(centers[0].0, 0.5 / 24.0);
        assert_abs_diff_eq!(centers[1152].0, 0.5 / 12.0);
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoundingBox::from_center(0.0, 0.0, 2.0, 2.0);
        let b = BoundingBox::from_center(10.0, 0.0, 2.0, 2.0);
        assert_abs_diff_eq!(a.iou(&a), 1.0);
        assert_abs_diff_eq!(a.iou(&b), 0.0);
        let c = BoundingBox::from_center(1.0, 0.0, 2.0, 2.0);
        assert_abs_diff_eq!(a.iou(&c), 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn decode_filters_by_threshold() {
        let anchors = Anchors::calculate(&[(1, 2)]);
        let mut boxes = vec![0.0; anchors.centers().len() * VALUES_PER_ANCHOR];
        boxes[VALUES_PER_ANCHOR] = 3.0;
        boxes[VALUES_PER_ANCHOR + 2] = 10.0;
        boxes[VALUES_PER_ANCHOR + 3] = 12.0;
        let logits = vec![-5.0, 5.0, -5.0, -5.0];

        let detections = decode(&anchors, 100.0, &boxes, &logits, 0.5).unwrap();
        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_abs_diff_eq!(det.rect.x_center, 78.0);
        assert_abs_diff_eq!(det.rect.y_center, 25.0);
        assert_abs_diff_eq!(det.rect.width, 10.0);
        assert_abs_diff_eq!(det.keypoint(PalmKeypoint::Wrist).0, 75.0);
    }

    #[test]
    fn decode_rejects_wrong_shapes() {
        let anchors = Anchors::calculate(&[(1, 2)]);
        assert!(decode(&anchors, 100.0, &[0.0; 3], &[0.0; 4], 0.5).is_err());
    }

    #[test]
    fn nms_averages_overlapping() {
        let kp = [(0.0, 0.0); NUM_KEYPOINTS];
        let a = PalmDetection::new(0.75, BoundingBox::from_center(0.0, 0.0, 10.0, 10.0), kp);
        let b = PalmDetection::new(0.25, BoundingBox::from_center(1.0, 0.0, 10.0, 10.0), kp);
        let far = PalmDetection::new(0.5, BoundingBox::from_center(100.0, 0.0, 10.0, 10.0), kp);

        let merged = weighted_nms(vec![b, far, a], 0.3);
        assert_eq!(merged.len(), 2);
        assert_abs_diff_eq!(merged[0].confidence, 0.75);
        assert_abs_diff_eq!(merged[0].rect.x_center, 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(merged[1].rect.x_center, 100.0);
    }
}
