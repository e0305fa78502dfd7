//! Rotated square regions of interest around a hand.

use opencv::{
    core::{self, Mat, Scalar, Size},
    imgproc,
    prelude::*,
};

use crate::error::Result;

use super::detection::{BoundingBox, PalmDetection, PalmKeypoint};
use super::landmarks::{HandLandmarks, LandmarkIdx};

/// A rotated square in frame pixel coordinates.
///
/// `angle` is in radians, clockwise in image coordinates. An angle of zero means the fingers point
/// straight up in the crop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandRoi {
    pub x_center: f32,
    pub y_center: f32,
    pub size: f32,
    pub angle: f32,
}

/// Rotation that maps the direction `wrist -> finger` onto "up".
fn upright_angle(wrist: (f32, f32), finger: (f32, f32)) -> f32 {
    let (dx, dy) = (finger.0 - wrist.0, finger.1 - wrist.1);
    dx.atan2(-dy)
}

impl HandRoi {
    const PALM_SCALE: f32 = 2.6;
    const PALM_SHIFT_Y: f32 = -0.5;
    const LANDMARK_SCALE: f32 = 2.0;
    const LANDMARK_SHIFT_Y: f32 = -0.1;

    /// Expands a palm detection into a region covering the whole hand.
    pub fn from_palm(palm: &PalmDetection) -> Self {
        let rect = palm.rect;
        let angle = upright_angle(
            palm.keypoint(PalmKeypoint::Wrist),
            palm.keypoint(PalmKeypoint::MiddleFingerMcp),
        );
        Self::from_oriented_box(
            (rect.x_center, rect.y_center),
            rect.width,
            rect.height,
            angle,
            Self::PALM_SHIFT_Y,
            Self::PALM_SCALE,
        )
    }

    /// Computes the region to track a hand in the next frame from its current landmarks.
    pub fn from_landmarks(hand: &HandLandmarks, frame_width: i32, frame_height: i32) -> Self {
        let (w, h) = (frame_width as f32, frame_height as f32);
        let points: Vec<(f32, f32)> = hand
            .landmarks()
            .iter()
            .map(|lm| (lm.x * w, lm.y * h))
            .collect();

        let wrist = points[LandmarkIdx::Wrist as usize];
        let mcp = points[LandmarkIdx::MiddleFingerMcp as usize];
        let angle = upright_angle(wrist, mcp);

        // Axis-aligned bounds in the hand's own rotated frame.
        let (sin, cos) = angle.sin_cos();
        let (mut min_u, mut min_v) = (f32::MAX, f32::MAX);
        let (mut max_u, mut max_v) = (f32::MIN, f32::MIN);
        for &(x, y) in &points {
            let u = x * cos + y * sin;
            let v = -x * sin + y * cos;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }
        let (uc, vc) = ((min_u + max_u) / 2.0, (min_v + max_v) / 2.0);
        let center = (uc * cos - vc * sin, uc * sin + vc * cos);

        Self::from_oriented_box(
            center,
            max_u - min_u,
            max_v - min_v,
            angle,
            Self::LANDMARK_SHIFT_Y,
            Self::LANDMARK_SCALE,
        )
    }

    fn from_oriented_box(
        center: (f32, f32),
        width: f32,
        height: f32,
        angle: f32,
        shift_y: f32,
        scale: f32,
    ) -> Self {
        let (sin, cos) = angle.sin_cos();
        let shift = shift_y * height;
        Self {
            x_center: center.0 - sin * shift,
            y_center: center.1 + cos * shift,
            size: width.max(height) * scale,
            angle,
        }
    }

    /// Affine matrix (2x3, row major) mapping crop pixels of a `crop_size` square to frame pixels.
    pub fn crop_to_frame(&self, crop_size: i32) -> [[f64; 3]; 2] {
        let (sin, cos) = (f64::from(self.angle).sin(), f64::from(self.angle).cos());
        let size = f64::from(self.size);
        let k = size / f64::from(crop_size);
        let half = size / 2.0;
        [
            [
                k * cos,
                -k * sin,
                f64::from(self.x_center) - half * (cos - sin),
            ],
            [
                k * sin,
                k * cos,
                f64::from(self.y_center) - half * (sin + cos),
            ],
        ]
    }

    /// Maps a point in crop pixels back into the frame.
    pub fn map_to_frame(&self, crop_size: i32, u: f32, v: f32) -> (f32, f32) {
        let m = self.crop_to_frame(crop_size);
        let (u, v) = (f64::from(u), f64::from(v));
        (
            (m[0][0] * u + m[0][1] * v + m[0][2]) as f32,
            (m[1][0] * u + m[1][1] * v + m[1][2]) as f32,
        )
    }

    /// Cuts the region out of `frame`, rotated upright and resized to `crop_size` squared.
    pub fn crop(&self, frame: &Mat, crop_size: i32) -> Result<Mat> {
        let affine = Mat::from_slice_2d(&self.crop_to_frame(crop_size))?;
        let mut crop = Mat::default();
        imgproc::warp_affine(
            frame,
            &mut crop,
            &affine,
            Size::new(crop_size, crop_size),
            imgproc::INTER_LINEAR | imgproc::WARP_INVERSE_MAP,
            core::BORDER_CONSTANT,
            Scalar::all(0.0),
        )?;
        Ok(crop)
    }

    /// Axis-aligned box enclosing the rotated square.
    pub fn bounding_box(&self) -> BoundingBox {
        let (sin, cos) = self.angle.sin_cos();
        let extent = self.size * (sin.abs() + cos.abs());
        BoundingBox::from_center(self.x_center, self.y_center, extent, extent)
    }
}
