//! Hand landmark naming, storage and drawing.

use opencv::{
    core::{Mat, Point, Scalar},
    imgproc::{self, LINE_8},
    prelude::*,
};

use crate::error::Result;

/// Number of landmarks produced per hand.
pub const NUM_LANDMARKS: usize = 21;

/// Names for the hand landmarks, in model output order.
///
/// - **CMC**: carpometacarpal joint, the lowest joint of the thumb.
/// - **MCP**: metacarpophalangeal joint, the knuckles near the palm.
/// - **PIP**/**DIP**: proximal/distal interphalangeal joints.
/// - **Tip**: the tip of the finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Bones drawn between landmarks.
pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        (Wrist, ThumbCmc),
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        (Wrist, IndexFingerMcp),
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        (RingFingerMcp, PinkyMcp),
        (Wrist, PinkyMcp),
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

/// A landmark in normalized frame coordinates.
///
/// `x` and `y` are relative to the frame width and height, `z` is a depth relative to the wrist
/// in roughly the same scale as `x`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// The landmarks of one hand.
#[derive(Debug, Clone)]
pub struct HandLandmarks {
    landmarks: [Landmark; NUM_LANDMARKS],
    presence: f32,
    raw_handedness: f32,
}

impl HandLandmarks {
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS], presence: f32, raw_handedness: f32) -> Self {
        Self {
            landmarks,
            presence,
            raw_handedness,
        }
    }

    pub fn landmarks(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.landmarks
    }

    /// Confidence that a hand is actually present in the tracked region.
    pub fn presence(&self) -> f32 {
        self.presence
    }

    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }

    /// Landmark position in pixels, truncated towards zero.
    pub fn pixel(&self, index: usize, width: i32, height: i32) -> Point {
        let lm = self.landmarks[index];
        Point::new(
            (lm.x * width as f32) as i32,
            (lm.y * height as f32) as i32,
        )
    }

    /// Draws the hand skeleton onto a BGR frame.
    pub fn draw(&self, frame: &mut Mat) -> Result<()> {
        let (w, h) = (frame.cols(), frame.rows());
        for &(a, b) in CONNECTIVITY {
            imgproc::line(
                frame,
                self.pixel(a as usize, w, h),
                self.pixel(b as usize, w, h),
                Scalar::new(224.0, 224.0, 224.0, 0.0),
                2,
                LINE_8,
                0,
            )?;
        }
        for index in 0..NUM_LANDMARKS {
            imgproc::circle(
                frame,
                self.pixel(index, w, h),
                2,
                Scalar::new(0.0, 0.0, 255.0, 0.0),
                2,
                LINE_8,
                0,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_covers_every_landmark() {
        let mut seen = [false; NUM_LANDMARKS];
        for &(a, b) in CONNECTIVITY {
            seen[a as usize] = true;
            seen[b as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(LandmarkIdx::PinkyTip as usize, NUM_LANDMARKS - 1);
    }

    #[test]
    fn pixel_truncates() {
        let mut landmarks = [Landmark::default(); NUM_LANDMARKS];
        landmarks[8] = Landmark {
            x: 0.5004,
            y: 0.2499,
            z: 0.0,
        };
        let hand = HandLandmarks::new(landmarks, 1.0, 0.9);
        assert_eq!(hand.pixel(8, 1000, 1000), Point::new(500, 249));
        assert_eq!(hand.handedness(), Handedness::Right);
    }
}
