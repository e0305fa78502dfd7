//! Hand tracking and the finger-up heuristic.
//!
//! [`HandTracker`] runs a palm detector to find hands and a landmark network to locate the 21
//! landmarks of each hand. While a hand stays visible its next region of interest is derived from
//! the previous landmarks, so palm detection only runs when a hand is lost or missing.

pub mod detection;
pub mod landmarker;
pub mod landmarks;
pub mod roi;

use opencv::{
    core::{Mat, Point},
    imgproc,
    prelude::*,
};

use crate::config::{Config, HandConfig};
use crate::error::Result;
use crate::nn::TorchModel;

use self::detection::{PalmDetection, PalmDetector};
use self::landmarker::LandmarkEstimator;
use self::landmarks::{HandLandmarks, LandmarkIdx};
use self::roi::HandRoi;

/// Finds palms in an RGB frame.
pub trait PalmFinder {
    /// Detections in frame pixels, most confident first.
    fn detect(&self, rgb: &Mat) -> Result<Vec<PalmDetection>>;
}

impl PalmFinder for PalmDetector {
    fn detect(&self, rgb: &Mat) -> Result<Vec<PalmDetection>> {
        PalmDetector::detect(self, rgb)
    }
}

/// Estimates the landmarks of the hand inside a region of an RGB frame.
pub trait HandLandmarker {
    fn estimate(&self, rgb: &Mat, roi: &HandRoi) -> Result<HandLandmarks>;
}

impl HandLandmarker for LandmarkEstimator {
    fn estimate(&self, rgb: &Mat, roi: &HandRoi) -> Result<HandLandmarks> {
        LandmarkEstimator::estimate(self, rgb, roi)
    }
}

/// A landmark of the first tracked hand, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkPoint {
    pub id: usize,
    pub x: i32,
    pub y: i32,
}

impl LandmarkPoint {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Which fingers are extended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fingers {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl Fingers {
    /// The flags as `0`/`1` in thumb-to-pinky order.
    pub fn to_array(self) -> [u8; 5] {
        [
            self.thumb as u8,
            self.index as u8,
            self.middle as u8,
            self.ring as u8,
            self.pinky as u8,
        ]
    }
}

/// Decides which fingers are up from a landmark list.
///
/// The thumb counts as up when its tip is left of its IP joint (this assumes a right hand in a
/// mirrored frame). Other fingers are up when the tip is above the PIP joint. An empty or short
/// list yields all fingers down.
pub fn fingers_up(landmarks: &[LandmarkPoint]) -> Fingers {
    if landmarks.len() <= LandmarkIdx::PinkyTip as usize {
        return Fingers::default();
    }

    let tip_above = |tip: LandmarkIdx| {
        let tip = tip as usize;
        landmarks[tip].y < landmarks[tip - 2].y
    };

    Fingers {
        thumb: landmarks[LandmarkIdx::ThumbTip as usize].x
            < landmarks[LandmarkIdx::ThumbIp as usize].x,
        index: tip_above(LandmarkIdx::IndexFingerTip),
        middle: tip_above(LandmarkIdx::MiddleFingerTip),
        ring: tip_above(LandmarkIdx::RingFingerTip),
        pinky: tip_above(LandmarkIdx::PinkyTip),
    }
}

pub struct HandTracker {
    detector: Box<dyn PalmFinder>,
    landmarker: Box<dyn HandLandmarker>,
    params: HandConfig,
    rois: Vec<HandRoi>,
    hands: Vec<HandLandmarks>,
}

impl HandTracker {
    /// IoU above which a fresh palm detection is considered an already tracked hand.
    const DUPLICATE_IOU: f32 = 0.3;

    pub fn new(config: &Config) -> Result<Self> {
        let device = config.device();
        let detector = PalmDetector::new(
            TorchModel::load(&config.palm_model_path(), device)?,
            config.hands.detection_confidence,
        );
        let landmarker =
            LandmarkEstimator::new(TorchModel::load(&config.landmark_model_path(), device)?);

        log::info!(
            "Hand tracker ready (max_hands={}, detection={}, tracking={})",
            config.hands.max_hands,
            config.hands.detection_confidence,
            config.hands.tracking_confidence
        );
        Ok(Self::with_networks(
            Box::new(detector),
            Box::new(landmarker),
            config.hands.clone(),
        ))
    }

    /// Builds a tracker around already constructed networks.
    pub fn with_networks(
        detector: Box<dyn PalmFinder>,
        landmarker: Box<dyn HandLandmarker>,
        params: HandConfig,
    ) -> Self {
        Self {
            detector,
            landmarker,
            params,
            rois: Vec::new(),
            hands: Vec::new(),
        }
    }

    /// Tracks hands in a BGR frame and optionally draws their skeletons onto it.
    pub fn find_hands(&mut self, frame: &mut Mat, draw: bool) -> Result<()> {
        let mut rgb = Mat::default();
        imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;

        if self.rois.len() < self.params.max_hands {
            for palm in self.detector.detect(&rgb)? {
                if self.rois.len() >= self.params.max_hands {
                    break;
                }
                let roi = HandRoi::from_palm(&palm);
                let tracked = self
                    .rois
                    .iter()
                    .any(|r| r.bounding_box().iou(&roi.bounding_box()) >= Self::DUPLICATE_IOU);
                if !tracked {
                    log::debug!("new hand at ({:.0}, {:.0})", roi.x_center, roi.y_center);
                    self.rois.push(roi);
                }
            }
        }

        self.hands.clear();
        let (w, h) = (rgb.cols(), rgb.rows());
        let mut next_rois = Vec::with_capacity(self.rois.len());
        for roi in &self.rois {
            let hand = self.landmarker.estimate(&rgb, roi)?;
            log::trace!(
                "{:?} hand, presence {:.2}",
                hand.handedness(),
                hand.presence()
            );
            if hand.presence() < self.params.tracking_confidence {
                log::debug!("hand lost (presence {:.2})", hand.presence());
                continue;
            }
            next_rois.push(HandRoi::from_landmarks(&hand, w, h));
            self.hands.push(hand);
        }
        self.rois = next_rois;

        if draw {
            for hand in &self.hands {
                hand.draw(frame)?;
            }
        }
        Ok(())
    }

    /// Pixel landmarks of the first hand, or an empty list if no hand is visible.
    pub fn landmark_list(&self, frame: &Mat) -> Vec<LandmarkPoint> {
        landmark_list(self.hands.first(), frame.cols(), frame.rows())
    }
}

fn landmark_list(hand: Option<&HandLandmarks>, width: i32, height: i32) -> Vec<LandmarkPoint> {
    let Some(hand) = hand else {
        return Vec::new();
    };
    (0..hand.landmarks().len())
        .map(|id| {
            let p = hand.pixel(id, width, height);
            LandmarkPoint { id, x: p.x, y: p.y }
        })
        .collect()
}
