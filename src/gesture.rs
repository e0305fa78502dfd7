//! Mapping of finger patterns to drawing actions.

use opencv::core::Point;

use crate::hand::Fingers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Index, middle and ring finger up: pick a palette entry with the middle fingertip.
    Select,
    /// Index and middle finger up: anchor and preview a shape.
    ShapePreview,
    /// Only the index finger up: draw freehand, committing any pending shape first.
    Draw,
    Idle,
}

impl Gesture {
    /// Thumb and pinky are ignored.
    pub fn classify(fingers: Fingers) -> Self {
        match (fingers.index, fingers.middle, fingers.ring) {
            (true, true, true) => Gesture::Select,
            (true, true, false) => Gesture::ShapePreview,
            (true, false, _) => Gesture::Draw,
            _ => Gesture::Idle,
        }
    }
}

/// Exponential smoothing of the fingertip position.
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    weight: f64,
    current: Point,
}

impl Smoother {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            current: Point::new(0, 0),
        }
    }

    /// Blends `sample` into the smoothed position; results are truncated to whole pixels.
    pub fn update(&mut self, sample: Point) -> Point {
        let blend = |new: i32, old: i32| {
            (self.weight * f64::from(new) + (1.0 - self.weight) * f64::from(old)) as i32
        };
        self.current = Point::new(
            blend(sample.x, self.current.x),
            blend(sample.y, self.current.y),
        );
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingers(index: bool, middle: bool, ring: bool) -> Fingers {
        Fingers {
            thumb: true,
            index,
            middle,
            ring,
            pinky: true,
        }
    }

    #[test]
    fn classification_priority() {
        assert_eq!(Gesture::classify(fingers(true, true, true)), Gesture::Select);
        assert_eq!(
            Gesture::classify(fingers(true, true, false)),
            Gesture::ShapePreview
        );
        assert_eq!(Gesture::classify(fingers(true, false, false)), Gesture::Draw);
        assert_eq!(Gesture::classify(fingers(true, false, true)), Gesture::Draw);
        assert_eq!(Gesture::classify(fingers(false, true, true)), Gesture::Idle);
        assert_eq!(Gesture::classify(Fingers::default()), Gesture::Idle);
    }

    #[test]
    fn smoothing_starts_from_origin() {
        let mut smoother = Smoother::new(0.65);
        assert_eq!(smoother.update(Point::new(100, 200)), Point::new(65, 130));
        // 0.65 * 100 + 0.35 * 65 = 87.75
        assert_eq!(smoother.update(Point::new(100, 200)), Point::new(87, 175));
    }
}
