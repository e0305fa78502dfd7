//! Recognition of drawn letters, digits and sketches.
//!
//! The binarized canvas is split into regions with OpenCV contour extraction, each region is
//! centered on a padded square and downscaled to the 28x28 input of a pretrained classifier.
//! Letter sequences are optionally passed through dictionary spelling correction.

pub mod preprocess;
pub mod spell;

use std::fmt;
use std::fs;
use std::path::Path;

use opencv::{core::Mat, prelude::*};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::nn::{self, TorchModel};

use self::preprocess::{SKETCH_PADDING, TEXT_PADDING};
use self::spell::SpellChecker;

/// What the user is drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Alpha,
    Num,
    Draw,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Alpha => "ALPHA",
            Mode::Num => "NUM",
            Mode::Draw => "DRAW",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A network scoring a single-channel `28x28` glyph.
pub trait GlyphClassifier {
    /// Returns one score per class.
    fn scores(&self, glyph: &Mat) -> Result<Vec<f32>>;
}

impl GlyphClassifier for TorchModel {
    fn scores(&self, glyph: &Mat) -> Result<Vec<f32>> {
        let outputs = self.forward(&nn::mat_to_tensor(glyph)?)?;
        let scores = outputs
            .first()
            .ok_or_else(|| Error::Inference(format!("{} produced no output", self.name())))?;
        nn::to_vec(scores)
    }
}

/// A classifier together with the names of its classes.
pub struct LabeledClassifier {
    classifier: Box<dyn GlyphClassifier>,
    labels: Vec<String>,
}

impl LabeledClassifier {
    pub fn new(classifier: Box<dyn GlyphClassifier>, labels: Vec<String>) -> Self {
        Self { classifier, labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Labels a binary region after padding it by `padding` pixels and downscaling it.
    pub fn classify(&self, roi: &Mat, padding: i32) -> Result<&str> {
        let glyph = preprocess::to_glyph(roi, padding)?;
        let scores = self.classifier.scores(&glyph)?;
        let best = nn::argmax(&scores)
            .ok_or_else(|| Error::Inference("classifier returned no scores".to_string()))?;
        self.labels.get(best).map(String::as_str).ok_or_else(|| {
            Error::Inference(format!(
                "class {best} out of range for {} labels",
                self.labels.len()
            ))
        })
    }
}

/// `A`..`Z`.
pub fn alpha_labels() -> Vec<String> {
    (b'A'..=b'Z').map(|c| char::from(c).to_string()).collect()
}

/// `0`..`9`.
pub fn digit_labels() -> Vec<String> {
    (0..10).map(|d| d.to_string()).collect()
}

/// One label per line, surrounding whitespace trimmed. Blank lines keep their slot.
pub fn parse_labels(contents: &str) -> Result<Vec<String>> {
    let labels: Vec<String> = contents.lines().map(|l| l.trim().to_string()).collect();
    if labels.is_empty() {
        return Err(Error::Labels("no classes listed".to_string()));
    }
    Ok(labels)
}

pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    parse_labels(&fs::read_to_string(path)?)
        .map_err(|e| Error::Labels(format!("{}: {e}", path.display())))
}

/// Result of recognizing text: what the classifiers read and its dictionary correction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextReading {
    pub raw: String,
    pub corrected: String,
}

pub struct RecognitionEngine {
    alpha: LabeledClassifier,
    num: LabeledClassifier,
    sketch: LabeledClassifier,
    spell: Option<SpellChecker>,
}

impl RecognitionEngine {
    pub fn new(
        alpha: LabeledClassifier,
        num: LabeledClassifier,
        sketch: LabeledClassifier,
        spell: Option<SpellChecker>,
    ) -> Self {
        Self {
            alpha,
            num,
            sketch,
            spell,
        }
    }

    /// Loads the three classifiers and the spelling dictionary.
    ///
    /// A missing dictionary only disables spelling correction.
    pub fn load(config: &Config) -> Result<Self> {
        let device = config.device();
        let torch = |path: &Path| -> Result<Box<dyn GlyphClassifier>> {
            Ok(Box::new(TorchModel::load(path, device)?))
        };

        let alpha = LabeledClassifier::new(torch(&config.alpha_model_path())?, alpha_labels());
        let num = LabeledClassifier::new(torch(&config.num_model_path())?, digit_labels());
        let sketch = LabeledClassifier::new(
            torch(&config.sketch_model_path())?,
            load_labels(&config.sketch_labels_path())?,
        );

        let spell = match SpellChecker::load(&config.dictionary_path()) {
            Ok(spell) => Some(spell),
            Err(e) => {
                log::warn!("Spelling correction disabled: {e}");
                None
            }
        };

        log::info!(
            "Recognition models loaded ({} sketch classes)",
            sketch.labels().len()
        );
        Ok(Self::new(alpha, num, sketch, spell))
    }

    /// Reads the glyphs on a binary canvas from left to right.
    ///
    /// In [`Mode::Alpha`] a reading of two or more letters is also spell-corrected; if the
    /// dictionary has no candidate the raw reading is kept. Any other mode uses the digit model.
    pub fn predict_text(&self, binary: &Mat, mode: Mode) -> Result<TextReading> {
        let Some(boxes) = preprocess::glyph_boxes(binary)? else {
            return Ok(TextReading::default());
        };

        let model = match mode {
            Mode::Alpha => &self.alpha,
            _ => &self.num,
        };

        let mut raw = String::new();
        for rect in boxes {
            let roi = preprocess::crop(binary, rect)?;
            raw.push_str(model.classify(&roi, TEXT_PADDING)?);
        }

        let mut corrected = String::new();
        if mode == Mode::Alpha && raw.chars().count() > 1 {
            if let Some(spell) = &self.spell {
                corrected = spell
                    .correction(&raw.to_lowercase())
                    .unwrap_or_else(|| raw.clone())
                    .to_uppercase();
            }
        }

        log::debug!("read {raw:?} (corrected {corrected:?})");
        Ok(TextReading { raw, corrected })
    }

    /// Names the sketch on a binary canvas, or `"NONE"` if the canvas is empty.
    pub fn predict_drawing(&self, binary: &Mat) -> Result<String> {
        let Some(rect) = preprocess::drawing_box(binary)? else {
            return Ok("NONE".to_string());
        };

        let roi = preprocess::dilate(&preprocess::crop(binary, rect)?)?;
        let label = self.sketch.classify(&roi, SKETCH_PADDING)?;
        log::debug!("sketch classified as {label:?}");
        Ok(label.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use opencv::{
        core::{Rect, Scalar, CV_8UC1},
        imgproc::{self, FILLED, LINE_8},
    };

    /// Scores a glyph by its shape: the class is picked from the ink's aspect ratio, so tall
    /// strokes and wide strokes classify differently without any model.
    pub(crate) struct AspectClassifier {
        pub classes: usize,
        pub tall: usize,
        pub wide: usize,
    }

    impl GlyphClassifier for AspectClassifier {
        fn scores(&self, glyph: &Mat) -> Result<Vec<f32>> {
            assert_eq!((glyph.cols(), glyph.rows()), (28, 28));
            let rect = preprocess::drawing_box(glyph)?.unwrap_or_default();
            let mut scores = vec![0.0; self.classes];
            if rect.height > rect.width {
                scores[self.tall] = 1.0;
            } else {
                scores[self.wide] = 1.0;
            }
            Ok(scores)
        }
    }

    pub(crate) fn engine(spell: Option<SpellChecker>) -> RecognitionEngine {
        // Tall glyphs read as "I"/"1", wide ones as "T"/"7".
        let alpha = LabeledClassifier::new(
            Box::new(AspectClassifier {
                classes: 26,
                tall: 8,
                wide: 19,
            }),
            alpha_labels(),
        );
        let num = LabeledClassifier::new(
            Box::new(AspectClassifier {
                classes: 10,
                tall: 1,
                wide: 7,
            }),
            digit_labels(),
        );
        let sketch = LabeledClassifier::new(
            Box::new(AspectClassifier {
                classes: 2,
                tall: 0,
                wide: 1,
            }),
            vec!["tree".to_string(), "car".to_string()],
        );
        RecognitionEngine::new(alpha, num, sketch, spell)
    }

    fn canvas_with(rects: &[Rect]) -> Mat {
        let mut img = Mat::new_rows_cols_with_default(200, 400, CV_8UC1, Scalar::all(0.0)).unwrap();
        for &rect in rects {
            imgproc::rectangle(&mut img, rect, Scalar::all(255.0), FILLED, LINE_8, 0).unwrap();
        }
        img
    }

    #[test]
    fn labels() {
        assert_eq!(alpha_labels().len(), 26);
        assert_eq!(alpha_labels()[25], "Z");
        assert_eq!(digit_labels()[3], "3");
        assert_eq!(
            parse_labels("cat \n dog\n\nsun").unwrap(),
            vec!["cat", "dog", "", "sun"]
        );
        assert!(parse_labels("").is_err());
    }

    #[test]
    fn mode_names() {
        assert_eq!(Mode::default(), Mode::Alpha);
        assert_eq!(Mode::Num.to_string(), "NUM");
        assert_eq!(Mode::Draw.name(), "DRAW");
    }

    #[test]
    fn empty_canvas_reads_nothing() {
        let engine = engine(None);
        let blank = canvas_with(&[]);
        assert_eq!(
            engine.predict_text(&blank, Mode::Alpha).unwrap(),
            TextReading::default()
        );
        assert_eq!(engine.predict_drawing(&blank).unwrap(), "NONE");
    }

    #[test]
    fn text_is_read_left_to_right() {
        let engine = engine(None);
        let img = canvas_with(&[
            Rect::new(250, 50, 60, 10),
            Rect::new(20, 20, 10, 80),
            Rect::new(120, 50, 60, 10),
        ]);
        let reading = engine.predict_text(&img, Mode::Alpha).unwrap();
        assert_eq!(reading.raw, "ITT");
        // No dictionary, no correction.
        assert_eq!(reading.corrected, "");

        let reading = engine.predict_text(&img, Mode::Num).unwrap();
        assert_eq!(reading.raw, "177");
        assert_eq!(reading.corrected, "");
    }

    #[test]
    fn alpha_reading_is_spell_corrected() {
        let spell = SpellChecker::from_words([("it", 1000), ("tit", 1)]);
        let engine = engine(Some(spell));
        let img = canvas_with(&[Rect::new(20, 20, 10, 80), Rect::new(120, 50, 60, 10)]);
        let reading = engine.predict_text(&img, Mode::Alpha).unwrap();
        assert_eq!(reading.raw, "IT");
        assert_eq!(reading.corrected, "IT");

        let img = canvas_with(&[
            Rect::new(20, 20, 10, 80),
            Rect::new(60, 20, 10, 80),
            Rect::new(120, 50, 60, 10),
        ]);
        let reading = engine.predict_text(&img, Mode::Alpha).unwrap();
        assert_eq!(reading.raw, "IIT");
        assert_eq!(reading.corrected, "IT");
    }

    #[test]
    fn uncorrectable_reading_falls_back_to_raw() {
        let spell = SpellChecker::from_words([("zebra", 10)]);
        let engine = engine(Some(spell));
        let img = canvas_with(&[Rect::new(20, 20, 10, 80), Rect::new(120, 50, 60, 10)]);
        let reading = engine.predict_text(&img, Mode::Alpha).unwrap();
        assert_eq!(reading.corrected, "IT");
    }

    #[test]
    fn single_letter_is_not_corrected() {
        let spell = SpellChecker::from_words([("a", 10)]);
        let engine = engine(Some(spell));
        let img = canvas_with(&[Rect::new(20, 20, 10, 80)]);
        let reading = engine.predict_text(&img, Mode::Alpha).unwrap();
        assert_eq!(reading.raw, "I");
        assert_eq!(reading.corrected, "");
    }

    #[test]
    fn sketch_uses_union_of_strokes() {
        let engine = engine(None);
        // Two small blobs far apart horizontally make one wide drawing.
        let img = canvas_with(&[Rect::new(20, 90, 10, 10), Rect::new(300, 90, 10, 10)]);
        assert_eq!(engine.predict_drawing(&img).unwrap(), "car");

        let img = canvas_with(&[Rect::new(100, 10, 10, 10), Rect::new(100, 170, 10, 10)]);
        assert_eq!(engine.predict_drawing(&img).unwrap(), "tree");
    }

    #[test]
    fn out_of_range_class_is_an_error() {
        let classifier = LabeledClassifier::new(
            Box::new(AspectClassifier {
                classes: 5,
                tall: 4,
                wide: 0,
            }),
            vec!["only".to_string()],
        );
        let roi = Mat::new_rows_cols_with_default(80, 10, CV_8UC1, Scalar::all(255.0)).unwrap();
        assert!(classifier.classify(&roi, 40).is_err());
    }
}
