use std::path::PathBuf;

/// Runtime configuration of the air drawing application.
#[derive(Debug, Clone)]
pub struct Config {
    /// Width of the canvas and the displayed frame.
    pub width: i32,

    /// Height of the canvas and the displayed frame.
    pub height: i32,

    /// Index of the webcam to open.
    pub camera_index: u32,

    /// Directory holding the TorchScript models, the sketch class list and the dictionary.
    pub models_dir: PathBuf,

    /// Title of the OpenCV window.
    pub window_title: String,

    /// Start in fullscreen mode.
    pub fullscreen: bool,

    /// Run inference on the CPU even if CUDA is available.
    pub force_cpu: bool,

    /// Base URL of the web search, the query is appended as `q`.
    pub search_url: String,

    pub hands: HandConfig,
}

/// Hand tracking parameters.
#[derive(Debug, Clone)]
pub struct HandConfig {
    /// Maximum number of hands tracked at once.
    pub max_hands: usize,

    /// Minimum palm detection score.
    pub detection_confidence: f32,

    /// Minimum landmark presence score to keep tracking a hand without redetecting it.
    pub tracking_confidence: f32,

    /// Weight of the newest fingertip sample in the exponential smoothing.
    pub smoothing: f64,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            max_hands: 1,
            detection_confidence: 0.8,
            tracking_confidence: 0.8,
            smoothing: 0.65,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            camera_index: 0,
            models_dir: PathBuf::from("models"),
            window_title: "Air Drawing Search Pro".to_string(),
            fullscreen: false,
            force_cpu: false,
            search_url: "https://www.google.com/search".to_string(),
            hands: HandConfig::default(),
        }
    }
}

impl Config {
    /// Letter classifier (26 classes, `A`..`Z`).
    pub fn alpha_model_path(&self) -> PathBuf {
        self.models_dir.join("alpha.pt")
    }

    /// Digit classifier (10 classes, `0`..`9`).
    pub fn num_model_path(&self) -> PathBuf {
        self.models_dir.join("digits.pt")
    }

    /// Sketch classifier, labelled by [`Config::sketch_labels_path`].
    pub fn sketch_model_path(&self) -> PathBuf {
        self.models_dir.join("sketch.pt")
    }

    pub fn sketch_labels_path(&self) -> PathBuf {
        self.models_dir.join("classes.txt")
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.models_dir.join("frequency_dictionary_en.txt")
    }

    pub fn palm_model_path(&self) -> PathBuf {
        self.models_dir.join("palm_detection.pt")
    }

    pub fn landmark_model_path(&self) -> PathBuf {
        self.models_dir.join("hand_landmark.pt")
    }

    pub fn device(&self) -> tch::Device {
        if self.force_cpu {
            tch::Device::Cpu
        } else {
            tch::Device::cuda_if_available()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_window_layout() {
        let config = Config::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.hands.max_hands, 1);
        assert_eq!(config.hands.detection_confidence, 0.8);
    }

    #[test]
    fn model_paths_live_in_models_dir() {
        let config = Config {
            models_dir: PathBuf::from("/opt/air"),
            ..Config::default()
        };
        assert_eq!(config.alpha_model_path(), PathBuf::from("/opt/air/alpha.pt"));
        assert_eq!(
            config.sketch_labels_path(),
            PathBuf::from("/opt/air/classes.txt")
        );
    }
}
