//! The interactive loop: camera in, gestures onto the canvas, overlay and window out.

use opencv::{
    core::{self, Mat, Point, Size},
    highgui, imgproc,
    prelude::*,
};

use crate::camera::Camera;
use crate::canvas::{self, Canvas, Shape};
use crate::config::Config;
use crate::error::Result;
use crate::gesture::{Gesture, Smoother};
use crate::hand::{self, landmarks::LandmarkIdx, HandTracker, LandmarkPoint};
use crate::recognition::{Mode, RecognitionEngine, TextReading};
use crate::search;
use crate::ui::{self, Status, HEADER_HEIGHT};

/// A pending shape is only committed once the fingertip moved further than this from its start.
const MIN_SHAPE_DISTANCE: f64 = 20.0;

/// Keyboard commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Clear,
    SetMode(Mode),
    NextShape,
    ToggleFullscreen,
    Recognize,
    Search,
}

impl Command {
    /// Maps a key code as returned by `wait_key` to a command.
    pub fn from_key(key: i32) -> Option<Self> {
        let command = match key & 0xFF {
            k if k == i32::from(b'q') => Command::Quit,
            k if k == i32::from(b'c') => Command::Clear,
            k if k == i32::from(b'a') => Command::SetMode(Mode::Alpha),
            k if k == i32::from(b'n') => Command::SetMode(Mode::Num),
            k if k == i32::from(b'd') => Command::SetMode(Mode::Draw),
            k if k == i32::from(b's') => Command::NextShape,
            k if k == i32::from(b'f') => Command::ToggleFullscreen,
            k if k == i32::from(b'r') => Command::Recognize,
            13 | 10 => Command::Search,
            _ => return None,
        };
        Some(command)
    }
}

/// Drawing state driven by hand gestures and key commands.
///
/// Holds everything that does not need a camera, a window or the models, so the per-frame
/// behavior can be exercised on synthetic frames and landmarks.
pub struct Board {
    width: i32,
    canvas: Canvas,
    mode: Mode,
    color_idx: usize,
    shape: Shape,
    smoother: Smoother,
    prev: Option<Point>,
    shape_start: Option<Point>,
    reading: TextReading,
}

impl Board {
    pub fn new(width: i32, height: i32, smoothing: f64) -> Result<Self> {
        Ok(Self {
            width,
            canvas: Canvas::new(width, height)?,
            mode: Mode::default(),
            color_idx: 0,
            shape: Shape::default(),
            smoother: Smoother::new(smoothing),
            prev: None,
            shape_start: None,
            reading: TextReading::default(),
        })
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn color_idx(&self) -> usize {
        self.color_idx
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn reading(&self) -> &TextReading {
        &self.reading
    }

    /// Start of the shape currently being previewed.
    pub fn shape_start(&self) -> Option<Point> {
        self.shape_start
    }

    /// Renders one frame: header, gesture handling, canvas and footer.
    ///
    /// `landmarks` are the pixel landmarks of the tracked hand, empty if none is visible.
    pub fn render(&mut self, frame: &mut Mat, landmarks: &[LandmarkPoint]) -> Result<()> {
        ui::draw_header(frame, self.color_idx)?;
        self.handle_hand(frame, landmarks)?;
        self.canvas.composite(frame)?;
        ui::draw_footer(
            frame,
            &Status {
                mode: self.mode.name(),
                shape: self.shape,
                raw: &self.reading.raw,
                corrected: &self.reading.corrected,
            },
        )
    }

    /// Applies the current gesture. Without a hand nothing changes.
    pub fn handle_hand(&mut self, frame: &mut Mat, landmarks: &[LandmarkPoint]) -> Result<()> {
        let (Some(index_tip), Some(middle_tip)) = (
            landmarks.get(LandmarkIdx::IndexFingerTip as usize),
            landmarks.get(LandmarkIdx::MiddleFingerTip as usize),
        ) else {
            return Ok(());
        };
        let (index_tip, middle_tip) = (index_tip.point(), middle_tip.point());

        let point = self.smoother.update(index_tip);
        match Gesture::classify(hand::fingers_up(landmarks)) {
            Gesture::Select => {
                self.prev = None;
                self.shape_start = None;
                ui::draw_selection_cursor(frame, middle_tip)?;
                if middle_tip.y < HEADER_HEIGHT {
                    let idx = ui::palette_index_at(middle_tip.x, self.width);
                    if idx != self.color_idx {
                        log::debug!("color -> {}", canvas::PALETTE[idx].name);
                    }
                    self.color_idx = idx;
                }
            }
            Gesture::ShapePreview => {
                self.prev = None;
                let start = *self.shape_start.get_or_insert(point);
                canvas::preview_shape(frame, self.shape, start, point, self.color_idx)?;
            }
            Gesture::Draw => {
                if let Some(start) = self.shape_start.take() {
                    if canvas::distance(start, point) > MIN_SHAPE_DISTANCE {
                        log::debug!("{} {start:?} -> {point:?}", self.shape.name());
                        self.canvas
                            .commit_shape(self.shape, start, point, self.color_idx)?;
                    }
                }
                let from = self.prev.unwrap_or(point);
                self.canvas.stroke(from, point, self.color_idx)?;
                self.prev = Some(point);
            }
            Gesture::Idle => {
                self.prev = None;
                self.shape_start = None;
            }
        }
        Ok(())
    }

    /// Wipes the canvas and the last recognition result.
    pub fn clear(&mut self) -> Result<()> {
        self.canvas.clear()?;
        self.reading = TextReading::default();
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Mode) {
        log::info!("Mode: {mode}");
        self.mode = mode;
    }

    pub fn next_shape(&mut self) {
        self.shape = self.shape.next();
        log::info!("Tool: {}", self.shape.name());
    }

    /// Recognizes the canvas content in the current mode and stores the result.
    pub fn recognize(&mut self, engine: &RecognitionEngine) -> Result<()> {
        let binary = self.canvas.binarize(self.color_idx)?;
        self.reading = match self.mode {
            Mode::Draw => TextReading {
                raw: engine.predict_drawing(&binary)?,
                corrected: String::new(),
            },
            mode => engine.predict_text(&binary, mode)?,
        };
        log::info!(
            "Recognized: {}",
            ui::result_text(&self.reading.raw, &self.reading.corrected)
        );
        Ok(())
    }

    /// Text to search for: the correction if there is one, else the raw reading.
    pub fn search_query(&self) -> Option<&str> {
        [&self.reading.corrected, &self.reading.raw]
            .into_iter()
            .find(|text| !text.is_empty())
            .map(String::as_str)
    }
}

/// Mirrors the camera frame and brings it to the canvas size.
pub fn prepare_frame(frame: &Mat, width: i32, height: i32) -> Result<Mat> {
    let mut mirrored = Mat::default();
    core::flip(frame, &mut mirrored, 1)?;
    if mirrored.cols() == width && mirrored.rows() == height {
        return Ok(mirrored);
    }

    let mut resized = Mat::default();
    imgproc::resize(
        &mirrored,
        &mut resized,
        Size::new(width, height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(resized)
}

pub struct AirDrawingApp {
    config: Config,
    camera: Camera,
    tracker: HandTracker,
    engine: Option<RecognitionEngine>,
    board: Board,
    fullscreen: bool,
}

impl AirDrawingApp {
    /// Opens the camera and loads the models.
    ///
    /// The hand tracker is required. Recognition models that fail to load only disable `r`.
    pub fn new(config: Config) -> Result<Self> {
        let camera = Camera::open(config.camera_index, config.width, config.height)?;
        let tracker = HandTracker::new(&config)?;
        let engine = match RecognitionEngine::load(&config) {
            Ok(engine) => Some(engine),
            Err(e) => {
                log::warn!("Recognition disabled: {e}");
                None
            }
        };
        let board = Board::new(config.width, config.height, config.hands.smoothing)?;

        Ok(Self {
            fullscreen: config.fullscreen,
            config,
            camera,
            tracker,
            engine,
            board,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let title = self.config.window_title.clone();
        highgui::named_window(&title, highgui::WINDOW_NORMAL)?;
        self.apply_fullscreen()?;

        loop {
            let frame = match self.camera.frame() {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("Failed to capture frame: {e}");
                    break;
                }
            };
            let mut frame = prepare_frame(&frame, self.config.width, self.config.height)?;

            self.tracker.find_hands(&mut frame, true)?;
            let landmarks = self.tracker.landmark_list(&frame);
            self.board.render(&mut frame, &landmarks)?;

            highgui::imshow(&title, &frame)?;
            let Some(command) = Command::from_key(highgui::wait_key(1)?) else {
                continue;
            };
            if command == Command::Quit {
                break;
            }
            self.execute(command)?;
        }

        highgui::destroy_all_windows()?;
        Ok(())
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Quit => {}
            Command::Clear => self.board.clear()?,
            Command::SetMode(mode) => self.board.set_mode(mode),
            Command::NextShape => self.board.next_shape(),
            Command::ToggleFullscreen => {
                self.fullscreen = !self.fullscreen;
                self.apply_fullscreen()?;
            }
            Command::Recognize => match &self.engine {
                Some(engine) => self.board.recognize(engine)?,
                None => log::warn!("Recognition models are not loaded"),
            },
            Command::Search => {
                if let Some(query) = self.board.search_query() {
                    if let Err(e) = search::open(&self.config.search_url, query) {
                        log::warn!("{e}");
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_fullscreen(&self) -> Result<()> {
        let value = if self.fullscreen {
            highgui::WINDOW_FULLSCREEN
        } else {
            highgui::WINDOW_NORMAL
        };
        highgui::set_window_property(
            &self.config.window_title,
            highgui::WND_PROP_FULLSCREEN,
            f64::from(value),
        )?;
        Ok(())
    }
}
