//! The drawing surface and its palette.

use opencv::{
    core::{self, Mat, Point, Scalar, CV_8UC3},
    imgproc::{self, LINE_8},
    prelude::*,
};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub name: &'static str,
    /// Blue, green, red.
    pub bgr: [u8; 3],
}

impl PaletteEntry {
    pub fn scalar(&self) -> Scalar {
        let [b, g, r] = self.bgr;
        Scalar::new(f64::from(b), f64::from(g), f64::from(r), 0.0)
    }
}

pub const PALETTE: [PaletteEntry; 7] = [
    PaletteEntry { name: "RED", bgr: [0, 0, 255] },
    PaletteEntry { name: "GREEN", bgr: [0, 255, 0] },
    PaletteEntry { name: "BLUE", bgr: [255, 0, 0] },
    PaletteEntry { name: "YELLOW", bgr: [0, 255, 255] },
    PaletteEntry { name: "PINK", bgr: [255, 0, 255] },
    // Not pure black, so strokes stay distinguishable from empty canvas.
    PaletteEntry { name: "BLACK", bgr: [1, 1, 1] },
    PaletteEntry { name: "ERASER", bgr: [0, 0, 0] },
];

pub const BLACK: usize = 5;
pub const ERASER: usize = 6;

const STROKE_THICKNESS: i32 = 5;
const ERASER_THICKNESS: i32 = 100;
const PREVIEW_THICKNESS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Line,
    Rectangle,
    Circle,
}

impl Shape {
    pub fn next(self) -> Self {
        match self {
            Shape::Line => Shape::Rectangle,
            Shape::Rectangle => Shape::Circle,
            Shape::Circle => Shape::Line,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shape::Line => "Line",
            Shape::Rectangle => "Rectangle",
            Shape::Circle => "Circle",
        }
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    f64::from(b.x - a.x).hypot(f64::from(b.y - a.y))
}

/// Draws `shape` spanning from `start` to `end`. Circles are centered on `start`.
pub fn draw_shape(
    img: &mut Mat,
    shape: Shape,
    start: Point,
    end: Point,
    color: Scalar,
    thickness: i32,
) -> Result<()> {
    match shape {
        Shape::Line => imgproc::line(img, start, end, color, thickness, LINE_8, 0)?,
        Shape::Rectangle => {
            imgproc::rectangle_points(img, start, end, color, thickness, LINE_8, 0)?
        }
        Shape::Circle => {
            let radius = distance(start, end) as i32;
            imgproc::circle(img, start, radius, color, thickness, LINE_8, 0)?
        }
    }
    Ok(())
}

/// Outlines a pending shape on the camera frame. The eraser previews in white.
pub fn preview_shape(
    img: &mut Mat,
    shape: Shape,
    start: Point,
    end: Point,
    color_idx: usize,
) -> Result<()> {
    let color = if color_idx < ERASER {
        PALETTE[color_idx].scalar()
    } else {
        Scalar::all(255.0)
    };
    draw_shape(img, shape, start, end, color, PREVIEW_THICKNESS)
}

/// A persistent BGR layer drawn over the camera image. Black pixels are transparent.
pub struct Canvas {
    pixels: Mat,
}

impl Canvas {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        Ok(Self {
            pixels: Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))?,
        })
    }

    pub fn pixels(&self) -> &Mat {
        &self.pixels
    }

    pub fn clear(&mut self) -> Result<()> {
        self.pixels.set_to_def(&Scalar::all(0.0))?;
        Ok(())
    }

    /// Freehand segment in the given palette color.
    pub fn stroke(&mut self, from: Point, to: Point, color_idx: usize) -> Result<()> {
        let thickness = if color_idx == ERASER {
            ERASER_THICKNESS
        } else {
            STROKE_THICKNESS
        };
        imgproc::line(
            &mut self.pixels,
            from,
            to,
            PALETTE[color_idx].scalar(),
            thickness,
            LINE_8,
            0,
        )?;
        Ok(())
    }

    pub fn commit_shape(
        &mut self,
        shape: Shape,
        start: Point,
        end: Point,
        color_idx: usize,
    ) -> Result<()> {
        draw_shape(
            &mut self.pixels,
            shape,
            start,
            end,
            PALETTE[color_idx].scalar(),
            STROKE_THICKNESS,
        )
    }

    fn gray(&self) -> Result<Mat> {
        let mut gray = Mat::default();
        imgproc::cvt_color_def(&self.pixels, &mut gray, imgproc::COLOR_BGR2GRAY)?;
        Ok(gray)
    }

    /// Replaces every frame pixel under a non-black canvas pixel with the canvas pixel.
    pub fn composite(&self, frame: &mut Mat) -> Result<()> {
        let mut mask = Mat::default();
        imgproc::threshold(&self.gray()?, &mut mask, 0.0, 255.0, imgproc::THRESH_BINARY)?;
        let mut inverse = Mat::default();
        core::bitwise_not(&mask, &mut inverse, &core::no_array())?;

        let mut background = Mat::default();
        core::bitwise_and(&*frame, &*frame, &mut background, &inverse)?;
        let mut out = Mat::default();
        core::add(&background, &self.pixels, &mut out, &core::no_array(), -1)?;
        *frame = out;
        Ok(())
    }

    /// Binary (0/255) image of the drawing for recognition.
    ///
    /// With the near-black palette color selected any non-zero pixel counts, otherwise pixels
    /// need a gray level above 10.
    pub fn binarize(&self, color_idx: usize) -> Result<Mat> {
        let thresh = if color_idx == BLACK { 0.0 } else { 10.0 };
        let mut binary = Mat::default();
        imgproc::threshold(&self.gray()?, &mut binary, thresh, 255.0, imgproc::THRESH_BINARY)?;
        Ok(binary)
    }
}
