//! The fixed overlay: palette header and status footer.

use opencv::{
    core::{self, Mat, Point, Scalar},
    imgproc::{self, FILLED, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};

use crate::canvas::{Shape, BLACK, PALETTE};
use crate::error::Result;

/// Height of the palette band at the top of the frame.
pub const HEADER_HEIGHT: i32 = 100;
/// Height of the status band at the bottom of the frame.
pub const FOOTER_HEIGHT: i32 = 85;

const BAND_COLOR: f64 = 20.0;

/// Width of one palette slot for a frame of the given width.
pub fn palette_slot_width(frame_width: i32) -> i32 {
    frame_width / PALETTE.len() as i32
}

/// Palette index under a fingertip at `x`, clamped to the palette.
pub fn palette_index_at(x: i32, frame_width: i32) -> usize {
    let slot = palette_slot_width(frame_width).max(1);
    (x.div_euclid(slot)).clamp(0, PALETTE.len() as i32 - 1) as usize
}

/// Text shown as the recognition result.
pub fn result_text(raw: &str, corrected: &str) -> String {
    if !corrected.is_empty() && corrected != raw {
        format!("{raw} -> {corrected}")
    } else if raw.is_empty() {
        "---".to_string()
    } else {
        raw.to_string()
    }
}

fn text(img: &mut Mat, s: &str, org: Point, scale: f64, color: Scalar, thickness: i32) -> Result<()> {
    imgproc::put_text(
        img,
        s,
        org,
        FONT_HERSHEY_SIMPLEX,
        scale,
        color,
        thickness,
        LINE_8,
        false,
    )?;
    Ok(())
}

fn gray(level: f64) -> Scalar {
    Scalar::new(level, level, level, 0.0)
}

/// Darkens a horizontal band by blending a filled rectangle over it.
fn shade_band(img: &mut Mat, top: i32, bottom: i32, opacity: f64) -> Result<()> {
    let mut overlay = img.try_clone()?;
    imgproc::rectangle_points(
        &mut overlay,
        Point::new(0, top),
        Point::new(img.cols(), bottom),
        gray(BAND_COLOR),
        FILLED,
        LINE_8,
        0,
    )?;
    let mut out = Mat::default();
    core::add_weighted(&overlay, opacity, &*img, 1.0 - opacity, 0.0, &mut out, -1)?;
    *img = out;
    Ok(())
}

/// Draws the palette band with the selected entry outlined.
pub fn draw_header(img: &mut Mat, selected: usize) -> Result<()> {
    shade_band(img, 0, HEADER_HEIGHT, 0.7)?;

    let bw = palette_slot_width(img.cols());
    for (i, entry) in PALETTE.iter().enumerate() {
        let x = i as i32 * bw;
        // The near-black entry would be invisible on the dark band.
        let fill = if i == BLACK { gray(50.0) } else { entry.scalar() };
        imgproc::rectangle_points(
            img,
            Point::new(x + 15, 15),
            Point::new(x + bw - 15, 65),
            fill,
            FILLED,
            LINE_8,
            0,
        )?;

        if i == selected {
            imgproc::rectangle_points(
                img,
                Point::new(x + 12, 12),
                Point::new(x + bw - 12, 68),
                gray(255.0),
                2,
                LINE_8,
                0,
            )?;
        }

        text(img, entry.name, Point::new(x + bw / 4, 85), 0.4, gray(200.0), 1)?;
    }
    Ok(())
}

/// What the footer displays.
pub struct Status<'a> {
    pub mode: &'a str,
    pub shape: Shape,
    pub raw: &'a str,
    pub corrected: &'a str,
}

pub fn draw_footer(img: &mut Mat, status: &Status<'_>) -> Result<()> {
    let (w, h) = (img.cols(), img.rows());
    let top = h - FOOTER_HEIGHT;
    shade_band(img, top, h, 0.85)?;
    imgproc::line(
        img,
        Point::new(0, top),
        Point::new(w, top),
        Scalar::new(0.0, 255.0, 255.0, 0.0),
        2,
        LINE_8,
        0,
    )?;

    let (label_y, value_y) = (h - 50, h - 20);
    text(img, "MODE:", Point::new(20, label_y), 0.5, gray(150.0), 1)?;
    text(
        img,
        status.mode,
        Point::new(20, value_y),
        0.7,
        Scalar::new(0.0, 255.0, 255.0, 0.0),
        2,
    )?;

    text(img, "TOOL:", Point::new(160, label_y), 0.5, gray(150.0), 1)?;
    text(
        img,
        &status.shape.name().to_uppercase(),
        Point::new(160, value_y),
        0.6,
        gray(200.0),
        1,
    )?;

    text(img, "RECOGNITION RESULT:", Point::new(350, label_y), 0.5, gray(150.0), 1)?;
    text(
        img,
        &result_text(status.raw, status.corrected),
        Point::new(350, value_y),
        0.8,
        Scalar::new(0.0, 255.0, 0.0, 0.0),
        2,
    )?;

    text(
        img,
        "[R] RECO  |  [F] FULL  |  [S] SHAPE",
        Point::new(820, label_y),
        0.5,
        gray(180.0),
        1,
    )?;
    text(
        img,
        "[C] CLEAR |  [A/N/D] MODES |  [ENTER] SEARCH",
        Point::new(820, value_y),
        0.5,
        gray(180.0),
        1,
    )?;
    Ok(())
}

/// Marks the middle fingertip while selecting a color.
pub fn draw_selection_cursor(img: &mut Mat, at: Point) -> Result<()> {
    imgproc::circle(img, at, 10, gray(255.0), FILLED, LINE_8, 0)?;
    imgproc::circle(img, at, 14, gray(200.0), 2, LINE_8, 0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, CV_8UC3};

    #[test]
    fn result_text_variants() {
        assert_eq!(result_text("", ""), "---");
        assert_eq!(result_text("HELO", ""), "HELO");
        assert_eq!(result_text("HELO", "HELO"), "HELO");
        assert_eq!(result_text("HELO", "HELLO"), "HELO -> HELLO");
    }

    #[test]
    fn palette_index_is_clamped() {
        assert_eq!(palette_slot_width(1280), 182);
        assert_eq!(palette_index_at(0, 1280), 0);
        assert_eq!(palette_index_at(200, 1280), 1);
        assert_eq!(palette_index_at(1279, 1280), 6);
        assert_eq!(palette_index_at(-30, 1280), 0);
        assert_eq!(palette_index_at(5000, 1280), 6);
    }

    #[test]
    fn header_outlines_selection() {
        let mut img =
            Mat::new_rows_cols_with_default(720, 1280, CV_8UC3, Scalar::all(100.0)).unwrap();
        draw_header(&mut img, 2).unwrap();

        // Inside the BLUE box.
        assert_eq!(img.at_2d::<Vec3b>(40, 2 * 182 + 50).unwrap().0, [255, 0, 0]);
        // Selection border around it.
        assert_eq!(img.at_2d::<Vec3b>(12, 2 * 182 + 50).unwrap().0, [255, 255, 255]);
        // No border around an unselected box.
        assert_ne!(img.at_2d::<Vec3b>(12, 50).unwrap().0, [255, 255, 255]);
        // Below the header the frame is untouched.
        assert_eq!(img.at_2d::<Vec3b>(300, 640).unwrap().0, [100, 100, 100]);
    }

    #[test]
    fn footer_draws_divider() {
        let mut img = Mat::new_rows_cols_with_default(720, 1280, CV_8UC3, Scalar::all(0.0)).unwrap();
        let status = Status {
            mode: "ALPHA",
            shape: Shape::Line,
            raw: "",
            corrected: "",
        };
        draw_footer(&mut img, &status).unwrap();
        assert_eq!(img.at_2d::<Vec3b>(635, 5).unwrap().0, [0, 255, 255]);
    }
}
