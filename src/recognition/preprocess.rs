//! Extraction of glyph regions from the binarized canvas and their normalization to model input.

use opencv::{
    core::{Mat, Point, Rect, Scalar, Size, Vector, CV_8UC1},
    imgproc,
    prelude::*,
};

use crate::error::Result;

/// Side length of the classifier input.
pub const GLYPH_SIZE: i32 = 28;

/// Contours below this area are treated as noise when splitting text into glyphs.
pub const MIN_GLYPH_AREA: f64 = 50.0;

/// Padding around a single text glyph.
pub const TEXT_PADDING: i32 = 40;
/// Padding around a whole sketch.
pub const SKETCH_PADDING: i32 = 80;

fn external_contours(binary: &Mat) -> Result<Vector<Vector<Point>>> {
    let mut contours = Vector::<Vector<Point>>::new();
    imgproc::find_contours_def(
        binary,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
    )?;
    Ok(contours)
}

/// Bounding boxes of the separate glyphs, left to right.
///
/// `None` means the canvas has no contours at all, while `Some` with an empty list means every
/// contour was too small.
pub fn glyph_boxes(binary: &Mat) -> Result<Option<Vec<Rect>>> {
    let contours = external_contours(binary)?;
    if contours.is_empty() {
        return Ok(None);
    }

    let mut boxes = Vec::new();
    for contour in &contours {
        if imgproc::contour_area_def(&contour)? > MIN_GLYPH_AREA {
            boxes.push(imgproc::bounding_rect(&contour)?);
        }
    }
    boxes.sort_by_key(|rect| rect.x);
    Ok(Some(boxes))
}

/// The box enclosing every contour on the canvas, if any.
pub fn drawing_box(binary: &Mat) -> Result<Option<Rect>> {
    let contours = external_contours(binary)?;
    if contours.is_empty() {
        return Ok(None);
    }

    let points: Vector<Point> = contours.iter().flat_map(|contour| contour.into_iter()).collect();
    Ok(Some(imgproc::bounding_rect(&points)?))
}

/// Thickens thin strokes so the sketch survives downscaling.
pub fn dilate(roi: &Mat) -> Result<Mat> {
    let kernel = Mat::new_rows_cols_with_default(5, 5, CV_8UC1, Scalar::all(1.0))?;
    let mut out = Mat::default();
    imgproc::dilate_def(roi, &mut out, &kernel)?;
    Ok(out)
}

/// Centers `roi` on a black square of side `max(w, h) + padding`.
pub fn center_on_square(roi: &Mat, padding: i32) -> Result<Mat> {
    let (w, h) = (roi.cols(), roi.rows());
    let side = w.max(h) + padding;
    let mut square = Mat::new_rows_cols_with_default(side, side, CV_8UC1, Scalar::all(0.0))?;
    {
        let placement = Rect::new((side - w) / 2, (side - h) / 2, w, h);
        let mut target = Mat::roi_mut(&mut square, placement)?;
        roi.copy_to(&mut target)?;
    }
    Ok(square)
}

/// Pads and resizes a binary region into a `GLYPH_SIZE` square classifier input.
pub fn to_glyph(roi: &Mat, padding: i32) -> Result<Mat> {
    let square = center_on_square(roi, padding)?;
    let mut glyph = Mat::default();
    imgproc::resize(
        &square,
        &mut glyph,
        Size::new(GLYPH_SIZE, GLYPH_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(glyph)
}

/// Copies a rectangular region out of `image`.
pub fn crop(image: &Mat, rect: Rect) -> Result<Mat> {
    Ok(Mat::roi(image, rect)?.try_clone()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core;
    use opencv::imgproc::{FILLED, LINE_8};

    fn blank(w: i32, h: i32) -> Mat {
        Mat::new_rows_cols_with_default(h, w, CV_8UC1, Scalar::all(0.0)).unwrap()
    }

    fn fill(img: &mut Mat, rect: Rect) {
        imgproc::rectangle(img, rect, Scalar::all(255.0), FILLED, LINE_8, 0).unwrap();
    }

    #[test]
    fn empty_canvas_has_no_glyphs() {
        assert_eq!(glyph_boxes(&blank(100, 100)).unwrap(), None);
        assert_eq!(drawing_box(&blank(100, 100)).unwrap(), None);
    }

    #[test]
    fn glyphs_sorted_left_to_right_and_noise_dropped() {
        let mut img = blank(300, 100);
        fill(&mut img, Rect::new(200, 10, 20, 40));
        fill(&mut img, Rect::new(20, 30, 30, 30));
        // 3x3 speck, too small to count.
        fill(&mut img, Rect::new(120, 50, 3, 3));

        let boxes = glyph_boxes(&img).unwrap().unwrap();
        assert_eq!(boxes, vec![Rect::new(20, 30, 30, 30), Rect::new(200, 10, 20, 40)]);
    }

    #[test]
    fn only_noise_gives_empty_list() {
        let mut img = blank(100, 100);
        fill(&mut img, Rect::new(10, 10, 4, 4));
        assert_eq!(glyph_boxes(&img).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn drawing_box_spans_all_contours() {
        let mut img = blank(300, 200);
        fill(&mut img, Rect::new(10, 20, 5, 5));
        fill(&mut img, Rect::new(100, 150, 10, 10));
        assert_eq!(drawing_box(&img).unwrap(), Some(Rect::new(10, 20, 100, 140)));
    }

    #[test]
    fn roi_is_centered_with_padding() {
        let mut roi = blank(10, 20);
        roi.set_to_def(&Scalar::all(255.0)).unwrap();
        let square = center_on_square(&roi, 40).unwrap();
        assert_eq!((square.cols(), square.rows()), (60, 60));
        assert_eq!(*square.at_2d::<u8>(20, 25).unwrap(), 255);
        assert_eq!(*square.at_2d::<u8>(39, 34).unwrap(), 255);
        assert_eq!(*square.at_2d::<u8>(19, 25).unwrap(), 0);
        assert_eq!(*square.at_2d::<u8>(20, 24).unwrap(), 0);
        assert_eq!(*square.at_2d::<u8>(20, 35).unwrap(), 0);
    }

    #[test]
    fn glyph_has_model_size() {
        let mut roi = blank(30, 50);
        roi.set_to_def(&Scalar::all(255.0)).unwrap();
        let glyph = to_glyph(&roi, TEXT_PADDING).unwrap();
        assert_eq!((glyph.cols(), glyph.rows()), (GLYPH_SIZE, GLYPH_SIZE));
        assert_eq!(*glyph.at_2d::<u8>(14, 14).unwrap(), 255);
        assert_eq!(*glyph.at_2d::<u8>(0, 0).unwrap(), 0);
    }

    #[test]
    fn dilation_grows_strokes() {
        let mut img = blank(20, 20);
        fill(&mut img, Rect::new(10, 10, 1, 1));
        let grown = dilate(&img).unwrap();
        assert_eq!(core::count_non_zero(&grown).unwrap(), 25);
    }
}
