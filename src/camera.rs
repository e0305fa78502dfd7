//! Webcam capture.

use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};
use opencv::{core::Mat, imgproc, prelude::*};

use crate::error::{Error, Result};

pub struct Camera {
    inner: nokhwa::Camera,
}

impl Camera {
    /// Opens the camera at `index`, asking for the format closest to `width`x`height`.
    pub fn open(index: u32, width: i32, height: i32) -> Result<Self> {
        let wanted = CameraFormat::new(
            Resolution::new(width.max(1) as u32, height.max(1) as u32),
            FrameFormat::MJPEG,
            30,
        );
        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));
        let mut inner = nokhwa::Camera::new(CameraIndex::Index(index), format)?;
        inner.open_stream()?;

        log::info!(
            "Opened camera {} ({}) at {}",
            index,
            inner.info().human_name(),
            inner.resolution()
        );
        Ok(Self { inner })
    }

    /// Captures the next frame as a BGR matrix.
    pub fn frame(&mut self) -> Result<Mat> {
        let buffer = self.inner.frame()?;
        let image = buffer.decode_image::<RgbFormat>()?;
        rgb_to_bgr(image.as_raw(), image.width() as i32, image.height() as i32)
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = self.inner.stop_stream() {
            log::warn!("Failed to stop camera stream: {e}");
        }
    }
}

/// Converts packed RGB bytes into an owned BGR matrix.
pub fn rgb_to_bgr(data: &[u8], width: i32, height: i32) -> Result<Mat> {
    let expected = width as usize * height as usize * 3;
    if data.len() != expected || width <= 0 || height <= 0 {
        return Err(Error::Frame(format!(
            "frame has {} bytes, expected {expected} for {width}x{height} RGB",
            data.len()
        )));
    }

    let flat = Mat::from_slice(data)?;
    let rgb = flat.reshape(3, height)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&*rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::Vec3b;

    #[test]
    fn rgb_bytes_become_bgr_pixels() {
        let data = [255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 20, 30];
        let mat = rgb_to_bgr(&data, 2, 2).unwrap();
        assert_eq!((mat.cols(), mat.rows(), mat.channels()), (2, 2, 3));
        assert_eq!(mat.at_2d::<Vec3b>(0, 0).unwrap().0, [0, 0, 255]);
        assert_eq!(mat.at_2d::<Vec3b>(1, 1).unwrap().0, [30, 20, 10]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(rgb_to_bgr(&[0; 5], 2, 2).is_err());
    }
}
