use crate::shared::frame::{Frame, GrayFrame};

/// Converts a color frame into the equalized grayscale image the cascade
/// detectors search.
///
/// Luma conversion uses the Rec. 601 weights from `image`, followed by a
/// global histogram equalization to normalize lighting between frames.
pub fn to_equalized_gray(frame: &Frame) -> Result<GrayFrame, Box<dyn std::error::Error>> {
    let rgb = frame
        .as_rgb_image()
        .ok_or("frame buffer does not match its dimensions")?;
    let gray = image::imageops::grayscale(&rgb);
    let equalized = imageproc::contrast::equalize_histogram(&gray);

    let (width, height) = equalized.dimensions();
    Ok(GrayFrame::new(equalized.into_raw(), width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Frame::new(data, width, height, 0)
    }

    #[test]
    fn test_output_matches_frame_dimensions() {
        let frame = frame_from_fn(32, 24, |_, _| [100, 100, 100]);
        let gray = to_equalized_gray(&frame).unwrap();
        assert_eq!((gray.width(), gray.height()), (32, 24));
        assert_eq!(gray.data().len(), 32 * 24);
    }

    #[test]
    fn test_equalization_stretches_low_contrast() {
        // Two close gray levels should be pushed apart to span the range.
        let frame = frame_from_fn(16, 16, |x, _| if x < 8 { [100; 3] } else { [110; 3] });
        let gray = to_equalized_gray(&frame).unwrap();

        let min = *gray.data().iter().min().unwrap();
        let max = *gray.data().iter().max().unwrap();
        assert!(max - min > 10, "expected spread > 10, got {min}..{max}");
        assert_eq!(max, 255);
    }

    #[test]
    fn test_brightness_order_is_preserved() {
        let frame = frame_from_fn(10, 1, |x, _| [(x * 20) as u8; 3]);
        let gray = to_equalized_gray(&frame).unwrap();
        assert!(gray.data().windows(2).all(|w| w[0] <= w[1]));
    }
}
