use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;

use crate::detection::domain::face_analyzer::FrameAnalysis;
use crate::shared::frame::Frame;
use crate::shared::rect::Rect;

/// Box colors and stroke width for the three feature kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnnotationStyle {
    pub face: Rgb<u8>,
    pub eye: Rgb<u8>,
    pub smile: Rgb<u8>,
    pub thickness: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            face: Rgb([0, 0, 255]),
            eye: Rgb([0, 255, 0]),
            smile: Rgb([255, 0, 0]),
            thickness: 2,
        }
    }
}

/// Draws every face, eye and smile box of `analysis` onto `frame`.
///
/// Eye and smile boxes are stored relative to their face and are translated
/// into frame coordinates here. Returns the number of boxes drawn. A frame
/// with nothing detected is left untouched.
pub fn annotate(frame: &mut Frame, analysis: &FrameAnalysis, style: &AnnotationStyle) -> usize {
    let Some(mut img) = frame.as_rgb_image_mut() else {
        log::warn!("Skipping annotation of frame with mismatched buffer");
        return 0;
    };

    let mut drawn = 0;
    for detection in &analysis.faces {
        draw_box(&mut img, &detection.face, style.face, style.thickness);
        drawn += 1;

        for eye in &detection.eyes {
            draw_box(&mut img, &eye.offset_by(&detection.face), style.eye, style.thickness);
            drawn += 1;
        }
        for smile in &detection.smiles {
            draw_box(&mut img, &smile.offset_by(&detection.face), style.smile, style.thickness);
            drawn += 1;
        }
    }
    drawn
}

/// Strokes `rect` inward `thickness` pixels, so the outer edge of the box
/// sits on the detected rectangle.
fn draw_box(img: &mut image::ImageBuffer<Rgb<u8>, &mut [u8]>, rect: &Rect, color: Rgb<u8>, thickness: u32) {
    for inset in 0..thickness.max(1) as i32 {
        let w = rect.width - 2 * inset;
        let h = rect.height - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let r = imageproc::rect::Rect::at(rect.x + inset, rect.y + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, r, color);
    }
}
