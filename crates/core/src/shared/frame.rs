use image::{ImageBuffer, Luma, Rgb};

use crate::shared::rect::Rect;

/// A single decoded video frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the pipeline treats
/// pixel data as opaque except where it draws annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Position of the frame in decode order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Borrowed `image` view for read-only processing. `None` only if the
    /// buffer does not match the dimensions.
    pub fn as_rgb_image(&self) -> Option<ImageBuffer<Rgb<u8>, &[u8]>> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
    }

    /// Borrowed mutable `image` view, used for drawing in place.
    pub fn as_rgb_image_mut(&mut self) -> Option<ImageBuffer<Rgb<u8>, &mut [u8]>> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_mut_slice())
    }
}

/// Single-channel 8-bit image handed to detectors.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_luma_image(&self) -> Option<ImageBuffer<Luma<u8>, &[u8]>> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
    }

    /// Copies out the pixels covered by `rect`.
    ///
    /// Returns `None` when `rect` is empty or not fully inside the frame.
    pub fn crop(&self, rect: &Rect) -> Option<GrayFrame> {
        if !rect.fits_within(self.width, self.height) {
            return None;
        }
        let fw = self.width as usize;
        let (rx, ry) = (rect.x as usize, rect.y as usize);
        let (rw, rh) = (rect.width as usize, rect.height as usize);

        let mut out = Vec::with_capacity(rw * rh);
        for row in ry..ry + rh {
            let start = row * fw + rx;
            out.extend_from_slice(&self.data[start..start + rw]);
        }
        Some(GrayFrame::new(out, rect.width as u32, rect.height as u32))
    }
}
