use anyhow::{bail, Result};

use crate::draw::model::Color;

/// Straight-alpha RGBA pixels, row-major, four bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaBuffer {
    pub fn new(width: u32, height: u32, fill: Color) -> Self {
        let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[fill.r, fill.g, fill.b, fill.a]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected {
            bail!(
                "pixel buffer is {} bytes, expected {expected} for {width}x{height}",
                pixels.len()
            );
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn fill(&mut self, color: Color) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(((y as usize) * (self.width as usize) + x as usize) * 4)
    }

    /// Out-of-bounds reads return transparent.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        match self.index(x, y) {
            Some(idx) => Color::rgba(
                self.pixels[idx],
                self.pixels[idx + 1],
                self.pixels[idx + 2],
                self.pixels[idx + 3],
            ),
            None => Color::TRANSPARENT,
        }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx..idx + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Color) {
        if color.a == 0 {
            return;
        }
        let under = self.pixel(x, y);
        self.set_pixel(x, y, blend_pixel(under, color));
    }
}

pub fn composite_annotation_over_desktop(
    desktop: &RgbaBuffer,
    annotation: &RgbaBuffer,
) -> Result<RgbaBuffer> {
    let mut output = desktop.clone();
    blend_in_place(&mut output, annotation)?;
    Ok(output)
}

pub fn blend_in_place(base: &mut RgbaBuffer, top: &RgbaBuffer) -> Result<()> {
    if base.width != top.width || base.height != top.height {
        bail!(
            "cannot blend {}x{} over {}x{}",
            top.width,
            top.height,
            base.width,
            base.height
        );
    }

    for (dst, src) in base
        .pixels
        .chunks_exact_mut(4)
        .zip(top.pixels.chunks_exact(4))
    {
        let blended = blend_pixel(
            Color::rgba(dst[0], dst[1], dst[2], dst[3]),
            Color::rgba(src[0], src[1], src[2], src[3]),
        );
        dst.copy_from_slice(&[blended.r, blended.g, blended.b, blended.a]);
    }
    Ok(())
}

/// Source-over for straight (non-premultiplied) alpha.
pub fn blend_pixel(bottom: Color, top: Color) -> Color {
    let sa = top.a as f32 / 255.0;
    let da = bottom.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Color::TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Color::rgba(
        blend(top.r, bottom.r),
        blend(top.g, bottom.g),
        blend(top.b, bottom.b),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_over_desktop_blends_expected_pixel() {
        let desktop = RgbaBuffer::from_pixels(1, 1, vec![100, 100, 100, 255]).expect("desktop");
        let annotation = RgbaBuffer::from_pixels(1, 1, vec![200, 0, 0, 128]).expect("annotation");

        let out = composite_annotation_over_desktop(&desktop, &annotation).expect("composite");
        assert_eq!(out.pixel(0, 0), Color::rgba(150, 50, 50, 255));
    }

    #[test]
    fn transparent_annotation_leaves_desktop_untouched() {
        let desktop = RgbaBuffer::new(2, 2, Color::rgb(10, 20, 30));
        let annotation = RgbaBuffer::new(2, 2, Color::TRANSPARENT);
        let out = composite_annotation_over_desktop(&desktop, &annotation).expect("composite");
        assert_eq!(out, desktop);
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let desktop = RgbaBuffer::new(2, 2, Color::BLACK);
        let annotation = RgbaBuffer::new(3, 2, Color::BLACK);
        assert!(composite_annotation_over_desktop(&desktop, &annotation).is_err());
        assert!(RgbaBuffer::from_pixels(2, 2, vec![0; 3]).is_err());
    }

    #[test]
    fn translucent_over_transparent_keeps_source_alpha() {
        let out = blend_pixel(Color::TRANSPARENT, Color::rgba(255, 0, 0, 50));
        assert_eq!(out, Color::rgba(255, 0, 0, 50));
    }

    #[test]
    fn out_of_bounds_access_is_ignored() {
        let mut buffer = RgbaBuffer::new(1, 1, Color::BLACK);
        buffer.set_pixel(5, 5, Color::WHITE);
        assert_eq!(buffer.pixel(5, 5), Color::TRANSPARENT);
        assert_eq!(buffer.pixel(0, 0), Color::BLACK);
    }
}
