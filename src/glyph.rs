//! Glyph rasterization for the countdown digits.
//!
//! Digits are drawn from an embedded 8x8 bitmap face onto a grayscale canvas
//! (no font assets; all visual content is generated at runtime), then scanned
//! on a coarse grid for bright pixels. The resulting sparse point list is the
//! placement template for glyph particles.

use image::{GrayImage, Luma};

/// Fraction of the canvas height the rendered text fills
const TEXT_HEIGHT_FRACTION: f32 = 0.7;

/// Maximum fraction of the canvas width the text may occupy
const TEXT_WIDTH_FRACTION: f32 = 0.9;

/// Luminance above which a pixel counts as part of a stroke
const LUMA_THRESHOLD: u8 = 128;

/// Sampling stride of the pixel scan
const SCAN_STRIDE: u32 = 2;

/// 8x8 bitmaps for '0'..='9', one byte per row, MSB = leftmost column.
const DIGIT_ROWS: [[u8; 8]; 10] = [
    // 0
    [
        0b0111_1100,
        0b1100_0110,
        0b1100_1110,
        0b1101_0110,
        0b1110_0110,
        0b1100_0110,
        0b0111_1100,
        0b0000_0000,
    ],
    // 1
    [
        0b0011_0000,
        0b0111_0000,
        0b0011_0000,
        0b0011_0000,
        0b0011_0000,
        0b0011_0000,
        0b1111_1100,
        0b0000_0000,
    ],
    // 2
    [
        0b0111_1100,
        0b1100_0110,
        0b0000_0110,
        0b0001_1100,
        0b0111_0000,
        0b1100_0000,
        0b1111_1110,
        0b0000_0000,
    ],
    // 3
    [
        0b0111_1100,
        0b1100_0110,
        0b0000_0110,
        0b0011_1100,
        0b0000_0110,
        0b1100_0110,
        0b0111_1100,
        0b0000_0000,
    ],
    // 4
    [
        0b0000_1100,
        0b0001_1100,
        0b0011_1100,
        0b0110_1100,
        0b1111_1110,
        0b0000_1100,
        0b0000_1100,
        0b0000_0000,
    ],
    // 5
    [
        0b1111_1110,
        0b1100_0000,
        0b1111_1100,
        0b0000_0110,
        0b0000_0110,
        0b1100_0110,
        0b0111_1100,
        0b0000_0000,
    ],
    // 6
    [
        0b0011_1100,
        0b0110_0000,
        0b1100_0000,
        0b1111_1100,
        0b1100_0110,
        0b1100_0110,
        0b0111_1100,
        0b0000_0000,
    ],
    // 7
    [
        0b1111_1110,
        0b0000_0110,
        0b0000_1100,
        0b0001_1000,
        0b0011_0000,
        0b0011_0000,
        0b0011_0000,
        0b0000_0000,
    ],
    // 8
    [
        0b0111_1100,
        0b1100_0110,
        0b1100_0110,
        0b0111_1100,
        0b1100_0110,
        0b1100_0110,
        0b0111_1100,
        0b0000_0000,
    ],
    // 9
    [
        0b0111_1100,
        0b1100_0110,
        0b1100_0110,
        0b0111_1110,
        0b0000_0110,
        0b0000_1100,
        0b0111_1000,
        0b0000_0000,
    ],
];

fn glyph_rows(c: char) -> Option<&'static [u8; 8]> {
    let digit = c.to_digit(10)? as usize;
    Some(&DIGIT_ROWS[digit])
}

/// Rasterize `text` centered on a `resolution` x `resolution` canvas and
/// return the stride-2 sample coordinates whose luminance exceeds the stroke
/// threshold. Deterministic for identical inputs; characters without a glyph
/// contribute no pixels, so unsupported text yields an empty list.
pub fn rasterize_text(text: &str, resolution: u32) -> Vec<(u32, u32)> {
    let canvas = draw_text(text, resolution);

    let mut points = Vec::new();
    let mut y = 0;
    while y < resolution {
        let mut x = 0;
        while x < resolution {
            if canvas.get_pixel(x, y).0[0] > LUMA_THRESHOLD {
                points.push((x, y));
            }
            x += SCAN_STRIDE;
        }
        y += SCAN_STRIDE;
    }
    points
}

/// Draw `text` onto a fresh canvas, scaled to fill most of it.
fn draw_text(text: &str, resolution: u32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(resolution, resolution, Luma([0u8]));

    let char_count = text.chars().count() as u32;
    if char_count == 0 {
        return canvas;
    }

    // Cell size from the height budget, shrunk if the line would overflow
    let res = resolution as f32;
    let mut cell = res * TEXT_HEIGHT_FRACTION / 8.0;
    let max_cell = res * TEXT_WIDTH_FRACTION / (char_count * 8) as f32;
    if cell > max_cell {
        cell = max_cell;
    }

    let line_width = cell * (char_count * 8) as f32;
    let origin_x = (res - line_width) / 2.0;
    let origin_y = (res - cell * 8.0) / 2.0;

    for (char_idx, c) in text.chars().enumerate() {
        let Some(rows) = glyph_rows(c) else {
            continue;
        };
        let glyph_x = origin_x + (char_idx as u32 * 8) as f32 * cell;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..8u32 {
                if bits & (0b1000_0000 >> col) == 0 {
                    continue;
                }
                fill_cell(
                    &mut canvas,
                    glyph_x + col as f32 * cell,
                    origin_y + row as f32 * cell,
                    cell,
                );
            }
        }
    }

    canvas
}

/// Fill one glyph cell with full luminance, clipped to the canvas.
fn fill_cell(canvas: &mut GrayImage, x: f32, y: f32, cell: f32) {
    let x0 = x.max(0.0) as u32;
    let y0 = y.max(0.0) as u32;
    let x1 = ((x + cell).ceil() as u32).min(canvas.width());
    let y1 = ((y + cell).ceil() as u32).min(canvas.height());

    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px, py, Luma([255u8]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_produce_points() {
        for digit in ["0", "1", "2", "3", "9"] {
            let points = rasterize_text(digit, 256);
            assert!(!points.is_empty(), "digit {} produced no points", digit);
        }
    }

    #[test]
    fn test_points_on_scan_grid() {
        let points = rasterize_text("3", 256);
        for &(x, y) in &points {
            assert!(x < 256 && y < 256);
            assert_eq!(x % SCAN_STRIDE, 0);
            assert_eq!(y % SCAN_STRIDE, 0);
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(rasterize_text("2", 256), rasterize_text("2", 256));
    }

    #[test]
    fn test_unsupported_text_yields_empty() {
        assert!(rasterize_text("@", 256).is_empty());
        assert!(rasterize_text("", 256).is_empty());
    }

    #[test]
    fn test_text_roughly_centered() {
        let points = rasterize_text("1", 256);
        let (min_x, max_x) = points
            .iter()
            .fold((u32::MAX, 0), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)));
        let (min_y, max_y) = points
            .iter()
            .fold((u32::MAX, 0), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));

        // Bounding box straddles the canvas center on both axes
        assert!(min_x < 128 && max_x > 100);
        assert!(min_y < 128 && max_y > 128);
    }

    #[test]
    fn test_wide_text_stays_on_canvas() {
        let points = rasterize_text("33333333", 256);
        assert!(!points.is_empty());
        for &(x, _) in &points {
            assert!(x < 256);
        }
    }
}
