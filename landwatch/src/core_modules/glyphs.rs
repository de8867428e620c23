// THEORY:
// Region labels are short ("D1", "D12"), so a tiny built-in bitmap font is enough
// and keeps the library free of font files. Each glyph is 5 columns by 7 rows; a
// row is a 5-bit mask with bit 4 as the leftmost column.

use image::{Rgb, RgbImage};

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
pub const GLYPH_SPACING: u32 = 1;

type Glyph = [u8; GLYPH_HEIGHT as usize];

const DIGITS: [Glyph; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
];

const LETTER_D: Glyph = [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C];

/// Bitmap for `c`, if the font has it.
pub fn glyph(c: char) -> Option<Glyph> {
    match c {
        'D' | 'd' => Some(LETTER_D),
        '0'..='9' => c.to_digit(10).map(|digit| DIGITS[digit as usize]),
        _ => None,
    }
}

/// Rendered width of `text` in pixels.
pub fn text_width(text: &str) -> u32 {
    let count = text.chars().count() as u32;
    if count == 0 {
        return 0;
    }
    count * GLYPH_WIDTH + (count - 1) * GLYPH_SPACING
}

/// Draws `text` with its top-left corner at `(x, y)`. Pixels off the canvas are
/// clipped; characters outside the font advance the cursor but draw nothing.
pub fn draw_text(image: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>) {
    let (width, height) = (image.width() as i64, image.height() as i64);
    let mut cursor = x;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH as i64 {
                    if bits & (0x10 >> col) == 0 {
                        continue;
                    }
                    let (px, py) = (cursor + col, y + row as i64);
                    if px >= 0 && py >= 0 && px < width && py < height {
                        image.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
        cursor += (GLYPH_WIDTH + GLYPH_SPACING) as i64;
    }
}
