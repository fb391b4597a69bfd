// Text rendered out of rectangles
//
// Every glyph is drawn on a 16x20 grid (in units of the text size) from a
// handful of rectangles, bottom-left origin. Glyphs advance by 20 units.

use crate::color::Color;
use crate::error::{at_least, HopResult};
use crate::group::Group;
use crate::scene::Scene;

pub const GLYPH_WIDTH: u32 = 16;
pub const GLYPH_HEIGHT: u32 = 20;
pub const GLYPH_ADVANCE: u32 = 20;

/// One rectangle of a glyph: x, y, width, height in grid units.
pub type GlyphRect = (u8, u8, u8, u8);

/// Rectangles making up `c`, or `None` when the character has no glyph.
/// Letters are case-insensitive; space is a valid, empty glyph.
pub fn glyph(c: char) -> Option<&'static [GlyphRect]> {
    let rects: &'static [GlyphRect] = match c.to_ascii_uppercase() {
        'A' => &[(0, 0, 4, 16), (12, 0, 4, 16), (4, 16, 8, 4), (4, 8, 8, 4)],
        'B' => &[(0, 0, 4, 20), (4, 0, 8, 4), (4, 8, 8, 4), (4, 16, 8, 4), (12, 12, 4, 4), (12, 4, 4, 4)],
        'C' => &[(0, 4, 4, 12), (4, 0, 12, 4), (4, 16, 12, 4)],
        'D' => &[(0, 0, 4, 20), (4, 0, 8, 4), (4, 16, 8, 4), (12, 4, 4, 12)],
        'E' => &[(0, 0, 4, 20), (4, 0, 12, 4), (4, 16, 12, 4), (4, 8, 8, 4)],
        'F' => &[(0, 0, 4, 20), (4, 16, 12, 4), (4, 8, 8, 4)],
        'G' => &[(0, 4, 4, 12), (4, 0, 12, 4), (4, 16, 12, 4), (12, 4, 4, 8), (8, 8, 4, 4)],
        'H' => &[(0, 0, 4, 20), (4, 8, 8, 4), (12, 0, 4, 20)],
        'I' => &[(8, 4, 4, 12), (4, 16, 12, 4), (4, 0, 12, 4)],
        'J' => &[(12, 4, 4, 16), (4, 0, 8, 4), (0, 4, 4, 4)],
        'K' => &[(0, 0, 4, 20), (4, 8, 4, 4), (8, 4, 4, 4), (8, 12, 4, 4), (12, 16, 4, 4), (12, 0, 4, 4)],
        'L' => &[(0, 0, 4, 20), (4, 0, 8, 4)],
        'M' => &[(0, 0, 4, 20), (12, 0, 4, 20), (6, 0, 4, 16), (4, 16, 8, 4)],
        'N' => &[(0, 0, 4, 20), (12, 0, 4, 20), (4, 12, 4, 4), (8, 8, 8, 4)],
        'O' => &[(0, 4, 4, 12), (12, 4, 4, 12), (4, 0, 8, 4), (4, 16, 8, 4)],
        'P' => &[(0, 0, 4, 20), (4, 16, 8, 4), (4, 8, 8, 4), (12, 12, 4, 4)],
        'Q' => &[(0, 4, 4, 12), (12, 4, 4, 12), (4, 0, 8, 4), (4, 16, 8, 4), (12, 0, 4, 4), (8, 4, 4, 4)],
        'R' => &[(0, 0, 4, 20), (4, 16, 8, 4), (4, 8, 8, 4), (12, 12, 4, 4), (12, 0, 4, 4), (8, 4, 4, 4)],
        'S' => &[(0, 12, 4, 4), (0, 0, 12, 4), (4, 16, 12, 4), (4, 8, 8, 4), (12, 4, 4, 4)],
        'T' => &[(6, 0, 4, 16), (0, 16, 16, 4)],
        'U' => &[(0, 0, 4, 20), (4, 0, 8, 4), (12, 0, 4, 20)],
        'V' => &[(2, 4, 4, 16), (6, 0, 4, 4), (10, 4, 4, 16)],
        'W' => &[(0, 0, 4, 20), (12, 0, 4, 20), (6, 4, 4, 16), (4, 0, 8, 4)],
        'X' => &[(2, 0, 4, 8), (2, 12, 4, 8), (6, 8, 4, 4), (10, 0, 4, 8), (10, 12, 4, 8)],
        'Y' => &[(6, 0, 4, 8), (2, 12, 4, 8), (6, 8, 4, 4), (10, 12, 4, 8)],
        'Z' => &[(0, 0, 16, 4), (0, 16, 16, 4), (2, 4, 4, 4), (6, 8, 4, 4), (10, 12, 4, 4)],
        '.' => &[(0, 0, 4, 4)],
        ',' => &[(2, 0, 2, 4), (0, 0, 2, 2)],
        '!' => &[(6, 0, 4, 4), (6, 8, 4, 12)],
        '?' => &[(2, 0, 4, 4), (2, 16, 8, 4), (10, 12, 4, 4), (2, 8, 8, 4)],
        '0' => &[(0, 4, 4, 12), (12, 4, 4, 12), (4, 0, 8, 4), (4, 16, 8, 4), (6, 8, 4, 4)],
        '1' => &[(2, 0, 12, 4), (6, 4, 4, 16), (2, 12, 4, 4)],
        '2' => &[(2, 0, 12, 4), (2, 4, 4, 4), (6, 8, 4, 4), (10, 12, 4, 4), (2, 16, 12, 4)],
        '3' => &[(2, 0, 12, 4), (10, 4, 4, 4), (6, 8, 4, 4), (10, 12, 4, 4), (2, 16, 12, 4)],
        '4' => &[(10, 0, 4, 20), (6, 8, 4, 4), (2, 8, 4, 12)],
        '5' => &[(2, 0, 12, 4), (2, 8, 12, 4), (2, 16, 12, 4), (2, 12, 4, 4), (10, 4, 4, 4)],
        '6' => &[(2, 0, 12, 4), (2, 8, 12, 4), (2, 16, 12, 4), (2, 12, 4, 4), (2, 4, 4, 4), (10, 4, 4, 4)],
        '7' => &[(2, 16, 12, 4), (10, 0, 4, 16)],
        '8' => &[
            (2, 0, 12, 4),
            (2, 8, 12, 4),
            (2, 16, 12, 4),
            (2, 12, 4, 4),
            (2, 4, 4, 4),
            (10, 4, 4, 4),
            (10, 12, 4, 4),
        ],
        '9' => &[(2, 16, 12, 4), (10, 0, 4, 16), (2, 8, 4, 8), (6, 8, 4, 4)],
        ' ' => &[],
        _ => return None,
    };
    Some(rects)
}

/// A line of text made of rectangle glyphs.
#[derive(Debug, Clone)]
pub struct TextBox {
    text: String,
    size: u32,
    color: Color,
    group: Group,
}

impl TextBox {
    /// Lays out `text` starting at `(x, y)`. Characters without a glyph are
    /// skipped and take no space.
    pub fn new(scene: &mut Scene, x: f32, y: f32, size: u32, color: Color, text: &str) -> HopResult<Self> {
        at_least("text size", size as f32, 1.0)?;

        let s = size as f32;
        let stride = (GLYPH_ADVANCE * size) as f32;
        let slots = text.chars().count().max(1) as f32;
        let mut group = Group::new(x, y, stride * slots, (GLYPH_HEIGHT * size) as f32);

        let mut place = 0.0;
        for c in text.chars() {
            let Some(rects) = glyph(c) else {
                log::debug!("TextBox: no glyph for {:?}, skipping", c);
                continue;
            };

            let mut letter = Group::new(0.0, 0.0, GLYPH_WIDTH as f32 * s, GLYPH_HEIGHT as f32 * s);
            for &(rx, ry, rw, rh) in rects {
                letter.create_rectangle(
                    scene,
                    rx as f32 * s,
                    ry as f32 * s,
                    rw as f32 * s,
                    rh as f32 * s,
                    color,
                )?;
            }
            group.add_group(scene, place, 0.0, letter)?;
            place += stride;
        }

        Ok(Self {
            text: text.to_string(),
            size,
            color,
            group,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn set_color(&mut self, scene: &mut Scene, color: Color) {
        self.color = color;
        self.group.set_color_all(scene, color);
    }

    pub fn move_by(&mut self, scene: &mut Scene, dx: f32, dy: f32) {
        self.group.move_by(scene, dx, dy);
    }

    pub fn destroy(self, scene: &mut Scene) {
        self.group.destroy(scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{GREEN, RED};
    use crate::geometry::Rect;

    const SUPPORTED: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.,!? ";

    #[test]
    fn every_glyph_fits_its_cell() {
        let cell = Rect::new(0.0, 0.0, GLYPH_WIDTH as f32, GLYPH_HEIGHT as f32);
        for c in SUPPORTED.chars() {
            for &(x, y, w, h) in glyph(c).unwrap() {
                let r = Rect::new(x as f32, y as f32, w as f32, h as f32);
                assert!(cell.contains_rect(&r), "glyph {:?} rect {:?} leaves the cell", c, r);
            }
        }
    }

    #[test]
    fn lowercase_maps_to_uppercase() {
        assert_eq!(glyph('a'), glyph('A'));
        assert_eq!(glyph('z'), glyph('Z'));
    }

    #[test]
    fn unsupported_characters_have_no_glyph() {
        assert!(glyph('#').is_none());
        assert!(glyph('~').is_none());
        assert!(glyph(' ').unwrap().is_empty());
    }

    #[test]
    fn text_advances_per_valid_glyph() {
        let mut scene = Scene::new();
        let tb = TextBox::new(&mut scene, 0.0, 600.0, 2, GREEN, "H#I").unwrap();

        let letters = tb.group().children();
        assert_eq!(letters.len(), 2);
        assert_eq!(letters[0].x(), 0.0);
        // '#' is skipped without consuming space
        assert_eq!(letters[1].x(), 40.0);
        assert_eq!(letters[1].y(), 600.0);

        let rects = glyph('H').unwrap().len() + glyph('I').unwrap().len();
        assert_eq!(scene.len(), rects);
    }

    #[test]
    fn glyph_rectangles_scale_with_size() {
        let mut scene = Scene::new();
        let tb = TextBox::new(&mut scene, 10.0, 20.0, 3, GREEN, "L").unwrap();
        let stem = tb.group().children()[0].objects()[0];
        assert_eq!(scene.bounds(stem).unwrap(), Rect::new(10.0, 20.0, 12.0, 60.0));
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut scene = Scene::new();
        assert!(TextBox::new(&mut scene, 0.0, 0.0, 0, GREEN, "HI").is_err());
        assert!(scene.is_empty());
    }

    #[test]
    fn set_color_recolors_every_rectangle() {
        let mut scene = Scene::new();
        let mut tb = TextBox::new(&mut scene, 0.0, 0.0, 1, GREEN, "OK").unwrap();
        tb.set_color(&mut scene, RED);
        assert!(scene.iter().all(|o| o.color() == RED));
        assert_eq!(tb.color(), RED);
    }
}
