// Colors objects can be drawn with

/// Linear RGB color, each channel in `0.0..=1.0`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Channels clamped into range, opaque alpha appended.
    pub fn to_rgba(self) -> [f32; 4] {
        [
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            1.0,
        ]
    }
}

impl From<[f32; 3]> for Color {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colors() {
        assert_eq!(RED.to_rgba(), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(WHITE.to_rgba(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(BLACK, Color::default());
    }

    #[test]
    fn rgba_clamps_out_of_range_channels() {
        let c = Color::rgb(1.5, -0.2, 0.4);
        assert_eq!(c.to_rgba(), [1.0, 0.0, 0.4, 1.0]);
    }

    #[test]
    fn from_array() {
        let pink: Color = [1.0, 0.4, 0.7].into();
        assert_eq!(pink, Color::rgb(1.0, 0.4, 0.7));
    }
}
