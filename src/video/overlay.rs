use super::NUM_CHARACTERS;
use super::attributes::CharAttributes;
use super::character::Character;
use super::color::{ColorRegisters, pack_color};
use super::plane::{Cell, Plane};

/// First ASCII code with a glyph in the overlay character set.
const FIRST_GLYPH: u8 = b' ';
const LAST_GLYPH: u8 = b'~';
const FALLBACK_GLYPH: u8 = b'?';

/// Black, white, light gray, dark gray in palette 0.
pub const DEFAULT_OVERLAY_COLORS: [u8; 4] = [
    pack_color(0, 0, 0),
    pack_color(3, 3, 3),
    pack_color(2, 2, 2),
    pack_color(1, 1, 1),
];

/// System UI layer with its own characters and colors. It is composited
/// after every other layer and never scrolls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub characters: [Character; NUM_CHARACTERS],
    pub plane: Plane,
    pub colors: ColorRegisters,
    /// Attributes applied to cells written by [`Overlay::print`].
    pub text_attr: CharAttributes,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay {
    pub fn new() -> Self {
        let mut colors = ColorRegisters::new();
        colors.colors[..DEFAULT_OVERLAY_COLORS.len()].copy_from_slice(&DEFAULT_OVERLAY_COLORS);
        Self {
            characters: [Character::EMPTY; NUM_CHARACTERS],
            plane: Plane::new(),
            colors,
            text_attr: CharAttributes::default().with_priority(true),
        }
    }

    pub fn clear(&mut self) {
        self.plane.clear();
    }

    /// Character index used for an ASCII byte. Printable characters map to
    /// `code - 32`; anything else shows as `?`.
    pub fn glyph(byte: u8) -> u8 {
        let byte = if (FIRST_GLYPH..=LAST_GLYPH).contains(&byte) {
            byte
        } else {
            FALLBACK_GLYPH
        };
        byte - FIRST_GLYPH
    }

    /// Writes `text` starting at cell (`x`, `y`). Columns wrap at the plane
    /// width.
    pub fn print(&mut self, x: usize, y: usize, text: &str) {
        let attr = self.text_attr;
        for (offset, byte) in text.bytes().enumerate() {
            self.plane
                .set_cell(y, x + offset, Cell::new(Self::glyph(byte), attr));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PLANE_COLUMNS;

    #[test]
    fn print_maps_ascii_to_glyphs() {
        let mut overlay = Overlay::new();
        overlay.print(2, 1, "A1");

        assert_eq!(overlay.plane.cell(1, 2).character, 33);
        assert_eq!(overlay.plane.cell(1, 3).character, 17);
        assert_eq!(overlay.plane.cell(1, 2).attr.priority(), 1);
    }

    #[test]
    fn print_wraps_and_substitutes_unknown_bytes() {
        let mut overlay = Overlay::new();
        overlay.print(PLANE_COLUMNS - 1, 0, "x\u{7f}");

        assert_eq!(overlay.plane.cell(0, PLANE_COLUMNS - 1).character, b'x' - 32);
        assert_eq!(overlay.plane.cell(0, 0).character, b'?' - 32);

        overlay.clear();
        assert_eq!(overlay.plane.cell(0, 0), Cell::EMPTY);
    }

    #[test]
    fn default_colors_fill_palette_zero() {
        let overlay = Overlay::new();
        assert_eq!(overlay.colors.colors[1], 0x3F);
        assert_eq!(overlay.colors.colors[2], 0x2A);
        assert_eq!(overlay.colors.colors[3], 0x15);
        assert_eq!(overlay.colors.colors[4], 0x00);
    }
}
