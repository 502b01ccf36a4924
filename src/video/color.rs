use super::pixel;
use super::{NUM_COLORS, SCREEN_WIDTH};

pub const BYTES_PER_PIXEL: usize = 4;

/// Output level of each 2-bit channel. Black is lifted to 0x11 to look like a
/// lit screen.
pub const CHANNEL_LEVELS: [u8; 4] = [0x11, 0x66, 0xBB, 0xFF];

const CHANNEL_MASK: u8 = 0x03;

/// Packs 2-bit channels into a color register value `0b00RRGGBB`.
pub const fn pack_color(r: u8, g: u8, b: u8) -> u8 {
    ((r & CHANNEL_MASK) << 4) | ((g & CHANNEL_MASK) << 2) | (b & CHANNEL_MASK)
}

pub const fn unpack_color(color: u8) -> (u8, u8, u8) {
    (
        (color >> 4) & CHANNEL_MASK,
        (color >> 2) & CHANNEL_MASK,
        color & CHANNEL_MASK,
    )
}

pub const fn expand_channel(channel: u8) -> u8 {
    CHANNEL_LEVELS[(channel & CHANNEL_MASK) as usize]
}

pub const fn color_rgb(color: u8) -> [u8; 3] {
    let (r, g, b) = unpack_color(color);
    [expand_channel(r), expand_channel(g), expand_channel(b)]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRegisters {
    pub colors: [u8; NUM_COLORS],
}

impl Default for ColorRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorRegisters {
    pub const fn new() -> Self {
        Self {
            colors: [0; NUM_COLORS],
        }
    }

    pub const fn from_colors(colors: [u8; NUM_COLORS]) -> Self {
        Self { colors }
    }

    pub fn rgb(&self, index: usize) -> [u8; 3] {
        color_rgb(self.colors[index % NUM_COLORS])
    }
}

/// Converts a composited scanline into RGB pixels. The fourth byte of every
/// output pixel is left untouched.
pub fn resolve_scanline(
    scanline: &[u8; SCREEN_WIDTH],
    colors: &ColorRegisters,
    overlay_colors: &ColorRegisters,
    out: &mut [u8],
) {
    for (&byte, px) in scanline
        .iter()
        .zip(out.chunks_exact_mut(BYTES_PER_PIXEL))
    {
        let bank = if pixel::is_overlay(byte) {
            overlay_colors
        } else {
            colors
        };
        let rgb = color_rgb(bank.colors[pixel::color_index(byte)]);
        px[..3].copy_from_slice(&rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::pixel::OVERLAY_FLAG;

    #[test]
    fn channels_expand_to_lit_levels() {
        assert_eq!(color_rgb(pack_color(3, 0, 1)), [0xFF, 0x11, 0x66]);
        assert_eq!(color_rgb(pack_color(2, 2, 2)), [0xBB, 0xBB, 0xBB]);
        assert_eq!(unpack_color(0b0011_0001), (3, 0, 1));
    }

    #[test]
    fn overlay_flag_selects_overlay_bank() {
        let mut colors = ColorRegisters::new();
        colors.colors[5] = pack_color(3, 0, 0);
        let mut overlay = ColorRegisters::new();
        overlay.colors[5] = pack_color(0, 0, 3);

        let mut scanline = [0u8; SCREEN_WIDTH];
        scanline[0] = (1 << 2) | 1;
        scanline[1] = OVERLAY_FLAG | (1 << 2) | 1;
        scanline[2] = 0x80 | (1 << 2) | 1;
        let mut out = vec![0xAAu8; SCREEN_WIDTH * BYTES_PER_PIXEL];

        resolve_scanline(&scanline, &colors, &overlay, &mut out);
        assert_eq!(&out[0..4], &[0xFF, 0x11, 0x11, 0xAA]);
        assert_eq!(&out[4..8], &[0x11, 0x11, 0xFF, 0xAA]);
        assert_eq!(&out[8..12], &[0xFF, 0x11, 0x11, 0xAA]);
    }

    #[test]
    fn transparent_resolves_to_color_zero() {
        let mut colors = ColorRegisters::new();
        colors.colors[0] = pack_color(1, 2, 3);
        let scanline = [0u8; SCREEN_WIDTH];
        let mut out = vec![0u8; SCREEN_WIDTH * BYTES_PER_PIXEL];

        resolve_scanline(&scanline, &colors, &ColorRegisters::new(), &mut out);
        assert_eq!(&out[636..640], &[0x66, 0xBB, 0xFF, 0x00]);
    }
}
