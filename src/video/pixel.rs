//! Layout of a composited scanline byte.
//!
//! bits 0-1 pixel, bits 2-4 palette, bit 6 overlay flag, bit 7 priority.
//! Bit 5 is never written by the compositors.

pub const OVERLAY_FLAG: u8 = 1 << 6;

const COLOR_INDEX_MASK: u8 = 0x1F;
const PIXEL_MASK: u8 = 0x03;

#[inline]
pub const fn priority(byte: u8) -> u8 {
    byte >> 7
}

#[inline]
pub const fn is_opaque(byte: u8) -> bool {
    (byte & PIXEL_MASK) != 0
}

#[inline]
pub const fn is_overlay(byte: u8) -> bool {
    (byte & OVERLAY_FLAG) != 0
}

/// Index into a 32-entry color register bank (palette * 4 + pixel).
#[inline]
pub const fn color_index(byte: u8) -> usize {
    (byte & COLOR_INDEX_MASK) as usize
}
