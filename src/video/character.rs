pub const CHARACTER_BYTES: usize = 16;
pub const CHARACTER_SIZE: usize = 8;

const HIGH_PLANE: usize = 0x08;

/// 8x8 tile with two bit-planes: rows 0-7 hold bit 0 of each pixel, rows
/// 8-15 hold bit 1. The most significant bit of a row is the leftmost pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Character {
    pub data: [u8; CHARACTER_BYTES],
}

impl Character {
    pub const EMPTY: Self = Self {
        data: [0; CHARACTER_BYTES],
    };

    pub const fn from_bytes(data: [u8; CHARACTER_BYTES]) -> Self {
        Self { data }
    }

    /// Builds a character from 2-bit pixel values laid out row by row.
    pub fn from_pixels(rows: [[u8; CHARACTER_SIZE]; CHARACTER_SIZE]) -> Self {
        let mut data = [0u8; CHARACTER_BYTES];
        for (y, row) in rows.iter().enumerate() {
            for (x, &pixel) in row.iter().enumerate() {
                let bit = 0x80u8 >> x;
                if (pixel & 0x01) != 0 {
                    data[y] |= bit;
                }
                if (pixel & 0x02) != 0 {
                    data[y | HIGH_PLANE] |= bit;
                }
            }
        }
        Self { data }
    }

    /// Fills every pixel with the same color index.
    pub fn solid(pixel: u8) -> Self {
        Self::from_pixels([[pixel & 0x03; CHARACTER_SIZE]; CHARACTER_SIZE])
    }

    /// Color index (0-3) of the pixel at `x`, `y`. Callers apply flipping
    /// before calling; both coordinates must be below 8.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        debug_assert!(x < CHARACTER_SIZE && y < CHARACTER_SIZE);
        let shift = 7 - x;
        let b0 = (self.data[y] >> shift) & 0x01;
        let b1 = (self.data[y | HIGH_PLANE] >> shift) & 0x01;
        b0 | (b1 << 1)
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&row| row == 0)
    }
}
