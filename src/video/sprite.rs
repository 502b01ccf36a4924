use super::attributes::CharAttributes;
use super::character::{CHARACTER_SIZE, Character};
use super::pixel;
use super::{NUM_CHARACTERS, NUM_SPRITES, SCREEN_WIDTH};

/// Character slots between consecutive 8-pixel rows of a multi-row sprite.
pub const SPRITE_ROW_STRIDE: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Sprite {
    /// Screen column of the left edge; may be negative.
    pub x: i16,
    /// Screen line of the top edge; may be negative.
    pub y: i16,
    pub character: u8,
    pub attr: CharAttributes,
}

impl Sprite {
    pub const DISABLED: Self = Self {
        x: 0,
        y: 0,
        character: 0,
        attr: CharAttributes::from_bits(0),
    };

    pub const fn new(x: i16, y: i16, character: u8, attr: CharAttributes) -> Self {
        Self {
            x,
            y,
            character,
            attr,
        }
    }

    /// Position (0, 0) switches the sprite off.
    pub const fn is_disabled(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteRegisters {
    pub sprites: [Sprite; NUM_SPRITES],
}

impl Default for SpriteRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteRegisters {
    pub const fn new() -> Self {
        Self {
            sprites: [Sprite::DISABLED; NUM_SPRITES],
        }
    }

    pub fn clear(&mut self) {
        self.sprites.fill(Sprite::DISABLED);
    }

    pub fn active_count(&self) -> usize {
        self.sprites.iter().filter(|s| !s.is_disabled()).count()
    }
}

/// Composites every sprite crossing line `y`.
///
/// Sprites are rasterized into `sprite_line` from the highest index down, so
/// lower indices overwrite higher ones. The result is then merged into
/// `scanline` wherever the sprite pixel's priority is at least the
/// incumbent's. `sprite_line` must be cleared by the caller. Returns the
/// number of sprites that touched the line.
pub fn render_sprites(
    registers: &SpriteRegisters,
    characters: &[Character; NUM_CHARACTERS],
    y: usize,
    scanline: &mut [u8; SCREEN_WIDTH],
    sprite_line: &mut [u8; SCREEN_WIDTH],
) -> usize {
    let line = y as i32;
    let mut drawn = 0;

    for sprite in registers.sprites.iter().rev() {
        if sprite.is_disabled() {
            continue;
        }

        let attr = sprite.attr;
        let size = attr.sprite_dimension();
        let mut row = line - i32::from(sprite.y);
        if !(0..size).contains(&row) {
            continue;
        }
        if attr.flip_y() {
            row = size - row - 1;
        }

        let left = i32::from(sprite.x);
        let min_x = left.max(0);
        let max_x = (left + size).min(SCREEN_WIDTH as i32);
        if min_x >= max_x {
            continue;
        }

        let row_offset = (row as u8 / CHARACTER_SIZE as u8).wrapping_mul(SPRITE_ROW_STRIDE);
        let base = sprite.character.wrapping_add(row_offset);
        let cell_y = row as usize % CHARACTER_SIZE;

        for x in min_x..max_x {
            let mut column = x - left;
            if attr.flip_x() {
                column = size - column - 1;
            }
            let tile = base.wrapping_add((column as usize / CHARACTER_SIZE) as u8);
            let cell_x = column as usize % CHARACTER_SIZE;
            let value = characters[usize::from(tile)].pixel(cell_x, cell_y);
            if value != 0 {
                sprite_line[x as usize] = attr.scanline_byte(value);
            }
        }
        drawn += 1;
    }

    for (dest, &src) in scanline.iter_mut().zip(sprite_line.iter()) {
        if pixel::is_opaque(src) && pixel::priority(src) >= pixel::priority(*dest) {
            *dest = src;
        }
    }

    drawn
}
