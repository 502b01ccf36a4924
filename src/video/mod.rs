pub mod attributes;
pub mod character;
pub mod chip;
pub mod color;
pub mod overlay;
pub mod pixel;
pub mod plane;
pub mod raster;
pub mod sprite;

use attributes::{AttributeError, AttributeExpr, DisplayAttributes};
use character::Character;
use color::ColorRegisters;
use overlay::Overlay;
use plane::{Cell, Plane};
use sprite::{Sprite, SpriteRegisters};

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 128;
pub const NUM_CHARACTERS: usize = 256;
pub const NUM_PALETTES: usize = 8;
pub const NUM_COLORS: usize = NUM_PALETTES * 4;
pub const PLANE_COLUMNS: usize = 32;
pub const PLANE_ROWS: usize = 32;
pub const NUM_SPRITES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneId {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRam {
    pub characters: [Character; NUM_CHARACTERS],
    pub plane_a: Plane,
    pub plane_b: Plane,
}

impl Default for VideoRam {
    fn default() -> Self {
        Self {
            characters: [Character::EMPTY; NUM_CHARACTERS],
            plane_a: Plane::new(),
            plane_b: Plane::new(),
        }
    }
}

impl VideoRam {
    pub fn plane(&self, id: PlaneId) -> &Plane {
        match id {
            PlaneId::A => &self.plane_a,
            PlaneId::B => &self.plane_b,
        }
    }

    pub fn plane_mut(&mut self, id: PlaneId) -> &mut Plane {
        match id {
            PlaneId::A => &mut self.plane_a,
            PlaneId::B => &mut self.plane_b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoRegisters {
    pub attr: DisplayAttributes,
    /// Scroll offsets in plane pixels. Only the low 8 bits take effect.
    pub scroll_ax: u16,
    pub scroll_ay: u16,
    pub scroll_bx: u16,
    pub scroll_by: u16,
    /// Written by the renderer before each raster interrupt.
    pub raster_line: u8,
}

impl VideoRegisters {
    pub fn scroll(&self, id: PlaneId) -> (u16, u16) {
        match id {
            PlaneId::A => (self.scroll_ax, self.scroll_ay),
            PlaneId::B => (self.scroll_bx, self.scroll_by),
        }
    }

    pub fn set_scroll(&mut self, id: PlaneId, x: u16, y: u16) {
        match id {
            PlaneId::A => {
                self.scroll_ax = x;
                self.scroll_ay = y;
            }
            PlaneId::B => {
                self.scroll_bx = x;
                self.scroll_by = y;
            }
        }
    }
}

/// Memory and registers shared between the interpreter and the video chip.
///
/// The chip only reads this state while rendering, apart from
/// `video_registers.raster_line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub video_ram: VideoRam,
    pub video_registers: VideoRegisters,
    pub sprite_registers: SpriteRegisters,
    pub color_registers: ColorRegisters,
    pub overlay: Overlay,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            video_ram: VideoRam::default(),
            video_registers: VideoRegisters::default(),
            sprite_registers: SpriteRegisters::new(),
            color_registers: ColorRegisters::new(),
            overlay: Overlay::new(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn set_character(&mut self, index: u8, character: Character) {
        self.video_ram.characters[usize::from(index)] = character;
    }

    pub fn cell(&self, plane: PlaneId, row: usize, column: usize) -> Cell {
        self.video_ram.plane(plane).cell(row, column)
    }

    pub fn set_cell(&mut self, plane: PlaneId, row: usize, column: usize, cell: Cell) {
        self.video_ram.plane_mut(plane).set_cell(row, column, cell);
    }

    pub fn set_sprite(&mut self, index: usize, sprite: Sprite) {
        self.sprite_registers.sprites[index % NUM_SPRITES] = sprite;
    }

    pub fn clear_sprites(&mut self) {
        self.sprite_registers.clear();
    }

    pub fn raster_line(&self) -> u8 {
        self.video_registers.raster_line
    }

    pub fn set_color(&mut self, index: usize, color: u8) {
        self.color_registers.colors[index % NUM_COLORS] = color;
    }

    /// Applies an attribute write to a sprite. The sprite is untouched on
    /// error.
    pub fn set_sprite_attributes(
        &mut self,
        index: usize,
        expr: &AttributeExpr,
    ) -> Result<(), AttributeError> {
        let sprite = &mut self.sprite_registers.sprites[index % NUM_SPRITES];
        sprite.attr = sprite.attr.apply(expr)?;
        Ok(())
    }

    pub fn set_cell_attributes(
        &mut self,
        plane: PlaneId,
        row: usize,
        column: usize,
        expr: &AttributeExpr,
    ) -> Result<(), AttributeError> {
        let cell = self.video_ram.plane_mut(plane).cell_mut(row, column);
        cell.attr = cell.attr.apply(expr)?;
        Ok(())
    }

    pub fn set_display_attributes(
        &mut self,
        expr: &AttributeExpr,
    ) -> Result<(), AttributeError> {
        self.video_registers.attr = self.video_registers.attr.apply(expr)?;
        Ok(())
    }
}
