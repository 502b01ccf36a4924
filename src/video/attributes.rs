//! Packed attribute registers shared between the interpreter and the renderer.
//!
//! Character attributes (cells and sprites) pack into one byte:
//!
//! | bits | field    |
//! |------|----------|
//! | 0-2  | palette  |
//! | 3    | flip x   |
//! | 4    | flip y   |
//! | 5    | priority |
//! | 6-7  | size     |
//!
//! Display attributes hold the sprite / plane A / plane B enables in bits 0-2.
//!
//! Both registers accept a sparse update: a bracketed list such as
//! `(2,,,1,)` where an omitted term keeps the previous field value.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use super::NUM_PALETTES;

const PALETTE_MASK: u8 = 0x07;
const FLIP_X: u8 = 0x08;
const FLIP_Y: u8 = 0x10;
const PRIORITY: u8 = 0x20;
const PRIORITY_SHIFT: u8 = 5;
const SIZE_SHIFT: u8 = 6;
const SIZE_MASK: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeField {
    Palette,
    FlipX,
    FlipY,
    Priority,
    Size,
    Sprites,
    PlaneA,
    PlaneB,
    /// The whole register written as one scalar.
    Value,
}

impl AttributeField {
    /// Inclusive range accepted for the field.
    pub const fn range(self) -> (i32, i32) {
        match self {
            Self::Palette => (0, NUM_PALETTES as i32 - 1),
            Self::Size => (0, 3),
            Self::Value => (0, 255),
            Self::FlipX
            | Self::FlipY
            | Self::Priority
            | Self::Sprites
            | Self::PlaneA
            | Self::PlaneB => (0, 1),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Palette => "palette",
            Self::FlipX => "flip x",
            Self::FlipY => "flip y",
            Self::Priority => "priority",
            Self::Size => "size",
            Self::Sprites => "sprites",
            Self::PlaneA => "plane A",
            Self::PlaneB => "plane B",
            Self::Value => "value",
        }
    }

    fn check_value(self, value: i32) -> Result<u8, AttributeError> {
        let (min, max) = self.range();
        if value < min || value > max {
            return Err(AttributeError::InvalidOperand { field: self, value });
        }
        Ok(value as u8)
    }

    fn check(self, value: Option<i32>) -> Result<Option<u8>, AttributeError> {
        value.map(|value| self.check_value(value)).transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    InvalidOperand { field: AttributeField, value: i32 },
    ExpectedRightParenthesis,
    ExpectedNumber(String),
    TooManyFields { expected: usize, found: usize },
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOperand { field, value } => {
                let (min, max) = field.range();
                write!(
                    f,
                    "invalid operand: {} {} outside {}..={}",
                    field.name(),
                    value,
                    min,
                    max
                )
            }
            Self::ExpectedRightParenthesis => write!(f, "expected right parenthesis"),
            Self::ExpectedNumber(text) => write!(f, "expected number, found {text:?}"),
            Self::TooManyFields { expected, found } => write!(
                f,
                "too many attribute fields: expected at most {expected}, found {found}"
            ),
        }
    }
}

impl std::error::Error for AttributeError {}

/// Register write as written by a script: either a whole scalar or a sparse
/// bracketed field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeExpr {
    Whole(i32),
    /// `None` entries keep the previous field value.
    Fields(Vec<Option<i32>>),
}

impl AttributeExpr {
    pub fn parse(source: &str) -> Result<Self, AttributeError> {
        let source = source.trim();
        let Some(inner) = source.strip_prefix('(') else {
            return parse_operand(source).map(Self::Whole);
        };
        let inner = inner
            .strip_suffix(')')
            .ok_or(AttributeError::ExpectedRightParenthesis)?;

        let fields = inner
            .split(',')
            .map(|term| {
                let term = term.trim();
                if term.is_empty() {
                    Ok(None)
                } else {
                    parse_operand(term).map(Some)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Fields(fields))
    }
}

impl FromStr for AttributeExpr {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_operand(text: &str) -> Result<i32, AttributeError> {
    text.parse::<i32>()
        .map_err(|_| AttributeError::ExpectedNumber(text.to_string()))
}

fn field_slots<const N: usize>(
    fields: &[Option<i32>],
) -> Result<[Option<i32>; N], AttributeError> {
    if fields.len() > N {
        return Err(AttributeError::TooManyFields {
            expected: N,
            found: fields.len(),
        });
    }
    let mut slots = [None; N];
    slots[..fields.len()].copy_from_slice(fields);
    Ok(slots)
}

const fn with_flag(bits: u8, flag: u8, on: bool) -> u8 {
    if on { bits | flag } else { bits & !flag }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CharAttributes(u8);

impl CharAttributes {
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn palette(self) -> u8 {
        self.0 & PALETTE_MASK
    }

    pub const fn flip_x(self) -> bool {
        (self.0 & FLIP_X) != 0
    }

    pub const fn flip_y(self) -> bool {
        (self.0 & FLIP_Y) != 0
    }

    pub const fn priority(self) -> u8 {
        (self.0 & PRIORITY) >> PRIORITY_SHIFT
    }

    pub const fn size(self) -> u8 {
        (self.0 >> SIZE_SHIFT) & SIZE_MASK
    }

    /// Edge length in pixels of a sprite using these attributes.
    pub const fn sprite_dimension(self) -> i32 {
        (self.size() as i32 + 1) * 8
    }

    pub const fn with_palette(self, palette: u8) -> Self {
        Self((self.0 & !PALETTE_MASK) | (palette & PALETTE_MASK))
    }

    pub const fn with_flip_x(self, on: bool) -> Self {
        Self(with_flag(self.0, FLIP_X, on))
    }

    pub const fn with_flip_y(self, on: bool) -> Self {
        Self(with_flag(self.0, FLIP_Y, on))
    }

    pub const fn with_priority(self, on: bool) -> Self {
        Self(with_flag(self.0, PRIORITY, on))
    }

    pub const fn with_size(self, size: u8) -> Self {
        Self((self.0 & !(SIZE_MASK << SIZE_SHIFT)) | ((size & SIZE_MASK) << SIZE_SHIFT))
    }

    /// Packs a decoded pixel with these attributes into a scanline byte.
    pub const fn scanline_byte(self, pixel: u8) -> u8 {
        (pixel & 0x03) | (self.palette() << 2) | (self.priority() << 7)
    }

    /// Overwrites only the fields present in `update`. Every present value is
    /// validated before anything changes.
    pub fn merge(self, update: &CharAttributeUpdate) -> Result<Self, AttributeError> {
        let palette = AttributeField::Palette.check(update.palette)?;
        let flip_x = AttributeField::FlipX.check(update.flip_x)?;
        let flip_y = AttributeField::FlipY.check(update.flip_y)?;
        let priority = AttributeField::Priority.check(update.priority)?;
        let size = AttributeField::Size.check(update.size)?;

        let mut result = self;
        if let Some(value) = palette {
            result = result.with_palette(value);
        }
        if let Some(value) = flip_x {
            result = result.with_flip_x(value != 0);
        }
        if let Some(value) = flip_y {
            result = result.with_flip_y(value != 0);
        }
        if let Some(value) = priority {
            result = result.with_priority(value != 0);
        }
        if let Some(value) = size {
            result = result.with_size(value);
        }
        Ok(result)
    }

    pub fn apply(self, expr: &AttributeExpr) -> Result<Self, AttributeError> {
        match expr {
            AttributeExpr::Whole(value) => {
                Ok(Self(AttributeField::Value.check_value(*value)?))
            }
            AttributeExpr::Fields(fields) => {
                self.merge(&CharAttributeUpdate::from_fields(fields)?)
            }
        }
    }
}

impl From<u8> for CharAttributes {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl From<CharAttributes> for u8 {
    fn from(attr: CharAttributes) -> Self {
        attr.0
    }
}

/// Sparse write to a character attribute register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharAttributeUpdate {
    pub palette: Option<i32>,
    pub flip_x: Option<i32>,
    pub flip_y: Option<i32>,
    pub priority: Option<i32>,
    pub size: Option<i32>,
}

impl CharAttributeUpdate {
    /// Maps positional terms (palette, flip x, flip y, priority, size) onto
    /// fields. Missing trailing terms count as omitted.
    pub fn from_fields(fields: &[Option<i32>]) -> Result<Self, AttributeError> {
        let [palette, flip_x, flip_y, priority, size] = field_slots::<5>(fields)?;
        Ok(Self {
            palette,
            flip_x,
            flip_y,
            priority,
            size,
        })
    }
}

bitflags! {
    /// Layer enables of the display attribute register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DisplayAttributes: u8 {
        const SPRITES = 1 << 0;
        const PLANE_A = 1 << 1;
        const PLANE_B = 1 << 2;
    }
}

impl Default for DisplayAttributes {
    fn default() -> Self {
        Self::empty()
    }
}

impl DisplayAttributes {
    pub fn sprites_enabled(self) -> bool {
        self.contains(Self::SPRITES)
    }

    pub fn plane_a_enabled(self) -> bool {
        self.contains(Self::PLANE_A)
    }

    pub fn plane_b_enabled(self) -> bool {
        self.contains(Self::PLANE_B)
    }

    pub fn merge(self, update: &DisplayAttributeUpdate) -> Result<Self, AttributeError> {
        let sprites = AttributeField::Sprites.check(update.sprites)?;
        let plane_a = AttributeField::PlaneA.check(update.plane_a)?;
        let plane_b = AttributeField::PlaneB.check(update.plane_b)?;

        let mut result = self;
        if let Some(value) = sprites {
            result.set(Self::SPRITES, value != 0);
        }
        if let Some(value) = plane_a {
            result.set(Self::PLANE_A, value != 0);
        }
        if let Some(value) = plane_b {
            result.set(Self::PLANE_B, value != 0);
        }
        Ok(result)
    }

    pub fn apply(self, expr: &AttributeExpr) -> Result<Self, AttributeError> {
        match expr {
            AttributeExpr::Whole(value) => {
                Ok(Self::from_bits_retain(AttributeField::Value.check_value(*value)?))
            }
            AttributeExpr::Fields(fields) => {
                self.merge(&DisplayAttributeUpdate::from_fields(fields)?)
            }
        }
    }
}

/// Sparse write to the display attribute register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayAttributeUpdate {
    pub sprites: Option<i32>,
    pub plane_a: Option<i32>,
    pub plane_b: Option<i32>,
}

impl DisplayAttributeUpdate {
    pub fn from_fields(fields: &[Option<i32>]) -> Result<Self, AttributeError> {
        let [sprites, plane_a, plane_b] = field_slots::<3>(fields)?;
        Ok(Self {
            sprites,
            plane_a,
            plane_b,
        })
    }
}
