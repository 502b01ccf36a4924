//! JSON scene files describing a machine state and a raster script.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::debug;

use crate::video::attributes::{AttributeExpr, CharAttributes};
use crate::video::character::{CHARACTER_BYTES, Character};
use crate::video::plane::{Cell, Plane};
use crate::video::raster::{RasterEvent, RasterScript, RegisterWrite};
use crate::video::sprite::Sprite;
use crate::video::{Machine, NUM_COLORS, NUM_SPRITES, PlaneId, SCREEN_HEIGHT};

const MAX_COLOR: u8 = 0x3F;

/// Attribute written either as a whole byte or as a bracketed sparse update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(i64),
    Expr(String),
}

impl AttrValue {
    pub fn to_expr(&self) -> Result<AttributeExpr> {
        match self {
            Self::Number(value) => {
                let value = i32::try_from(*value)
                    .with_context(|| format!("attribute value {value} out of range"))?;
                Ok(AttributeExpr::Whole(value))
            }
            Self::Expr(text) => AttributeExpr::parse(text)
                .with_context(|| format!("invalid attribute expression {text:?}")),
        }
    }

    fn apply_to(&self, attr: CharAttributes) -> Result<CharAttributes> {
        let expr = self.to_expr()?;
        Ok(attr.apply(&expr)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollDef {
    pub x: Option<u16>,
    pub y: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterDef {
    pub index: u8,
    /// Base64 of the 16 raw character bytes.
    pub data: String,
}

impl CharacterDef {
    fn decode(&self) -> Result<Character> {
        let bytes = BASE64_STANDARD
            .decode(self.data.trim())
            .with_context(|| format!("character {} is not valid base64", self.index))?;
        let data: [u8; CHARACTER_BYTES] = bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "character {} has {} bytes, expected {CHARACTER_BYTES}",
                self.index,
                bytes.len()
            )
        })?;
        Ok(Character::from_bytes(data))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellDef {
    #[serde(default)]
    pub row: usize,
    #[serde(default)]
    pub column: usize,
    pub character: u8,
    pub attr: Option<AttrValue>,
}

impl CellDef {
    fn to_cell(&self, prior: Cell) -> Result<Cell> {
        let attr = match &self.attr {
            Some(value) => value
                .apply_to(prior.attr)
                .with_context(|| format!("cell ({}, {})", self.row, self.column))?,
            None => prior.attr,
        };
        Ok(Cell::new(self.character, attr))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaneDef {
    /// Written to every cell before `cells`.
    pub fill: Option<CellDef>,
    #[serde(default)]
    pub cells: Vec<CellDef>,
}

impl PlaneDef {
    fn write(&self, plane: &mut Plane) -> Result<()> {
        if let Some(fill) = &self.fill {
            plane.fill(fill.to_cell(Cell::EMPTY)?);
        }
        for entry in &self.cells {
            let prior = plane.cell(entry.row, entry.column);
            plane.set_cell(entry.row, entry.column, entry.to_cell(prior)?);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpriteDef {
    pub index: usize,
    pub x: i16,
    pub y: i16,
    #[serde(default)]
    pub character: u8,
    pub attr: Option<AttrValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextDef {
    pub x: usize,
    pub y: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayDef {
    pub colors: Option<Vec<u8>>,
    #[serde(default)]
    pub characters: Vec<CharacterDef>,
    pub text_attr: Option<AttrValue>,
    #[serde(default)]
    pub text: Vec<TextDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorWriteDef {
    pub index: usize,
    pub value: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpriteWriteDef {
    pub index: usize,
    pub x: Option<i16>,
    pub y: Option<i16>,
    pub attr: Option<AttrValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RasterDef {
    pub line: u8,
    pub scroll_a: Option<ScrollDef>,
    pub scroll_b: Option<ScrollDef>,
    pub display: Option<AttrValue>,
    #[serde(default)]
    pub colors: Vec<ColorWriteDef>,
    #[serde(default)]
    pub sprites: Vec<SpriteWriteDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    pub display: Option<AttrValue>,
    #[serde(default)]
    pub scroll_a: ScrollDef,
    #[serde(default)]
    pub scroll_b: ScrollDef,
    #[serde(default)]
    pub colors: Vec<u8>,
    #[serde(default)]
    pub characters: Vec<CharacterDef>,
    #[serde(default)]
    pub plane_a: PlaneDef,
    #[serde(default)]
    pub plane_b: PlaneDef,
    #[serde(default)]
    pub sprites: Vec<SpriteDef>,
    #[serde(default)]
    pub overlay: OverlayDef,
    #[serde(default)]
    pub raster: Vec<RasterDef>,
}

impl Scene {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene: {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("failed to parse scene: {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let scene = serde_json::from_str(text).context("invalid scene JSON")?;
        Ok(scene)
    }

    /// Builds the initial machine state and the raster script.
    pub fn build(&self) -> Result<(Machine, RasterScript)> {
        let mut machine = Machine::new();

        if let Some(display) = &self.display {
            let expr = display.to_expr()?;
            machine
                .set_display_attributes(&expr)
                .context("display attributes")?;
        }
        let registers = &mut machine.video_registers;
        registers.set_scroll(
            PlaneId::A,
            self.scroll_a.x.unwrap_or(0),
            self.scroll_a.y.unwrap_or(0),
        );
        registers.set_scroll(
            PlaneId::B,
            self.scroll_b.x.unwrap_or(0),
            self.scroll_b.y.unwrap_or(0),
        );

        machine.color_registers.colors = color_bank(&self.colors, &[]).context("colors")?;

        for entry in &self.characters {
            machine.set_character(entry.index, entry.decode()?);
        }
        self.plane_a
            .write(&mut machine.video_ram.plane_a)
            .context("plane A")?;
        self.plane_b
            .write(&mut machine.video_ram.plane_b)
            .context("plane B")?;

        for entry in &self.sprites {
            check_sprite_index(entry.index)?;
            let attr = match &entry.attr {
                Some(value) => value
                    .apply_to(CharAttributes::default())
                    .with_context(|| format!("sprite {}", entry.index))?,
                None => CharAttributes::default(),
            };
            let sprite = Sprite::new(entry.x, entry.y, entry.character, attr);
            machine.set_sprite(entry.index, sprite);
        }

        self.load_overlay(&mut machine)?;
        let script = self.raster_script()?;

        debug!(
            characters = self.characters.len(),
            sprites = machine.sprite_registers.active_count(),
            raster_events = script.events().len(),
            "scene built"
        );
        Ok((machine, script))
    }

    fn load_overlay(&self, machine: &mut Machine) -> Result<()> {
        let overlay = &mut machine.overlay;
        if let Some(colors) = &self.overlay.colors {
            overlay.colors.colors =
                color_bank(colors, &overlay.colors.colors).context("overlay colors")?;
        }
        for entry in &self.overlay.characters {
            overlay.characters[usize::from(entry.index)] = entry.decode().context("overlay")?;
        }
        if let Some(value) = &self.overlay.text_attr {
            overlay.text_attr = value
                .apply_to(overlay.text_attr)
                .context("overlay text attribute")?;
        }
        for text in &self.overlay.text {
            overlay.print(text.x, text.y, &text.text);
        }
        Ok(())
    }

    fn raster_script(&self) -> Result<RasterScript> {
        let mut script = RasterScript::new();
        for entry in &self.raster {
            if usize::from(entry.line) >= SCREEN_HEIGHT {
                bail!("raster line {} is beyond the last screen line", entry.line);
            }

            let mut writes = Vec::new();
            let scrolls = [
                (PlaneId::A, &entry.scroll_a),
                (PlaneId::B, &entry.scroll_b),
            ];
            for (plane, scroll) in scrolls {
                if let Some(scroll) = scroll {
                    writes.push(RegisterWrite::Scroll {
                        plane,
                        x: scroll.x,
                        y: scroll.y,
                    });
                }
            }
            if let Some(display) = &entry.display {
                let expr = display
                    .to_expr()
                    .with_context(|| format!("raster line {}", entry.line))?;
                writes.push(RegisterWrite::Display(expr));
            }
            for color in &entry.colors {
                check_color(color.index, color.value)?;
                writes.push(RegisterWrite::Color {
                    index: color.index,
                    value: color.value,
                });
            }
            for sprite in &entry.sprites {
                check_sprite_index(sprite.index)?;
                if sprite.x.is_some() || sprite.y.is_some() {
                    writes.push(RegisterWrite::SpriteMove {
                        index: sprite.index,
                        x: sprite.x,
                        y: sprite.y,
                    });
                }
                if let Some(attr) = &sprite.attr {
                    writes.push(RegisterWrite::SpriteAttributes {
                        index: sprite.index,
                        expr: attr.to_expr()?,
                    });
                }
            }

            script.push(RasterEvent {
                line: entry.line,
                writes,
            });
        }
        Ok(script)
    }
}

fn check_sprite_index(index: usize) -> Result<()> {
    if index >= NUM_SPRITES {
        bail!("sprite index {index} out of range 0..{NUM_SPRITES}");
    }
    Ok(())
}

fn check_color(index: usize, value: u8) -> Result<()> {
    if index >= NUM_COLORS {
        bail!("color index {index} out of range 0..{NUM_COLORS}");
    }
    if value > MAX_COLOR {
        bail!("color {index} value {value:#04X} exceeds 6 bits");
    }
    Ok(())
}

/// Copies `colors` over `base` (zero-filled when shorter).
fn color_bank(colors: &[u8], base: &[u8]) -> Result<[u8; NUM_COLORS]> {
    if colors.len() > NUM_COLORS {
        bail!("{} colors given, at most {NUM_COLORS} allowed", colors.len());
    }
    let mut bank = [0u8; NUM_COLORS];
    let keep = base.len().min(NUM_COLORS);
    bank[..keep].copy_from_slice(&base[..keep]);
    for (index, &value) in colors.iter().enumerate() {
        check_color(index, value)?;
        bank[index] = value;
    }
    Ok(bank)
}
