use tracing::warn;

use super::attributes::AttributeExpr;
use super::{Machine, NUM_COLORS, NUM_SPRITES, PlaneId};

/// Called synchronously once per scanline, after the raster-line register is
/// written and before the line is composited. Register changes made here
/// take effect on that same line.
pub trait RasterInterrupt {
    fn raster(&mut self, machine: &mut Machine);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterrupt;

impl RasterInterrupt for NoInterrupt {
    fn raster(&mut self, _machine: &mut Machine) {}
}

impl<F> RasterInterrupt for F
where
    F: FnMut(&mut Machine),
{
    fn raster(&mut self, machine: &mut Machine) {
        self(machine)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterWrite {
    Scroll {
        plane: PlaneId,
        x: Option<u16>,
        y: Option<u16>,
    },
    Display(AttributeExpr),
    Color {
        index: usize,
        value: u8,
    },
    /// An omitted axis keeps the sprite's current coordinate.
    SpriteMove {
        index: usize,
        x: Option<i16>,
        y: Option<i16>,
    },
    SpriteAttributes {
        index: usize,
        expr: AttributeExpr,
    },
}

impl RegisterWrite {
    fn apply(&self, machine: &mut Machine) {
        match self {
            Self::Scroll { plane, x, y } => {
                let (old_x, old_y) = machine.video_registers.scroll(*plane);
                machine.video_registers.set_scroll(
                    *plane,
                    x.unwrap_or(old_x),
                    y.unwrap_or(old_y),
                );
            }
            Self::Display(expr) => {
                if let Err(err) = machine.set_display_attributes(expr) {
                    warn!(
                        line = machine.raster_line(),
                        "display attribute write: {err}"
                    );
                }
            }
            Self::Color { index, value } => {
                machine.set_color(*index % NUM_COLORS, *value);
            }
            Self::SpriteMove { index, x, y } => {
                let sprite = &mut machine.sprite_registers.sprites[*index % NUM_SPRITES];
                sprite.x = x.unwrap_or(sprite.x);
                sprite.y = y.unwrap_or(sprite.y);
            }
            Self::SpriteAttributes { index, expr } => {
                if let Err(err) = machine.set_sprite_attributes(*index, expr) {
                    warn!(
                        line = machine.raster_line(),
                        sprite = index,
                        "sprite attribute write: {err}"
                    );
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterEvent {
    pub line: u8,
    pub writes: Vec<RegisterWrite>,
}

/// Scripted register writes keyed by raster line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterScript {
    events: Vec<RasterEvent>,
}

impl RasterScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RasterEvent) {
        self.events.push(event);
    }

    pub fn on_line(mut self, line: u8, write: RegisterWrite) -> Self {
        self.events.push(RasterEvent {
            line,
            writes: vec![write],
        });
        self
    }

    pub fn events(&self) -> &[RasterEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl RasterInterrupt for RasterScript {
    fn raster(&mut self, machine: &mut Machine) {
        let line = machine.raster_line();
        for event in self.events.iter().filter(|event| event.line == line) {
            for write in &event.writes {
                write.apply(machine);
            }
        }
    }
}
