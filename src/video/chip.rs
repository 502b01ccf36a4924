use std::collections::VecDeque;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::Serialize;
use sha1::{Digest, Sha1};
use tracing::{debug, trace};

use super::color::{BYTES_PER_PIXEL, resolve_scanline};
use super::pixel::OVERLAY_FLAG;
use super::plane::render_plane;
use super::raster::RasterInterrupt;
use super::sprite::render_sprites;
use super::{Machine, SCREEN_HEIGHT, SCREEN_WIDTH, VideoRegisters};

pub const FRAME_STRIDE: usize = SCREEN_WIDTH * BYTES_PER_PIXEL;
pub const FRAME_BYTES: usize = FRAME_STRIDE * SCREEN_HEIGHT;

const MAX_DEBUG_EVENTS: usize = 512;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct VideoDebugCounters {
    pub frames: u64,
    pub scanlines: u64,
    pub raster_interrupts: u64,
    pub plane_a_lines: u64,
    pub plane_b_lines: u64,
    pub sprite_lines: u64,
    pub sprites_drawn: u64,
    pub register_changes: u64,
    pub last_register_change_line: u8,
}

pub struct VideoChip {
    scanline: [u8; SCREEN_WIDTH],
    sprite_line: [u8; SCREEN_WIDTH],
    frame_buffer: Vec<u8>,
    debug: VideoDebugCounters,
    debug_events: VecDeque<String>,
}

impl Default for VideoChip {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoChip {
    pub fn new() -> Self {
        Self {
            scanline: [0; SCREEN_WIDTH],
            sprite_line: [0; SCREEN_WIDTH],
            frame_buffer: opaque_frame(),
            debug: VideoDebugCounters::default(),
            debug_events: VecDeque::with_capacity(MAX_DEBUG_EVENTS),
        }
    }

    pub fn reset(&mut self) {
        self.scanline.fill(0);
        self.sprite_line.fill(0);
        self.frame_buffer = opaque_frame();
        self.debug = VideoDebugCounters::default();
        self.debug_events.clear();
    }

    /// Renders one frame into `output`, one row every `bytes_per_line` bytes.
    ///
    /// Only the first three bytes of each 4-byte pixel are written. The
    /// interrupt runs before every line is composited.
    ///
    /// # Panics
    ///
    /// Panics if `bytes_per_line` is shorter than a row of pixels or if
    /// `output` cannot hold every row.
    pub fn render_screen<I>(
        &mut self,
        machine: &mut Machine,
        interrupt: &mut I,
        output: &mut [u8],
        bytes_per_line: usize,
    ) where
        I: RasterInterrupt + ?Sized,
    {
        assert!(
            bytes_per_line >= FRAME_STRIDE,
            "bytes_per_line {bytes_per_line} shorter than a {FRAME_STRIDE}-byte row"
        );
        let required = (SCREEN_HEIGHT - 1) * bytes_per_line + FRAME_STRIDE;
        assert!(
            output.len() >= required,
            "output buffer holds {} bytes, need {required}",
            output.len()
        );

        for y in 0..SCREEN_HEIGHT {
            machine.video_registers.raster_line = y as u8;
            let before = machine.video_registers;
            interrupt.raster(machine);
            self.debug.raster_interrupts = self.debug.raster_interrupts.wrapping_add(1);
            self.note_register_change(y, &before, &machine.video_registers);

            self.render_line(machine, y);

            let offset = y * bytes_per_line;
            resolve_scanline(
                &self.scanline,
                &machine.color_registers,
                &machine.overlay.colors,
                &mut output[offset..offset + FRAME_STRIDE],
            );
        }

        self.debug.frames = self.debug.frames.wrapping_add(1);
        debug!(
            frame = self.debug.frames,
            sprites_drawn = self.debug.sprites_drawn,
            "video frame rendered"
        );
    }

    fn render_line(&mut self, machine: &Machine, y: usize) {
        let registers = &machine.video_registers;
        let ram = &machine.video_ram;

        self.scanline.fill(0);
        self.debug.scanlines = self.debug.scanlines.wrapping_add(1);

        if registers.attr.plane_b_enabled() {
            render_plane(
                &ram.characters,
                &ram.plane_b,
                y,
                registers.scroll_bx,
                registers.scroll_by,
                0,
                &mut self.scanline,
            );
            self.debug.plane_b_lines = self.debug.plane_b_lines.wrapping_add(1);
        }

        if registers.attr.plane_a_enabled() {
            render_plane(
                &ram.characters,
                &ram.plane_a,
                y,
                registers.scroll_ax,
                registers.scroll_ay,
                0,
                &mut self.scanline,
            );
            self.debug.plane_a_lines = self.debug.plane_a_lines.wrapping_add(1);
        }

        if registers.attr.sprites_enabled() {
            self.sprite_line.fill(0);
            let drawn = render_sprites(
                &machine.sprite_registers,
                &ram.characters,
                y,
                &mut self.scanline,
                &mut self.sprite_line,
            );
            self.debug.sprite_lines = self.debug.sprite_lines.wrapping_add(1);
            self.debug.sprites_drawn = self.debug.sprites_drawn.wrapping_add(drawn as u64);
        }

        let overlay = &machine.overlay;
        render_plane(
            &overlay.characters,
            &overlay.plane,
            y,
            0,
            0,
            OVERLAY_FLAG,
            &mut self.scanline,
        );
    }

    /// Renders into the internal RGBA frame buffer.
    pub fn run_frame<I>(&mut self, machine: &mut Machine, interrupt: &mut I)
    where
        I: RasterInterrupt + ?Sized,
    {
        let mut frame = std::mem::take(&mut self.frame_buffer);
        self.render_screen(machine, interrupt, &mut frame, FRAME_STRIDE);
        self.frame_buffer = frame;
    }

    pub fn frame_buffer(&self) -> &[u8] {
        &self.frame_buffer
    }

    /// Base64 SHA-1 of the internal frame buffer.
    pub fn frame_sha1(&self) -> String {
        frame_sha1(&self.frame_buffer)
    }

    pub fn debug_counters(&self) -> VideoDebugCounters {
        self.debug
    }

    pub fn debug_recent_events(&self, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }

        self.debug_events
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    fn note_register_change(
        &mut self,
        y: usize,
        before: &VideoRegisters,
        after: &VideoRegisters,
    ) {
        let before = VideoRegisters {
            raster_line: after.raster_line,
            ..*before
        };
        if before == *after {
            return;
        }

        self.debug.register_changes = self.debug.register_changes.wrapping_add(1);
        self.debug.last_register_change_line = y as u8;
        trace!(line = y, "video registers changed by raster interrupt");
        self.push_debug_event(format!(
            "line {y}: attr={:03b} A=({},{}) B=({},{})",
            after.attr.bits(),
            after.scroll_ax,
            after.scroll_ay,
            after.scroll_bx,
            after.scroll_by
        ));
    }

    fn push_debug_event<S: Into<String>>(&mut self, event: S) {
        if self.debug_events.len() >= MAX_DEBUG_EVENTS {
            self.debug_events.pop_front();
        }
        self.debug_events.push_back(event.into());
    }
}

fn opaque_frame() -> Vec<u8> {
    let mut frame = vec![0; FRAME_BYTES];
    for px in frame.chunks_exact_mut(BYTES_PER_PIXEL) {
        px[3] = 0xFF;
    }
    frame
}

pub fn frame_sha1(frame: &[u8]) -> String {
    let digest = Sha1::digest(frame);
    BASE64_STANDARD.encode(digest)
}

/// Binary PPM (P6) of a frame stored with the given row stride.
pub fn encode_ppm(frame: &[u8], bytes_per_line: usize) -> Vec<u8> {
    let mut out = format!("P6\n{SCREEN_WIDTH} {SCREEN_HEIGHT}\n255\n").into_bytes();
    out.reserve(SCREEN_WIDTH * SCREEN_HEIGHT * 3);
    for row in frame.chunks(bytes_per_line).take(SCREEN_HEIGHT) {
        for px in row[..FRAME_STRIDE].chunks_exact(BYTES_PER_PIXEL) {
            out.extend_from_slice(&px[..3]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PlaneId;
    use crate::video::attributes::{CharAttributes, DisplayAttributes};
    use crate::video::character::Character;
    use crate::video::color::pack_color;
    use crate::video::plane::Cell;
    use crate::video::raster::NoInterrupt;
    use crate::video::sprite::Sprite;

    fn striped_machine() -> Machine {
        let mut machine = Machine::new();
        machine.set_character(1, Character::solid(1));
        let mut rows = [[0u8; 8]; 8];
        rows[0][0] = 2;
        machine.set_character(2, Character::from_pixels(rows));
        machine.video_ram.plane_a.fill(Cell::new(1, CharAttributes::default()));
        machine.set_cell(PlaneId::A, 0, 0, Cell::new(2, CharAttributes::default()));
        machine.set_color(1, pack_color(3, 0, 0));
        machine.set_color(2, pack_color(0, 3, 0));
        machine.video_registers.attr = DisplayAttributes::PLANE_A;
        machine
    }

    fn rgb_at(frame: &[u8], stride: usize, x: usize, y: usize) -> [u8; 3] {
        let offset = y * stride + x * BYTES_PER_PIXEL;
        [frame[offset], frame[offset + 1], frame[offset + 2]]
    }

    #[test]
    fn raster_interrupt_change_applies_from_its_line() {
        let mut machine = striped_machine();
        let mut chip = VideoChip::new();
        let mut interrupt = |m: &mut Machine| {
            if m.raster_line() == 10 {
                m.video_registers.scroll_ax = 248;
                m.video_registers.scroll_ay = 256 - 10;
            }
        };

        chip.run_frame(&mut machine, &mut interrupt);
        let frame = chip.frame_buffer();
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 0, 0), [0x11, 0xFF, 0x11]);
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 1, 0), [0x11, 0x11, 0x11]);
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 8, 10), [0x11, 0xFF, 0x11]);
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 0, 10), [0xFF, 0x11, 0x11]);
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 0, 9), [0xFF, 0x11, 0x11]);

        let counters = chip.debug_counters();
        assert_eq!(counters.register_changes, 1);
        assert_eq!(counters.last_register_change_line, 10);
        assert_eq!(chip.debug_recent_events(4).len(), 1);
    }

    #[test]
    fn rendering_twice_is_identical() {
        let mut machine = striped_machine();
        machine.video_registers.attr |= DisplayAttributes::SPRITES;
        let attr = CharAttributes::default().with_size(2);
        machine.set_sprite(0, Sprite::new(30, 30, 1, attr));
        let mut chip = VideoChip::new();

        chip.run_frame(&mut machine, &mut NoInterrupt);
        let first = chip.frame_sha1();
        chip.run_frame(&mut machine, &mut NoInterrupt);
        assert_eq!(chip.frame_sha1(), first);
        assert_eq!(chip.debug_counters().frames, 2);
        assert_eq!(chip.debug_counters().sprites_drawn, 2 * 24);
    }

    #[test]
    fn disabled_layers_resolve_to_color_zero() {
        let mut machine = striped_machine();
        machine.video_registers.attr = DisplayAttributes::empty();
        machine.set_color(0, pack_color(1, 1, 1));
        let mut chip = VideoChip::new();

        chip.run_frame(&mut machine, &mut NoInterrupt);
        assert!(
            chip.frame_buffer()
                .chunks_exact(4)
                .all(|px| px == [0x66, 0x66, 0x66, 0xFF])
        );
        assert_eq!(chip.debug_counters().plane_a_lines, 0);
    }

    #[test]
    fn overlay_covers_planes() {
        let mut machine = striped_machine();
        machine.overlay.characters[33] = Character::solid(1);
        machine.overlay.print(0, 0, "A");
        let mut chip = VideoChip::new();

        chip.run_frame(&mut machine, &mut NoInterrupt);
        let frame = chip.frame_buffer();
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 3, 3), [0xFF, 0xFF, 0xFF]);
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 8, 3), [0xFF, 0x11, 0x11]);
    }

    #[test]
    fn low_priority_overlay_hides_behind_high_priority_cells() {
        let mut machine = striped_machine();
        let high = CharAttributes::default().with_priority(true);
        machine.set_cell(PlaneId::A, 0, 1, Cell::new(1, high));
        machine.overlay.characters[33] = Character::solid(1);
        machine.overlay.text_attr = CharAttributes::default();
        machine.overlay.print(1, 0, "AA");
        let mut chip = VideoChip::new();

        chip.run_frame(&mut machine, &mut NoInterrupt);
        let frame = chip.frame_buffer();
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 11, 3), [0xFF, 0x11, 0x11]);
        assert_eq!(rgb_at(frame, FRAME_STRIDE, 19, 3), [0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn padded_stride_leaves_gaps_untouched() {
        let mut machine = striped_machine();
        let mut chip = VideoChip::new();
        let stride = FRAME_STRIDE + 16;
        let mut output = vec![0xEEu8; (SCREEN_HEIGHT - 1) * stride + FRAME_STRIDE];

        chip.render_screen(&mut machine, &mut NoInterrupt, &mut output, stride);
        assert!(output[FRAME_STRIDE..stride].iter().all(|&b| b == 0xEE));
        assert_eq!(output[3], 0xEE);
        assert_eq!(&output[stride + 32..stride + 35], &[0xFF, 0x11, 0x11]);
        assert_eq!(machine.raster_line(), (SCREEN_HEIGHT - 1) as u8);
    }

    #[test]
    #[should_panic]
    fn short_stride_panics() {
        let mut machine = Machine::new();
        let mut chip = VideoChip::new();
        let mut output = vec![0u8; FRAME_BYTES];
        chip.render_screen(&mut machine, &mut NoInterrupt, &mut output, 100);
    }

    #[test]
    fn ppm_has_header_and_rgb_payload() {
        let chip = VideoChip::new();
        let ppm = encode_ppm(chip.frame_buffer(), FRAME_STRIDE);
        let header = b"P6\n160 128\n255\n";
        assert!(ppm.starts_with(header));
        assert_eq!(ppm.len(), header.len() + SCREEN_WIDTH * SCREEN_HEIGHT * 3);
    }
}
