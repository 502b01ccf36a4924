use nxvideo::scene::Scene;
use nxvideo::video::attributes::{AttributeExpr, CharAttributes, DisplayAttributes};
use nxvideo::video::character::Character;
use nxvideo::video::chip::{FRAME_STRIDE, VideoChip};
use nxvideo::video::color::pack_color;
use nxvideo::video::plane::Cell;
use nxvideo::video::raster::NoInterrupt;
use nxvideo::video::sprite::Sprite;
use nxvideo::video::{Machine, PlaneId};

fn pixel(frame: &[u8], x: usize, y: usize) -> [u8; 3] {
    let offset = y * FRAME_STRIDE + x * 4;
    [frame[offset], frame[offset + 1], frame[offset + 2]]
}

fn layered_machine() -> Machine {
    let mut machine = Machine::new();
    machine.set_character(1, Character::solid(1));
    machine.set_character(2, Character::solid(2));
    machine.set_character(3, Character::solid(3));
    machine.set_color(1, pack_color(3, 0, 0));
    machine.set_color(4 + 2, pack_color(0, 3, 0));
    machine.set_color(8 + 3, pack_color(0, 0, 3));
    machine.video_registers.attr = DisplayAttributes::all();
    machine
}

#[test]
fn plane_a_draws_over_plane_b_on_equal_priority() {
    let mut machine = layered_machine();
    machine
        .video_ram
        .plane_b
        .fill(Cell::new(1, CharAttributes::default()));
    let green = CharAttributes::default().with_palette(1);
    machine.set_cell(PlaneId::A, 0, 0, Cell::new(2, green));

    let mut chip = VideoChip::new();
    chip.run_frame(&mut machine, &mut NoInterrupt);
    assert_eq!(pixel(chip.frame_buffer(), 0, 0), [0x11, 0xFF, 0x11]);
    assert_eq!(pixel(chip.frame_buffer(), 8, 0), [0xFF, 0x11, 0x11]);
}

#[test]
fn priority_background_hides_sprite() {
    let mut machine = layered_machine();
    machine.set_cell(
        PlaneId::B,
        2,
        2,
        Cell::new(1, CharAttributes::default().with_priority(true)),
    );
    let attr = CharAttributes::default().with_palette(2);
    machine.set_sprite(0, Sprite::new(16, 16, 3, attr));
    machine.set_sprite(1, Sprite::new(24, 16, 3, attr));

    let mut chip = VideoChip::new();
    chip.run_frame(&mut machine, &mut NoInterrupt);
    assert_eq!(pixel(chip.frame_buffer(), 17, 17), [0xFF, 0x11, 0x11]);
    assert_eq!(pixel(chip.frame_buffer(), 25, 17), [0x11, 0x11, 0xFF]);
}

#[test]
fn sprite_at_origin_stays_hidden_until_moved() {
    let mut machine = layered_machine();
    let blue = CharAttributes::default().with_palette(2);
    machine.set_sprite(0, Sprite::new(0, 0, 3, blue));

    let mut chip = VideoChip::new();
    chip.run_frame(&mut machine, &mut NoInterrupt);
    assert_eq!(pixel(chip.frame_buffer(), 0, 0), [0x11, 0x11, 0x11]);
    assert_eq!(chip.debug_counters().sprites_drawn, 0);

    machine.sprite_registers.sprites[0].y = 1;
    chip.run_frame(&mut machine, &mut NoInterrupt);
    assert_eq!(pixel(chip.frame_buffer(), 0, 1), [0x11, 0x11, 0xFF]);
}

#[test]
fn scroll_change_at_line_ten_splits_the_frame() {
    let mut machine = layered_machine();
    machine.video_registers.attr = DisplayAttributes::PLANE_A;
    for row in 0..32 {
        machine.set_cell(PlaneId::A, row, 0, Cell::new(1, CharAttributes::default()));
    }

    let mut chip = VideoChip::new();
    let mut interrupt = |m: &mut Machine| {
        if m.raster_line() == 10 {
            m.video_registers.scroll_ax = 8;
        }
    };
    chip.run_frame(&mut machine, &mut interrupt);

    let frame = chip.frame_buffer();
    for y in 0..10 {
        assert_eq!(pixel(frame, 0, y), [0xFF, 0x11, 0x11], "line {y}");
    }
    for y in 10..128 {
        assert_eq!(pixel(frame, 0, y), [0x11, 0x11, 0x11], "line {y}");
        assert_eq!(pixel(frame, 159, y), [0x11, 0x11, 0x11], "line {y}");
    }
}

#[test]
fn sparse_attribute_write_through_machine() {
    let mut machine = layered_machine();
    machine.video_registers.attr = DisplayAttributes::SPRITES | DisplayAttributes::PLANE_B;

    machine
        .set_display_attributes(&AttributeExpr::parse("(,1,)").unwrap())
        .unwrap();
    assert_eq!(machine.video_registers.attr, DisplayAttributes::all());

    let err = machine
        .set_display_attributes(&AttributeExpr::parse("(0,0,7)").unwrap())
        .unwrap_err();
    assert!(err.to_string().starts_with("invalid operand"));
    assert_eq!(machine.video_registers.attr, DisplayAttributes::all());
}

#[test]
fn scene_file_renders_through_its_raster_script() {
    let json = r#"{
        "display": 2,
        "colors": [0, 48],
        "characters": [{ "index": 1, "data": "//////////8AAAAAAAAAAA==" }],
        "plane_a": { "cells": [{ "row": 0, "column": 0, "character": 1 }] },
        "raster": [{ "line": 64, "display": "(,0,)" }]
    }"#;
    let (mut machine, mut script) = Scene::from_json(json).unwrap().build().unwrap();

    let mut chip = VideoChip::new();
    chip.run_frame(&mut machine, &mut script);
    assert_eq!(pixel(chip.frame_buffer(), 0, 0), [0xFF, 0x11, 0x11]);
    assert!(!machine.video_registers.attr.plane_a_enabled());
    assert_eq!(chip.debug_counters().plane_a_lines, 64);

    let first = chip.frame_sha1();
    chip.run_frame(&mut machine, &mut script);
    assert_ne!(chip.frame_sha1(), first);
    assert_eq!(pixel(chip.frame_buffer(), 0, 0), [0x11, 0x11, 0x11]);
}
