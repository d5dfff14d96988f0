mod common;

use std::collections::HashSet;

use common::{rom, ScriptCpu};
use tracing_subscriber::fmt;
use wasmzx::{
    renderer::{deinterlace, display_row, PALETTE},
    Config, CoreError, Machine, MachineBuilder, Renderer,
};

#[cfg(test)]
#[ctor::ctor]
fn init() {
    let fmt_subscriber = fmt::Subscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(fmt_subscriber)
        .expect("Unable to set global tracing subscriber");
}

const ATTRIBUTES: u16 = 0x5800;

fn machine() -> Machine<ScriptCpu> {
    MachineBuilder::new()
        .rom(&rom())
        .build(ScriptCpu::default())
        .expect("ROM should load")
}

fn pixel(machine: &Machine<ScriptCpu>, x: usize, y: usize) -> [u8; 4] {
    let offset = 4 * (y * machine.frame_width() + x);
    machine.frame_buffer()[offset..offset + 4]
        .try_into()
        .unwrap()
}

fn colors(buffer: &[u8]) -> HashSet<[u8; 4]> {
    buffer
        .chunks_exact(4)
        .map(|p| p.try_into().unwrap())
        .collect()
}

#[test]
fn test_frame_shows_screen_memory() {
    let mut machine = machine();
    for offset in 0..768 {
        // blue ink on yellow paper
        machine
            .bus
            .memory
            .write_byte(ATTRIBUTES + offset, 0x01 | (0x06 << 3));
    }
    // top-left pixel of the second character row
    machine.bus.memory.write_byte(0x4020, 0x80);

    machine.tick(20.0).unwrap();

    assert_eq!(pixel(&machine, 32, 24), PALETTE[6]);
    assert_eq!(pixel(&machine, 32, 24 + 8), PALETTE[1]);
    assert_eq!(pixel(&machine, 33, 24 + 8), PALETTE[6]);
    assert_eq!(pixel(&machine, 0, 0), PALETTE[7]);
    assert_eq!(colors(machine.frame_buffer()).len(), 3);
}

#[test]
fn test_flash_cells_blink() {
    let mut machine = machine();
    // flashing red ink on black paper, cell (0, 0)
    machine.bus.memory.write_byte(ATTRIBUTES, 0x80 | 0x02);
    // same colours without FLASH, cell (1, 0)
    machine.bus.memory.write_byte(ATTRIBUTES + 1, 0x02);

    machine.tick(20.0).unwrap();
    assert_eq!(pixel(&machine, 32, 24), PALETTE[0]);

    for _ in 0..15 {
        machine.tick(20.0).unwrap();
    }
    assert!(machine.flash_state());
    assert_eq!(pixel(&machine, 32, 24), PALETTE[2]);
    assert_eq!(pixel(&machine, 40, 24), PALETTE[0]);
}

#[test]
fn test_bright_attribute() {
    let mut renderer = Renderer::new(&Config::default());
    let mut screen = vec![0u8; 6912];
    screen[6144..].fill(0x40 | (0x04 << 3)); // bright green paper

    renderer.draw(&screen, 4, false).unwrap();
    let found = colors(&renderer.screen_buffer);
    assert_eq!(found.len(), 2);
    assert!(found.contains(&[0, 255, 0, 255]));
    assert!(found.contains(&[0, 192, 0, 255]));
}

#[test]
fn test_border_size_comes_from_config() {
    let config = Config {
        x_border: 8,
        y_border: 4,
        ..Default::default()
    };
    let renderer = Renderer::new(&config);
    assert_eq!(renderer.width(), 272);
    assert_eq!(renderer.height(), 200);
    assert_eq!(renderer.width(), config.frame_width());
    assert_eq!(renderer.height(), config.frame_height());
}

#[test]
fn test_deinterlace_moves_rows() {
    let mut screen = vec![0u8; 6912];
    for row in 0..192 {
        screen[row * 32] = row as u8;
    }
    let linear = deinterlace(&screen).unwrap();
    for row in 0..192 {
        assert_eq!(linear[display_row(row) * 32], row as u8);
    }
    // second third starts at memory row 64
    assert_eq!(linear[64 * 32], 64);
    assert_eq!(linear[65 * 32], 72);
}

#[test]
fn test_short_screen_is_rejected() {
    assert_eq!(
        deinterlace(&[0; 6000]),
        Err(CoreError::MalformedScreenBuffer {
            expected: 6912,
            actual: 6000
        })
    );
}
