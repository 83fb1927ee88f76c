//! End-to-end playback tests over hand-assembled CDG streams.

use cdg_replayer::display::{BORDER_COLUMNS, HEIGHT, WIDTH};
use cdg_replayer::{CdgError, CdgPlayer};
use image::Rgb;

const PACKET_SIZE: usize = 24;

fn packet(instruction: u8, data: [u8; 16]) -> [u8; PACKET_SIZE] {
    let mut p = [0u8; PACKET_SIZE];
    p[0] = 0x09;
    p[1] = instruction;
    p[4..20].copy_from_slice(&data);
    p
}

fn memory_preset(color: u8, repeat: u8) -> [u8; PACKET_SIZE] {
    let mut data = [0u8; 16];
    data[0] = color;
    data[1] = repeat;
    packet(1, data)
}

fn tile_normal(color0: u8, color1: u8, row: u8, column: u8, rows: [u8; 12]) -> [u8; PACKET_SIZE] {
    let mut data = [0u8; 16];
    data[0] = color0;
    data[1] = color1;
    data[2] = row;
    data[3] = column;
    data[4..16].copy_from_slice(&rows);
    packet(6, data)
}

fn scroll_copy(h_bits: u8, v_bits: u8) -> [u8; PACKET_SIZE] {
    let mut data = [0u8; 16];
    data[1] = h_bits;
    data[2] = v_bits;
    packet(24, data)
}

fn load_colors_low(colors: [(u8, u8, u8); 8]) -> [u8; PACKET_SIZE] {
    let mut data = [0u8; 16];
    for (i, (r, g, b)) in colors.iter().enumerate() {
        let packed = ((*r as u16 & 0x0F) << 8) | ((*g as u16 & 0x0F) << 4) | (*b as u16 & 0x0F);
        data[i * 2] = (packed >> 6) as u8;
        data[i * 2 + 1] = (packed & 0x3F) as u8;
    }
    packet(30, data)
}

fn filler() -> [u8; PACKET_SIZE] {
    [0u8; PACKET_SIZE]
}

fn stream(packets: &[[u8; PACKET_SIZE]]) -> Vec<u8> {
    packets.iter().flatten().copied().collect()
}

fn processed(packets: &[[u8; PACKET_SIZE]]) -> CdgPlayer {
    let mut player = CdgPlayer::new();
    player.open(&stream(packets)).unwrap();
    player.process().unwrap();
    player
}

#[test]
fn empty_stream_fails_to_open() {
    let mut player = CdgPlayer::new();
    assert!(matches!(player.open(&[]), Err(CdgError::EmptyInput)));
    assert!(matches!(player.process(), Err(CdgError::EmptyInput)));
    assert!(!player.is_open());
}

#[test]
fn single_memory_preset_paints_the_canvas() {
    let player = processed(&[memory_preset(5, 0)]);
    assert_eq!(player.frame_count(), 0);
    assert_eq!(player.last_update_ms(), 0);
    for (x, y) in [(0, 0), (150, 100), (WIDTH - 1, HEIGHT - 1)] {
        assert_eq!(player.display().pixel(x, y), 5);
    }
}

#[test]
fn repeated_memory_presets_fill_once() {
    // One real fill followed by eleven error-correction repeats carrying a
    // different color; the repeats must be suppressed.
    let mut packets = vec![memory_preset(3, 0)];
    packets.extend(std::iter::repeat_n(memory_preset(9, 1), 11));
    let player = processed(&packets);

    assert_eq!(player.frame_count(), 1);
    assert_eq!(player.frames()[0].start_time_ms, 40);
    assert_eq!(player.display().pixel(150, 100), 3);
    // The initial fill counts as an update, so the first frame is not
    // skippable.
    assert!(!player.can_skip(40));
}

#[test]
fn palette_load_recolors_existing_pixels() {
    let colors = [
        (0x0, 0x0, 0x0), // black
        (0xF, 0x0, 0x0), // red
        (0x0, 0xF, 0x0), // green
        (0x0, 0x0, 0xF), // blue
        (0xF, 0xF, 0xF), // white
        (0x8, 0x8, 0x8), // gray
        (0xF, 0xF, 0x0), // yellow
        (0x0, 0xF, 0xF), // cyan
    ];
    let mut packets = vec![memory_preset(1, 0), load_colors_low(colors)];
    packets.extend(std::iter::repeat_n(filler(), 10));
    let player = processed(&packets);

    let palette = player.display().palette();
    assert_eq!(palette[1], Rgb([0xFF, 0x00, 0x00]));
    assert_eq!(palette[4], Rgb([0xFF, 0xFF, 0xFF]));
    assert_eq!(palette[5], Rgb([0x88, 0x88, 0x88]));
    // Upper half untouched by a low load.
    assert_eq!(palette[8], Rgb([0x00, 0x00, 0x00]));

    // The whole canvas is index 1, so the frame renders red.
    let frame = &player.frames()[0];
    assert_eq!(frame.image.get_pixel(0, 0), &Rgb([0xFF, 0x00, 0x00]));
    assert_eq!(frame.image.get_pixel(287, 191), &Rgb([0xFF, 0x00, 0x00]));
}

#[test]
fn tile_block_draws_exactly_its_rectangle() {
    let player = processed(&[tile_normal(0, 1, 0, 0, [0x3F; 12])]);
    for y in 0..12 {
        for x in 0..6 {
            assert_eq!(player.display().pixel(x, y), 1);
        }
    }
    assert_eq!(player.display().pixel(6, 0), 0);
    assert_eq!(player.display().pixel(0, 12), 0);
    assert_eq!(player.display().pixel(150, 100), 0);
}

#[test]
fn scroll_copy_right_wraps_and_sets_offset() {
    let colors = [(0x0, 0x0, 0x0), (0, 0, 0), (0xF, 0xF, 0xF), (0, 0, 0), (0, 0, 0), (0, 0, 0), (0, 0, 0), (0, 0, 0)];

    // Paint the leftmost framebuffer tile column solid, then scroll right
    // with h_offset = 3.
    let mut packets = vec![load_colors_low(colors)];
    for row in 0..18 {
        packets.push(tile_normal(0, 2, row, 0, [0x3F; 12]));
    }
    packets.push(scroll_copy(0x13, 0x00)); // h_cmd=1 (right), h_offset=3
    while packets.len() % 12 != 0 {
        packets.push(filler());
    }
    let player = processed(&packets);

    // Content moved one tile to the right; the displaced right edge
    // wrapped around to the leftmost columns.
    assert_eq!(player.display().pixel(BORDER_COLUMNS, 0), 2);
    assert_eq!(player.display().pixel(BORDER_COLUMNS, HEIGHT - 1), 2);
    assert_eq!(player.display().pixel(2 * BORDER_COLUMNS, 0), 0);
    assert_eq!(player.display().pixel(0, 0), 0);
    assert_eq!(player.display().h_offset(), 3);

    // The next frame samples starting at framebuffer column 6 + 3, which
    // still sits inside the shifted stripe.
    let frame = player.frames().last().unwrap();
    assert_eq!(frame.image.get_pixel(0, 0), &Rgb([0xFF, 0xFF, 0xFF]));
    assert_eq!(frame.image.get_pixel(3, 0), &Rgb([0x00, 0x00, 0x00]));
}

#[test]
fn scroll_copy_round_trip_restores_the_canvas() {
    let mut draw = Vec::new();
    // Scatter some tiles so the canvas is not uniform.
    draw.push(tile_normal(2, 7, 3, 10, [0x15; 12]));
    draw.push(tile_normal(1, 4, 8, 30, [0x2A; 12]));
    let mut packets = draw.clone();
    while packets.len() % 12 != 0 {
        packets.push(filler());
    }
    let reference = processed(&packets);

    let mut packets = draw;
    packets.push(scroll_copy(0x10, 0x00)); // right 6
    packets.push(scroll_copy(0x20, 0x00)); // left 6
    while packets.len() % 12 != 0 {
        packets.push(filler());
    }
    let round_tripped = processed(&packets);

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            assert_eq!(reference.display().pixel(x, y), round_tripped.display().pixel(x, y));
        }
    }
}

#[test]
fn idle_windows_are_skippable() {
    let mut packets = vec![memory_preset(5, 0)];
    packets.extend(std::iter::repeat_n(filler(), 71));
    let player = processed(&packets);

    assert_eq!(player.frame_count(), 6);
    assert!(!player.can_skip(40)); // adjacent to the updating window
    assert!(player.can_skip(80));
    assert!(player.can_skip(160));
    assert!(!player.can_skip(240)); // last frame has no successor
}

#[test]
fn reloading_identical_palette_stays_skippable() {
    let colors = [(0xF, 0x0, 0x0), (0, 0, 0), (0, 0, 0), (0, 0, 0), (0, 0, 0), (0, 0, 0), (0, 0, 0), (0, 0, 0)];
    let mut packets = vec![load_colors_low(colors)];
    packets.extend(std::iter::repeat_n(filler(), 11));
    // Second window reloads the exact same palette: a no-op.
    packets.push(load_colors_low(colors));
    packets.extend(std::iter::repeat_n(filler(), 35));
    let player = processed(&packets);

    assert_eq!(player.frame_count(), 4);
    // Windows 1..=3 saw no observable change.
    assert!(player.can_skip(80));
}

#[test]
fn frames_stay_valid_for_the_player_lifetime() {
    let player = processed(&[filler(); 36]);
    let first = player.frame_at(0).unwrap();
    let again = player.frame_at(0).unwrap();
    assert_eq!(first.start_time_ms, again.start_time_ms);
    assert_eq!(player.frames().len(), 3);
}
