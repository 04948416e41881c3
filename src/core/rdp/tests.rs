// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 rdpx developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Display-list level tests
//!
//! These drive the whole pipeline through the command processor the way
//! a host would: words into shared memory, start/end registers, process.

use proptest::prelude::*;

use crate::core::memory::RdpMemory;
use crate::core::rdp::render::combine::{alpha_combiner_equation, color_combiner_equation};
use crate::core::rdp::{Rdp, RdpConfig};
use crate::RdpError;

/// Framebuffer base used by every test list
const FB_BASE: u32 = 0x4000;

/// Texture image base
const TEX_BASE: u32 = 0x8000;

/// Command list base
const CMD_BASE: u32 = 0x100;

fn setup() -> (Rdp, RdpMemory) {
    let _ = env_logger::builder().is_test(true).try_init();
    (Rdp::new(), RdpMemory::new(0x10000).unwrap())
}

/// Write a command list into memory and run it to completion
fn run(rdp: &mut Rdp, mem: &RdpMemory, words: &[u32]) {
    for (i, w) in words.iter().enumerate() {
        mem.write_u32(CMD_BASE + (i as u32) * 4, *w);
    }
    rdp.set_start(CMD_BASE);
    rdp.set_end(CMD_BASE + (words.len() as u32) * 4);
    rdp.process_command_list(mem).unwrap();
}

/// 16-bit framebuffer pixel at (x, y) for a 16-pixel-wide image
fn fb_pixel(mem: &RdpMemory, x: u32, y: u32) -> u16 {
    mem.read_u16_idx((FB_BASE >> 1) + y * 16 + x)
}

/// Stored coverage of a 16-bit pixel: top bit in the word, low two hidden
fn fb_coverage(mem: &RdpMemory, x: u32, y: u32) -> u32 {
    let idx = (FB_BASE >> 1) + y * 16 + x;
    (((mem.read_u16_idx(idx) & 1) as u32) << 2) | mem.hidden_read(idx) as u32
}

/// Set_Color_Image: RGBA, 16-bit, 16 pixels wide, at FB_BASE
fn set_color_image_words() -> [u32; 2] {
    [(0x3f << 24) | (0 << 21) | (2 << 19) | 15, FB_BASE]
}

/// Set_Scissor covering (0,0)-(xl, yl)
fn set_scissor_words(xl: u32, yl: u32) -> [u32; 2] {
    [0x2d00_0000, ((xl << 2) << 12) | (yl << 2)]
}

/// Set_Other_Modes for fill mode, dithering off
fn fill_mode_words() -> [u32; 2] {
    [(0x2f << 24) | (3 << 20) | (3 << 6) | (3 << 4), 0]
}

#[test]
fn test_flat_fill_rectangle_scenario() {
    let (mut rdp, mem) = setup();
    let mut list = Vec::new();
    list.extend(set_color_image_words());
    list.extend(set_scissor_words(4, 4));
    list.extend(fill_mode_words());
    list.extend([0x3700_0000, 0xFFFF_FFFF]); // Set_Fill_Color, opaque white
    // Fill_Rectangle (0,0)-(8,8); the scissor trims it to 4x4
    list.extend([(0x36 << 24) | ((8 << 2) << 12) | (8 << 2), 0]);
    list.extend([0x2900_0000, 0]); // Sync_Full
    run(&mut rdp, &mem, &list);

    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(fb_pixel(&mem, x, y), 0xFFFF, "pixel ({x},{y})");
            assert_eq!(fb_coverage(&mem, x, y), 7, "coverage ({x},{y})");
        }
    }
    // Nothing outside the scissor
    for i in 0..16 {
        assert_eq!(fb_pixel(&mem, 5, i % 4), 0);
        assert_eq!(fb_pixel(&mem, i, 5), 0);
    }
    assert!(rdp.take_full_sync());
    assert!(!rdp.take_full_sync()); // observed exactly once
}

#[test]
fn test_degenerate_triangle_writes_nothing() {
    let (mut rdp, mem) = setup();
    let mut list = Vec::new();
    list.extend(set_color_image_words());
    list.extend(set_scissor_words(16, 16));
    // 1-cycle mode
    list.extend([(0x2f << 24) | (3 << 6) | (3 << 4), 0]);
    // Collinear triangle: yh == ym == yl, zero signed area
    let y = 10u32 << 2;
    list.extend([
        (0x08 << 24) | y,
        (y << 16) | y,
        4 << 16,
        0,
        4 << 16,
        0,
        4 << 16,
        0,
    ]);
    list.extend([0x2900_0000, 0]);
    run(&mut rdp, &mem, &list);

    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(fb_pixel(&mem, x, y), 0, "pixel ({x},{y})");
        }
    }
    assert!(rdp.take_full_sync());
}

/// Shade-only 1-cycle triangle covering an 8-wide, `rows`-tall region
fn shaded_rect_triangle_words(rows: u32) -> Vec<u32> {
    let mut list = Vec::new();
    // Combiner: RGB = shade via the D operand, alpha = shade alpha
    list.extend([
        (0x3c << 24) | (8 << 5) | 16,
        (8 << 28) | (7 << 21) | (7 << 18) | (4 << 6) | (7 << 3) | 4,
    ]);
    // Shaded triangle, flipped, spanning y 0..rows, x 0..8
    let yl = rows << 2;
    list.extend([
        (0x0c << 24) | (0x80 << 16) | yl,
        (yl << 16), // ym = yl, yh = 0
        8 << 16,    // xl
        0,
        0, // xh
        0,
        8 << 16, // xm
        0,
    ]);
    // Shade block: r = 0xff, g = 0, b = 0xff, a = 0xff, all deltas zero
    list.extend([0x00ff_0000, 0x00ff_00ff]);
    list.extend([0u32; 14]);
    list
}

#[test]
fn test_shaded_triangle_renders_and_respects_scissor() {
    let (mut rdp, mem) = setup();
    let mut list = Vec::new();
    list.extend(set_color_image_words());
    list.extend(set_scissor_words(16, 16));
    list.extend([(0x2f << 24) | (3 << 6) | (3 << 4), 0]);
    list.extend(shaded_rect_triangle_words(8));
    list.extend([0x2900_0000, 0]);
    run(&mut rdp, &mem, &list);

    // Magenta at full shade: r=31, g=0, b=31, coverage top bit set
    let expected = (31u16 << 11) | (31 << 1) | 1;
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(fb_pixel(&mem, x, y), expected, "pixel ({x},{y})");
            assert!(fb_coverage(&mem, x, y) <= 7);
        }
    }
    // Right of the triangle and below it: untouched
    for y in 0..16 {
        assert_eq!(fb_pixel(&mem, 12, y), 0);
    }
    for x in 0..16 {
        assert_eq!(fb_pixel(&mem, x, 10), 0);
    }
}

#[test]
fn test_shaded_triangle_clipped_by_scissor() {
    let (mut rdp, mem) = setup();
    let mut list = Vec::new();
    list.extend(set_color_image_words());
    list.extend(set_scissor_words(3, 2));
    list.extend([(0x2f << 24) | (3 << 6) | (3 << 4), 0]);
    list.extend(shaded_rect_triangle_words(8));
    run(&mut rdp, &mem, &list);

    for y in 0..16 {
        for x in 0..16 {
            let inside = x < 3 && y < 2;
            if inside {
                assert_ne!(fb_pixel(&mem, x, y), 0, "pixel ({x},{y}) should be set");
            } else {
                assert_eq!(fb_pixel(&mem, x, y), 0, "pixel ({x},{y}) must be clipped");
            }
        }
    }
}

#[test]
fn test_copy_mode_blit() {
    let (mut rdp, mem) = setup();

    // An 8x1 16-bit texture: ascending opaque gray ramp
    for i in 0..8u32 {
        let five = (i * 4) as u16 & 0x1f;
        mem.write_u16_idx((TEX_BASE >> 1) + i, (five << 11) | (five << 6) | (five << 1) | 1);
    }

    let mut list = Vec::new();
    list.extend(set_color_image_words());
    list.extend(set_scissor_words(16, 16));
    // Copy cycle type
    list.extend([(0x2f << 24) | (2 << 20) | (3 << 6) | (3 << 4), 0]);
    // Texture image: RGBA 16-bit, 8 wide, at TEX_BASE
    list.extend([(0x3d << 24) | (0 << 21) | (2 << 19) | 7, TEX_BASE]);
    // Tile 0: RGBA 16-bit, line = 2 qwords, tmem 0, no masks
    list.extend([(0x35 << 24) | (0 << 21) | (2 << 19) | (2 << 9), 0]);
    // Load_Tile 0: s 0..7, t 0..0
    list.extend([(0x34 << 24), (7 << 14) | 0]);
    // Texture_Rectangle over x 0..8, y 0..1, dsdx = 4.0 (copy), dtdy = 1.0
    list.extend([
        (0x24 << 24) | ((8 << 2) << 12) | (1 << 2),
        0,
        0,
        (4 << 10) << 16 | (1 << 10),
    ]);
    run(&mut rdp, &mem, &list);

    for x in 0..8u32 {
        let five = (x * 4) as u16 & 0x1f;
        let expected = (five << 11) | (five << 6) | (five << 1) | 1;
        assert_eq!(fb_pixel(&mem, x, 0), expected, "pixel ({x},0)");
    }
    assert_eq!(fb_pixel(&mem, 8, 0), 0);
}

#[test]
fn test_starved_command_defers_until_data_arrives() {
    let (mut rdp, mem) = setup();
    // First word of Set_Scissor only
    mem.write_u32(CMD_BASE, 0x2d00_0000);
    rdp.set_start(CMD_BASE);
    rdp.set_end(CMD_BASE + 4);
    rdp.process_command_list(&mem).unwrap();
    assert_eq!(rdp.scissor.xl, 0); // not executed yet

    // Second word arrives
    mem.write_u32(CMD_BASE + 4, ((32 << 2) << 12) | (24 << 2));
    rdp.set_end(CMD_BASE + 8);
    rdp.process_command_list(&mem).unwrap();
    assert_eq!(rdp.scissor.xl, 32);
    assert_eq!(rdp.scissor.yl, 24);
}

#[test]
fn test_unknown_opcode_is_skipped() {
    let (mut rdp, mem) = setup();
    let list = [
        0x0100_0000, // unused opcode
        0,
        0x2d00_0000, // Set_Scissor still runs afterwards
        ((10 << 2) << 12) | (12 << 2),
    ];
    run(&mut rdp, &mem, &list);
    assert_eq!(rdp.scissor.xl, 10);
    assert_eq!(rdp.scissor.yl, 12);
}

#[test]
fn test_state_commands_idempotent() {
    let (mut rdp, mem) = setup();
    let om = [(0x2f << 24) | 0x0023_4567u32, 0x89ab_cdef];
    let tile = [(0x35 << 24) | 0x0014_2233u32, 0x0312_3456];
    let mut list = Vec::new();
    list.extend(om);
    list.extend(tile);
    run(&mut rdp, &mem, &list);
    let modes_once = rdp.other_modes;
    let tile_once = rdp.tiles[3];

    let mut list = Vec::new();
    list.extend(om);
    list.extend(tile);
    run(&mut rdp, &mem, &list);
    assert_eq!(rdp.other_modes, modes_once);
    assert_eq!(format!("{:?}", rdp.tiles[3]), format!("{tile_once:?}"));
}

#[test]
fn test_span_pool_exhaustion_is_fatal() {
    let mem = RdpMemory::new(0x10000).unwrap();
    let mut rdp = Rdp::with_config(RdpConfig {
        workers: 1,
        span_capacity: 4,
    })
    .unwrap();

    let mut list = Vec::new();
    list.extend(set_color_image_words());
    list.extend(set_scissor_words(16, 16));
    list.extend(fill_mode_words());
    list.extend([0x3700_0000, 0xFFFF_FFFF]);
    // 8 scanlines won't fit in a 4-span arena
    list.extend([(0x36 << 24) | ((8 << 2) << 12) | (8 << 2), 0]);
    for (i, w) in list.iter().enumerate() {
        mem.write_u32(CMD_BASE + (i as u32) * 4, *w);
    }
    rdp.set_start(CMD_BASE);
    rdp.set_end(CMD_BASE + (list.len() as u32) * 4);
    let err = rdp.process_command_list(&mem).unwrap_err();
    assert!(matches!(err, RdpError::SpanPoolExhausted { .. }));
}

#[test]
fn test_parallel_and_serial_render_identically() {
    let render = |workers: usize| {
        let mem = RdpMemory::new(0x10000).unwrap();
        let mut rdp = Rdp::with_config(RdpConfig {
            workers,
            span_capacity: 2048,
        })
        .unwrap();
        let mut list = Vec::new();
        list.extend(set_color_image_words());
        list.extend(set_scissor_words(16, 16));
        list.extend([(0x2f << 24) | (3 << 6) | (3 << 4), 0]);
        list.extend(shaded_rect_triangle_words(32));
        run(&mut rdp, &mem, &list);
        let mut out = Vec::new();
        for y in 0..16 {
            for x in 0..16 {
                out.push(fb_pixel(&mem, x, y));
            }
        }
        out
    };
    assert_eq!(render(1), render(4));
}

proptest! {
    /// Combiner outputs always land in [0, 255] for any 9-bit operands
    #[test]
    fn prop_combiner_output_in_range(
        a in 0i32..0x200,
        b in 0i32..0x200,
        c in 0i32..0x200,
        d in 0i32..0x200,
    ) {
        let tables = crate::core::rdp::tables::Tables::new();
        let rgb = color_combiner_equation(a, b, c, d, &tables);
        let alpha = alpha_combiner_equation(a, b, c, d, &tables);
        prop_assert!((0..=255).contains(&rgb));
        prop_assert!((0..=255).contains(&alpha));
    }
}
