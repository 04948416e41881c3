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

//! Blender
//!
//! Combines the combiner output, the framebuffer's memory color, and the
//! current coverage into the stored pixel. Per-pixel blending is gated by
//! the depth test's farther/overlap verdict and the antialiasing enable,
//! or forced unconditionally by `force_blend`. When the second blend
//! input is the memory color ("special" select), the factor shifts derived
//! from the dz comparison kick in, which is how edge antialiasing resolves
//! against previously drawn geometry.
//!
//! Returning `None` means the pixel is rejected: alpha compare failed or
//! no coverage survived. Rejection is control flow here, never an error.

use crate::core::rdp::color::Color;
use crate::core::rdp::render::{RenderObject, SpanAux};
use crate::core::rdp::state::OtherModes;
use crate::core::rdp::tables::{NoiseLfsr, BAYER_MATRIX, MAGIC_MATRIX};

/// First blend input (the "a" color mux)
fn select_rgb_input(cycle: usize, code: u32, aux: &SpanAux, object: &RenderObject) -> Color {
    match code & 3 {
        0 => {
            if cycle == 0 {
                aux.pixel_color
            } else {
                aux.blended_color
            }
        }
        1 => aux.memory_color,
        2 => object.blend_color,
        _ => object.fog_color,
    }
}

/// First blend factor (the "1b" alpha mux)
fn select_factor_1b(code: u32, aux: &SpanAux, object: &RenderObject) -> i32 {
    match code & 3 {
        0 => aux.pixel_color.a,
        1 => object.fog_color.a,
        2 => aux.shade.a,
        _ => 0,
    }
}

/// Second blend factor (the "2b" alpha mux)
fn select_factor_2b(code: u32, aux: &SpanAux) -> i32 {
    match code & 3 {
        0 => aux.inv_pixel_color_alpha,
        1 => aux.memory_color.a,
        2 => 0xff,
        _ => 0,
    }
}

/// Mux codes for one blender cycle out of the mode word
fn cycle_codes(cycle: usize, modes: &OtherModes) -> (u32, u32, u32, u32) {
    if cycle == 0 {
        (
            modes.blend_m1a_0,
            modes.blend_m1b_0,
            modes.blend_m2a_0,
            modes.blend_m2b_0,
        )
    } else {
        (
            modes.blend_m1a_1,
            modes.blend_m1b_1,
            modes.blend_m2a_1,
            modes.blend_m2b_1,
        )
    }
}

/// The blend arithmetic for one cycle
///
/// `special` is set when the second input reads the memory color; it
/// switches the factors onto the dz-derived shifts so nearly-coplanar
/// edges resolve smoothly. Without `force_blend` the sum is normalized by
/// the actual factor total (the hardware runs this through a small divide
/// ROM; exact integer division matches it on every factor pair in use).
fn blend_pipe(cycle: usize, special: bool, aux: &SpanAux, object: &RenderObject) -> Color {
    let (m1a, m1b, m2a, m2b) = cycle_codes(cycle, &object.other_modes);

    let mut blend1a = select_factor_1b(m1b, aux, object) >> 3;
    let mut blend2a = select_factor_2b(m2b, aux) >> 3;
    if special {
        blend1a = (blend1a >> aux.shift_a) & 0x3c;
        blend2a = ((blend2a >> aux.shift_b) | 3) & 0x3f;
    }
    let mulb = blend2a + 1;

    let c1 = select_rgb_input(cycle, m1a, aux, object);
    let c2 = select_rgb_input(cycle, m2a, aux, object);

    let r = c1.r * blend1a + c2.r * mulb;
    let g = c1.g * blend1a + c2.g * mulb;
    let b = c1.b * blend1a + c2.b * mulb;

    if object.other_modes.force_blend {
        Color::new(
            (r >> object.other_modes.blend_shift) & 0xff,
            (g >> object.other_modes.blend_shift) & 0xff,
            (b >> object.other_modes.blend_shift) & 0xff,
            0,
        )
    } else {
        let sum = blend1a + mulb;
        if sum != 0 {
            Color::new(
                (r / sum).min(0xff),
                (g / sum).min(0xff),
                (b / sum).min(0xff),
                0,
            )
        } else {
            Color::new(r & 0xff, g & 0xff, b & 0xff, 0)
        }
    }
}

/// Alpha-compare rejection
fn alpha_reject(aux: &mut SpanAux, object: &RenderObject) -> bool {
    match object.other_modes.alpha_dither_mode {
        0 | 1 => false,
        2 => aux.pixel_color.a < object.blend_color.a,
        _ => aux.pixel_color.a < (aux.noise.next() & 0xff) as i32,
    }
}

/// Reject a pixel on alpha or on empty coverage
fn test_for_reject(aux: &mut SpanAux, object: &RenderObject) -> bool {
    if alpha_reject(aux, object) {
        return true;
    }
    if object.other_modes.antialias_en {
        aux.current_pix_cvg == 0
    } else {
        aux.current_cvg_bit == 0
    }
}

/// Apply the RGB dither offset in place
fn rgb_dither(color: &mut Color, dith: i32) {
    for lane in [&mut color.r, &mut color.g, &mut color.b] {
        if (*lane & 7) > dith {
            *lane = ((*lane & !7) + 8).min(0xff);
        }
    }
}

/// Dither offsets for one pixel position
///
/// Returns `(color_dither, alpha_dither)` per the combined RGB/alpha
/// dither selectors. Noise selections pull from the span's LFSR.
pub fn dither_values(
    x: i32,
    y: i32,
    object: &RenderObject,
    noise: &mut NoiseLfsr,
) -> (i32, i32) {
    let index = (((y & 3) << 2) | (x & 3)) as usize;
    let magic = MAGIC_MATRIX[index] as i32;
    let bayer = BAYER_MATRIX[index] as i32;
    match (object.other_modes.rgb_dither_sel << 2) | object.other_modes.alpha_dither_sel {
        0 => (magic, magic),
        1 => (magic, !magic & 7),
        2 => (magic, (noise.next() & 7) as i32),
        3 => (magic, 0),
        4 => (bayer, bayer),
        5 => (bayer, !bayer & 7),
        6 => (bayer, (noise.next() & 7) as i32),
        7 => (bayer, 0),
        8 => ((noise.next() & 7) as i32, magic),
        9 => ((noise.next() & 7) as i32, !magic & 7),
        10 => {
            let c = (noise.next() & 7) as i32;
            (c, (c + 17) & 7)
        }
        11 => ((noise.next() & 7) as i32, 0),
        12 => (0, bayer),
        13 => (0, !bayer & 7),
        14 => (0, (noise.next() & 7) as i32),
        _ => (0, 0),
    }
}

/// One-cycle blend for a single pixel
///
/// Returns the color to store, or `None` to reject the pixel.
pub fn blend_1cycle(
    aux: &mut SpanAux,
    object: &RenderObject,
    adith: i32,
    cdith: i32,
    partialreject: bool,
    sel0: bool,
) -> Option<Color> {
    aux.inv_pixel_color_alpha =
        0xff - select_factor_1b(object.other_modes.blend_m1b_0, aux, object);

    // Alpha dither raises the pixel alpha before the compare
    if object.other_modes.alpha_dither_sel != 3 {
        aux.pixel_color.a = (aux.pixel_color.a + adith).min(0xff);
    }

    if test_for_reject(aux, object) {
        return None;
    }

    let mut out = if aux.blend_enable {
        if partialreject && aux.pixel_color.a >= 0xff {
            aux.pixel_color
        } else {
            blend_pipe(0, sel0, aux, object)
        }
    } else {
        select_rgb_input(0, object.other_modes.blend_m1a_0, aux, object)
    };

    if object.other_modes.rgb_dither_sel < 3 {
        rgb_dither(&mut out, cdith);
    }
    Some(out)
}

/// Two-cycle blend: cycle 0 feeds the chained "blended color" operand of
/// cycle 1
pub fn blend_2cycle(
    aux: &mut SpanAux,
    object: &RenderObject,
    adith: i32,
    cdith: i32,
    partialreject: bool,
    sel0: bool,
    sel1: bool,
) -> Option<Color> {
    aux.inv_pixel_color_alpha =
        0xff - select_factor_1b(object.other_modes.blend_m1b_0, aux, object);

    if object.other_modes.alpha_dither_sel != 3 {
        aux.pixel_color.a = (aux.pixel_color.a + adith).min(0xff);
    }

    if test_for_reject(aux, object) {
        return None;
    }

    let mut stage0 = blend_pipe(0, sel0, aux, object);
    stage0.a = aux.pixel_color.a;
    aux.blended_color = stage0;

    aux.inv_pixel_color_alpha =
        0xff - select_factor_1b(object.other_modes.blend_m1b_1, aux, object);

    let mut out = if aux.blend_enable {
        if partialreject && aux.pixel_color.a >= 0xff {
            aux.pixel_color
        } else {
            blend_pipe(1, sel1, aux, object)
        }
    } else {
        select_rgb_input(1, object.other_modes.blend_m1a_1, aux, object)
    };

    if object.other_modes.rgb_dither_sel < 3 {
        rgb_dither(&mut out, cdith);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rdp::Rdp;

    fn test_object(modes_w2: u32) -> RenderObject {
        let mut rdp = Rdp::new();
        rdp.cmd_set_other_modes(0, modes_w2);
        crate::core::rdp::render::RenderObject::snapshot(&rdp, 0, false, false)
    }

    #[test]
    fn test_force_blend_average() {
        // m1a=pixel(0) m1b=pixel alpha(0) m2a=memory(1) m2b=inv alpha(0),
        // force_blend on: classic 50/50 at alpha 0x80
        let w2 = (0u32 << 30) | (0 << 26) | (1 << 22) | (0 << 18) | (1 << 14);
        let object = test_object(w2);
        let mut aux = SpanAux::default();
        aux.pixel_color = Color::new(0xff, 0, 0, 0x80);
        aux.memory_color = Color::new(0, 0, 0xff, 0);
        aux.inv_pixel_color_alpha = 0xff - 0x80;
        let out = blend_pipe(0, false, &aux, &object);
        // (0xff*16 + 0*16)>>5 = 127ish on red, symmetric on blue
        assert!(out.r > 0x70 && out.r < 0x90, "r={}", out.r);
        assert!(out.b > 0x70 && out.b < 0x90, "b={}", out.b);
        assert_eq!(out.g, 0);
    }

    #[test]
    fn test_normalized_blend_identity() {
        // Without force_blend the factor sum divides back out, so
        // full-alpha blending returns the pixel color untouched
        let w2 = (0u32 << 30) | (0 << 26) | (1 << 22) | (0 << 18);
        let object = test_object(w2);
        let mut aux = SpanAux::default();
        aux.pixel_color = Color::new(0xc0, 0x40, 0x20, 0xff);
        aux.memory_color = Color::new(0, 0, 0, 0);
        aux.inv_pixel_color_alpha = 0;
        let out = blend_pipe(0, false, &aux, &object);
        assert_eq!(out.r, (0xc0 * 31) / 32);
        assert_eq!(out.g, (0x40 * 31) / 32);
    }

    #[test]
    fn test_coverage_reject() {
        // AA on, zero coverage: pixel rejected
        let object = test_object(1 << 3);
        let mut aux = SpanAux::default();
        aux.current_pix_cvg = 0;
        assert!(test_for_reject(&mut aux, &object));
        aux.current_pix_cvg = 3;
        assert!(!test_for_reject(&mut aux, &object));
    }

    #[test]
    fn test_alpha_compare_reject() {
        // alpha_compare_en, threshold from blend color
        let mut rdp = Rdp::new();
        rdp.cmd_set_other_modes(0, 1);
        rdp.cmd_set_blend_color(0, 0x0000_0080);
        let object = crate::core::rdp::render::RenderObject::snapshot(&rdp, 0, false, false);
        let mut aux = SpanAux::default();
        aux.current_cvg_bit = 1;
        aux.pixel_color.a = 0x40;
        assert!(test_for_reject(&mut aux, &object));
        aux.pixel_color.a = 0x90;
        assert!(!test_for_reject(&mut aux, &object));
    }

    #[test]
    fn test_rgb_dither_rounds_up() {
        let mut c = Color::new(0x81, 0xf9, 0x80, 0);
        rgb_dither(&mut c, 0);
        assert_eq!(c.r, 0x88); // low bits above threshold step up
        assert_eq!(c.b, 0x80); // exact multiple untouched
        assert_eq!(c.g, 0xff); // clamped at the top
    }
}
