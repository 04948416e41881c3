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

//! Color/alpha combiner
//!
//! Two configurable arithmetic stages computing `clamp(((A - B) * C) + D)`
//! independently for RGB and alpha. Operands come from a fixed menu
//! selected per stage by the Set_Combine mux codes; unknown codes resolve
//! to the zero operand, never to a fault. All intermediates are 9-bit
//! signed with the hardware's asymmetric sign rule, and the final
//! clamp-and-store goes through the special 9-bit clamp table.

use crate::core::rdp::color::Color;
use crate::core::rdp::render::{RenderObject, SpanAux};
use crate::core::rdp::tables::{akeley_sign9, sign_extend, Tables};

/// RGB subtract-A operand menu (4-bit code)
fn select_rgb_sub_a(code: u32, aux: &SpanAux, object: &RenderObject) -> Color {
    match code & 0xf {
        0 => aux.combined,
        1 => aux.texel0,
        2 => aux.texel1,
        3 => object.prim_color,
        4 => aux.shade,
        5 => object.env_color,
        6 => Color::ONE,
        7 => aux.noise_color,
        _ => Color::ZERO,
    }
}

/// RGB subtract-B operand menu (4-bit code)
fn select_rgb_sub_b(code: u32, aux: &SpanAux, object: &RenderObject) -> Color {
    match code & 0xf {
        0 => aux.combined,
        1 => aux.texel0,
        2 => aux.texel1,
        3 => object.prim_color,
        4 => aux.shade,
        5 => object.env_color,
        6 => {
            // key center is unimplemented on this menu slot; hardware
            // tolerates it, reading zero
            Color::ZERO
        }
        7 => Color::splat(object.yuv.k4),
        _ => Color::ZERO,
    }
}

/// RGB multiply operand menu (5-bit code)
fn select_rgb_mul(code: u32, aux: &SpanAux, object: &RenderObject) -> Color {
    match code & 0x1f {
        0 => aux.combined,
        1 => aux.texel0,
        2 => aux.texel1,
        3 => object.prim_color,
        4 => aux.shade,
        5 => object.env_color,
        6 => object.key_scale,
        7 => aux.combined_alpha,
        8 => aux.texel0_alpha,
        9 => aux.texel1_alpha,
        10 => object.prim_alpha,
        11 => aux.shade_alpha,
        12 => object.env_alpha,
        13 => aux.lod_fraction,
        14 => object.prim_lod_fraction,
        15 => Color::splat(object.yuv.k5),
        _ => Color::ZERO,
    }
}

/// RGB add operand menu (3-bit code)
fn select_rgb_add(code: u32, aux: &SpanAux, object: &RenderObject) -> Color {
    match code & 0x7 {
        0 => aux.combined,
        1 => aux.texel0,
        2 => aux.texel1,
        3 => object.prim_color,
        4 => aux.shade,
        5 => object.env_color,
        6 => Color::ONE,
        _ => Color::ZERO,
    }
}

/// Alpha subtract/add operand menu (3-bit code)
fn select_alpha_sub(code: u32, aux: &SpanAux, object: &RenderObject) -> Color {
    match code & 0x7 {
        0 => aux.combined_alpha,
        1 => aux.texel0_alpha,
        2 => aux.texel1_alpha,
        3 => object.prim_alpha,
        4 => aux.shade_alpha,
        5 => object.env_alpha,
        6 => Color::ONE,
        _ => Color::ZERO,
    }
}

/// Alpha multiply operand menu (3-bit code)
fn select_alpha_mul(code: u32, aux: &SpanAux, object: &RenderObject) -> Color {
    match code & 0x7 {
        0 => aux.lod_fraction,
        1 => aux.texel0_alpha,
        2 => aux.texel1_alpha,
        3 => object.prim_alpha,
        4 => aux.shade_alpha,
        5 => object.env_alpha,
        6 => object.prim_lod_fraction,
        _ => Color::ZERO,
    }
}

/// The color equation: `clamp9(((A - B) * C + (D << 8) + 0x80) >> 8)`
pub fn color_combiner_equation(a: i32, b: i32, c: i32, d: i32, tables: &Tables) -> i32 {
    let a = akeley_sign9(a);
    let b = akeley_sign9(b);
    let c = sign_extend(c, 9);
    let d = akeley_sign9(d);
    let v = ((a - b) * c) + (d << 8) + 0x80;
    let v = sign_extend(v, 17) >> 8;
    tables.clamp_9bit[(v & 0x1ff) as usize] as i32
}

/// The alpha equation, identical but for the narrower intermediate
pub fn alpha_combiner_equation(a: i32, b: i32, c: i32, d: i32, tables: &Tables) -> i32 {
    let a = akeley_sign9(a);
    let b = akeley_sign9(b);
    let c = sign_extend(c, 9);
    let d = akeley_sign9(d);
    let v = (((a - b) * c) + (d << 8) + 0x80) >> 8;
    let v = sign_extend(v, 9);
    tables.clamp_9bit[(v & 0x1ff) as usize] as i32
}

/// Run one combiner stage
///
/// `cycle` selects which mux field set applies: stage 0 runs only in
/// 2-cycle mode, stage 1 is the final stage in both modes.
pub fn combine_cycle(
    cycle: usize,
    aux: &SpanAux,
    object: &RenderObject,
    tables: &Tables,
) -> Color {
    let cm = &object.combine;
    let (sa, sb, mu, ad, asa, asb, amu, aad) = if cycle == 0 {
        (
            cm.sub_a_rgb0,
            cm.sub_b_rgb0,
            cm.mul_rgb0,
            cm.add_rgb0,
            cm.sub_a_a0,
            cm.sub_b_a0,
            cm.mul_a0,
            cm.add_a0,
        )
    } else {
        (
            cm.sub_a_rgb1,
            cm.sub_b_rgb1,
            cm.mul_rgb1,
            cm.add_rgb1,
            cm.sub_a_a1,
            cm.sub_b_a1,
            cm.mul_a1,
            cm.add_a1,
        )
    };

    let a = select_rgb_sub_a(sa, aux, object);
    let b = select_rgb_sub_b(sb, aux, object);
    let c = select_rgb_mul(mu, aux, object);
    let d = select_rgb_add(ad, aux, object);
    let aa = select_alpha_sub(asa, aux, object);
    let ab = select_alpha_sub(asb, aux, object);
    let ac = select_alpha_mul(amu, aux, object);
    let adn = select_alpha_sub(aad, aux, object);

    Color::new(
        color_combiner_equation(a.r, b.r, c.r, d.r, tables),
        color_combiner_equation(a.g, b.g, c.g, d.g, tables),
        color_combiner_equation(a.b, b.b, c.b, d.b, tables),
        alpha_combiner_equation(aa.a, ab.a, ac.a, adn.a, tables),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passthrough() {
        let t = Tables::new();
        // (0x80 - 0) * 0xff: the +0x80 bias rounds 255/256 scaling back up
        assert_eq!(color_combiner_equation(0x80, 0, 0xff, 0, &t), 0x80);
        // D alone passes through untouched
        assert_eq!(color_combiner_equation(0, 0, 0, 0x80, &t), 0x80);
    }

    #[test]
    fn test_equation_clamps_low() {
        let t = Tables::new();
        // (0 - 0xff) * 0xff + 0 is deeply negative
        assert_eq!(color_combiner_equation(0, 0xff, 0xff, 0, &t), 0);
        assert_eq!(alpha_combiner_equation(0, 0xff, 0xff, 0, &t), 0);
    }

    #[test]
    fn test_equation_clamps_high() {
        let t = Tables::new();
        // (0xff - 0) * 0xff + 0xff overflows 8 bits
        assert_eq!(color_combiner_equation(0xff, 0, 0xff, 0xff, &t), 0xff);
        assert_eq!(alpha_combiner_equation(0xff, 0, 0xff, 0xff, &t), 0xff);
    }

    #[test]
    fn test_rounding_bias() {
        let t = Tables::new();
        // The +0x80 bias rounds the 8-bit downshift to nearest
        assert_eq!(color_combiner_equation(1, 0, 0x80, 0, &t), 1);
    }
}
