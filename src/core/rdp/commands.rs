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

//! Display-list command handlers
//!
//! Opcodes live in the high byte of each command's first word; every
//! opcode has a fixed word count, from 2 words for state setters to 44
//! for a shaded, textured, depth-buffered triangle. State-setting
//! commands mutate the rendering state in place; drawing commands hand
//! off to the edge walker.

use crate::core::error::Result;
use crate::core::memory::RdpMemory;
use crate::core::rdp::color::Color;
use crate::core::rdp::state::{CycleType, CombineModes, OtherModes};
use crate::core::rdp::tables::sign_extend;
use crate::core::rdp::Rdp;

/// Fixed length of every opcode, in 32-bit words
///
/// Unused opcodes decode as two-word no-ops, which is how the hardware
/// swallows garbage display lists.
pub const COMMAND_LENGTH_WORDS: [usize; 64] = [
    2, 2, 2, 2, 2, 2, 2, 2, // 0x00-0x07: no-op / unused
    8, 12, 24, 28, 24, 28, 40, 44, // 0x08-0x0f: triangle variants
    2, 2, 2, 2, 2, 2, 2, 2, // 0x10-0x17: unused
    2, 2, 2, 2, 2, 2, 2, 2, // 0x18-0x1f: unused
    2, 2, 2, 2, // 0x20-0x23: unused
    4, 4, // 0x24-0x25: texture rectangle, flipped variant
    2, 2, 2, 2, // 0x26-0x29: sync load/pipe/tile/full
    2, 2, // 0x2a-0x2b: set key GB / R
    2, 2, 2, 2, // 0x2c-0x2f: convert, scissor, prim depth, other modes
    2, 2, 2, 2, 2, 2, // 0x30-0x35: load tlut, -, tile size, block, tile, set tile
    2, 2, 2, 2, 2, 2, // 0x36-0x3b: fill rect, fill/fog/blend/prim/env color
    2, 2, 2, 2, // 0x3c-0x3f: combine, texture/mask/color image
];

impl Rdp {
    /// Triangle opcodes 0x08-0x0f: {fill, shade} x {texture} x {zbuffer}
    pub(crate) fn cmd_triangle(
        &mut self,
        mem: &RdpMemory,
        shade: bool,
        texture: bool,
        zbuffer: bool,
    ) -> Result<()> {
        self.draw_triangle(mem, shade, texture, zbuffer, false)
    }

    /// Texture_Rectangle / Texture_Rectangle_Flip (0x24 / 0x25)
    ///
    /// Rectangles are rewritten into the edge walker's triangle format:
    /// a flipped "triangle" whose major and middle edges are both the
    /// rectangle's left side, with S/T steps packed into the coefficient
    /// block. The flipped variant swaps which axis each texture delta
    /// walks.
    pub(crate) fn cmd_tex_rect(&mut self, mem: &RdpMemory, flip_st: bool) -> Result<()> {
        let w1 = self.cmd_data[self.cmd_cur];
        let w2 = self.cmd_data[self.cmd_cur + 1];
        let w3 = self.cmd_data[self.cmd_cur + 2];
        let w4 = self.cmd_data[self.cmd_cur + 3];

        let tilenum = (w2 >> 24) & 0x7;
        let xh = (w2 >> 12) & 0xfff;
        let xl = (w1 >> 12) & 0xfff;
        let yh = w2 & 0xfff;
        let mut yl = w1 & 0xfff;

        let s = (w3 >> 16) & 0xffff;
        let t = w3 & 0xffff;
        let dsdx = sign_extend(((w4 >> 16) & 0xffff) as i32, 16);
        let dtdy = sign_extend((w4 & 0xffff) as i32, 16);

        if matches!(
            self.other_modes.cycle_type,
            CycleType::Fill | CycleType::Copy
        ) {
            yl |= 3;
        }

        let xlint = (xl >> 2) & 0x3ff;
        let xhint = (xh >> 2) & 0x3ff;

        let opcode: u32 = if flip_st { 0x25 } else { 0x24 };
        let ew = &mut self.temp_rect_data;
        ew.fill(0);
        ew[0] = (opcode << 24) | ((0x80 | tilenum) << 16) | yl;
        ew[1] = (yl << 16) | yh;
        ew[2] = (xlint << 16) | ((xl & 3) << 14);
        ew[4] = (xhint << 16) | ((xh & 3) << 14);
        ew[6] = (xlint << 16) | ((xl & 3) << 14);
        ew[24] = (s << 16) | t;
        let dsdx_hi = ((dsdx >> 5) as u32) & 0xffff;
        let dtdy_hi = ((dtdy >> 5) as u32) & 0xffff;
        if !flip_st {
            ew[26] = dsdx_hi << 16;
            ew[30] = (((dsdx & 0x1f) << 11) as u32) << 16;
            ew[32] = dtdy_hi;
            ew[34] = dtdy_hi;
            ew[36] = ((dtdy & 0x1f) << 11) as u32;
            ew[38] = ((dtdy & 0x1f) << 11) as u32;
        } else {
            ew[26] = dtdy_hi;
            ew[30] = ((dtdy & 0x1f) << 11) as u32;
            ew[32] = dsdx_hi << 16;
            ew[34] = dsdx_hi << 16;
            ew[36] = ((dsdx & 0x1f) as u32) << 27;
            ew[38] = ((dsdx & 0x1f) as u32) << 27;
        }

        self.draw_triangle(mem, true, true, false, true)
    }

    /// Fill_Rectangle (0x36)
    pub(crate) fn cmd_fill_rect(&mut self, mem: &RdpMemory, w1: u32, w2: u32) -> Result<()> {
        let xh = (w2 >> 12) & 0xfff;
        let xl = (w1 >> 12) & 0xfff;
        let yh = w2 & 0xfff;
        let mut yl = w1 & 0xfff;

        if matches!(
            self.other_modes.cycle_type,
            CycleType::Fill | CycleType::Copy
        ) {
            yl |= 3;
        }

        let xlint = (xl >> 2) & 0x3ff;
        let xhint = (xh >> 2) & 0x3ff;

        let ew = &mut self.temp_rect_data;
        ew.fill(0);
        ew[0] = (0x3680 << 16) | yl;
        ew[1] = (yl << 16) | yh;
        ew[2] = (xlint << 16) | ((xl & 3) << 14);
        ew[4] = (xhint << 16) | ((xh & 3) << 14);
        ew[6] = (xlint << 16) | ((xl & 3) << 14);

        self.draw_triangle(mem, false, false, false, true)
    }

    /// Set_Scissor (0x2d)
    pub(crate) fn cmd_set_scissor(&mut self, w1: u32, w2: u32) {
        self.scissor.xh = (((w1 >> 12) & 0xfff) >> 2) as i32;
        self.scissor.yh = ((w1 & 0xfff) >> 2) as i32;
        self.scissor.xl = (((w2 >> 12) & 0xfff) >> 2) as i32;
        self.scissor.yl = ((w2 & 0xfff) >> 2) as i32;
    }

    /// Set_Other_Modes (0x2f)
    pub(crate) fn cmd_set_other_modes(&mut self, w1: u32, w2: u32) {
        self.other_modes = OtherModes::decode(w1, w2);
    }

    /// Set_Combine (0x3c)
    pub(crate) fn cmd_set_combine(&mut self, w1: u32, w2: u32) {
        self.combine = CombineModes::decode(w1, w2);
    }

    /// Set_Fill_Color (0x37); one 32-bit word, two 16-bit pixels
    pub(crate) fn cmd_set_fill_color(&mut self, _w1: u32, w2: u32) {
        self.fill_color = w2;
    }

    /// Set_Fog_Color (0x38)
    pub(crate) fn cmd_set_fog_color(&mut self, _w1: u32, w2: u32) {
        self.fog_color = Color::from_cmd_word(w2);
    }

    /// Set_Blend_Color (0x39)
    pub(crate) fn cmd_set_blend_color(&mut self, _w1: u32, w2: u32) {
        self.blend_color = Color::from_cmd_word(w2);
    }

    /// Set_Prim_Color (0x3a), with min-LOD level and prim LOD fraction
    pub(crate) fn cmd_set_prim_color(&mut self, w1: u32, w2: u32) {
        self.misc.min_level = (w1 >> 8) & 0x1f;
        let frac = (w1 & 0xff) as i32;
        self.prim_lod_fraction = Color::splat(frac);
        self.prim_color = Color::from_cmd_word(w2);
        self.prim_alpha = self.prim_color.alpha_splat();
    }

    /// Set_Env_Color (0x3b)
    pub(crate) fn cmd_set_env_color(&mut self, _w1: u32, w2: u32) {
        self.env_color = Color::from_cmd_word(w2);
        self.env_alpha = self.env_color.alpha_splat();
    }

    /// Set_Key_GB (0x2a)
    pub(crate) fn cmd_set_key_gb(&mut self, _w1: u32, w2: u32) {
        self.key_scale.g = ((w2 >> 16) & 0xff) as i32;
        self.key_scale.b = (w2 & 0xff) as i32;
    }

    /// Set_Key_R (0x2b)
    pub(crate) fn cmd_set_key_r(&mut self, _w1: u32, w2: u32) {
        self.key_scale.r = (w2 & 0xff) as i32;
    }

    /// Set_Convert (0x2c): YUV conversion factors
    ///
    /// The first four factors carry the hardware's `2k + 1` scaling.
    pub(crate) fn cmd_set_convert(&mut self, w1: u32, w2: u32) {
        let k0 = ((w1 >> 13) & 0x1ff) as i32;
        let k1 = ((w1 >> 4) & 0x1ff) as i32;
        let k2 = (((w1 & 0xf) << 5) | ((w2 >> 27) & 0x1f)) as i32;
        let k3 = ((w2 >> 18) & 0x1ff) as i32;
        let k4 = ((w2 >> 9) & 0x1ff) as i32;
        let k5 = (w2 & 0x1ff) as i32;

        self.yuv.k0 = (sign_extend(k0, 9) << 1) + 1;
        self.yuv.k1 = (sign_extend(k1, 9) << 1) + 1;
        self.yuv.k2 = (sign_extend(k2, 9) << 1) + 1;
        self.yuv.k3 = (sign_extend(k3, 9) << 1) + 1;
        self.yuv.k4 = k4;
        self.yuv.k5 = k5;
    }

    /// Set_Prim_Depth (0x2e)
    pub(crate) fn cmd_set_prim_depth(&mut self, w1: u32, w2: u32) {
        self.misc.primitive_z = w2 & 0x7fff_0000;
        self.misc.primitive_dz = w1 as u16;
    }

    /// Set_Texture_Image (0x3d)
    pub(crate) fn cmd_set_texture_image(&mut self, w1: u32, w2: u32) {
        self.misc.ti_format = (w1 >> 21) & 0x7;
        self.misc.ti_size = (w1 >> 19) & 0x3;
        self.misc.ti_width = (w1 & 0x3ff) + 1;
        self.misc.ti_address = w2 & 0x01ff_ffff;
    }

    /// Set_Mask_Image (0x3e): depth buffer base
    pub(crate) fn cmd_set_mask_image(&mut self, _w1: u32, w2: u32) {
        self.misc.zb_address = w2 & 0x01ff_ffff;
    }

    /// Set_Color_Image (0x3f)
    pub(crate) fn cmd_set_color_image(&mut self, w1: u32, w2: u32) {
        self.misc.fb_format = (w1 >> 21) & 0x7;
        self.misc.fb_size = (w1 >> 19) & 0x3;
        self.misc.fb_width = (w1 & 0x3ff) + 1;
        self.misc.fb_address = w2 & 0x01ff_ffff;

        if self.misc.fb_format != 0 && self.misc.fb_format != 2 {
            // Some titles program nonsense formats; the framebuffer
            // behaves as RGBA regardless
            log::warn!(
                "set_color_image: coercing framebuffer format {} to RGBA",
                self.misc.fb_format
            );
            self.misc.fb_format = 2;
        }
    }
}
