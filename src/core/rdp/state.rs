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

//! Rendering state types
//!
//! Everything a state-setting command can mutate lives here: the "other
//! modes" flag word, the combiner operand selectors, the scissor
//! rectangle, and the image/miscellaneous registers. State persists across
//! primitives until overwritten and is snapshotted by value into each
//! triangle's render object, so span workers only ever see immutable
//! copies.

use bitflags::bitflags;

bitflags! {
    /// DP status register bits
    ///
    /// Only the bits the pipeline acts on are modeled: XBUS selects DMEM
    /// as the command source, FREEZE stalls command processing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DpStatus: u32 {
        /// Fetch display-list words from DMEM instead of RDRAM
        const XBUS_DMEM_DMA = 0x001;
        /// Command processing is frozen
        const FREEZE        = 0x002;
        /// Pipe is flushed
        const FLUSH         = 0x004;
        /// Command buffer ready
        const CBUF_READY    = 0x080;
    }
}

/// Pipeline configuration selected by the cycle-type field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleType {
    /// One combiner/blender pass per pixel
    #[default]
    One,
    /// Two chained passes per pixel (mipmapping, two-tile effects)
    Two,
    /// Unfiltered texel-to-framebuffer blit
    Copy,
    /// Constant-color fill
    Fill,
}

impl CycleType {
    /// Decode the 2-bit field
    pub fn from_bits(v: u32) -> Self {
        match v & 3 {
            0 => CycleType::One,
            1 => CycleType::Two,
            2 => CycleType::Copy,
            _ => CycleType::Fill,
        }
    }
}

/// Texture image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TexFormat {
    /// Direct RGBA
    #[default]
    Rgba,
    /// Subsampled luma/chroma
    Yuv,
    /// Palette index
    ColorIndex,
    /// Intensity with alpha
    IntensityAlpha,
    /// Intensity
    Intensity,
}

impl TexFormat {
    /// Decode the 3-bit format code; unknown codes read as RGBA, which is
    /// what the hardware's format fixups collapse to
    pub fn from_bits(v: u32) -> Self {
        match v & 7 {
            0 => TexFormat::Rgba,
            1 => TexFormat::Yuv,
            2 => TexFormat::ColorIndex,
            3 => TexFormat::IntensityAlpha,
            4 => TexFormat::Intensity,
            _ => TexFormat::Rgba,
        }
    }
}

/// Texel/pixel size codes, log2 of the bit width over 4
pub mod pixel_size {
    /// 4 bits per texel
    pub const SIZE_4: u32 = 0;
    /// 8 bits per texel
    pub const SIZE_8: u32 = 1;
    /// 16 bits per texel
    pub const SIZE_16: u32 = 2;
    /// 32 bits per texel
    pub const SIZE_32: u32 = 3;
}

/// The Set_Other_Modes flag word, unpacked
///
/// Field order follows the command's bit layout from the top of the first
/// word down through the second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OtherModes {
    /// Pipeline configuration (1-cycle / 2-cycle / copy / fill)
    pub cycle_type: CycleType,
    /// Perspective-correct texture coordinates
    pub persp_tex_en: bool,
    /// Detail texture on the finest LOD
    pub detail_tex_en: bool,
    /// Sharpened texture extrapolation when magnifying
    pub sharpen_tex_en: bool,
    /// Texture LOD computation enabled
    pub tex_lod_en: bool,
    /// Texel lookups go through the palette in upper TMEM
    pub en_tlut: bool,
    /// Palette entries are IA16 instead of RGBA16
    pub tlut_type: bool,
    /// Bilinear sampling (nearest when clear)
    pub sample_type: bool,
    /// True 4-tap average at the texel midpoint
    pub mid_texel: bool,
    /// Cycle-0 texture stage interpolates (converts when clear)
    pub bi_lerp0: bool,
    /// Cycle-1 texture stage interpolates
    pub bi_lerp1: bool,
    /// Apply the YUV convert step to the previous cycle's texel
    pub convert_one: bool,
    /// Chroma keying enabled
    pub key_en: bool,
    /// RGB dither selector (0=magic, 1=Bayer, 2=noise, 3=off)
    pub rgb_dither_sel: u32,
    /// Alpha dither selector (0=pattern, 1=inverse, 2=noise, 3=off)
    pub alpha_dither_sel: u32,
    /// Blender 1a mux, cycles 0/1
    pub blend_m1a_0: u32,
    /// Blender 1a mux, cycle 1
    pub blend_m1a_1: u32,
    /// Blender 1b mux, cycle 0
    pub blend_m1b_0: u32,
    /// Blender 1b mux, cycle 1
    pub blend_m1b_1: u32,
    /// Blender 2a mux, cycle 0
    pub blend_m2a_0: u32,
    /// Blender 2a mux, cycle 1
    pub blend_m2a_1: u32,
    /// Blender 2b mux, cycle 0
    pub blend_m2b_0: u32,
    /// Blender 2b mux, cycle 1
    pub blend_m2b_1: u32,
    /// Blend unconditionally, ignoring the depth/AA gate
    pub force_blend: bool,
    /// Shift applied when normalizing the blend sum
    pub blend_shift: u32,
    /// Replace combiner alpha with coverage
    pub alpha_cvg_select: bool,
    /// Multiply coverage by combiner alpha
    pub cvg_times_alpha: bool,
    /// Depth comparison policy (0=opaque, 1=interpenetrating, 2=decal, 3=additive)
    pub z_mode: u32,
    /// Coverage destination policy (0=clamp, 1=wrap, 2=force-full, 3=save)
    pub cvg_dest: u32,
    /// Only update color on coverage overflow
    pub color_on_cvg: bool,
    /// Read-modify-write the framebuffer (memory color available)
    pub image_read_en: bool,
    /// Write the depth buffer on pass
    pub z_update_en: bool,
    /// Compare against the depth buffer
    pub z_compare_en: bool,
    /// Coverage-based antialiasing enabled
    pub antialias_en: bool,
    /// Take Z from the primitive registers instead of interpolating
    pub z_source_sel: bool,
    /// Dither the alpha-compare threshold
    pub dither_alpha_en: bool,
    /// Reject pixels failing the alpha compare
    pub alpha_compare_en: bool,
    /// Combined alpha-compare/dither mode, derived
    pub alpha_dither_mode: u32,
}

impl OtherModes {
    /// Decode a Set_Other_Modes command pair
    pub fn decode(w1: u32, w2: u32) -> Self {
        let force_blend = (w2 >> 14) & 1 != 0;
        let dither_alpha_en = (w2 >> 1) & 1 != 0;
        let alpha_compare_en = w2 & 1 != 0;
        Self {
            cycle_type: CycleType::from_bits(w1 >> 20),
            persp_tex_en: w1 & 0x80000 != 0,
            detail_tex_en: w1 & 0x40000 != 0,
            sharpen_tex_en: w1 & 0x20000 != 0,
            tex_lod_en: w1 & 0x10000 != 0,
            en_tlut: w1 & 0x08000 != 0,
            tlut_type: w1 & 0x04000 != 0,
            sample_type: w1 & 0x02000 != 0,
            mid_texel: w1 & 0x01000 != 0,
            bi_lerp0: w1 & 0x00800 != 0,
            bi_lerp1: w1 & 0x00400 != 0,
            convert_one: w1 & 0x00200 != 0,
            key_en: w1 & 0x00100 != 0,
            rgb_dither_sel: (w1 >> 6) & 3,
            alpha_dither_sel: (w1 >> 4) & 3,
            blend_m1a_0: (w2 >> 30) & 3,
            blend_m1a_1: (w2 >> 28) & 3,
            blend_m1b_0: (w2 >> 26) & 3,
            blend_m1b_1: (w2 >> 24) & 3,
            blend_m2a_0: (w2 >> 22) & 3,
            blend_m2a_1: (w2 >> 20) & 3,
            blend_m2b_0: (w2 >> 18) & 3,
            blend_m2b_1: (w2 >> 16) & 3,
            force_blend,
            blend_shift: if force_blend { 5 } else { 2 },
            alpha_cvg_select: (w2 >> 13) & 1 != 0,
            cvg_times_alpha: (w2 >> 12) & 1 != 0,
            z_mode: (w2 >> 10) & 3,
            cvg_dest: (w2 >> 8) & 3,
            color_on_cvg: (w2 >> 7) & 1 != 0,
            image_read_en: (w2 >> 6) & 1 != 0,
            z_update_en: (w2 >> 5) & 1 != 0,
            z_compare_en: (w2 >> 4) & 1 != 0,
            antialias_en: (w2 >> 3) & 1 != 0,
            z_source_sel: (w2 >> 2) & 1 != 0,
            dither_alpha_en,
            alpha_compare_en,
            alpha_dither_mode: ((alpha_compare_en as u32) << 1) | dither_alpha_en as u32,
        }
    }
}

/// Combiner operand selectors for both cycles
///
/// Raw mux codes straight from the Set_Combine command; the combiner maps
/// unknown codes to the zero operand at evaluation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombineModes {
    /// RGB subtract-A mux, cycle 0
    pub sub_a_rgb0: u32,
    /// RGB multiply mux, cycle 0
    pub mul_rgb0: u32,
    /// Alpha subtract-A mux, cycle 0
    pub sub_a_a0: u32,
    /// Alpha multiply mux, cycle 0
    pub mul_a0: u32,
    /// RGB subtract-A mux, cycle 1
    pub sub_a_rgb1: u32,
    /// RGB multiply mux, cycle 1
    pub mul_rgb1: u32,
    /// RGB subtract-B mux, cycle 0
    pub sub_b_rgb0: u32,
    /// RGB subtract-B mux, cycle 1
    pub sub_b_rgb1: u32,
    /// Alpha subtract-A mux, cycle 1
    pub sub_a_a1: u32,
    /// Alpha multiply mux, cycle 1
    pub mul_a1: u32,
    /// RGB add mux, cycle 0
    pub add_rgb0: u32,
    /// Alpha subtract-B mux, cycle 0
    pub sub_b_a0: u32,
    /// Alpha add mux, cycle 0
    pub add_a0: u32,
    /// RGB add mux, cycle 1
    pub add_rgb1: u32,
    /// Alpha subtract-B mux, cycle 1
    pub sub_b_a1: u32,
    /// Alpha add mux, cycle 1
    pub add_a1: u32,
}

impl CombineModes {
    /// Decode a Set_Combine command pair
    pub fn decode(w1: u32, w2: u32) -> Self {
        Self {
            sub_a_rgb0: (w1 >> 20) & 0xf,
            mul_rgb0: (w1 >> 15) & 0x1f,
            sub_a_a0: (w1 >> 12) & 0x7,
            mul_a0: (w1 >> 9) & 0x7,
            sub_a_rgb1: (w1 >> 5) & 0xf,
            mul_rgb1: w1 & 0x1f,
            sub_b_rgb0: (w2 >> 28) & 0xf,
            sub_b_rgb1: (w2 >> 24) & 0xf,
            sub_a_a1: (w2 >> 21) & 0x7,
            mul_a1: (w2 >> 18) & 0x7,
            add_rgb0: (w2 >> 15) & 0x7,
            sub_b_a0: (w2 >> 12) & 0x7,
            add_a0: (w2 >> 9) & 0x7,
            add_rgb1: (w2 >> 6) & 0x7,
            sub_b_a1: (w2 >> 3) & 0x7,
            add_a1: w2 & 0x7,
        }
    }
}

/// Scissor rectangle in pixels
///
/// `xh`/`yh` are the inclusive left/top edge, `xl`/`yl` the exclusive
/// right/bottom edge, matching the hardware comparison `x >= xh && x < xl`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rectangle {
    /// Left edge (inclusive)
    pub xh: i32,
    /// Top edge (inclusive)
    pub yh: i32,
    /// Right edge (exclusive)
    pub xl: i32,
    /// Bottom edge (exclusive)
    pub yl: i32,
}

/// Image pointers and assorted registers outside the mode word
#[derive(Debug, Clone, Copy, Default)]
pub struct MiscState {
    /// Framebuffer format code
    pub fb_format: u32,
    /// Framebuffer pixel size code
    pub fb_size: u32,
    /// Framebuffer width in pixels
    pub fb_width: u32,
    /// Framebuffer base byte address
    pub fb_address: u32,
    /// Depth buffer base byte address
    pub zb_address: u32,
    /// Texture image format code
    pub ti_format: u32,
    /// Texture image pixel size code
    pub ti_size: u32,
    /// Texture image width in pixels
    pub ti_width: u32,
    /// Texture image base byte address
    pub ti_address: u32,
    /// Highest mip level for LOD
    pub max_level: u32,
    /// Minimum LOD from Set_Prim_Color
    pub min_level: u32,
    /// Primitive-constant Z
    pub primitive_z: u32,
    /// Primitive-constant delta-Z
    pub primitive_dz: u16,
}

/// Per-span attribute steps captured at triangle setup
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanBase {
    /// Per-pixel red step
    pub dr: i32,
    /// Per-pixel green step
    pub dg: i32,
    /// Per-pixel blue step
    pub db: i32,
    /// Per-pixel alpha step
    pub da: i32,
    /// Per-pixel S step
    pub ds: i32,
    /// Per-pixel T step
    pub dt: i32,
    /// Per-pixel W step
    pub dw: i32,
    /// Per-pixel Z step
    pub dz: i32,
    /// Per-scanline red step
    pub drdy: i32,
    /// Per-scanline green step
    pub dgdy: i32,
    /// Per-scanline blue step
    pub dbdy: i32,
    /// Per-scanline alpha step
    pub dady: i32,
    /// Per-scanline Z step
    pub dzdy: i32,
    /// Normalized per-pixel dz for the depth comparator
    pub dzpix: i32,
}

/// YUV conversion factors from Set_Convert, pre-scaled
#[derive(Debug, Clone, Copy, Default)]
pub struct YuvFactors {
    /// V -> red
    pub k0: i32,
    /// U -> green
    pub k1: i32,
    /// V -> green
    pub k2: i32,
    /// U -> blue
    pub k3: i32,
    /// Texture filter factor
    pub k4: i32,
    /// Texture filter factor
    pub k5: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_type_decode() {
        assert_eq!(CycleType::from_bits(0), CycleType::One);
        assert_eq!(CycleType::from_bits(1), CycleType::Two);
        assert_eq!(CycleType::from_bits(2), CycleType::Copy);
        assert_eq!(CycleType::from_bits(3), CycleType::Fill);
        assert_eq!(CycleType::from_bits(7), CycleType::Fill);
    }

    #[test]
    fn test_other_modes_decode() {
        // Cycle type in bits 21:20 of the first word
        let m = OtherModes::decode(0x0030_0000, 0);
        assert_eq!(m.cycle_type, CycleType::Fill);
        assert!(!m.persp_tex_en);

        let m = OtherModes::decode(0x0008_0000, 0);
        assert!(m.persp_tex_en);
        assert_eq!(m.cycle_type, CycleType::One);
    }

    #[test]
    fn test_other_modes_blend_shift() {
        let m = OtherModes::decode(0, 1 << 14);
        assert!(m.force_blend);
        assert_eq!(m.blend_shift, 5);
        let m = OtherModes::decode(0, 0);
        assert!(!m.force_blend);
        assert_eq!(m.blend_shift, 2);
    }

    #[test]
    fn test_other_modes_alpha_dither_mode() {
        let m = OtherModes::decode(0, 0b11);
        assert_eq!(m.alpha_dither_mode, 3);
        let m = OtherModes::decode(0, 0b01);
        assert_eq!(m.alpha_dither_mode, 1);
    }

    #[test]
    fn test_combine_decode_is_idempotent() {
        let a = CombineModes::decode(0x00FF_FFFF, 0xFFFE_93F8);
        let b = CombineModes::decode(0x00FF_FFFF, 0xFFFE_93F8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_other_modes_decode_is_idempotent() {
        let a = OtherModes::decode(0x002D_8A55, 0x3F15_2E3B);
        let b = OtherModes::decode(0x002D_8A55, 0x3F15_2E3B);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tex_format_decode() {
        assert_eq!(TexFormat::from_bits(0), TexFormat::Rgba);
        assert_eq!(TexFormat::from_bits(1), TexFormat::Yuv);
        assert_eq!(TexFormat::from_bits(2), TexFormat::ColorIndex);
        assert_eq!(TexFormat::from_bits(3), TexFormat::IntensityAlpha);
        assert_eq!(TexFormat::from_bits(4), TexFormat::Intensity);
        // Reserved codes collapse to RGBA
        assert_eq!(TexFormat::from_bits(6), TexFormat::Rgba);
    }
}
