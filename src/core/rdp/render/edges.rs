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

//! Edge walker / span generator
//!
//! Triangles arrive as three edge descriptors (high/middle/low Y with
//! per-scanline X and X-slope in 16.16 fixed point) plus optional shade,
//! texture and depth coefficient blocks. The walker steps Y through four
//! sub-scanlines per pixel row: every sub-row contributes 4 bits of
//! coverage per boundary pixel through the left/right nibble tables, and
//! on one designated sub-row (`ldflag`) the interpolator start values are
//! finalized, corrected for the fraction between the sub-pixel edge and
//! the true span start.
//!
//! Degenerate (zero-height) regions fall out naturally: no sub-row
//! passes the `yh <= y < yl` validity test, so no coverage and no spans
//! are produced. Triangles fully outside the scissor are rejected before
//! walking.

use crate::core::error::{RdpError, Result};
use crate::core::memory::RdpMemory;
use crate::core::rdp::render::{self, RenderObject, SpanAux};
use crate::core::rdp::tables::sign_extend;
use crate::core::rdp::Rdp;

/// Coverage nibble for the right (major) edge crossing
fn rightcvghex(x: u32, fmask: u32) -> u32 {
    let stickybit = ((x >> 1) & 0x1fff) > 0;
    let covered = ((x >> 14) & 3) + stickybit as u32;
    ((0xf0 >> covered) & 0xf) & fmask
}

/// Coverage nibble for the left (minor) edge crossing
fn leftcvghex(x: u32, fmask: u32) -> u32 {
    let stickybit = ((x >> 1) & 0x1fff) > 0;
    let covered = ((x >> 14) & 3) + stickybit as u32;
    (0xf >> covered) & fmask
}

/// Accumulate one pixel row's coverage from its four sub-scanline edges
#[allow(clippy::too_many_arguments)]
fn compute_cvg(
    aux: &mut SpanAux,
    majorx: &[i32; 4],
    minorx: &[i32; 4],
    majorxint: &[i32; 4],
    minorxint: &[i32; 4],
    scanline: i32,
    yh: i32,
    yl: i32,
    flip: bool,
) {
    let mut purgestart = 0xfff;
    let mut purgeend = 0;
    if scanline & !0x3ff != 0 {
        return;
    }
    let scanlinespx = scanline << 2;

    for i in 0..4 {
        let (lo, hi) = if flip {
            (majorxint[i], minorxint[i])
        } else {
            (minorxint[i], majorxint[i])
        };
        purgestart = purgestart.min(lo);
        purgeend = purgeend.max(hi);
    }

    let purgestart = purgestart.clamp(0, 1023);
    let purgeend = purgeend.clamp(0, 1023);
    if purgeend < purgestart {
        return;
    }
    for c in &mut aux.cvg[purgestart as usize..=purgeend as usize] {
        *c = 0;
    }

    for i in 0..4 {
        let minorcur = minorx[i] as u32;
        let majorcur = majorx[i] as u32;
        let minorcurint = minorxint[i];
        let majorcurint = majorxint[i];
        let length = if flip {
            minorcurint - majorcurint
        } else {
            majorcurint - minorcurint
        };

        let fmask: u32 = if i & 1 != 0 { 5 } else { 0xa };
        let maskshift = (i ^ 3) << 2;
        let fmaskshifted = (fmask as u16) << maskshift;
        let (fleft, fright) = if flip {
            ((majorcurint + 1).clamp(0, 647), (minorcurint - 1).clamp(0, 647))
        } else {
            ((minorcurint + 1).clamp(0, 647), (majorcurint - 1).clamp(0, 647))
        };
        let valid_y = (scanlinespx + i as i32) >= yh && (scanlinespx + i as i32) < yl;

        if valid_y && length >= 0 {
            if minorcurint != majorcurint {
                if minorcurint & !0x3ff == 0 {
                    let nib = if flip {
                        rightcvghex(minorcur, fmask)
                    } else {
                        leftcvghex(minorcur, fmask)
                    };
                    aux.cvg[minorcurint as usize] |= (nib as u16) << maskshift;
                }
                if majorcurint & !0x3ff == 0 {
                    let nib = if flip {
                        leftcvghex(majorcur, fmask)
                    } else {
                        rightcvghex(majorcur, fmask)
                    };
                    aux.cvg[majorcurint as usize] |= (nib as u16) << maskshift;
                }
            } else if majorcurint & !0x3ff == 0 {
                let samecvg = if flip {
                    rightcvghex(minorcur, fmask) & leftcvghex(majorcur, fmask)
                } else {
                    leftcvghex(minorcur, fmask) & rightcvghex(majorcur, fmask)
                };
                aux.cvg[majorcurint as usize] |= (samecvg as u16) << maskshift;
            }
            let mut f = fleft;
            while f <= fright {
                aux.cvg[f as usize] |= fmaskshifted;
                f += 1;
            }
        }
    }
}

impl Rdp {
    /// Rasterize one triangle (or rectangle-as-triangle) command
    ///
    /// `shade`/`texture`/`zbuffer` mirror the opcode's coefficient blocks;
    /// `rect` draws from the synthesized rectangle edge data instead of
    /// the command FIFO.
    pub(crate) fn draw_triangle(
        &mut self,
        mem: &RdpMemory,
        shade: bool,
        texture: bool,
        zbuffer: bool,
        rect: bool,
    ) -> Result<()> {
        // Stable copy of the command words; rectangle data is synthesized
        let mut cw = [0u32; 44];
        if rect {
            cw.copy_from_slice(&self.temp_rect_data);
        } else {
            for (i, w) in cw.iter_mut().enumerate() {
                *w = self
                    .cmd_data
                    .get(self.cmd_cur + i)
                    .copied()
                    .unwrap_or(0);
            }
        }

        let w1 = cw[0];
        let flip = w1 & 0x0080_0000 != 0;
        self.misc.max_level = (w1 >> 19) & 7;
        let tilenum = ((w1 >> 16) & 7) as usize;

        let shade_base = 8usize;
        let mut texture_base = 8usize;
        let mut zbuffer_base = 8usize;
        if shade {
            texture_base += 16;
            zbuffer_base += 16;
        }
        if texture {
            zbuffer_base += 16;
        }

        let yl = sign_extend((w1 & 0x3fff) as i32, 14);
        let ym = sign_extend(((cw[1] >> 16) & 0x3fff) as i32, 14);
        let yh = sign_extend((cw[1] & 0x3fff) as i32, 14);
        let xl = sign_extend((cw[2] & 0x3fff_ffff) as i32, 30);
        let xh = sign_extend((cw[4] & 0x3fff_ffff) as i32, 30);
        let xm = sign_extend((cw[6] & 0x3fff_ffff) as i32, 30);
        // Inverse slopes in 16.16 format
        let dxldy = cw[3] as i32;
        let dxhdy = cw[5] as i32;
        let dxmdy = cw[7] as i32;

        let pack = |hi: u32, lo: u32| ((hi & 0xffff_0000) | ((lo >> 16) & 0xffff)) as i32;
        let pack_lo = |hi: u32, lo: u32| (((hi << 16) & 0xffff_0000) | (lo & 0xffff)) as i32;

        let mut r = pack(cw[shade_base], cw[shade_base + 4]);
        let mut g = pack_lo(cw[shade_base], cw[shade_base + 4]);
        let mut b = pack(cw[shade_base + 1], cw[shade_base + 5]);
        let mut a = pack_lo(cw[shade_base + 1], cw[shade_base + 5]);
        let drdx = pack(cw[shade_base + 2], cw[shade_base + 6]);
        let dgdx = pack_lo(cw[shade_base + 2], cw[shade_base + 6]);
        let dbdx = pack(cw[shade_base + 3], cw[shade_base + 7]);
        let dadx = pack_lo(cw[shade_base + 3], cw[shade_base + 7]);
        let drde = pack(cw[shade_base + 8], cw[shade_base + 12]);
        let dgde = pack_lo(cw[shade_base + 8], cw[shade_base + 12]);
        let dbde = pack(cw[shade_base + 9], cw[shade_base + 13]);
        let dade = pack_lo(cw[shade_base + 9], cw[shade_base + 13]);
        let drdy = pack(cw[shade_base + 10], cw[shade_base + 14]);
        let dgdy = pack_lo(cw[shade_base + 10], cw[shade_base + 14]);
        let dbdy = pack(cw[shade_base + 11], cw[shade_base + 15]);
        let dady = pack_lo(cw[shade_base + 11], cw[shade_base + 15]);

        let mut s = pack(cw[texture_base], cw[texture_base + 4]);
        let mut t = pack_lo(cw[texture_base], cw[texture_base + 4]);
        let mut w = pack(cw[texture_base + 1], cw[texture_base + 5]);
        let dsdx = pack(cw[texture_base + 2], cw[texture_base + 6]);
        let dtdx = pack_lo(cw[texture_base + 2], cw[texture_base + 6]);
        let dwdx = pack(cw[texture_base + 3], cw[texture_base + 7]);
        let dsde = pack(cw[texture_base + 8], cw[texture_base + 12]);
        let dtde = pack_lo(cw[texture_base + 8], cw[texture_base + 12]);
        let dwde = pack(cw[texture_base + 9], cw[texture_base + 13]);
        let dsdy = pack(cw[texture_base + 10], cw[texture_base + 14]);
        let dtdy = pack_lo(cw[texture_base + 10], cw[texture_base + 14]);
        let dwdy = pack(cw[texture_base + 11], cw[texture_base + 15]);

        let mut z = cw[zbuffer_base] as i32;
        let dzdx = cw[zbuffer_base + 1] as i32;
        let dzde = cw[zbuffer_base + 2] as i32;
        let dzdy = cw[zbuffer_base + 3] as i32;

        let dzdy_dz = (dzdy >> 16) & 0xffff;
        let dzdx_dz = (dzdx >> 16) & 0xffff;

        self.span_base.drdy = drdy;
        self.span_base.dgdy = dgdy;
        self.span_base.dbdy = dbdy;
        self.span_base.dady = dady;
        self.span_base.dzdy = if self.other_modes.z_source_sel { 0 } else { dzdy };

        let temp_dzpix = (if dzdy_dz & 0x8000 != 0 {
            !dzdy_dz & 0x7fff
        } else {
            dzdy_dz
        }) + (if dzdx_dz & 0x8000 != 0 {
            !dzdx_dz & 0x7fff
        } else {
            dzdx_dz
        });
        self.span_base.dr = drdx & !0x1f;
        self.span_base.dg = dgdx & !0x1f;
        self.span_base.db = dbdx & !0x1f;
        self.span_base.da = dadx & !0x1f;
        self.span_base.ds = dsdx;
        self.span_base.dt = dtdx;
        self.span_base.dw = dwdx;
        self.span_base.dz = if self.other_modes.z_source_sel { 0 } else { dzdx };
        self.span_base.dzpix = self.tables.dzpix_normalize[(temp_dzpix & 0xffff) as usize] as i32;

        let mut xleft_inc = (dxmdy >> 2) & !1;
        let mut xright_inc = (dxhdy >> 2) & !1;
        let mut xright = xh & !1;
        let mut xleft = xm & !1;

        let sign_dxhdy = dxhdy < 0;
        let do_offset = sign_dxhdy == flip;

        let (dsdiff, dtdiff, dwdiff, drdiff, dgdiff, dbdiff, dadiff, dzdiff);
        if do_offset {
            let diff = |de: i32, dy: i32| {
                let deh = de >> 9;
                let dyh = dy >> 9;
                (deh << 8)
                    .wrapping_add(deh << 7)
                    .wrapping_sub(dyh << 8)
                    .wrapping_sub(dyh << 7)
            };
            dsdiff = diff(dsde, dsdy);
            dtdiff = diff(dtde, dtdy);
            dwdiff = diff(dwde, dwdy);
            drdiff = diff(drde, drdy);
            dgdiff = diff(dgde, dgdy);
            dbdiff = diff(dbde, dbdy);
            dadiff = diff(dade, dady);
            dzdiff = diff(dzde, dzdy);
        } else {
            dsdiff = 0;
            dtdiff = 0;
            dwdiff = 0;
            drdiff = 0;
            dgdiff = 0;
            dbdiff = 0;
            dadiff = 0;
            dzdiff = 0;
        }

        let dsdxh = dsdx >> 8;
        let dtdxh = dtdx >> 8;
        let dwdxh = dwdx >> 8;
        let drdxh = drdx >> 8;
        let dgdxh = dgdx >> 8;
        let dbdxh = dbdx >> 8;
        let dadxh = dadx >> 8;
        let dzdxh = dzdx >> 8;

        let ycur = yh & !3;
        let ylfar = yl | 3;
        let ldflag: i32 = if sign_dxhdy != flip { 0 } else { 3 };

        let clipy1 = self.scissor.yh;
        let clipy2 = self.scissor.yl;

        // Trivial reject against the scissor's vertical range
        if (ycur >> 2) >= clipy2 && (ylfar >> 2) >= clipy2 {
            return Ok(());
        }
        if (ycur >> 2) < clipy1 && (ylfar >> 2) < clipy1 {
            return Ok(());
        }

        // Walking below the scissor bottom would only produce spans the
        // renderer discards, so stop there; this also bounds the span
        // working set to the scissor height.
        let ylfar_walk = ylfar.min((clipy2 << 2) + 3);
        let capacity = self.aux_arena.len();
        let required = (((ylfar_walk - ycur) >> 2) + 1).max(0) as usize;
        if required > capacity {
            return Err(RdpError::SpanPoolExhausted {
                required,
                capacity,
            });
        }

        let mut majorx = [0i32; 4];
        let mut minorx = [0i32; 4];
        let mut majorxint = [0i32; 4];
        let mut minorxint = [0i32; 4];

        let mut minv: i32 = 0xfff;
        let mut maxv: i32 = 0;
        let mut valid = false;
        let mut used: usize = 0;
        let base = ycur >> 2;

        let mut k = ycur;
        while k <= ylfar_walk {
            if k == ym {
                xleft = xl & !1;
                xleft_inc = (dxldy >> 2) & !1;
            }

            let xstart = xleft >> 16;
            let xend = xright >> 16;
            let j = k >> 2;
            let spanidx = ((k - ycur) >> 2) as usize;
            let spix = k & 3;
            let valid_y = !(k < yh || k >= yl);

            {
                majorxint[spix as usize] = xend;
                minorxint[spix as usize] = xstart;
                majorx[spix as usize] = xright;
                minorx[spix as usize] = xleft;

                if spix == 0 {
                    maxv = 0;
                    minv = 0xfff;
                }
                if valid_y {
                    if flip {
                        maxv = maxv.max(xstart);
                        minv = minv.min(xend);
                    } else {
                        minv = minv.min(xstart);
                        maxv = maxv.max(xend);
                    }
                }

                if spix == 0 {
                    self.aux_arena[spanidx].reset((k as u32).wrapping_mul(0x9e37_79b9) | 1);
                    self.span_buf[spanidx].scanline = j;
                    valid = true;
                    used = used.max(spanidx + 1);
                }

                if spix == 3 {
                    let span = &mut self.span_buf[spanidx];
                    if flip {
                        span.startx = maxv;
                        span.stopx = minv;
                    } else {
                        span.startx = minv;
                        span.stopx = maxv;
                    }
                    compute_cvg(
                        &mut self.aux_arena[spanidx],
                        &majorx,
                        &minorx,
                        &majorxint,
                        &minorxint,
                        j,
                        yh,
                        yl,
                        flip,
                    );
                }

                if spix == ldflag {
                    let span = &mut self.span_buf[spanidx];
                    span.unscissored_rx = xend;
                    let xfrac = (xright >> 8) & 0xff;
                    let start = |v: i32, vdiff: i32, vdxh: i32| {
                        ((v >> 9) << 9)
                            .wrapping_add(vdiff)
                            .wrapping_sub(xfrac.wrapping_mul(vdxh))
                    };
                    span.r = start(r, drdiff, drdxh);
                    span.g = start(g, dgdiff, dgdxh);
                    span.b = start(b, dbdiff, dbdxh);
                    span.a = start(a, dadiff, dadxh);
                    span.s = start(s, dsdiff, dsdxh) & !0x1f;
                    span.t = start(t, dtdiff, dtdxh) & !0x1f;
                    span.w = start(w, dwdiff, dwdxh) & !0x1f;
                    span.z = start(z, dzdiff, dzdxh);
                }
            }

            if spix == 3 {
                r = r.wrapping_add(drde);
                g = g.wrapping_add(dgde);
                b = b.wrapping_add(dbde);
                a = a.wrapping_add(dade);
                s = s.wrapping_add(dsde);
                t = t.wrapping_add(dtde);
                w = w.wrapping_add(dwde);
                z = z.wrapping_add(dzde);
            }
            xleft = xleft.wrapping_add(xleft_inc);
            xright = xright.wrapping_add(xright_inc);
            k += 1;
        }

        if !valid {
            return Ok(());
        }

        // Intersect the produced scanline range with the scissor and
        // render what survives
        let start = (yh >> 2).max(clipy1);
        let end = (yl >> 2).min(clipy2 - 1);
        if end < start {
            return Ok(());
        }
        let lo = (start - base) as usize;
        let hi = (((end - base) as usize) + 1).min(used);
        if lo >= hi {
            return Ok(());
        }

        let object = RenderObject::snapshot(self, tilenum, flip, rect);
        render::render_spans(
            &object,
            &self.span_buf[lo..hi],
            &mut self.aux_arena[lo..hi],
            mem,
            &self.tables,
            self.config.workers,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cvg_nibbles() {
        // Fully covered position: all four sample bits of the mask
        assert_eq!(leftcvghex(0, 0xf), 0xf);
        // Fully missed from the right
        assert_eq!(rightcvghex(0, 0xf), 0);
        // A fractional crossing covers part of the nibble
        let partial = leftcvghex(2 << 14, 0xf);
        assert!(partial < 0xf);
    }

    #[test]
    fn test_cvg_sticky_bit() {
        // Any sub-16384 fraction below the sample bits still nudges
        // coverage by one sample
        let without = leftcvghex(1 << 14, 0xf);
        let with = leftcvghex((1 << 14) | 2, 0xf);
        assert!(with < without || (without == 0 && with == 0));
    }
}
