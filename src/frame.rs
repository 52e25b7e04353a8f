//! Typed views over caller-owned pixel buffers.
//!
//! The engine never does per-format pointer math itself; everything it needs
//! from a frame goes through the small capability surface here (`sad`,
//! `copy_pixel`, luma and alpha reads), implemented once per supported
//! layout.

use crate::{errors::Error, Dims};

/// The pixel layouts the engine understands.
///
/// This is a closed set: the engine dispatches on it when classifying the
/// mask and deriving luma, and the frame views dispatch on it for channel
/// access.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PixelLayout {
    /// Packed 4 bytes per pixel, R G B A. The alpha channel doubles as the
    /// inpaint mask (alpha > 127 marks a pixel for removal), so no separate
    /// mask buffer is accepted.
    RgbaAlphaMask,
    /// Packed 4 bytes per pixel, R G B X. The fourth byte is copied along
    /// with the color but otherwise ignored. Requires a packed mask buffer.
    Rgbx32,
    /// Packed 3 bytes per pixel, R G B. Requires a packed mask buffer.
    Rgb24,
    /// Planar Y plane plus 2x2-subsampled U and V planes, each with its own
    /// stride. Requires a planar mask.
    Yuv420,
    /// Packed 3 bytes per pixel, Y U V, no chroma subsampling. Requires a
    /// packed mask buffer.
    Yuv24,
}

impl PixelLayout {
    pub fn is_planar(self) -> bool {
        matches!(self, Self::Yuv420)
    }

    /// Whether `run` must be given a separate mask buffer for this layout.
    pub fn needs_mask(self) -> bool {
        !matches!(self, Self::RgbaAlphaMask)
    }

    pub(crate) fn bytes_per_pixel(self) -> usize {
        match self {
            Self::RgbaAlphaMask | Self::Rgbx32 => 4,
            Self::Rgb24 | Self::Yuv24 => 3,
            // per plane; chroma handled separately
            Self::Yuv420 => 1,
        }
    }
}

pub struct PackedFrame<'a> {
    data: &'a mut [u8],
    stride: usize,
    layout: PixelLayout,
}

pub struct PlanarFrame<'a> {
    y: &'a mut [u8],
    y_stride: usize,
    u: &'a mut [u8],
    v: &'a mut [u8],
    uv_stride: usize,
}

/// A mutable view of the caller's pixel buffer(s) for one frame.
///
/// The engine mutates the frame in place; the view borrows the buffers for
/// the duration of one `run` call.
pub enum FrameMut<'a> {
    Packed(PackedFrame<'a>),
    Planar(PlanarFrame<'a>),
}

impl<'a> FrameMut<'a> {
    /// Wraps a packed (interleaved) buffer. `stride` is in bytes.
    ///
    /// Panics if `layout` is a planar layout; use [`FrameMut::planar`] for
    /// those.
    pub fn packed(layout: PixelLayout, data: &'a mut [u8], stride: usize) -> Self {
        assert!(
            !layout.is_planar(),
            "packed frame constructed with a planar layout"
        );
        Self::Packed(PackedFrame {
            data,
            stride,
            layout,
        })
    }

    /// Wraps separate Y/U/V planes of a 4:2:0 frame. Strides are in bytes;
    /// the U and V planes share one stride, as they always do in practice.
    pub fn planar(
        y: &'a mut [u8],
        y_stride: usize,
        u: &'a mut [u8],
        v: &'a mut [u8],
        uv_stride: usize,
    ) -> Self {
        Self::Planar(PlanarFrame {
            y,
            y_stride,
            u,
            v,
            uv_stride,
        })
    }

    pub(crate) fn layout(&self) -> PixelLayout {
        match self {
            Self::Packed(p) => p.layout,
            Self::Planar(_) => PixelLayout::Yuv420,
        }
    }

    pub(crate) fn check_dims(&self, dims: Dims) -> Result<(), Error> {
        let (w, h) = (dims.width as usize, dims.height as usize);
        match self {
            Self::Packed(p) => {
                let bpp = p.layout.bytes_per_pixel();
                if p.stride < w * bpp {
                    return Err(Error::BufferTooSmall("frame"));
                }
                if p.data.len() < p.stride * (h - 1) + w * bpp {
                    return Err(Error::BufferTooSmall("frame"));
                }
            }
            Self::Planar(p) => {
                let (cw, ch) = ((w + 1) / 2, (h + 1) / 2);
                if p.y_stride < w || p.uv_stride < cw {
                    return Err(Error::BufferTooSmall("frame"));
                }
                if p.y.len() < p.y_stride * (h - 1) + w
                    || p.u.len() < p.uv_stride * (ch - 1) + cw
                    || p.v.len() < p.uv_stride * (ch - 1) + cw
                {
                    return Err(Error::BufferTooSmall("frame"));
                }
            }
        }
        Ok(())
    }

    /// Sum of absolute channel differences between the pixel at `target`
    /// and the pixel at `source`. Three channels for every layout: R/G/B
    /// for the packed RGB layouts (the fourth byte is never compared),
    /// Y/U/V for the YUV ones, with 4:2:0 chroma sampled at half
    /// resolution (nearest, no interpolation).
    #[inline]
    pub(crate) fn sad(&self, target: (i32, i32), source: (i32, i32)) -> u32 {
        match self {
            Self::Packed(p) => {
                let t = p.offset(target.0, target.1);
                let s = p.offset(source.0, source.1);
                let mut sum = 0u32;
                for c in 0..3 {
                    sum += (i32::from(p.data[t + c]) - i32::from(p.data[s + c])).abs() as u32;
                }
                sum
            }
            Self::Planar(p) => {
                let ty = p.y_at(target.0, target.1);
                let sy = p.y_at(source.0, source.1);
                let (tu, tv) = p.uv_at(target.0, target.1);
                let (su, sv) = p.uv_at(source.0, source.1);
                ((i32::from(ty) - i32::from(sy)).abs()
                    + (i32::from(tu) - i32::from(su)).abs()
                    + (i32::from(tv) - i32::from(sv)).abs()) as u32
            }
        }
    }

    /// Copies one pixel from `from` to `to`, all channels. For 4:2:0 the
    /// shared chroma sample of the destination block is overwritten with
    /// the donor's.
    #[inline]
    pub(crate) fn copy_pixel(&mut self, from: (i32, i32), to: (i32, i32)) {
        match self {
            Self::Packed(p) => {
                let bpp = p.layout.bytes_per_pixel();
                let s = p.offset(from.0, from.1);
                let d = p.offset(to.0, to.1);
                for c in 0..bpp {
                    let v = p.data[s + c];
                    p.data[d + c] = v;
                }
            }
            Self::Planar(p) => {
                let s = p.y_stride * from.1 as usize + from.0 as usize;
                let d = p.y_stride * to.1 as usize + to.0 as usize;
                p.y[d] = p.y[s];
                let s = p.uv_stride * (from.1 >> 1) as usize + (from.0 >> 1) as usize;
                let d = p.uv_stride * (to.1 >> 1) as usize + (to.0 >> 1) as usize;
                p.u[d] = p.u[s];
                p.v[d] = p.v[s];
            }
        }
    }

    /// Brightness of a packed pixel, used to seed the engine's gray buffer.
    /// BT.601 integer weights for RGB; the Y byte for packed YUV. Planar
    /// frames never go through here, their Y plane is read directly.
    #[inline]
    pub(crate) fn derived_luma(&self, x: i32, y: i32) -> u8 {
        match self {
            Self::Packed(p) => {
                let i = p.offset(x, y);
                match p.layout {
                    PixelLayout::RgbaAlphaMask | PixelLayout::Rgbx32 | PixelLayout::Rgb24 => {
                        let r = i32::from(p.data[i]);
                        let g = i32::from(p.data[i + 1]);
                        let b = i32::from(p.data[i + 2]);
                        ((b * 3735 + g * 19268 + r * 9765) / 32768) as u8
                    }
                    PixelLayout::Yuv24 => p.data[i],
                    PixelLayout::Yuv420 => unreachable!(),
                }
            }
            Self::Planar(p) => p.y_at(x, y),
        }
    }

    /// The Y sample of a planar frame; the live luma source for 4:2:0.
    #[inline]
    pub(crate) fn plane_luma(&self, x: i32, y: i32) -> u8 {
        match self {
            Self::Planar(p) => p.y_at(x, y),
            Self::Packed(_) => unreachable!("packed layouts use the gray buffer"),
        }
    }

    /// Alpha byte of a packed 32-bit pixel (the embedded mask channel).
    #[inline]
    pub(crate) fn alpha(&self, x: i32, y: i32) -> u8 {
        match self {
            Self::Packed(p) => p.data[p.offset(x, y) + 3],
            Self::Planar(_) => unreachable!("planar frames carry no alpha"),
        }
    }
}

impl<'a> PackedFrame<'a> {
    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        self.stride * y as usize + self.layout.bytes_per_pixel() * x as usize
    }
}

impl<'a> PlanarFrame<'a> {
    #[inline]
    fn y_at(&self, x: i32, y: i32) -> u8 {
        self.y[self.y_stride * y as usize + x as usize]
    }

    #[inline]
    fn uv_at(&self, x: i32, y: i32) -> (u8, u8) {
        let i = self.uv_stride * (y >> 1) as usize + (x >> 1) as usize;
        (self.u[i], self.v[i])
    }
}

/// A read-only view of the caller's mask buffer(s).
///
/// The mask uses the same layout family as the frame it belongs to: a
/// packed byte buffer for packed frames, three planes for 4:2:0 frames.
pub enum MaskRef<'a> {
    Packed {
        data: &'a [u8],
        stride: usize,
    },
    Planar {
        y: &'a [u8],
        y_stride: usize,
        u: &'a [u8],
        v: &'a [u8],
        uv_stride: usize,
    },
}

impl<'a> MaskRef<'a> {
    pub fn packed(data: &'a [u8], stride: usize) -> Self {
        Self::Packed { data, stride }
    }

    pub fn planar(
        y: &'a [u8],
        y_stride: usize,
        u: &'a [u8],
        v: &'a [u8],
        uv_stride: usize,
    ) -> Self {
        Self::Planar {
            y,
            y_stride,
            u,
            v,
            uv_stride,
        }
    }

    pub(crate) fn check_dims(&self, layout: PixelLayout, dims: Dims) -> Result<(), Error> {
        let (w, h) = (dims.width as usize, dims.height as usize);
        match self {
            Self::Packed { data, stride } => {
                if layout.is_planar() {
                    return Err(Error::MaskKind(layout));
                }
                let bpp = layout.bytes_per_pixel();
                if *stride < w * bpp || data.len() < stride * (h - 1) + w * bpp {
                    return Err(Error::BufferTooSmall("mask"));
                }
            }
            Self::Planar {
                y,
                y_stride,
                u,
                v,
                uv_stride,
            } => {
                if !layout.is_planar() {
                    return Err(Error::MaskKind(layout));
                }
                let (cw, ch) = ((w + 1) / 2, (h + 1) / 2);
                if *y_stride < w || *uv_stride < cw {
                    return Err(Error::BufferTooSmall("mask"));
                }
                if y.len() < y_stride * (h - 1) + w
                    || u.len() < uv_stride * (ch - 1) + cw
                    || v.len() < uv_stride * (ch - 1) + cw
                {
                    return Err(Error::BufferTooSmall("mask"));
                }
            }
        }
        Ok(())
    }

    /// The mask pixel packed into the color key the engine compares against
    /// `mask_color`: `0xRRGGBB` for RGB layouts, `0xYYUUVV` for YUV ones.
    /// Alpha (the fourth packed byte) never participates.
    #[inline]
    pub(crate) fn color_key(&self, layout: PixelLayout, x: i32, y: i32) -> u32 {
        match self {
            Self::Packed { data, stride } => {
                let i = stride * y as usize + layout.bytes_per_pixel() * x as usize;
                u32::from(data[i]) << 16 | u32::from(data[i + 1]) << 8 | u32::from(data[i + 2])
            }
            Self::Planar {
                y: yp,
                y_stride,
                u,
                v,
                uv_stride,
            } => {
                let yi = y_stride * y as usize + x as usize;
                let ci = uv_stride * (y >> 1) as usize + (x >> 1) as usize;
                u32::from(yp[yi]) << 16 | u32::from(u[ci]) << 8 | u32::from(v[ci])
            }
        }
    }
}
