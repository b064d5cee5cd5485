//! Texture upload.
//!
//! Only 8-bit RGBA data goes to the device.  `Rgba` (premultiplied) and
//! `Nrgba` (straight alpha) share the same byte layout; decoded PNGs are
//! straight alpha.

use crate::device::{Device, Sampling, TextureId, TextureWrap};
use crate::error::RenderError;

use super::Binder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgba,
    Nrgba,
    Rgb,
    Gray,
    GrayAlpha,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgba | PixelLayout::Nrgba => 4,
            PixelLayout::Rgb => 3,
            PixelLayout::Gray => 1,
            PixelLayout::GrayAlpha => 2,
        }
    }

    fn uploadable(self) -> bool {
        matches!(self, PixelLayout::Rgba | PixelLayout::Nrgba)
    }
}

/// Borrowed image rows, bottom row first.
#[derive(Debug, Clone, Copy)]
pub struct Pixels<'a> {
    layout: PixelLayout,
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> Pixels<'a> {
    /// Fails with `InvalidImage` when `data` does not hold exactly
    /// `width * height` pixels.
    pub fn new(layout: PixelLayout, width: u32, height: u32, data: &'a [u8]) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * layout.bytes_per_pixel();
        if data.len() != expected {
            return Err(RenderError::InvalidImage(format!(
                "{width}x{height} {layout:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            layout,
            width,
            height,
            data,
        })
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a image::DynamicImage> for Pixels<'a> {
    type Error = RenderError;

    fn try_from(img: &'a image::DynamicImage) -> Result<Self, RenderError> {
        use image::DynamicImage;

        let layout = match img {
            DynamicImage::ImageRgba8(_) => PixelLayout::Nrgba,
            DynamicImage::ImageRgb8(_) => PixelLayout::Rgb,
            DynamicImage::ImageLuma8(_) => PixelLayout::Gray,
            DynamicImage::ImageLumaA8(_) => PixelLayout::GrayAlpha,
            other => {
                return Err(RenderError::UnsupportedImageFormat(format!("{:?}", other.color())))
            }
        };
        Pixels::new(layout, img.width(), img.height(), img.as_bytes())
    }
}

fn require_rgba(pixels: &Pixels<'_>) -> Result<(), RenderError> {
    if pixels.layout.uploadable() {
        Ok(())
    } else {
        Err(RenderError::UnsupportedImageFormat(format!("{:?}", pixels.layout)))
    }
}

impl<D: Device> Binder<D> {
    /// Creates a mipmapped, repeating texture from `pixels`.  A pending
    /// device error fails with `StaleDevice` before anything is allocated.
    pub fn bind_texture(&mut self, pixels: &Pixels<'_>) -> Result<TextureId, RenderError> {
        self.check_device("bind_texture")?;
        require_rgba(pixels)?;

        let texture = self.device.create_texture()?;
        self.device
            .upload_texture(texture, pixels.width, pixels.height, pixels.data);
        self.device.generate_mipmaps(texture);
        self.device
            .set_sampling(texture, Sampling::mipmapped(TextureWrap::Repeat));
        if let Some(code) = self.device.poll_error() {
            self.device.delete_texture(texture);
            return Err(RenderError::DeviceCall {
                operation: "bind_texture",
                code,
            });
        }
        log::debug!("texture {}x{} -> {texture}", pixels.width, pixels.height);
        Ok(texture)
    }

    /// Replaces the contents of an existing texture.  Its wrap mode stays.
    pub fn update_texture(&mut self, texture: TextureId, pixels: &Pixels<'_>) -> Result<(), RenderError> {
        require_rgba(pixels)?;
        self.device
            .upload_texture(texture, pixels.width, pixels.height, pixels.data);
        self.device.generate_mipmaps(texture);
        match self.device.poll_error() {
            Some(code) => Err(RenderError::DeviceCall {
                operation: "update_texture",
                code,
            }),
            None => Ok(()),
        }
    }

    /// Switches between edge clamping and repeating without re-uploading.
    pub fn set_texture_wrap_mode(&mut self, texture: TextureId, clamped: bool) {
        let wrap = if clamped {
            TextureWrap::ClampToEdge
        } else {
            TextureWrap::Repeat
        };
        self.device.set_sampling(texture, Sampling::mipmapped(wrap));
    }

    pub fn release_texture(&mut self, texture: TextureId) {
        if texture.is_allocated() {
            self.device.delete_texture(texture);
        }
    }
}
