//! Texture decoding for font atlases.
//!
//! Pack resources embed texture images as base64-encoded PNG payloads. This module
//! decodes them into tightly packed RGBA8 pixels that a renderer can upload as-is.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

const DATA_URI_PNG_PREFIX: &str = "data:image/png;base64,";

/// Errors produced while decoding a texture payload.
#[derive(thiserror::Error, Debug)]
pub enum TextureError {
    #[error("texture payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("texture payload is not a readable PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// Decoded RGBA8 texture.
#[derive(Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
    /// Font atlases are sampled without mipmaps/filtering tweaks by the renderer.
    pub font_texture: bool,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .field("font_texture", &self.font_texture)
            .finish()
    }
}

impl Texture {
    /// Decode a base64 PNG payload. A leading `data:image/png;base64,` is accepted.
    pub fn from_base64_png(payload: &str) -> Result<Self, TextureError> {
        let payload = payload
            .strip_prefix(DATA_URI_PNG_PREFIX)
            .unwrap_or(payload)
            .trim();
        let bytes = STANDARD.decode(payload)?;
        Self::from_png_bytes(&bytes)
    }

    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, TextureError> {
        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
            font_texture: false,
        })
    }

    #[inline]
    pub fn mark_as_font_texture(&mut self) {
        self.font_texture = true;
    }
}
