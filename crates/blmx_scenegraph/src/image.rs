use serde::{Deserialize, Serialize};

/// Where Blender gets the image data from (`bpy.types.Image.source`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageSourceKind {
    File,
    Sequence,
    Movie,
    Generated,
    Viewer,
    Tiled,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageFileFormat {
    Png,
    Jpeg,
    Bmp,
    Targa,
    Hdr,
    OpenExr,
    Tiff,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageSource {
    pub name: String,
    pub source: ImageSourceKind,
    /// Absolute path as returned by `filepath_from_user()`; empty for generated images.
    #[serde(default)]
    pub filepath: String,
    pub file_format: ImageFileFormat,
    #[serde(default)]
    pub is_packed: bool,
    #[serde(default)]
    pub is_dirty: bool,
    pub size: [u32; 2],
    #[serde(default = "default_channels")]
    pub channels: u32,
    /// Float pixels, bottom row first, `channels` values per pixel.
    /// Only sent for images that cannot be referenced by path.
    #[serde(default)]
    pub pixels: Option<Vec<f32>>,
}
fn default_channels() -> u32 {
    4
}

impl ImageSource {
    pub fn is_empty(&self) -> bool {
        self.size[0] == 0 || self.size[1] == 0
    }
    /// Packed, generated and edited images only exist in Blender's memory.
    pub fn needs_export(&self) -> bool {
        self.is_packed || self.is_dirty || self.source == ImageSourceKind::Generated
    }
}
