//! Makes Blender images available as files a MaterialX `image` node can read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use blmx_common::image::{self, DynamicImage, ImageBuffer, Rgba};
use blmx_common::log;
use blmx_common::parking_lot::Mutex;
use blmx_common::sha2::{Digest, Sha256};
use blmx_common::Config;
use blmx_scenegraph::{ImageFileFormat, ImageSource, ImageSourceKind};

/// Extensions a renderer can read straight from Blender's file path.
const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg", "hdr", "tga", "bmp"];

/// Extension used when re-encoding an image of the given format.
fn export_extension(format: ImageFileFormat) -> Option<&'static str> {
    match format {
        ImageFileFormat::Png => Some("png"),
        ImageFileFormat::Jpeg => Some("jpg"),
        ImageFileFormat::Bmp => Some("bmp"),
        ImageFileFormat::Targa => Some("tga"),
        ImageFileFormat::OpenExr => Some("exr"),
        ImageFileFormat::Tiff => Some("tif"),
        ImageFileFormat::Hdr | ImageFileFormat::Other => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image `{0}` has zero size")]
    Empty(String),
    #[error("image `{name}` has unsupported source {kind:?}")]
    UnsupportedSource { name: String, kind: ImageSourceKind },
    #[error("image `{0}` has to be exported but no pixels were provided")]
    MissingPixels(String),
    #[error("image `{name}`: expected {expected} pixel values, got {got}")]
    PixelCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("image file `{0}` does not exist")]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Encode(#[from] image::ImageError),
}

/// Files written for in-memory images, keyed by content hash.
///
/// Shared between the materials of one export, so an image packed into the
/// .blend is written once no matter how many materials use it.
pub struct ImageCache {
    dir: PathBuf,
    default_extension: String,
    files: Mutex<HashMap<String, PathBuf>>,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>, default_extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            default_extension: default_extension.into(),
            files: Mutex::new(HashMap::new()),
        }
    }
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.image_cache_dir(), config.default_image_extension.clone())
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    /// Path to use for `image`'s `file` input.
    pub fn resolve(&self, image: &ImageSource) -> Result<PathBuf, ImageError> {
        match image.source {
            ImageSourceKind::Tiled | ImageSourceKind::Sequence => {
                return Err(ImageError::UnsupportedSource {
                    name: image.name.clone(),
                    kind: image.source,
                })
            }
            _ => {}
        }
        if image.is_empty() {
            return Err(ImageError::Empty(image.name.clone()));
        }
        let path = PathBuf::from(&image.filepath);
        let direct = !image.needs_export()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if direct {
            return if path.is_file() {
                Ok(path)
            } else {
                Err(ImageError::NotFound(path))
            };
        }
        self.export(image)
    }

    fn export(&self, image: &ImageSource) -> Result<PathBuf, ImageError> {
        let extension = export_extension(image.file_format)
            .unwrap_or(self.default_extension.as_str())
            .to_string();
        let pixels: &[f32] = match &image.pixels {
            Some(pixels) => pixels,
            None if !image.needs_export() => {
                // a file in a format we cannot reference, convert it
                let path = Path::new(&image.filepath);
                if !path.is_file() {
                    return Err(ImageError::NotFound(path.to_path_buf()));
                }
                let decoded = image::open(path)?.into_rgba32f();
                return self.store(image, &extension, &decoded);
            }
            None => return Err(ImageError::MissingPixels(image.name.clone())),
        };
        let [width, height] = image.size;
        let channels = image.channels.clamp(1, 4) as usize;
        let expected = width as usize * height as usize * channels;
        if pixels.len() != expected {
            return Err(ImageError::PixelCount {
                name: image.name.clone(),
                expected,
                got: pixels.len(),
            });
        }
        // Blender stores rows bottom-up
        let buffer = ImageBuffer::from_fn(width, height, |x, y| {
            let row = (height - 1 - y) as usize;
            let base = (row * width as usize + x as usize) * channels;
            let px = &pixels[base..base + channels];
            let rgba = match channels {
                1 => [px[0], px[0], px[0], 1.0],
                2 => [px[0], px[0], px[0], px[1]],
                3 => [px[0], px[1], px[2], 1.0],
                _ => [px[0], px[1], px[2], px[3]],
            };
            Rgba(rgba)
        });
        self.store(image, &extension, &buffer)
    }

    fn store(
        &self,
        image: &ImageSource,
        extension: &str,
        buffer: &ImageBuffer<Rgba<f32>, Vec<f32>>,
    ) -> Result<PathBuf, ImageError> {
        let mut hasher = Sha256::new();
        hasher.update(image.name.as_bytes());
        hasher.update(buffer.width().to_le_bytes());
        hasher.update(buffer.height().to_le_bytes());
        for v in buffer.as_raw() {
            hasher.update(v.to_le_bytes());
        }
        let digest = hasher.finalize();
        let hash: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        let key = format!("{}.{}", hash, extension);

        let mut files = self.files.lock();
        if let Some(path) = files.get(&key) {
            if path.is_file() {
                return Ok(path.clone());
            }
        }
        std::fs::create_dir_all(&self.dir)?;
        let stem: String = image
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = self.dir.join(format!("{}_{}.{}", stem, hash, extension));
        let img = DynamicImage::ImageRgba32F(buffer.clone());
        match extension {
            "exr" => img.save(&path)?,
            "hdr" => DynamicImage::ImageRgb32F(img.to_rgb32f()).save(&path)?,
            "jpg" | "jpeg" => DynamicImage::ImageRgb8(img.to_rgb8()).save(&path)?,
            _ => DynamicImage::ImageRgba8(img.to_rgba8()).save(&path)?,
        }
        log::debug!("wrote image `{}` to {}", image.name, path.display());
        files.insert(key, path.clone());
        Ok(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn generated(name: &str, pixels: Vec<f32>, size: [u32; 2]) -> ImageSource {
        ImageSource {
            name: name.into(),
            source: ImageSourceKind::Generated,
            filepath: String::new(),
            file_format: ImageFileFormat::Png,
            is_packed: false,
            is_dirty: false,
            size,
            channels: 4,
            pixels: Some(pixels),
        }
    }

    #[test]
    fn test_generated_image_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path(), "png");
        let img = generated("Untitled", vec![1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0], [2, 1]);
        let a = cache.resolve(&img).unwrap();
        let b = cache.resolve(&img).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(a.extension().unwrap(), "png");
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("Untitled_"));
        let decoded = image::open(&a).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_rows_flipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path(), "png");
        // bottom row red, top row blue
        let img = generated("flip", vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0], [1, 2]);
        let path = cache.resolve(&img).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(decoded.get_pixel(0, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_unknown_format_uses_default_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path(), "png");
        let mut img = generated("odd", vec![0.5; 4], [1, 1]);
        img.file_format = ImageFileFormat::Other;
        let path = cache.resolve(&img).unwrap();
        assert_eq!(path.extension().unwrap(), "png");
    }

    #[test]
    fn test_file_referenced_directly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("albedo.png");
        image::RgbaImage::new(2, 2).save(&file).unwrap();
        let cache = ImageCache::new(dir.path().join("cache"), "png");
        let img = ImageSource {
            name: "albedo.png".into(),
            source: ImageSourceKind::File,
            filepath: file.to_string_lossy().into_owned(),
            file_format: ImageFileFormat::Png,
            is_packed: false,
            is_dirty: false,
            size: [2, 2],
            channels: 4,
            pixels: None,
        };
        assert_eq!(cache.resolve(&img).unwrap(), file);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_rejected_images() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path(), "png");
        let mut img = generated("tiles", vec![], [4, 4]);
        img.source = ImageSourceKind::Tiled;
        assert!(matches!(
            cache.resolve(&img),
            Err(ImageError::UnsupportedSource { .. })
        ));
        let img = generated("empty", vec![], [0, 4]);
        assert!(matches!(cache.resolve(&img), Err(ImageError::Empty(_))));
        let mut img = generated("packed", vec![], [1, 1]);
        img.pixels = None;
        assert!(matches!(cache.resolve(&img), Err(ImageError::MissingPixels(_))));
        let img = generated("short", vec![1.0; 3], [1, 1]);
        assert!(matches!(cache.resolve(&img), Err(ImageError::PixelCount { .. })));
    }
}
