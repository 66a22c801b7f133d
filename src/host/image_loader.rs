//! Raster loader backed by the `image` crate.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::config::is_descriptor_path;

use super::{InvalidResource, RasterHandle, RasterLoader, TransparentPixel};

/// Loads local image files (PNG, JPEG, TIFF, ...) as raster layers.
///
/// Only the header is decoded at load time; pixel data is read on demand by
/// [`ImageRaster::to_rgba`]. Files whose extension is one of the descriptor
/// extensions are accepted as-is when they exist and are not empty.
#[derive(Debug, Clone)]
pub struct ImageRasterLoader {
    descriptor_extensions: Vec<String>,
}

impl ImageRasterLoader {
    pub fn new<S: Into<String>>(descriptor_extensions: impl IntoIterator<Item = S>) -> Self {
        Self {
            descriptor_extensions: descriptor_extensions.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ImageRasterLoader {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_DESCRIPTOR_EXTENSIONS.iter().copied())
    }
}

impl RasterLoader for ImageRasterLoader {
    fn load(&self, path: &Path, display_name: &str) -> Result<Box<dyn RasterHandle>, InvalidResource> {
        if is_descriptor_path(path, &self.descriptor_extensions) {
            let meta = std::fs::metadata(path)
                .map_err(|e| InvalidResource::new(format!("{}: {}", path.display(), e)))?;
            if !meta.is_file() || meta.len() == 0 {
                return Err(InvalidResource::new(format!(
                    "{}: empty descriptor",
                    path.display()
                )));
            }
            log::debug!("Accepted descriptor {:?}", path);
            return Ok(Box::new(ImageRaster::new(path, display_name, None)));
        }

        let (width, height) = image::image_dimensions(path)
            .map_err(|e| InvalidResource::new(format!("{}: {}", path.display(), e)))?;
        if width == 0 || height == 0 {
            return Err(InvalidResource::new(format!(
                "{}: image has no pixels",
                path.display()
            )));
        }
        log::debug!("Loaded {}x{} raster {:?}", width, height, path);
        Ok(Box::new(ImageRaster::new(
            path,
            display_name,
            Some((width, height)),
        )))
    }
}

/// A raster file on disk.
#[derive(Debug, Clone)]
pub struct ImageRaster {
    path: PathBuf,
    source: String,
    name: String,
    dimensions: Option<(u32, u32)>,
    transparency: Vec<TransparentPixel>,
}

impl ImageRaster {
    fn new(path: &Path, name: &str, dimensions: Option<(u32, u32)>) -> Self {
        Self {
            path: path.to_path_buf(),
            source: path.display().to_string(),
            name: name.to_string(),
            dimensions,
            transparency: Vec::new(),
        }
    }

    /// Width and height, `None` for descriptor files.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Decode the image and apply the transparent-pixel list to its alpha channel.
    pub fn to_rgba(&self) -> Result<RgbaImage, InvalidResource> {
        let mut rgba = image::open(&self.path)
            .map_err(|e| InvalidResource::new(format!("Failed to decode image: {}", e)))?
            .to_rgba8();

        if self.transparency.is_empty() {
            return Ok(rgba);
        }

        for pixel in rgba.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            if let Some(rule) = self.transparency.iter().find(|t| t.matches(r, g, b)) {
                let keep = (100.0 - rule.percent_transparent.clamp(0.0, 100.0)) / 100.0;
                pixel.0[3] = (f64::from(a) * keep).round() as u8;
            }
        }
        Ok(rgba)
    }
}

impl RasterHandle for ImageRaster {
    fn source(&self) -> &str {
        &self.source
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn set_transparent_pixels(&mut self, pixels: Vec<TransparentPixel>) {
        self.transparency = pixels;
    }

    fn transparent_pixels(&self) -> &[TransparentPixel] {
        &self.transparency
    }
}
