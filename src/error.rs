//! Error types for catalog operations.

use std::path::PathBuf;

use cotf_geo::CoordinateTransformError;
use thiserror::Error;

use crate::model::FeatureId;

/// Errors raised while binding, materializing or activating catalog images.
///
/// None of these escape a controller: they are turned into diagnostics at the
/// controller boundary.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The feature behind an image has no usable geometry.
    #[error("Geometry of feature (fid = {fid}) of layer ('{layer}') is invalid")]
    GeometryInvalid {
        /// Feature whose geometry could not be read
        fid: FeatureId,
        /// Name of the catalog layer
        layer: String,
    },

    /// An activated raster does not belong to this catalog.
    #[error("Image ({image}) not in catalog layer ('{layer}')")]
    NotACatalogImage {
        /// Basename of the raster source
        image: String,
        /// Name of the catalog layer
        layer: String,
    },

    /// Canvas and layer coordinate systems cannot be converted.
    #[error(transparent)]
    CoordinateTransform(#[from] CoordinateTransformError),

    /// A raster could not be loaded.
    #[error("Invalid image '{image}': {reason}")]
    InvalidResource {
        /// Image identifier
        image: String,
        /// Loader message
        reason: String,
    },

    /// A remote source could not be fetched into the scratch directory.
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch {
        /// Source URL
        url: String,
        /// Transport or I/O message
        reason: String,
    },

    /// The scratch directory could not be used.
    #[error("Scratch directory {path:?} unusable: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An operation needs a bound catalog layer.
    #[error("Need define layer catalog")]
    NotBound,
}

impl CatalogError {
    pub fn invalid_resource(image: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResource {
            image: image.into(),
            reason: reason.into(),
        }
    }

    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
