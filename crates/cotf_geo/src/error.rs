use thiserror::Error;

/// A pair of coordinate systems that cannot be converted into each other.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateTransformError {
    #[error("Unsupported coordinate system '{auth_id}': {reason}")]
    UnsupportedCrs { auth_id: String, reason: String },

    #[error("Cannot transform from {from} to {to}: {reason}")]
    Projection {
        from: String,
        to: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, CoordinateTransformError>;
