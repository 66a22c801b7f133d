//! Global constants for catalog-on-the-fly

/// Suffix appended to a catalog layer's name to form its group name
pub const GROUP_SUFFIX: &str = " - Catalog";

/// Date format used in raster layer names
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default seconds a highlight stays visible
pub const DEFAULT_HIGHLIGHT_SECONDS: u64 = 3;

/// Default outline width of a highlight, in pixels
pub const DEFAULT_HIGHLIGHT_WIDTH: u32 = 5;

/// Default timeout for remote existence checks and downloads
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Extensions of preprocessed raster descriptors that are never masked
pub const DEFAULT_DESCRIPTOR_EXTENSIONS: &[&str] = &["xml"];

/// Message bar durations, in seconds
pub const INFO_MESSAGE_SECS: u64 = 3;
pub const WARNING_MESSAGE_SECS: u64 = 2;
pub const CRITICAL_MESSAGE_SECS: u64 = 4;

/// Message bar duration of the aggregated load-failure report
pub const LOAD_FAILURE_MESSAGE_SECS: u64 = 5;

/// Group name for a catalog layer name.
pub fn group_name(layer_name: &str) -> String {
    format!("{layer_name}{GROUP_SUFFIX}")
}
