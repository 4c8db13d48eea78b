use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The fixed timestamp pattern exiftool reads and writes.
///
/// Example: `2014:11:09 14:45:18`. Precision is one second; subsecond
/// fields are never produced or consumed.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Image metadata extracted from one exiftool report.
///
/// Every field is `Option` because the tool only prints the tags a file
/// actually carries. An all-`None` record is a normal answer for a file
/// with no metadata — absence is never an error by itself.
///
/// Each query produces a fresh, independent value; records are never
/// shared or mutated after being returned.
///
/// # Example
///
/// ```rust
/// use exif_bridge::metadata::ImageMetadata;
///
/// let meta = ImageMetadata::default();
/// assert!(meta.capture_timestamp.is_none());
/// assert!(meta.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Date/time the image was originally captured (`DateTimeOriginal`).
    pub capture_timestamp: Option<NaiveDateTime>,
    /// Image width in pixels (`ImageWidth`).
    pub width: Option<u32>,
    /// Image height in pixels (`ImageHeight`).
    pub height: Option<u32>,
}

impl ImageMetadata {
    /// `true` if no field was extracted.
    pub fn is_empty(&self) -> bool {
        self.capture_timestamp.is_none() && self.width.is_none() && self.height.is_none()
    }
}

/// Parse a timestamp in the exiftool wire format.
pub fn parse_exif_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), EXIF_DATE_FORMAT).ok()
}

/// Format a timestamp into the exiftool wire format, truncated to seconds.
pub fn format_exif_timestamp(ts: NaiveDateTime) -> String {
    ts.format(EXIF_DATE_FORMAT).to_string()
}
