//! Backup archive filename encoding.
//!
//! Archives are named `{prefix}-YYYY-MM-DDTHH-MM-SS-mmmZ.zip`: an RFC 3339
//! UTC timestamp with millisecond precision where the `:` and `.` separators
//! are replaced by `-`.
//!
//! Decoding checks every separator at its fixed offset. The prefix is
//! compared literally.

use chrono::{DateTime, NaiveDate, Utc};

/// Archive extension, including the dot.
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Length of the encoded timestamp, `YYYY-MM-DDTHH-MM-SS-mmmZ`.
const ENCODED_LEN: usize = 24;

/// Expected separator byte at each fixed offset of the encoded timestamp.
const SEPARATORS: [(usize, u8); 7] = [
    (4, b'-'),
    (7, b'-'),
    (10, b'T'),
    (13, b'-'),
    (16, b'-'),
    (19, b'-'),
    (23, b'Z'),
];

/// Decoded timestamp fields, before calendar validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimestampFields {
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
}

impl TimestampFields {
    /// Split an encoded timestamp into its digit groups.
    ///
    /// Returns `None` on wrong length, wrong separators or non-digit fields.
    fn decode(encoded: &str) -> Option<Self> {
        let bytes = encoded.as_bytes();
        if bytes.len() != ENCODED_LEN {
            return None;
        }

        if SEPARATORS
            .iter()
            .any(|&(offset, separator)| bytes[offset] != separator)
        {
            return None;
        }

        Some(Self {
            year: digits(bytes, 0, 4)?,
            month: digits(bytes, 5, 2)?,
            day: digits(bytes, 8, 2)?,
            hour: digits(bytes, 11, 2)?,
            minute: digits(bytes, 14, 2)?,
            second: digits(bytes, 17, 2)?,
            millis: digits(bytes, 20, 3)?,
        })
    }

    /// Build the UTC instant, rejecting impossible calendar values.
    fn to_datetime(self) -> Option<DateTime<Utc>> {
        let year = i32::try_from(self.year).ok()?;
        let date = NaiveDate::from_ymd_opt(year, self.month, self.day)?;
        let datetime = date.and_hms_milli_opt(self.hour, self.minute, self.second, self.millis)?;
        Some(datetime.and_utc())
    }
}

/// Parse a fixed-width decimal field.
fn digits(bytes: &[u8], start: usize, width: usize) -> Option<u32> {
    bytes
        .get(start..start + width)?
        .iter()
        .try_fold(0u32, |value, &byte| {
            byte.is_ascii_digit()
                .then(|| value * 10 + u32::from(byte - b'0'))
        })
}

/// Decode the creation timestamp from a backup filename.
///
/// `file_name` must be the final path segment only. Returns `None` when the
/// name does not follow the encoding for `prefix` or encodes an impossible
/// date or time.
pub fn parse_backup_timestamp(file_name: &str, prefix: &str) -> Option<DateTime<Utc>> {
    let encoded = file_name
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_suffix(ARCHIVE_EXTENSION)?;

    TimestampFields::decode(encoded)?.to_datetime()
}

/// Encode a backup filename for `prefix` and `timestamp`.
///
/// Sub-millisecond precision is dropped.
pub fn backup_file_name(prefix: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "{prefix}-{}{ARCHIVE_EXTENSION}",
        timestamp.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

/// Final path segment of an object key.
pub fn base_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}
