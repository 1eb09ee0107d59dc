//! Citation number range compression.
//!
//! Turns `[1, 2, 3, 6]` into `1–3,6`. The input order is kept as given;
//! callers sort first when they want sorted output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// En dash (U+2013), the separator the `cite` package puts inside a range.
pub const EN_DASH: char = '\u{2013}';

/// Em dash (U+2014).
pub const EM_DASH: char = '\u{2014}';

/// Minimum number of consecutive citation numbers collapsed into a range.
///
/// With `Three`, a pair such as `4,5` stays a pair; with `Two` it becomes `4–5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RunThreshold {
    Two,
    #[default]
    Three,
}

impl RunThreshold {
    /// The run length as a number.
    pub fn min_len(self) -> usize {
        match self {
            RunThreshold::Two => 2,
            RunThreshold::Three => 3,
        }
    }
}

/// Error for a threshold outside `{2, 3}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid range threshold {0}: only 2 or 3 is allowed")]
pub struct InvalidThreshold(pub u8);

impl TryFrom<u8> for RunThreshold {
    type Error = InvalidThreshold;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(RunThreshold::Two),
            3 => Ok(RunThreshold::Three),
            other => Err(InvalidThreshold(other)),
        }
    }
}

impl From<RunThreshold> for u8 {
    fn from(value: RunThreshold) -> Self {
        value.min_len() as u8
    }
}

/// Compresses runs of consecutive numbers into `start<dash>end` ranges.
///
/// Runs are detected in the given order: `[3, 2, 1]` has no runs. A run
/// shorter than `min_run` is written out member by member, joined with `,`.
///
/// # Examples
///
/// ```
/// use auxcite::range::{compress, RunThreshold, EN_DASH};
///
/// assert_eq!(compress(&[1, 2, 3, 6], RunThreshold::Three, EN_DASH), "1\u{2013}3,6");
/// assert_eq!(compress(&[1, 2, 6], RunThreshold::Three, EN_DASH), "1,2,6");
/// assert_eq!(compress(&[1, 2, 6], RunThreshold::Two, '-'), "1-2,6");
/// ```
pub fn compress(nums: &[u32], min_run: RunThreshold, dash: char) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut start = 0;

    while start < nums.len() {
        let mut end = start;
        while end + 1 < nums.len() && nums[end].checked_add(1) == Some(nums[end + 1]) {
            end += 1;
        }
        push_run(&mut segments, &nums[start..=end], min_run, dash);
        start = end + 1;
    }

    segments.join(",")
}

fn push_run(segments: &mut Vec<String>, run: &[u32], min_run: RunThreshold, dash: char) {
    match run {
        [first, .., last] if run.len() >= min_run.min_len() => {
            segments.push(format!("{}{}{}", first, dash, last));
        }
        _ => segments.extend(run.iter().map(u32::to_string)),
    }
}
