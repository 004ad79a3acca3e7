use crate::error::{RangeContext, RulerError, RulerResult};

/// Root font size used for every px to rem conversion.
pub const REM_BASE_PX: f64 = 16.0;

const DECIMAL_SCALE: f64 = 10_000.0;

/// Inputs for one fluid value, all in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampRange {
    pub min_size: f64,
    pub max_size: f64,
    pub min_width: f64,
    pub max_width: f64,
}

impl ClampRange {
    pub fn new(min_size: f64, max_size: f64, min_width: f64, max_width: f64) -> Self {
        Self {
            min_size,
            max_size,
            min_width,
            max_width,
        }
    }
}

/// Converts a pixel length to a terse rem string: at most four decimals,
/// no trailing zeros, no trailing dot.
pub fn px_to_rem(px: f64) -> String {
    format!("{}rem", round_to_four(px / REM_BASE_PX))
}

/// Renders either a static rem length (equal sizes) or a `clamp()` that
/// interpolates linearly between `min_width` and `max_width`.
///
/// The equal-size branch returns before any validation, so the width pair
/// is not checked there.
pub fn calculate_clamp(range: ClampRange) -> RulerResult<String> {
    let ClampRange {
        min_size,
        max_size,
        min_width,
        max_width,
    } = range;

    if [min_size, max_size, min_width, max_width]
        .iter()
        .any(|value| !value.is_finite())
    {
        return Err(RulerError::configuration(format!(
            "clamp values must be finite numbers, got ({}, {}, {}, {})",
            min_size, max_size, min_width, max_width
        )));
    }

    if min_size == max_size {
        if !is_renderable(min_size / REM_BASE_PX) {
            return Err(too_large(&range));
        }
        return Ok(px_to_rem(min_size));
    }

    if min_size > max_size {
        return Err(RulerError::Range {
            context: RangeContext::Size,
            min: min_size,
            max: max_size,
        });
    }
    if min_width >= max_width {
        return Err(RulerError::Range {
            context: RangeContext::Width,
            min: min_width,
            max: max_width,
        });
    }

    let slope = (max_size - min_size) / (max_width - min_width);
    let intersect = -min_width * slope + min_size;
    let vw = slope * 100.0;

    if ![min_size, max_size, intersect]
        .iter()
        .map(|px| px / REM_BASE_PX)
        .chain([vw])
        .all(is_renderable)
    {
        return Err(too_large(&range));
    }

    Ok(format!(
        "clamp({}, {:.4}vw + {}, {})",
        px_to_rem(min_size),
        round_to_four(vw),
        px_to_rem(intersect),
        px_to_rem(max_size)
    ))
}

/// A value renders as a plain decimal only while its four-decimal scaling
/// stays finite.
fn is_renderable(value: f64) -> bool {
    (value * DECIMAL_SCALE).is_finite()
}

fn too_large(range: &ClampRange) -> RulerError {
    RulerError::configuration(format!(
        "clamp values are too large to render, got ({}, {}, {}, {})",
        range.min_size, range.max_size, range.min_width, range.max_width
    ))
}

// f64::round is half-away-from-zero; the zero check folds -0 into 0.
// Values too large to scale already have no fractional digits to round.
fn round_to_four(value: f64) -> f64 {
    if !is_renderable(value) {
        return value;
    }
    let rounded = (value * DECIMAL_SCALE).round() / DECIMAL_SCALE;
    if rounded == 0.0 { 0.0 } else { rounded }
}
