use crate::config::RunOptions;
use crate::error::{RulerError, RulerResult};
use crate::fluid::{ClampRange, calculate_clamp};
use crate::params::parse_number;

pub const FLUID_CALL_MARKER: &str = "ruler.fluid(";

/// Replaces every `ruler.fluid(min, max[, minWidth, maxWidth])` call in a
/// declaration value with its computed clamp. Returns `None` when the value
/// contains no call, so callers can leave it untouched.
///
/// Arguments end at the first `)`. Zero, missing and non-numeric arguments
/// count as absent: widths fall back to the run options, sizes are an error.
pub fn rewrite_fluid_calls(value: &str, options: &RunOptions) -> RulerResult<Option<String>> {
    if !value.contains(FLUID_CALL_MARKER) {
        return Ok(None);
    }

    let mut out = String::with_capacity(value.len());
    let mut cursor = 0usize;
    let mut replaced = false;

    while let Some(rel_start) = value[cursor..].find(FLUID_CALL_MARKER) {
        let start = cursor + rel_start;
        let args_start = start + FLUID_CALL_MARKER.len();
        let Some(rel_close) = value[args_start..].find(')') else {
            break;
        };
        let close_idx = args_start + rel_close;

        out.push_str(&value[cursor..start]);
        out.push_str(&fluid_call(&value[args_start..close_idx], options)?);
        cursor = close_idx + 1;
        replaced = true;
    }

    if !replaced {
        return Ok(None);
    }
    out.push_str(&value[cursor..]);
    Ok(Some(out))
}

fn fluid_call(args: &str, options: &RunOptions) -> RulerResult<String> {
    let mut values = args.split(',').map(|arg| {
        parse_number(arg).filter(|number| *number != 0.0)
    });
    let min_size = values.next().flatten();
    let max_size = values.next().flatten();
    let min_width = values.next().flatten().unwrap_or(options.min_width);
    let max_width = values.next().flatten().unwrap_or(options.max_width);

    let (Some(min_size), Some(max_size)) = (min_size, max_size) else {
        return Err(RulerError::configuration(format!(
            "ruler.fluid() requires minSize and maxSize, got \"{}\"",
            args.trim()
        )));
    };

    let rendered = calculate_clamp(ClampRange::new(min_size, max_size, min_width, max_width))?;
    tracing::debug!(args = args.trim(), %rendered, "rewrote fluid call");
    Ok(rendered)
}
