//! Batch conversion with unit inference, and value-level ranges.

use crate::cast::{cast_datetime, cast_timedelta};
use crate::convert::{
    datetime_from_input, timedelta_from_input, DatetimeInput, ParseIso8601, TimedeltaInput,
};
use crate::meta::gcd_metadata;
use crate::{Casting, Error, Kind, Metadata, Unit, NAT};

/// A kind-tagged conversion operand.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Datetime(DatetimeInput<'a>),
    Timedelta(TimedeltaInput<'a>),
}

impl Operand<'_> {
    pub fn kind(&self) -> Kind {
        match self {
            Operand::Datetime(_) => Kind::Datetime,
            Operand::Timedelta(_) => Kind::Timedelta,
        }
    }
}

/// Converts a batch of operands into packed values sharing one
/// metadata.
///
/// With `meta` already fixed, every operand converts straight to it.
/// With `meta` unset, each operand first converts at its own detected
/// metadata; the detected metadatas are then joined with the GCD
/// (timedelta operands strict about nonlinear units) and every value
/// is re-cast to the join, which is stored back into `meta`. Absent
/// operands become NaT and do not constrain the join.
pub fn values_from_inputs(
    inputs: &[Option<Operand<'_>>],
    casting: Casting,
    meta: &mut Option<Metadata>,
    parser: &impl ParseIso8601,
) -> Result<Vec<i64>, Error> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let mut values = vec![0_i64; inputs.len()];

    if meta.is_some() {
        for (slot, input) in values.iter_mut().zip(inputs) {
            *slot = match input {
                None => NAT,
                Some(Operand::Datetime(input)) => {
                    datetime_from_input(meta, input, casting, parser)?
                }
                Some(Operand::Timedelta(input)) => timedelta_from_input(meta, input, casting)?,
            };
        }
        return Ok(values);
    }

    // First pass: convert each operand at its own metadata.
    let mut metas = Vec::with_capacity(inputs.len());
    for (slot, input) in values.iter_mut().zip(inputs) {
        let mut item_meta = None;
        *slot = match input {
            None => {
                item_meta = Some(Metadata::GENERIC);
                NAT
            }
            Some(Operand::Datetime(input)) => {
                datetime_from_input(&mut item_meta, input, casting, parser)?
            }
            Some(Operand::Timedelta(input)) => {
                timedelta_from_input(&mut item_meta, input, casting)?
            }
        };
        metas.push(item_meta.unwrap_or(Metadata::GENERIC));
    }

    // Join the metadatas, accumulating timedelta strictness.
    let is_strict = |input: &Option<Operand<'_>>| {
        input.map_or(false, |operand| operand.kind() == Kind::Timedelta)
    };
    let mut merged = metas[0];
    let mut merged_strict = is_strict(&inputs[0]);
    for (item_meta, input) in metas.iter().zip(inputs).skip(1) {
        merged = gcd_metadata(*item_meta, merged, is_strict(input), merged_strict)?;
        merged_strict = merged_strict || is_strict(input);
    }

    // Second pass: bring every value to the join.
    for ((slot, item_meta), input) in values.iter_mut().zip(&metas).zip(inputs) {
        match input {
            None => {}
            Some(Operand::Datetime(_)) => *slot = cast_datetime(*item_meta, merged, *slot)?,
            Some(Operand::Timedelta(_)) => *slot = cast_timedelta(*item_meta, merged, *slot)?,
        }
    }

    *meta = Some(merged);
    Ok(values)
}

/// Produces the packed values of `start .. stop` stepped by `step`,
/// together with the resolved kind and metadata.
///
/// Missing `stop` promotes `start` into its place with an implicit
/// zero start. The kind comes from `dtype` when given (generic dtype
/// metadata switches to inference), otherwise a datetime operand
/// anywhere makes the range a datetime range, which then requires an
/// explicit start. A timedelta `stop` in a datetime range is an
/// offset: the start is added into it after conversion. The length is
/// the sign-aware ceiling of `(stop − start) / step`.
pub fn arange(
    start: Option<Operand<'_>>,
    stop: Option<Operand<'_>>,
    step: Option<Operand<'_>>,
    dtype: Option<(Kind, Metadata)>,
    parser: &impl ParseIso8601,
) -> Result<(Vec<i64>, Kind, Metadata), Error> {
    let (start, stop) = match stop {
        Some(stop) => (start, stop),
        None => match start {
            Some(start) => (None, start),
            None => return Err(Error::RangeNeedsStop),
        },
    };

    if matches!(step, Some(Operand::Datetime(_))) {
        return Err(Error::RangeDatetimeStep);
    }

    let (kind, mut meta) = match dtype {
        Some((kind, dtype_meta)) => {
            // Generic dtype metadata means: detect from the operands.
            if dtype_meta.unit == Unit::Generic {
                (kind, None)
            } else {
                (kind, Some(dtype_meta))
            }
        }
        None => {
            let datetime_flavored = start.map_or(false, |op| op.kind() == Kind::Datetime)
                || stop.kind() == Kind::Datetime;
            if datetime_flavored {
                (Kind::Datetime, None)
            } else {
                (Kind::Timedelta, None)
            }
        }
    };

    if kind == Kind::Datetime && start.is_none() {
        return Err(Error::RangeNeedsStart);
    }

    let start_missing = start.is_none();
    let step_missing = step.is_none();
    let stop_is_offset = kind == Kind::Datetime && stop.kind() == Kind::Timedelta;

    let inputs = [start, Some(stop), step];
    let mut values = values_from_inputs(&inputs, Casting::SameKind, &mut meta, parser)?;

    if start_missing {
        values[0] = 0;
    }
    if step_missing {
        values[2] = 1;
    }

    // arange(datetime, timedelta) measures the stop from the start.
    if stop_is_offset {
        values[1] += values[0];
    }

    if values[0] == NAT || values[1] == NAT || values[2] == NAT {
        return Err(Error::RangeNat);
    }

    let length = if values[2] > 0 && values[1] > values[0] {
        (values[1] - values[0] + values[2] - 1) / values[2]
    } else if values[2] < 0 && values[1] < values[0] {
        (values[1] - values[0] + values[2] + 1) / values[2]
    } else if values[2] != 0 {
        0
    } else {
        return Err(Error::RangeZeroStep);
    };

    let meta = meta.unwrap_or(Metadata::GENERIC);
    let mut out = Vec::with_capacity(length as usize);
    let mut current = values[0];
    for _ in 0..length {
        out.push(current);
        current += values[2];
    }

    Ok((out, kind, meta))
}
