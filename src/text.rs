//! Textual and tuple forms of unit metadata.
//!
//! The bracketed grammar is byte-exact:
//!
//! ```text
//! metastr := "" | "[" ext "]"
//! ext     := [num] unit ["/" den]
//! ```
//!
//! The empty string means generic units. A denominator is resolved
//! into a whole multiple of a finer unit. Type strings prefix the
//! metadata with `M8`, `m8`, `datetime64` or `timedelta64`.

use core::fmt;
use core::str::FromStr;

use crate::units::divisor_to_multiple;
use crate::{Error, Kind, Metadata, Unit};

/// Parses a bare unit name (`"Y"` .. `"as"`). Generic units have no
/// name in this form.
pub fn parse_unit(text: &str) -> Result<Unit, Error> {
    let bytes = text.as_bytes();
    if bytes.len() == 1 {
        match bytes[0] {
            b'Y' => return Ok(Unit::Year),
            b'M' => return Ok(Unit::Month),
            b'W' => return Ok(Unit::Week),
            b'B' => return Ok(Unit::BusinessDay),
            b'D' => return Ok(Unit::Day),
            b'h' => return Ok(Unit::Hour),
            b'm' => return Ok(Unit::Minute),
            b's' => return Ok(Unit::Second),
            _ => {}
        }
    }
    // All the two-letter units are variants of seconds.
    if bytes.len() == 2 && bytes[1] == b's' {
        match bytes[0] {
            b'm' => return Ok(Unit::Millisecond),
            b'u' => return Ok(Unit::Microsecond),
            b'n' => return Ok(Unit::Nanosecond),
            b'p' => return Ok(Unit::Picosecond),
            b'f' => return Ok(Unit::Femtosecond),
            b'a' => return Ok(Unit::Attosecond),
            _ => {}
        }
    }
    Err(Error::UnknownUnit(text.to_string()))
}

/// Parses the extended form `[num] unit ["/" den]`.
///
/// `text` is the full input and `offset` the byte position of `ext`
/// within it, for error positions.
fn parse_extended(ext: &str, text: &str, offset: usize) -> Result<Metadata, Error> {
    let syntax = |position: usize| Error::MetadataSyntax {
        text: text.to_string(),
        position,
    };

    let digits = ext.bytes().take_while(|b| b.is_ascii_digit()).count();
    let num: i32 = if digits == 0 {
        1
    } else {
        ext[..digits].parse().map_err(|_| syntax(offset))?
    };
    if num < 1 {
        return Err(syntax(offset));
    }

    let rest = &ext[digits..];
    let (unit_str, den_str) = match rest.find('/') {
        Some(slash) => (&rest[..slash], Some(&rest[slash + 1..])),
        None => (rest, None),
    };
    if unit_str.is_empty() {
        return Err(syntax(offset + digits));
    }

    let mut meta = Metadata {
        unit: parse_unit(unit_str)?,
        num,
    };

    if let Some(den_str) = den_str {
        let den_offset = offset + digits + unit_str.len() + 1;
        if den_str.is_empty() || !den_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(syntax(den_offset));
        }
        let den: i32 = den_str.parse().map_err(|_| syntax(den_offset))?;
        if den < 1 {
            return Err(syntax(den_offset));
        }
        if den != 1 {
            meta = divisor_to_multiple(meta, den)?;
        }
    }

    Ok(meta)
}

/// Parses the strict bracketed form: empty means generic, anything
/// else must be `[ext]`.
pub(crate) fn parse_metastr(text: &str) -> Result<Metadata, Error> {
    if text.is_empty() {
        return Ok(Metadata::GENERIC);
    }

    let syntax = |position: usize| Error::MetadataSyntax {
        text: text.to_string(),
        position,
    };

    let inner = text
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| syntax(text.len()))?;
    if inner.is_empty() {
        return Err(syntax(1));
    }

    parse_extended(inner, text, 1)
}

impl FromStr for Metadata {
    type Err = Error;

    /// Accepts the bracketed metastr form (empty string included) as
    /// well as the bare extended form (`"7D"`, `"s/100"`).
    fn from_str(text: &str) -> Result<Metadata, Error> {
        if text.starts_with('[') || text.is_empty() {
            parse_metastr(text)
        } else {
            parse_extended(text, text, 0)
        }
    }
}

/// Parses a datetime/timedelta type string: one of the prefixes `M8`,
/// `m8`, `datetime64` or `timedelta64` followed by a strict metastr.
pub fn parse_typestr(text: &str) -> Result<(Kind, Metadata), Error> {
    let (kind, rest) = if let Some(rest) = text.strip_prefix("M8") {
        (Kind::Datetime, rest)
    } else if let Some(rest) = text.strip_prefix("m8") {
        (Kind::Timedelta, rest)
    } else if let Some(rest) = text.strip_prefix("datetime64") {
        (Kind::Datetime, rest)
    } else if let Some(rest) = text.strip_prefix("timedelta64") {
        (Kind::Timedelta, rest)
    } else {
        return Err(Error::TypeSyntax(text.to_string()));
    };

    let meta = parse_metastr(rest).map_err(|_| Error::TypeSyntax(text.to_string()))?;
    Ok((kind, meta))
}

/// Builds metadata from the parts of the tuple form
/// `(unit, num[, den[, _]])`. Both numbers must be positive.
pub fn metadata_from_tuple_parts(
    unit: &str,
    num: i64,
    den: Option<i64>,
) -> Result<Metadata, Error> {
    let unit = parse_unit(unit)?;
    let den = den.unwrap_or(1);
    if num < 1 || den < 1 || num > i64::from(i32::MAX) || den > i64::from(i32::MAX) {
        return Err(Error::TupleValues);
    }

    let mut meta = Metadata {
        unit,
        num: num as i32,
    };
    if den != 1 {
        meta = divisor_to_multiple(meta, den as i32)?;
    }
    Ok(meta)
}

impl Metadata {
    /// The textual form: `[7D]`, or `7D` with `skip_brackets`.
    /// Generic metadata emits `"generic"` bare and nothing bracketed.
    pub fn metastr(&self, skip_brackets: bool) -> String {
        if self.unit == Unit::Generic {
            return if skip_brackets {
                "generic".to_string()
            } else {
                String::new()
            };
        }
        match (self.num, skip_brackets) {
            (1, true) => self.unit.as_str().to_string(),
            (1, false) => format!("[{}]", self.unit),
            (num, true) => format!("{num}{}", self.unit),
            (num, false) => format!("[{num}{}]", self.unit),
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.metastr(false))
    }
}
