//! Python bindings for dt64 using PyO3.
//!
//! Host date/datetime/timedelta objects are read through duck-typed
//! attribute access, so anything exposing the right attributes
//! converts, not just the `datetime` module's types. No ISO 8601
//! parser is bundled; strings are not accepted for datetime values.

#![cfg(feature = "python")]

use pyo3::basic::CompareOp;
use pyo3::exceptions::{PyOverflowError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDate, PyDateTime, PyDelta, PyTuple, PyType};

use crate::cast::{can_cast_datetime_metadata, can_cast_timedelta_metadata};
use crate::convert::{
    datetime_to_object, timedelta_to_object, DateFields, DatetimeInput, DatetimeObject,
    TimeFields, TimedeltaInput, TimedeltaObject,
};
use crate::text::metadata_from_tuple_parts;
use crate::{
    datetime_from_input, gcd_metadata, timedelta_from_input, Casting, CivilTime, Datetime, Error,
    ErrorKind, Kind, Metadata, Timedelta, Unit, NAT,
};

fn to_py_err(err: Error) -> PyErr {
    let message = err.to_string();
    match err.kind() {
        ErrorKind::Type | ErrorKind::Casting => PyTypeError::new_err(message),
        ErrorKind::Value => PyValueError::new_err(message),
        ErrorKind::Overflow => PyOverflowError::new_err(message),
    }
}

fn parse_casting(name: &str) -> PyResult<Casting> {
    match name {
        "unsafe" => Ok(Casting::Unsafe),
        "same_kind" => Ok(Casting::SameKind),
        "safe" => Ok(Casting::Safe),
        "equiv" | "no" => Ok(Casting::Equiv),
        _ => Err(PyValueError::new_err(format!(
            "invalid casting rule '{name}'"
        ))),
    }
}

fn py_hash<T: std::hash::Hash>(value: &T) -> u64 {
    // DefaultHasher only needs to be consistent within one process,
    // like Python's own hash().
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Reads year/month/day (and optionally the clock and tzinfo
/// attributes) off a duck-typed date or datetime object.
fn extract_date_attrs(
    obj: &Bound<'_, PyAny>,
) -> PyResult<Option<(DateFields, Option<TimeFields>)>> {
    if !(obj.hasattr("year")? && obj.hasattr("month")? && obj.hasattr("day")?) {
        return Ok(None);
    }

    let date = DateFields {
        year: obj.getattr("year")?.extract()?,
        month: obj.getattr("month")?.extract()?,
        day: obj.getattr("day")?.extract()?,
    };

    if !(obj.hasattr("hour")?
        && obj.hasattr("minute")?
        && obj.hasattr("second")?
        && obj.hasattr("microsecond")?)
    {
        return Ok(Some((date, None)));
    }

    let mut time = TimeFields {
        hour: obj.getattr("hour")?.extract()?,
        minute: obj.getattr("minute")?.extract()?,
        second: obj.getattr("second")?.extract()?,
        microsecond: obj.getattr("microsecond")?.extract()?,
        utc_offset_minutes: None,
    };

    if obj.hasattr("tzinfo")? {
        let tzinfo = obj.getattr("tzinfo")?;
        if !tzinfo.is_none() {
            let offset = tzinfo.call_method1("utcoffset", (obj,))?;
            if !offset.is_none() {
                let seconds: f64 = offset.call_method0("total_seconds")?.extract()?;
                time.utc_offset_minutes = Some(seconds as i64 / 60);
            }
        }
    }

    Ok(Some((date, Some(time))))
}

// ===== PyUnitMeta =====

#[pyclass(name = "Metadata", module = "dt64")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyUnitMeta(Metadata);

#[pymethods]
impl PyUnitMeta {
    /// Parse metadata text: "[7D]", "7D", "[1M/30]" or "" (generic).
    #[new]
    fn new(text: &str) -> PyResult<Self> {
        text.parse::<Metadata>().map(PyUnitMeta).map_err(to_py_err)
    }

    /// Build from a unit name and a multiplier.
    #[classmethod]
    #[pyo3(name = "from_unit", signature = (unit, num=1))]
    fn from_unit(_cls: &Bound<'_, PyType>, unit: &str, num: i64) -> PyResult<Self> {
        metadata_from_tuple_parts(unit, num, None)
            .map(PyUnitMeta)
            .map_err(to_py_err)
    }

    /// Build from the tuple form (unit, num[, den[, ...]]).
    #[classmethod]
    #[pyo3(name = "from_tuple")]
    fn from_tuple(_cls: &Bound<'_, PyType>, tuple: &Bound<'_, PyTuple>) -> PyResult<Self> {
        let len = tuple.len();
        if !(2..=4).contains(&len) {
            return Err(to_py_err(Error::TupleShape));
        }
        let unit_item = tuple.get_item(0)?;
        let unit = match unit_item.extract::<String>() {
            Ok(text) => text,
            Err(_) => {
                let bytes: Vec<u8> = unit_item.extract()?;
                String::from_utf8(bytes).map_err(|_| to_py_err(Error::TupleValues))?
            }
        };
        let num: i64 = tuple.get_item(1)?.extract()?;
        let den: Option<i64> = if len >= 3 {
            Some(tuple.get_item(2)?.extract()?)
        } else {
            None
        };
        metadata_from_tuple_parts(&unit, num, den)
            .map(PyUnitMeta)
            .map_err(to_py_err)
    }

    #[getter]
    fn unit(&self) -> &'static str {
        self.0.unit.as_str()
    }

    #[getter]
    fn num(&self) -> i32 {
        self.0.num
    }

    /// The textual form, optionally without brackets.
    #[pyo3(name = "metastr", signature = (skip_brackets=false))]
    fn metastr(&self, skip_brackets: bool) -> String {
        self.0.metastr(skip_brackets)
    }

    /// Greatest common divisor with another metadata.
    #[pyo3(name = "gcd", signature = (other, strict=false, other_strict=false))]
    fn gcd(&self, other: &PyUnitMeta, strict: bool, other_strict: bool) -> PyResult<Self> {
        gcd_metadata(self.0, other.0, strict, other_strict)
            .map(PyUnitMeta)
            .map_err(to_py_err)
    }

    /// Whether `other` divides evenly into this metadata.
    #[pyo3(name = "divides_into", signature = (other, strict=false))]
    fn divides_into(&self, other: &PyUnitMeta, strict: bool) -> bool {
        crate::metadata_divides(self.0, other.0, strict)
    }

    /// The reduced conversion fraction towards `other`.
    #[pyo3(name = "conversion_factor")]
    fn conversion_factor(&self, other: &PyUnitMeta) -> PyResult<(i64, i64)> {
        crate::conversion_factor(self.0, other.0).map_err(to_py_err)
    }

    /// Equivalence; generic metadata ignores the multiplier.
    #[pyo3(name = "equivalent")]
    fn equivalent(&self, other: &PyUnitMeta) -> bool {
        self.0.equivalent(other.0)
    }

    fn __str__(&self) -> String {
        self.0.metastr(true)
    }

    fn __repr__(&self) -> String {
        format!("Metadata('{}')", self.0.metastr(false))
    }

    fn __richcmp__(&self, other: &Self, op: CompareOp) -> PyResult<bool> {
        match op {
            CompareOp::Eq => Ok(self.0 == other.0),
            CompareOp::Ne => Ok(self.0 != other.0),
            _ => Err(PyTypeError::new_err("metadata is not ordered")),
        }
    }

    fn __hash__(&self) -> u64 {
        py_hash(&self.0)
    }
}

// ===== PyDatetime64 =====

#[pyclass(name = "Datetime64", module = "dt64")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyDatetime64(Datetime);

#[pymethods]
impl PyDatetime64 {
    #[new]
    fn new(value: i64, meta: &PyUnitMeta) -> Self {
        PyDatetime64(Datetime::new(value, meta.0))
    }

    /// The not-a-time value in the given metadata.
    #[classmethod]
    #[pyo3(name = "nat")]
    fn nat(_cls: &Bound<'_, PyType>, meta: &PyUnitMeta) -> Self {
        PyDatetime64(Datetime::nat(meta.0))
    }

    /// Convert a Python object: an integer tick count, a duck-typed
    /// date or datetime object (tzinfo honored), an existing
    /// Datetime64, or None.
    #[classmethod]
    #[pyo3(name = "from_object", signature = (obj, meta=None, casting="same_kind"))]
    fn from_object(
        _cls: &Bound<'_, PyType>,
        obj: &Bound<'_, PyAny>,
        meta: Option<&PyUnitMeta>,
        casting: &str,
    ) -> PyResult<Self> {
        let casting = parse_casting(casting)?;
        let mut meta_io = meta.map(|wrapped| wrapped.0);
        let no_parser =
            |_: &str| -> Result<(CivilTime, Unit), Error> { Err(Error::UnconvertibleDatetime) };

        let input = if obj.is_none() {
            DatetimeInput::Null
        } else if let Ok(scalar) = obj.extract::<PyDatetime64>() {
            DatetimeInput::Scalar(scalar.0)
        } else if let Ok(value) = obj.extract::<i64>() {
            DatetimeInput::Ticks(value)
        } else if let Some((date, time)) = extract_date_attrs(obj)? {
            match time {
                Some(time) => DatetimeInput::DateTime(date, time),
                None => DatetimeInput::Date(date),
            }
        } else {
            DatetimeInput::Other
        };

        let value =
            datetime_from_input(&mut meta_io, &input, casting, &no_parser).map_err(to_py_err)?;
        Ok(PyDatetime64(Datetime::new(
            value,
            meta_io.unwrap_or(Metadata::GENERIC),
        )))
    }

    #[getter]
    fn value(&self) -> i64 {
        self.0.value
    }

    #[getter]
    fn meta(&self) -> PyUnitMeta {
        PyUnitMeta(self.0.meta)
    }

    #[pyo3(name = "is_nat")]
    fn is_nat(&self) -> bool {
        self.0.is_nat()
    }

    /// Cast to other metadata under a casting rule.
    #[pyo3(name = "cast", signature = (meta, casting="same_kind"))]
    fn cast(&self, meta: &PyUnitMeta, casting: &str) -> PyResult<Self> {
        let casting = parse_casting(casting)?;
        self.0
            .cast(meta.0, casting)
            .map(PyDatetime64)
            .map_err(to_py_err)
    }

    /// Render as datetime.date, datetime.datetime, int or None.
    #[pyo3(name = "to_object")]
    fn to_object(&self, py: Python<'_>) -> PyResult<PyObject> {
        match datetime_to_object(self.0.meta, self.0.value).map_err(to_py_err)? {
            DatetimeObject::NotATime => Ok(py.None()),
            DatetimeObject::Ticks(value) => Ok(value.into_py(py)),
            DatetimeObject::Date(date) => Ok(PyDate::new_bound(
                py,
                date.year as i32,
                date.month as u8,
                date.day as u8,
            )?
            .into_py(py)),
            DatetimeObject::DateTime { date, time } => Ok(PyDateTime::new_bound(
                py,
                date.year as i32,
                date.month as u8,
                date.day as u8,
                time.hour as u8,
                time.minute as u8,
                time.second as u8,
                time.microsecond as u32,
                None,
            )?
            .into_py(py)),
        }
    }

    fn __str__(&self) -> String {
        self.0.to_string()
    }

    fn __repr__(&self) -> String {
        format!("Datetime64({}, '{}')", self.0.value, self.0.meta)
    }

    fn __richcmp__(&self, other: &Self, op: CompareOp) -> PyResult<bool> {
        // NaT compares unequal to everything, itself included.
        let nat = self.0.is_nat() || other.0.is_nat();
        match op {
            CompareOp::Eq => Ok(!nat && self.0 == other.0),
            CompareOp::Ne => Ok(nat || self.0 != other.0),
            _ => Err(PyTypeError::new_err(
                "ordering requires values with equivalent metadata",
            )),
        }
    }

    fn __hash__(&self) -> u64 {
        py_hash(&self.0)
    }
}

// ===== PyTimedelta64 =====

#[pyclass(name = "Timedelta64", module = "dt64")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyTimedelta64(Timedelta);

#[pymethods]
impl PyTimedelta64 {
    #[new]
    fn new(value: i64, meta: &PyUnitMeta) -> Self {
        PyTimedelta64(Timedelta::new(value, meta.0))
    }

    #[classmethod]
    #[pyo3(name = "nat")]
    fn nat(_cls: &Bound<'_, PyType>, meta: &PyUnitMeta) -> Self {
        PyTimedelta64(Timedelta::nat(meta.0))
    }

    /// Convert a Python object: an integer, a "NaT"/integer string,
    /// a duck-typed timedelta object, an existing Timedelta64, or
    /// None.
    #[classmethod]
    #[pyo3(name = "from_object", signature = (obj, meta=None, casting="same_kind"))]
    fn from_object(
        _cls: &Bound<'_, PyType>,
        obj: &Bound<'_, PyAny>,
        meta: Option<&PyUnitMeta>,
        casting: &str,
    ) -> PyResult<Self> {
        let casting = parse_casting(casting)?;
        let mut meta_io = meta.map(|wrapped| wrapped.0);

        let text: Option<String> = obj.extract().ok();
        let input = if obj.is_none() {
            TimedeltaInput::Null
        } else if let Some(ref text) = text {
            TimedeltaInput::Text(text)
        } else if let Ok(scalar) = obj.extract::<PyTimedelta64>() {
            TimedeltaInput::Scalar(scalar.0)
        } else if let Ok(value) = obj.extract::<i64>() {
            TimedeltaInput::Ticks(value)
        } else if obj.hasattr("days")? && obj.hasattr("seconds")? && obj.hasattr("microseconds")? {
            TimedeltaInput::Delta {
                days: obj.getattr("days")?.extract()?,
                seconds: obj.getattr("seconds")?.extract()?,
                microseconds: obj.getattr("microseconds")?.extract()?,
            }
        } else {
            TimedeltaInput::Other
        };

        let value = timedelta_from_input(&mut meta_io, &input, casting).map_err(to_py_err)?;
        Ok(PyTimedelta64(Timedelta::new(
            value,
            meta_io.unwrap_or(Metadata::GENERIC),
        )))
    }

    #[getter]
    fn value(&self) -> i64 {
        self.0.value
    }

    #[getter]
    fn meta(&self) -> PyUnitMeta {
        PyUnitMeta(self.0.meta)
    }

    #[pyo3(name = "is_nat")]
    fn is_nat(&self) -> bool {
        self.0.is_nat()
    }

    #[pyo3(name = "cast", signature = (meta, casting="same_kind"))]
    fn cast(&self, meta: &PyUnitMeta, casting: &str) -> PyResult<Self> {
        let casting = parse_casting(casting)?;
        self.0
            .cast(meta.0, casting)
            .map(PyTimedelta64)
            .map_err(to_py_err)
    }

    /// Render as datetime.timedelta, int or None.
    #[pyo3(name = "to_object")]
    fn to_object(&self, py: Python<'_>) -> PyResult<PyObject> {
        match timedelta_to_object(self.0.meta, self.0.value).map_err(to_py_err)? {
            TimedeltaObject::NotATime => Ok(py.None()),
            TimedeltaObject::Ticks(value) => Ok(value.into_py(py)),
            TimedeltaObject::Delta {
                days,
                seconds,
                microseconds,
            } => Ok(PyDelta::new_bound(py, days as i32, seconds, microseconds, true)?.into_py(py)),
        }
    }

    fn __str__(&self) -> String {
        self.0.to_string()
    }

    fn __repr__(&self) -> String {
        format!("Timedelta64({}, '{}')", self.0.value, self.0.meta)
    }

    fn __richcmp__(&self, other: &Self, op: CompareOp) -> PyResult<bool> {
        let nat = self.0.is_nat() || other.0.is_nat();
        match op {
            CompareOp::Eq => Ok(!nat && self.0 == other.0),
            CompareOp::Ne => Ok(nat || self.0 != other.0),
            _ => Err(PyTypeError::new_err(
                "ordering requires values with equivalent metadata",
            )),
        }
    }

    fn __hash__(&self) -> u64 {
        py_hash(&self.0)
    }
}

// ===== Module functions =====

/// Parse a type string such as "datetime64[ns]" or "m8[7D]".
#[pyfunction]
#[pyo3(name = "parse_typestr")]
fn py_parse_typestr(text: &str) -> PyResult<(&'static str, PyUnitMeta)> {
    let (kind, meta) = crate::parse_typestr(text).map_err(to_py_err)?;
    let kind = match kind {
        Kind::Datetime => "datetime64",
        Kind::Timedelta => "timedelta64",
    };
    Ok((kind, PyUnitMeta(meta)))
}

#[pyfunction]
#[pyo3(name = "can_cast_datetime")]
fn py_can_cast_datetime(src: &PyUnitMeta, dst: &PyUnitMeta, casting: &str) -> PyResult<bool> {
    Ok(can_cast_datetime_metadata(
        src.0,
        dst.0,
        parse_casting(casting)?,
    ))
}

#[pyfunction]
#[pyo3(name = "can_cast_timedelta")]
fn py_can_cast_timedelta(src: &PyUnitMeta, dst: &PyUnitMeta, casting: &str) -> PyResult<bool> {
    Ok(can_cast_timedelta_metadata(
        src.0,
        dst.0,
        parse_casting(casting)?,
    ))
}

// ===== Module definition =====

#[pymodule]
fn dt64(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyUnitMeta>()?;
    m.add_class::<PyDatetime64>()?;
    m.add_class::<PyTimedelta64>()?;
    m.add_function(wrap_pyfunction!(py_parse_typestr, m)?)?;
    m.add_function(wrap_pyfunction!(py_can_cast_datetime, m)?)?;
    m.add_function(wrap_pyfunction!(py_can_cast_timedelta, m)?)?;
    m.add("NAT", NAT)?;
    Ok(())
}
