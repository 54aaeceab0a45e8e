//! Descriptor tables mapping option keys to typed setters.
//!
//! A table is a fixed slice of [`OptionField`]s. [`populate`] walks it in
//! order, looks each name up in the caller's option object, checks the JSON
//! kind the setter expects, and applies it. The first failure stops the walk,
//! so the same bad input always reports the same error.

use std::time::Duration;

use cluster::{location, CoreError, CoreResult};
use serde_json::{Map, Value};

/// Typed setter of one option. The variant fixes the JSON kind accepted.
pub enum Setter<R> {
    Boolean(fn(&mut R, bool)),
    /// Signed integer; the setter may reject values outside its domain.
    Integer(fn(&mut R, i64) -> CoreResult<()>),
    /// Non-negative integer.
    Unsigned(fn(&mut R, u64)),
    /// Non-negative integer that must fit in 32 bits.
    U32(fn(&mut R, u32)),
    /// Non-negative integer that must fit in 16 bits.
    U16(fn(&mut R, u16)),
    /// Non-negative integer number of milliseconds.
    Millis(fn(&mut R, Duration)),
    String(fn(&mut R, String)),
    NonEmptyString(fn(&mut R, String)),
    /// String the setter parses itself.
    Text(fn(&mut R, &str) -> CoreResult<()>),
    StringList(fn(&mut R, Vec<String>)),
    List(fn(&mut R, &[Value]) -> CoreResult<()>),
    Object(fn(&mut R, &Map<String, Value>) -> CoreResult<()>),
    /// Raw access for options whose handling depends on other fields.
    Custom(fn(&mut R, &'static str, &Value) -> CoreResult<()>),
}

impl<R> Setter<R> {
    /// Human-readable kind, used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Setter::Boolean(_) => "a boolean",
            Setter::Integer(_) => "an integer",
            Setter::Unsigned(_) | Setter::U32(_) | Setter::U16(_) => "a non-negative integer",
            Setter::Millis(_) => "a non-negative number of milliseconds",
            Setter::String(_) | Setter::Text(_) => "a string",
            Setter::NonEmptyString(_) => "a non-empty string",
            Setter::StringList(_) => "an array of strings",
            Setter::List(_) => "an array",
            Setter::Object(_) => "an object",
            Setter::Custom(_) => "a value",
        }
    }
}

/// One row of a descriptor table.
pub struct OptionField<R> {
    pub name: &'static str,
    pub setter: Setter<R>,
}

impl<R> OptionField<R> {
    pub const fn new(name: &'static str, setter: Setter<R>) -> Self {
        Self { name, setter }
    }

    fn apply(&self, target: &mut R, value: &Value) -> CoreResult<()> {
        let mismatch = || {
            CoreError::invalid_argument(
                location!(),
                format!("expected {} to be {} in the options", self.name, self.setter.kind()),
            )
        };
        match &self.setter {
            Setter::Boolean(set) => set(target, value.as_bool().ok_or_else(mismatch)?),
            Setter::Integer(set) => set(target, value.as_i64().ok_or_else(mismatch)?)?,
            Setter::Unsigned(set) => set(target, value.as_u64().ok_or_else(mismatch)?),
            Setter::U32(set) => {
                let raw = value.as_u64().ok_or_else(mismatch)?;
                set(target, u32::try_from(raw).map_err(|_| self.out_of_range(u32::MAX))?)
            }
            Setter::U16(set) => {
                let raw = value.as_u64().ok_or_else(mismatch)?;
                set(target, u16::try_from(raw).map_err(|_| self.out_of_range(u16::MAX))?)
            }
            Setter::Millis(set) => {
                set(target, Duration::from_millis(value.as_u64().ok_or_else(mismatch)?))
            }
            Setter::String(set) => set(target, value.as_str().ok_or_else(mismatch)?.to_owned()),
            Setter::NonEmptyString(set) => match value.as_str() {
                Some(text) if !text.is_empty() => set(target, text.to_owned()),
                _ => return Err(mismatch()),
            },
            Setter::Text(set) => set(target, value.as_str().ok_or_else(mismatch)?)?,
            Setter::StringList(set) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                let strings = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        CoreError::invalid_argument(
                            location!(),
                            format!(
                                "expected \"{}\" option to be an array of strings, \
                                 detected non-string value",
                                self.name
                            ),
                        )
                    })?;
                set(target, strings)
            }
            Setter::List(set) => set(target, value.as_array().ok_or_else(mismatch)?)?,
            Setter::Object(set) => set(target, value.as_object().ok_or_else(mismatch)?)?,
            Setter::Custom(set) => set(target, self.name, value)?,
        }
        Ok(())
    }

    fn out_of_range(&self, max: impl std::fmt::Display) -> CoreError {
        CoreError::invalid_argument(
            location!(),
            format!("expected {} to be at most {max} in the options", self.name),
        )
    }
}

/// Applies `fields` to `target` from an option object.
///
/// Absent input, absent keys and `null` values are skipped. Input that is not
/// a JSON object is rejected before any field is looked at.
pub fn populate<R>(
    target: &mut R,
    options: Option<&Value>,
    fields: &[OptionField<R>],
) -> CoreResult<()> {
    let options = match options {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(CoreError::invalid_argument(
                location!(),
                "expected object for options argument",
            ))
        }
    };
    populate_object(target, options, fields)
}

/// Applies `fields` to `target` from an already-unwrapped option object.
pub fn populate_object<R>(
    target: &mut R,
    options: &Map<String, Value>,
    fields: &[OptionField<R>],
) -> CoreResult<()> {
    for field in fields {
        match options.get(field.name) {
            None | Some(Value::Null) => continue,
            Some(value) => field.apply(target, value)?,
        }
    }
    Ok(())
}
