//! Typed constant values and numeric literal parsing

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantValueKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
}

impl ConstantValueKind {
    fn integer_bounds(self) -> Option<(i128, i128)> {
        let bounds = match self {
            ConstantValueKind::Int8 => (i8::MIN as i128, i8::MAX as i128),
            ConstantValueKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
            ConstantValueKind::Int32 => (i32::MIN as i128, i32::MAX as i128),
            ConstantValueKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
            ConstantValueKind::Uint8 => (0, u8::MAX as i128),
            ConstantValueKind::Uint16 => (0, u16::MAX as i128),
            ConstantValueKind::Uint32 => (0, u32::MAX as i128),
            ConstantValueKind::Uint64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(bounds)
    }

    pub fn is_integer(self) -> bool {
        self.integer_bounds().is_some()
    }

    pub fn is_float(self) -> bool {
        matches!(self, ConstantValueKind::Float32 | ConstantValueKind::Float64)
    }
}

/// A resolved constant
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
}

/// Numeric view used for conversions
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Integer(i128),
    Float(f64),
}

impl ConstantValue {
    pub fn kind(&self) -> ConstantValueKind {
        match self {
            ConstantValue::Bool(_) => ConstantValueKind::Bool,
            ConstantValue::Int8(_) => ConstantValueKind::Int8,
            ConstantValue::Int16(_) => ConstantValueKind::Int16,
            ConstantValue::Int32(_) => ConstantValueKind::Int32,
            ConstantValue::Int64(_) => ConstantValueKind::Int64,
            ConstantValue::Uint8(_) => ConstantValueKind::Uint8,
            ConstantValue::Uint16(_) => ConstantValueKind::Uint16,
            ConstantValue::Uint32(_) => ConstantValueKind::Uint32,
            ConstantValue::Uint64(_) => ConstantValueKind::Uint64,
            ConstantValue::Float32(_) => ConstantValueKind::Float32,
            ConstantValue::Float64(_) => ConstantValueKind::Float64,
            ConstantValue::String(_) => ConstantValueKind::String,
        }
    }

    fn as_number(&self) -> Option<Number> {
        let number = match *self {
            ConstantValue::Int8(v) => Number::Integer(v as i128),
            ConstantValue::Int16(v) => Number::Integer(v as i128),
            ConstantValue::Int32(v) => Number::Integer(v as i128),
            ConstantValue::Int64(v) => Number::Integer(v as i128),
            ConstantValue::Uint8(v) => Number::Integer(v as i128),
            ConstantValue::Uint16(v) => Number::Integer(v as i128),
            ConstantValue::Uint32(v) => Number::Integer(v as i128),
            ConstantValue::Uint64(v) => Number::Integer(v as i128),
            ConstantValue::Float32(v) => Number::Float(v as f64),
            ConstantValue::Float64(v) => Number::Float(v),
            ConstantValue::Bool(_) | ConstantValue::String(_) => return None,
        };
        Some(number)
    }

    /// Integer payload widened to `u64`, if this is a non-negative integer
    pub fn as_u64(&self) -> Option<u64> {
        match self.as_number()? {
            Number::Integer(v) => u64::try_from(v).ok(),
            Number::Float(_) => None,
        }
    }

    /// Represent this value as `kind`, or `None` if that would lose information.
    ///
    /// Floats become integers only when integral and in range; integers
    /// become floats only when exactly representable.
    pub fn convert(&self, kind: ConstantValueKind) -> Option<ConstantValue> {
        match (self, kind) {
            (ConstantValue::Bool(v), ConstantValueKind::Bool) => {
                return Some(ConstantValue::Bool(*v))
            }
            (ConstantValue::String(s), ConstantValueKind::String) => {
                return Some(ConstantValue::String(s.clone()))
            }
            _ => {}
        }

        let number = self.as_number()?;
        if let Some((min, max)) = kind.integer_bounds() {
            let value = match number {
                Number::Integer(v) => v,
                Number::Float(f) => {
                    if !f.is_finite() || f.fract() != 0.0 {
                        return None;
                    }
                    // Anything outside i128 is out of every integer range anyway.
                    if f.abs() > 1e38 {
                        return None;
                    }
                    f as i128
                }
            };
            if value < min || value > max {
                return None;
            }
            return Some(integer_value(kind, value));
        }

        match kind {
            ConstantValueKind::Float64 => match number {
                Number::Float(f) => Some(ConstantValue::Float64(f)),
                Number::Integer(i) => {
                    let f = i as f64;
                    (f as i128 == i).then_some(ConstantValue::Float64(f))
                }
            },
            ConstantValueKind::Float32 => match number {
                Number::Float(f) => {
                    (f.abs() <= f32::MAX as f64).then_some(ConstantValue::Float32(f as f32))
                }
                Number::Integer(i) => {
                    let f = i as f32;
                    (f as i128 == i).then_some(ConstantValue::Float32(f))
                }
            },
            _ => None,
        }
    }
}

fn integer_value(kind: ConstantValueKind, value: i128) -> ConstantValue {
    // Callers range-check against `kind` first.
    match kind {
        ConstantValueKind::Int8 => ConstantValue::Int8(value as i8),
        ConstantValueKind::Int16 => ConstantValue::Int16(value as i16),
        ConstantValueKind::Int32 => ConstantValue::Int32(value as i32),
        ConstantValueKind::Int64 => ConstantValue::Int64(value as i64),
        ConstantValueKind::Uint8 => ConstantValue::Uint8(value as u8),
        ConstantValueKind::Uint16 => ConstantValue::Uint16(value as u16),
        ConstantValueKind::Uint32 => ConstantValue::Uint32(value as u32),
        ConstantValueKind::Uint64 => ConstantValue::Uint64(value as u64),
        other => unreachable!("{:?} is not an integer kind", other),
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Bool(v) => write!(f, "{}", v),
            ConstantValue::Int8(v) => write!(f, "{}", v),
            ConstantValue::Int16(v) => write!(f, "{}", v),
            ConstantValue::Int32(v) => write!(f, "{}", v),
            ConstantValue::Int64(v) => write!(f, "{}", v),
            ConstantValue::Uint8(v) => write!(f, "{}", v),
            ConstantValue::Uint16(v) => write!(f, "{}", v),
            ConstantValue::Uint32(v) => write!(f, "{}", v),
            ConstantValue::Uint64(v) => write!(f, "{}", v),
            ConstantValue::Float32(v) => write!(f, "{}", v),
            ConstantValue::Float64(v) => write!(f, "{}", v),
            ConstantValue::String(v) => write!(f, "{:?}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseNumericError {
    Malformed,
    OutOfBounds,
}

impl fmt::Display for ParseNumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseNumericError::Malformed => write!(f, "malformed numeric literal"),
            ParseNumericError::OutOfBounds => write!(f, "numeric literal out of bounds"),
        }
    }
}

/// Parse a numeric literal as `kind`.
///
/// Integers accept an optional `-`, then `0x` hex, `0b` binary or decimal
/// digits. Float kinds accept decimal and exponent notation.
pub fn parse_numeric(
    text: &str,
    kind: ConstantValueKind,
) -> Result<ConstantValue, ParseNumericError> {
    if let Some((min, max)) = kind.integer_bounds() {
        let value = parse_integer(text)?;
        if value < min || value > max {
            return Err(ParseNumericError::OutOfBounds);
        }
        return Ok(integer_value(kind, value));
    }

    let value = parse_float(text)?;
    match kind {
        ConstantValueKind::Float64 => Ok(ConstantValue::Float64(value)),
        ConstantValueKind::Float32 => {
            if value.abs() > f32::MAX as f64 {
                Err(ParseNumericError::OutOfBounds)
            } else {
                Ok(ConstantValue::Float32(value as f32))
            }
        }
        _ => Err(ParseNumericError::Malformed),
    }
}

fn parse_integer(text: &str) -> Result<i128, ParseNumericError> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (digits, radix) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(binary) = unsigned
        .strip_prefix("0b")
        .or_else(|| unsigned.strip_prefix("0B"))
    {
        (binary, 2)
    } else {
        (unsigned, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(ParseNumericError::Malformed);
    }

    let magnitude =
        u128::from_str_radix(digits, radix).map_err(|_| ParseNumericError::OutOfBounds)?;
    let magnitude = i128::try_from(magnitude).map_err(|_| ParseNumericError::OutOfBounds)?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_float(text: &str) -> Result<f64, ParseNumericError> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    // Rejects `inf`, `nan`, leading `+` and friends that `f64::from_str` allows.
    if !unsigned.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ParseNumericError::Malformed);
    }
    let value: f64 = text.parse().map_err(|_| ParseNumericError::Malformed)?;
    if value.is_infinite() {
        return Err(ParseNumericError::OutOfBounds);
    }
    Ok(value)
}

/// Decode a quoted string literal, returning its contents.
///
/// Supports the escapes `\\ \" \n \r \t \0`; returns `None` for anything else.
pub fn decode_string_literal(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    let mut decoded = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        let escaped = match chars.next()? {
            '\\' => '\\',
            '"' => '"',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            _ => return None,
        };
        decoded.push(escaped);
    }
    Some(decoded)
}
