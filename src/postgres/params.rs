use std::error::Error;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_util::bytes::{BufMut, BytesMut};

use crate::format::{BoundData, BoundValue};

/// A bound value converted to the type the server declared for its parameter.
///
/// Conversion happens before the statement is sent so binding failures can be reported apart
/// from execution failures.
#[derive(Debug, Clone, PartialEq)]
pub enum PgParam {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Numeric(PgNumeric),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(JsonValue),
    /// Text family, enums, and anything else sent in its text form.
    Text(String),
}

impl PgParam {
    /// Convert `value` for a parameter of type `ty`.
    ///
    /// # Errors
    /// A message naming the value and the target type when the text does not parse.
    pub fn convert(value: &BoundValue, ty: &Type) -> Result<Self, String> {
        // domains (e.g. information_schema.sql_identifier) travel as their base type
        if let Kind::Domain(base) = ty.kind() {
            return Self::convert(value, base);
        }
        let text = match &value.data {
            BoundData::Null => return Ok(PgParam::Null),
            BoundData::Bytes(bytes) if *ty == Type::BYTEA => {
                return Ok(PgParam::Bytes(bytes.clone()));
            }
            // binary data headed for a text parameter is transcoded, not rejected
            BoundData::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            BoundData::Text(text) => text.clone(),
        };

        let invalid = |err: &dyn std::fmt::Display| {
            format!("cannot bind '{text}' as {}: {err}", ty.name())
        };

        let param = match *ty {
            Type::BOOL => PgParam::Bool(parse_bool(&text).ok_or_else(|| invalid(&"not a boolean"))?),
            Type::INT2 => PgParam::Int2(text.trim().parse().map_err(|e| invalid(&e))?),
            Type::INT4 => PgParam::Int4(text.trim().parse().map_err(|e| invalid(&e))?),
            Type::INT8 => PgParam::Int8(text.trim().parse().map_err(|e| invalid(&e))?),
            Type::FLOAT4 => PgParam::Float4(text.trim().parse().map_err(|e| invalid(&e))?),
            Type::FLOAT8 => PgParam::Float8(text.trim().parse().map_err(|e| invalid(&e))?),
            Type::NUMERIC => PgParam::Numeric(
                PgNumeric::parse(&text).ok_or_else(|| invalid(&"not a decimal number"))?,
            ),
            Type::BYTEA => PgParam::Bytes(text.as_bytes().to_vec()),
            Type::DATE => PgParam::Date(
                NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| invalid(&e))?,
            ),
            Type::TIME => PgParam::Time(
                NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f").map_err(|e| invalid(&e))?,
            ),
            Type::TIMESTAMP => {
                PgParam::Timestamp(parse_timestamp(&text).ok_or_else(|| invalid(&"not a timestamp"))?)
            }
            Type::TIMESTAMPTZ => PgParam::TimestampTz(
                parse_timestamptz(&text).ok_or_else(|| invalid(&"not a timestamp"))?,
            ),
            Type::JSON | Type::JSONB => {
                PgParam::Json(serde_json::from_str(&text).map_err(|e| invalid(&e))?)
            }
            _ if accepts_text(ty) => PgParam::Text(text.clone()),
            _ => return Err(invalid(&"unsupported parameter type")),
        };
        Ok(param)
    }
}

fn accepts_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::CHAR | Type::NAME | Type::UNKNOWN
    ) || matches!(ty.kind(), Kind::Enum(_))
        || matches!(ty.name(), "citext" | "ltree" | "lquery" | "ltxtquery")
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_timestamptz(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    DateTime::<FixedOffset>::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_timestamp(trimmed).map(|naive| naive.and_utc()))
}

impl ToSql for PgParam {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            PgParam::Null => Ok(IsNull::Yes),
            PgParam::Bool(b) => b.to_sql(ty, out),
            PgParam::Int2(i) => i.to_sql(ty, out),
            PgParam::Int4(i) => i.to_sql(ty, out),
            PgParam::Int8(i) => i.to_sql(ty, out),
            PgParam::Float4(f) => f.to_sql(ty, out),
            PgParam::Float8(f) => f.to_sql(ty, out),
            PgParam::Numeric(n) => {
                n.write(out);
                Ok(IsNull::No)
            }
            PgParam::Bytes(bytes) => bytes.as_slice().to_sql(ty, out),
            PgParam::Date(d) => d.to_sql(ty, out),
            PgParam::Time(t) => t.to_sql(ty, out),
            PgParam::Timestamp(ts) => ts.to_sql(ty, out),
            PgParam::TimestampTz(ts) => ts.to_sql(ty, out),
            PgParam::Json(v) => v.to_sql(ty, out),
            PgParam::Text(s) => {
                out.put_slice(s.as_bytes());
                Ok(IsNull::No)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // conversion already matched the value to the declared type
        true
    }

    to_sql_checked!();
}

const NUMERIC_NEG: u16 = 0x4000;

/// `NUMERIC` in the server's binary layout: base-10000 digits with a weight and display scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgNumeric {
    negative: bool,
    weight: i16,
    scale: u16,
    digits: Vec<i16>,
}

impl PgNumeric {
    /// Parse `[-+]digits[.digits]`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, unsigned) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let int_part = int_part.trim_start_matches('0');
        let scale = u16::try_from(frac_part.len()).ok()?;

        let int_pad = (4 - int_part.len() % 4) % 4;
        let int_digits = format!("{}{int_part}", "0".repeat(int_pad));
        let frac_pad = (4 - frac_part.len() % 4) % 4;
        let frac_digits = format!("{frac_part}{}", "0".repeat(frac_pad));

        let int_groups = groups(&int_digits)?;
        let frac_groups = groups(&frac_digits)?;
        let mut weight = i16::try_from(int_groups.len()).ok()? - 1;
        let mut digits: Vec<i16> = int_groups.into_iter().chain(frac_groups).collect();

        while digits.first() == Some(&0) {
            digits.remove(0);
            weight -= 1;
        }
        while digits.last() == Some(&0) {
            digits.pop();
        }
        if digits.is_empty() {
            return Some(Self {
                negative: false,
                weight: 0,
                scale,
                digits,
            });
        }

        Some(Self {
            negative,
            weight,
            scale,
            digits,
        })
    }

    fn write(&self, out: &mut BytesMut) {
        // digit count is bounded by the i16 weight range
        let ndigits = i16::try_from(self.digits.len()).unwrap_or(i16::MAX);
        out.put_i16(ndigits);
        out.put_i16(self.weight);
        out.put_u16(if self.negative { NUMERIC_NEG } else { 0 });
        out.put_u16(self.scale);
        for digit in &self.digits {
            out.put_i16(*digit);
        }
    }

    /// Decode the server's binary layout back into decimal text.
    #[must_use]
    pub fn decode(raw: &[u8]) -> Option<String> {
        let read_i16 = |at: usize| -> Option<i16> {
            Some(i16::from_be_bytes([*raw.get(at)?, *raw.get(at + 1)?]))
        };
        let ndigits = usize::try_from(read_i16(0)?).ok()?;
        let weight = i32::from(read_i16(2)?);
        let sign = u16::from_be_bytes([*raw.get(4)?, *raw.get(5)?]);
        let scale = usize::from(u16::from_be_bytes([*raw.get(6)?, *raw.get(7)?]));
        if sign == 0xC000 {
            return Some("NaN".to_string());
        }
        let digits: Vec<i16> = (0..ndigits)
            .map(|i| read_i16(8 + i * 2))
            .collect::<Option<_>>()?;

        let mut int_part = String::new();
        for pos in 0..=weight.max(-1) {
            let digit = usize::try_from(pos)
                .ok()
                .and_then(|p| digits.get(p))
                .copied()
                .unwrap_or(0);
            if int_part.is_empty() {
                int_part = digit.to_string();
            } else {
                int_part.push_str(&format!("{digit:04}"));
            }
        }
        if int_part.is_empty() {
            int_part.push('0');
        }

        let mut frac_part = String::new();
        let mut group = weight + 1;
        while frac_part.len() < scale {
            let digit = usize::try_from(group)
                .ok()
                .and_then(|g| digits.get(g))
                .copied()
                .unwrap_or(0);
            if group < 0 {
                frac_part.push_str("0000");
            } else {
                frac_part.push_str(&format!("{digit:04}"));
            }
            group += 1;
        }
        frac_part.truncate(scale);

        let mut out = String::new();
        if sign == NUMERIC_NEG {
            out.push('-');
        }
        out.push_str(&int_part);
        if scale > 0 {
            out.push('.');
            out.push_str(&frac_part);
        }
        Some(out)
    }
}

fn groups(digits: &str) -> Option<Vec<i16>> {
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).ok()?.parse::<i16>().ok())
        .collect()
}
