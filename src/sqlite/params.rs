use rusqlite::types::Value;

use crate::format::{BoundData, BoundValue};
use crate::validation::PlaceholderKind;

/// Convert one validated value to the rusqlite value stored for its placeholder kind.
///
/// Integer and boolean kinds bind as INTEGER, decimals as REAL, blobs as BLOB. Text that does not
/// parse for its kind (out-of-range integers) is bound as TEXT and left to column affinity.
#[must_use]
pub fn bound_to_sqlite_value(value: &BoundValue) -> Value {
    match &value.data {
        BoundData::Null => Value::Null,
        BoundData::Bytes(bytes) => Value::Blob(bytes.clone()),
        BoundData::Text(text) => match value.kind {
            PlaceholderKind::Integer | PlaceholderKind::Boolean => text
                .parse::<i64>()
                .map_or_else(|_| Value::Text(text.clone()), Value::Integer),
            PlaceholderKind::Decimal => text
                .parse::<f64>()
                .map_or_else(|_| Value::Text(text.clone()), Value::Real),
            PlaceholderKind::Blob => Value::Blob(text.as_bytes().to_vec()),
            _ => Value::Text(text.clone()),
        },
    }
}

/// `SQLite` parameter container.
pub struct Params(pub Vec<Value>);

impl Params {
    #[must_use]
    pub fn convert(values: &[BoundValue]) -> Self {
        Params(values.iter().map(bound_to_sqlite_value).collect())
    }

    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_choose_storage_class() {
        let params = Params::convert(&[
            BoundValue::text(PlaceholderKind::Integer, "2"),
            BoundValue::text(PlaceholderKind::Boolean, "1"),
            BoundValue::text(PlaceholderKind::Decimal, "15.25"),
            BoundValue::text(PlaceholderKind::String, "2"),
            BoundValue::text(PlaceholderKind::Integer, "99999999999999999999"),
            BoundValue {
                kind: PlaceholderKind::String,
                data: BoundData::Null,
            },
        ]);
        assert_eq!(
            params.as_values(),
            &[
                Value::Integer(2),
                Value::Integer(1),
                Value::Real(15.25),
                Value::Text("2".into()),
                Value::Text("99999999999999999999".into()),
                Value::Null,
            ]
        );
    }
}
