//! The upstream JSHint error record.

use serde_json::Value;

/// One entry of `JSHINT.errors`.
///
/// Every field is optional: the library's objects are untyped and the list
/// is known to contain holes, so nothing here is assumed present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LintError {
    pub reason: Option<String>,
    /// 1-based line.
    pub line: Option<i64>,
    /// 1-based column.
    pub character: Option<i64>,
    pub code: Option<Value>,
    pub id: Option<String>,
}

impl LintError {
    /// Lenient extraction from a raw list entry.
    ///
    /// Returns `None` for `null` and any non-object entry. Fields with an
    /// unexpected type are dropped rather than failing the whole record.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let int = |key: &str| {
            object.get(key).and_then(|v| {
                v.as_i64()
                    .or_else(|| v.as_f64().map(|f| f.trunc() as i64))
            })
        };
        let string = |key: &str| object.get(key).and_then(Value::as_str).map(String::from);

        Some(Self {
            reason: string("reason"),
            line: int("line"),
            character: int("character"),
            code: object.get("code").filter(|v| !v.is_null()).cloned(),
            id: string("id"),
        })
    }

    /// The machine code as a string; numeric codes are stringified.
    #[must_use]
    pub fn code_string(&self) -> Option<String> {
        match self.code.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
