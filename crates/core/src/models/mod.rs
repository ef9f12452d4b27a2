//! Domain records persisted by the store.
//!
//! Every record keeps the camelCase JSON shape used by earlier releases of the lab
//! application so exported bundles import unchanged. Where the wire shape is looser than the
//! domain type (numbers stored as strings, nullable text, the `age`/`isNewBorn` pair) the
//! conversion happens here and nowhere else.

pub mod lab;
pub mod patient;
pub mod results;
pub mod taxonomy;

pub use lab::{LabDetails, LabDetailsRecord, LabDetailsUpdate};
pub use patient::{Age, Gender, Patient, PatientStatus, PatientUpdate};
pub use results::{ResultsRecord, TestResults};
pub use taxonomy::{
    Group, GroupDetails, Parameter, RangeCategory, ReferenceRange, Subgroup, TestGroupsRecord,
};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Decodes a JSON value into `T`, reporting the path of the first mismatching field.
pub(crate) fn decode_value<T: DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<T, String> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        format!("{what} schema mismatch at {path}: {source}")
    })
}

/// Decodes JSON text into `T`, reporting the path of the first mismatching field.
pub(crate) fn decode_slice<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, String> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        format!("{what} is not valid at {path}: {source}")
    })?;
    deserializer
        .end()
        .map_err(|err| format!("{what} has trailing content: {err}"))?;
    Ok(value)
}

/// A JSON scalar that the lab application may have written as text or as a number.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl Scalar {
    pub(crate) fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

/// Deserializes a string that may be `null` or missing, mapping both to an empty string.
pub(crate) fn nullable_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(Scalar::into_text)
        .unwrap_or_default())
}

/// Deserializes an optional bound that may be a number, a numeric string, empty or `null`.
pub(crate) fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Number(n)) => Ok(n.as_f64()),
        Some(Scalar::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
        Some(Scalar::Bool(b)) => Err(serde::de::Error::custom(format!(
            "expected a number, got {b}"
        ))),
    }
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
