//! Entered test results.

use super::Scalar;
use pathlab_types::RecordId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Raw entered values keyed by parameter id.
///
/// Values are kept as entered text; numeric interpretation happens when a report is built.
pub type TestResults = BTreeMap<RecordId, String>;

/// The persisted result set for one patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsRecord {
    pub patient_id: RecordId,
    #[serde(default, deserialize_with = "lenient_results")]
    pub results: TestResults,
}

impl ResultsRecord {
    pub fn new(patient_id: RecordId, results: TestResults) -> Self {
        Self {
            patient_id,
            results,
        }
    }
}

/// Accepts result values written as strings or numbers; `null` entries are dropped.
fn lenient_results<'de, D>(deserializer: D) -> Result<TestResults, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<RecordId, Option<Scalar>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(id, value)| value.map(|v| (id, v.into_text())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_numbers_and_drops_nulls() {
        let record: ResultsRecord = serde_json::from_value(json!({
            "patientId": "p1",
            "results": {"hb": 13.5, "wbc": "7000", "rbc": null}
        }))
        .expect("parse results");

        assert_eq!(record.results.len(), 2);
        assert_eq!(record.results[&RecordId::parse("hb").unwrap()], "13.5");
        assert_eq!(record.results[&RecordId::parse("wbc").unwrap()], "7000");
    }

    #[test]
    fn missing_results_is_empty() {
        let record: ResultsRecord =
            serde_json::from_value(json!({"patientId": "p1"})).expect("parse results");
        assert!(record.results.is_empty());
    }
}
