//! Test-group taxonomy records.
//!
//! The taxonomy is a tree of groups, subgroups and parameters. It is stored as a single
//! aggregate under the `testGroups` key of the `labInfo` table.

use super::{is_false, nullable_text, optional_number};
use crate::constants::TEST_GROUPS_KEY;
use pathlab_types::{NonEmptyText, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which reference interval applies to a patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RangeCategory {
    #[serde(alias = "New Born")]
    NewBorn,
    Male,
    Female,
    Common,
}

impl RangeCategory {
    pub const ALL: [RangeCategory; 4] = [
        RangeCategory::NewBorn,
        RangeCategory::Male,
        RangeCategory::Female,
        RangeCategory::Common,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeCategory::NewBorn => "NewBorn",
            RangeCategory::Male => "Male",
            RangeCategory::Female => "Female",
            RangeCategory::Common => "Common",
        }
    }
}

impl fmt::Display for RangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RangeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        RangeCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(&normalised))
            .ok_or_else(|| {
                format!("unknown range category '{s}' (expected NewBorn, Male, Female or Common)")
            })
    }
}

/// A reference interval. Absent bounds never flag a value as abnormal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    #[serde(
        default,
        deserialize_with = "optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<f64>,
    #[serde(
        default,
        deserialize_with = "optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ReferenceRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            note: None,
        }
    }

    /// Whether `value` lies outside this interval.
    pub fn excludes(&self, value: f64) -> bool {
        self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max)
    }
}

/// A measurable test parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: RecordId,
    pub name: NonEmptyText,
    #[serde(default, deserialize_with = "nullable_text")]
    pub unit: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub note: String,
    #[serde(default)]
    pub ranges: BTreeMap<RangeCategory, ReferenceRange>,
}

impl Parameter {
    pub fn new(id: RecordId, name: NonEmptyText) -> Self {
        Self {
            id,
            name,
            unit: String::new(),
            note: String::new(),
            ranges: BTreeMap::new(),
        }
    }
}

/// A named cluster of parameters inside a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subgroup {
    pub id: RecordId,
    pub name: NonEmptyText,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Subgroup {
    pub fn new(id: RecordId, name: NonEmptyText) -> Self {
        Self {
            id,
            name,
            parameters: Vec::new(),
        }
    }
}

/// A test group, the unit of test selection and of report sections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: RecordId,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default, deserialize_with = "nullable_text")]
    pub desc: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub has_ranges: bool,
    #[serde(default)]
    pub sub_groups: Vec<Subgroup>,
}

impl Group {
    pub fn new(id: RecordId, details: GroupDetails) -> Self {
        Self {
            id,
            name: details.name,
            classification: details.classification,
            desc: details.desc,
            has_ranges: details.has_ranges,
            sub_groups: Vec::new(),
        }
    }

    /// Heading printed above the group on reports.
    pub fn heading(&self) -> &str {
        self.classification
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.name.as_str())
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.sub_groups.iter().flat_map(|sg| sg.parameters.iter())
    }
}

/// Editable group attributes, used when creating or updating a group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupDetails {
    pub name: NonEmptyText,
    pub classification: Option<String>,
    pub desc: String,
    pub has_ranges: bool,
}

impl GroupDetails {
    pub fn named(name: NonEmptyText) -> Self {
        Self {
            name,
            classification: None,
            desc: String::new(),
            has_ranges: false,
        }
    }
}

/// The stored form of the taxonomy aggregate: `{ "id": "testGroups", "data": [...] }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestGroupsRecord {
    pub id: String,
    #[serde(default)]
    pub data: Vec<Group>,
}

impl TestGroupsRecord {
    pub fn new(data: Vec<Group>) -> Self {
        Self {
            id: TEST_GROUPS_KEY.to_string(),
            data,
        }
    }
}

/// Decodes an imported taxonomy file: either the bare exported array or the stored record.
pub(crate) fn decode_taxonomy(value: serde_json::Value) -> Result<Vec<Group>, String> {
    if value.is_array() {
        super::decode_value::<Vec<Group>>(value, "taxonomy")
    } else {
        super::decode_value::<TestGroupsRecord>(value, "taxonomy").map(|record| record.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_exported_group() {
        let group: Group = serde_json::from_value(json!({
            "id": "1718000000001",
            "name": "Complete Blood Count",
            "desc": null,
            "hasRanges": true,
            "subGroups": [{
                "id": "1718000000002",
                "name": "Haemogram",
                "parameters": [{
                    "id": "1718000000003",
                    "name": "Hemoglobin",
                    "unit": "g/dL",
                    "ranges": {
                        "Male": {"min": 13, "max": "17"},
                        "Female": {"min": 12, "max": 15, "note": "adult"},
                        "New Born": {"min": "", "max": 20}
                    }
                }]
            }]
        }))
        .expect("parse group");

        assert_eq!(group.heading(), "Complete Blood Count");
        assert!(group.has_ranges);
        assert_eq!(group.desc, "");

        let param = &group.sub_groups[0].parameters[0];
        assert_eq!(param.ranges[&RangeCategory::Male].max, Some(17.0));
        assert_eq!(param.ranges[&RangeCategory::NewBorn].min, None);
        assert_eq!(
            param.ranges[&RangeCategory::Female].note.as_deref(),
            Some("adult")
        );
    }

    #[test]
    fn rejects_unknown_range_category() {
        let result = serde_json::from_value::<Parameter>(json!({
            "id": "p",
            "name": "Hb",
            "ranges": {"Child": {"min": 1, "max": 2}}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_blank_group_name() {
        assert!(serde_json::from_value::<Group>(json!({"id": "g", "name": "  "})).is_err());
    }

    #[test]
    fn classification_overrides_heading() {
        let mut group = Group::new(
            RecordId::parse("g").unwrap(),
            GroupDetails::named(NonEmptyText::new("CBC").unwrap()),
        );
        group.classification = Some("HAEMATOLOGY".into());
        assert_eq!(group.heading(), "HAEMATOLOGY");
    }

    #[test]
    fn range_excludes_outside_bounds_only() {
        let range = ReferenceRange::new(Some(12.0), Some(15.0));
        assert!(range.excludes(10.0));
        assert!(range.excludes(15.5));
        assert!(!range.excludes(12.0));
        assert!(!ReferenceRange::new(None, None).excludes(-1.0));
    }

    #[test]
    fn range_category_parses_display_names() {
        assert_eq!(
            "New Born".parse::<RangeCategory>().unwrap(),
            RangeCategory::NewBorn
        );
        assert_eq!("common".parse::<RangeCategory>().unwrap(), RangeCategory::Common);
        assert!("Child".parse::<RangeCategory>().is_err());
    }

    #[test]
    fn decode_taxonomy_accepts_array_or_record() {
        let groups = decode_taxonomy(json!([{"id": "g", "name": "CBC"}])).expect("array form");
        assert_eq!(groups.len(), 1);

        let groups =
            decode_taxonomy(json!({"id": "testGroups", "data": [{"id": "g", "name": "CBC"}]}))
                .expect("record form");
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn decode_taxonomy_reports_failing_path() {
        let err = decode_taxonomy(json!([{"id": "g", "name": "CBC", "subGroups": [{"id": "s"}]}]))
            .expect_err("subgroup without name");
        assert!(err.contains("[0].subGroups[0]"), "unexpected message: {err}");
    }
}
