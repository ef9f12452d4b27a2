//! Laboratory configuration.

use super::nullable_text;
use crate::constants::LAB_DETAILS_KEY;
use serde::{Deserialize, Serialize};

/// The lab's letterhead, signatories and signature image.
///
/// `signature` holds a data URL (`data:image/png;base64,...`) captured from a signature pad.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabDetails {
    #[serde(deserialize_with = "nullable_text")]
    pub lab_name: String,
    #[serde(deserialize_with = "nullable_text")]
    pub sub_heading: String,
    #[serde(deserialize_with = "nullable_text")]
    pub address: String,
    #[serde(deserialize_with = "nullable_text")]
    pub phone: String,
    #[serde(deserialize_with = "nullable_text")]
    pub email: String,
    #[serde(deserialize_with = "nullable_text")]
    pub specialist_name: String,
    #[serde(deserialize_with = "nullable_text")]
    pub specialist_qualification: String,
    #[serde(deserialize_with = "nullable_text")]
    pub doctor_name: String,
    #[serde(deserialize_with = "nullable_text")]
    pub doctor_qualification: String,
    #[serde(deserialize_with = "nullable_text")]
    pub reg_no: String,
    #[serde(deserialize_with = "nullable_text")]
    pub estd: String,
    #[serde(deserialize_with = "nullable_text")]
    pub timings: String,
    #[serde(deserialize_with = "nullable_text")]
    pub signature: String,
}

impl LabDetails {
    fn fields(&self) -> [(&'static str, &str); 13] {
        [
            ("labName", &self.lab_name),
            ("subHeading", &self.sub_heading),
            ("address", &self.address),
            ("phone", &self.phone),
            ("email", &self.email),
            ("specialistName", &self.specialist_name),
            ("specialistQualification", &self.specialist_qualification),
            ("doctorName", &self.doctor_name),
            ("doctorQualification", &self.doctor_qualification),
            ("regNo", &self.reg_no),
            ("estd", &self.estd),
            ("timings", &self.timings),
            ("signature", &self.signature),
        ]
    }

    /// Names of required fields that are blank. Every field except `email` is required.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(name, value)| *name != "email" && value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn has_signature(&self) -> bool {
        !self.signature.trim().is_empty()
    }
}

/// The stored form of the lab details singleton: the details flattened next to their key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabDetailsRecord {
    pub id: String,
    #[serde(flatten)]
    pub details: LabDetails,
}

impl LabDetailsRecord {
    pub fn new(details: LabDetails) -> Self {
        Self {
            id: LAB_DETAILS_KEY.to_string(),
            details,
        }
    }
}

/// Partial lab details, as read from an imported `lab-details.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabDetailsUpdate {
    pub lab_name: Option<String>,
    pub sub_heading: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specialist_name: Option<String>,
    pub specialist_qualification: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_qualification: Option<String>,
    pub reg_no: Option<String>,
    pub estd: Option<String>,
    pub timings: Option<String>,
    pub signature: Option<String>,
}

impl LabDetailsUpdate {
    /// Overwrites the fields present in this update.
    pub fn apply(self, details: &mut LabDetails) {
        let pairs = [
            (self.lab_name, &mut details.lab_name),
            (self.sub_heading, &mut details.sub_heading),
            (self.address, &mut details.address),
            (self.phone, &mut details.phone),
            (self.email, &mut details.email),
            (self.specialist_name, &mut details.specialist_name),
            (
                self.specialist_qualification,
                &mut details.specialist_qualification,
            ),
            (self.doctor_name, &mut details.doctor_name),
            (self.doctor_qualification, &mut details.doctor_qualification),
            (self.reg_no, &mut details.reg_no),
            (self.estd, &mut details.estd),
            (self.timings, &mut details.timings),
            (self.signature, &mut details.signature),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete() -> LabDetails {
        LabDetails {
            lab_name: "City Lab".into(),
            sub_heading: "Pathology".into(),
            address: "1 Main Road".into(),
            phone: "12345".into(),
            email: String::new(),
            specialist_name: "Dr. A".into(),
            specialist_qualification: "MD".into(),
            doctor_name: "Dr. B".into(),
            doctor_qualification: "MBBS".into(),
            reg_no: "R-1".into(),
            estd: "1999".into(),
            timings: "9-5".into(),
            signature: "data:image/png;base64,AAAA".into(),
        }
    }

    #[test]
    fn email_is_optional() {
        assert!(complete().missing_required_fields().is_empty());
    }

    #[test]
    fn reports_blank_required_fields() {
        let mut details = complete();
        details.reg_no = "  ".into();
        details.signature.clear();
        assert_eq!(details.missing_required_fields(), vec!["regNo", "signature"]);
    }

    #[test]
    fn stored_record_is_flat() {
        let value = serde_json::to_value(LabDetailsRecord::new(complete())).unwrap();
        assert_eq!(value["id"], json!("labDetails"));
        assert_eq!(value["labName"], json!("City Lab"));

        let back: LabDetailsRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.details, complete());
    }

    #[test]
    fn update_overwrites_present_fields_only() {
        let mut details = complete();
        let update: LabDetailsUpdate =
            serde_json::from_value(json!({"labName": "New Lab", "unknown": 1})).unwrap();
        update.apply(&mut details);
        assert_eq!(details.lab_name, "New Lab");
        assert_eq!(details.phone, "12345");
    }
}
