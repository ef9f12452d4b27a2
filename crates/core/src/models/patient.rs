//! Patient records.
//!
//! [`Patient`] is the domain type. On disk and in bundles a patient is stored in the wire
//! shape produced by the intake form (`age` as text or number next to an `isNewBorn` flag,
//! `sampleDate` as `YYYY-MM-DD`), translated by [`PatientWire`].

use super::{is_false, nullable_text, Scalar};
use crate::models::taxonomy::RangeCategory;
use chrono::{DateTime, NaiveDate, Utc};
use pathlab_types::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Patient gender as captured at intake.
///
/// Values other than `Male`/`Female` are preserved verbatim so records round-trip, but they
/// never select a gender-specific reference range or a salutation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
    Other(String),
}

impl Gender {
    fn from_wire(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Gender::Unspecified
        } else if trimmed.eq_ignore_ascii_case("male") {
            Gender::Male
        } else if trimmed.eq_ignore_ascii_case("female") {
            Gender::Female
        } else {
            Gender::Other(trimmed.to_string())
        }
    }

    fn to_wire(&self) -> String {
        self.as_str().to_string()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unspecified => "",
            Gender::Other(s) => s,
        }
    }

    fn is_new_born_marker(&self) -> bool {
        match self {
            Gender::Other(s) => {
                let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                compact.eq_ignore_ascii_case("newborn")
            }
            _ => false,
        }
    }

    /// Salutation printed before the patient's name on reports.
    pub fn salutation(&self) -> &'static str {
        match self {
            Gender::Male => "Mr. ",
            Gender::Female => "Ms. ",
            Gender::Unspecified | Gender::Other(_) => "",
        }
    }

    /// Gender-specific reference range category, if any.
    pub fn range_category(&self) -> Option<RangeCategory> {
        match self {
            Gender::Male => Some(RangeCategory::Male),
            Gender::Female => Some(RangeCategory::Female),
            Gender::Unspecified | Gender::Other(_) => None,
        }
    }
}

impl From<&str> for Gender {
    fn from(raw: &str) -> Self {
        Gender::from_wire(raw)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patient age. A new-born has no age in years; the two are mutually exclusive.
///
/// Ages in years may be fractional (`1.5` for eighteen months), as the intake form accepts
/// any non-negative number.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Age {
    Years(f64),
    NewBorn,
    #[default]
    Unknown,
}

impl Age {
    /// Age in years, rejecting negative and non-finite values.
    pub fn years(years: f64) -> Result<Self, String> {
        if years.is_finite() && years >= 0.0 {
            Ok(Age::Years(years))
        } else {
            Err(format!("age must be a non-negative number of years, got {years}"))
        }
    }

    pub fn is_new_born(&self) -> bool {
        matches!(self, Age::NewBorn)
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Age::Years(years) => write!(f, "{years}"),
            Age::NewBorn => f.write_str("New Born"),
            Age::Unknown => Ok(()),
        }
    }
}

/// Workflow status of a patient's report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    #[default]
    Pending,
    Active,
    Complete,
}

impl std::str::FromStr for PatientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PatientStatus::Pending),
            "active" => Ok(PatientStatus::Active),
            "complete" => Ok(PatientStatus::Complete),
            other => Err(format!(
                "unknown patient status '{other}' (expected pending, active or complete)"
            )),
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatientStatus::Pending => "pending",
            PatientStatus::Active => "active",
            PatientStatus::Complete => "complete",
        })
    }
}

/// A patient record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PatientWire", into = "PatientWire")]
pub struct Patient {
    pub id: RecordId,
    pub name: String,
    pub gender: Gender,
    pub age: Age,
    pub mobile: String,
    pub email: String,
    pub referred_by: String,
    pub consultant_doctor: String,
    pub sample_date: Option<NaiveDate>,
    pub sample_type: String,
    pub status: PatientStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Ids of the test groups selected for this patient.
    pub selected_tests: Vec<RecordId>,
}

impl Patient {
    /// Creates an empty pending patient with the given id.
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            name: String::new(),
            gender: Gender::Unspecified,
            age: Age::Unknown,
            mobile: String::new(),
            email: String::new(),
            referred_by: String::new(),
            consultant_doctor: String::new(),
            sample_date: None,
            sample_type: String::new(),
            status: PatientStatus::Pending,
            created_at: None,
            updated_at: None,
            selected_tests: Vec::new(),
        }
    }

    /// New-born patients are recorded either through the age field or, on older intake
    /// forms, by choosing "New Born" as the gender.
    pub fn is_new_born(&self) -> bool {
        self.age.is_new_born() || self.gender.is_new_born_marker()
    }

    /// Timestamp used to order the recent-patients list: `updatedAt`, then `sampleDate`, then
    /// `createdAt`.
    pub fn recency(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .or_else(|| {
                self.sample_date
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            })
            .or(self.created_at)
    }

    /// Case-insensitive search over name, mobile and sample date.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term)
            || self.mobile.contains(&term)
            || self
                .sample_date
                .map(|d| d.format("%Y-%m-%d").to_string().contains(&term))
                .unwrap_or(false)
    }
}

/// Partial patient update; present fields overwrite, absent fields are kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<Age>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub referred_by: Option<String>,
    pub consultant_doctor: Option<String>,
    pub sample_date: Option<Option<NaiveDate>>,
    pub sample_type: Option<String>,
    pub status: Option<PatientStatus>,
    pub updated_at: Option<DateTime<Utc>>,
    pub selected_tests: Option<Vec<RecordId>>,
}

impl PatientUpdate {
    /// Shallow-merges this update into `patient`.
    pub fn apply(self, patient: &mut Patient) {
        if let Some(v) = self.name {
            patient.name = v;
        }
        if let Some(v) = self.gender {
            patient.gender = v;
        }
        if let Some(v) = self.age {
            patient.age = v;
        }
        if let Some(v) = self.mobile {
            patient.mobile = v;
        }
        if let Some(v) = self.email {
            patient.email = v;
        }
        if let Some(v) = self.referred_by {
            patient.referred_by = v;
        }
        if let Some(v) = self.consultant_doctor {
            patient.consultant_doctor = v;
        }
        if let Some(v) = self.sample_date {
            patient.sample_date = v;
        }
        if let Some(v) = self.sample_type {
            patient.sample_type = v;
        }
        if let Some(v) = self.status {
            patient.status = v;
        }
        if let Some(v) = self.updated_at {
            patient.updated_at = Some(v);
        }
        if let Some(v) = self.selected_tests {
            patient.selected_tests = v;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == PatientUpdate::default()
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientWire {
    id: RecordId,
    #[serde(default, deserialize_with = "nullable_text")]
    name: String,
    #[serde(default, deserialize_with = "nullable_text")]
    gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    age: Option<Scalar>,
    #[serde(default, skip_serializing_if = "is_false")]
    is_new_born: bool,
    #[serde(default, deserialize_with = "nullable_text")]
    mobile: String,
    #[serde(default, deserialize_with = "nullable_text")]
    email: String,
    #[serde(default, deserialize_with = "nullable_text")]
    referred_by: String,
    #[serde(default, deserialize_with = "nullable_text")]
    consultant_doctor: String,
    #[serde(default, deserialize_with = "nullable_text")]
    sample_date: String,
    #[serde(default, deserialize_with = "nullable_text")]
    sample_type: String,
    #[serde(default)]
    status: PatientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    selected_tests: Vec<RecordId>,
}

fn parse_age(raw: Option<Scalar>) -> Result<Age, String> {
    let text = match raw {
        None => return Ok(Age::Unknown),
        Some(scalar) => scalar.into_text(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Age::Unknown);
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| format!("age must be a number of years, got {text:?}"))
        .and_then(Age::years)
}

fn age_number(years: f64) -> Option<serde_json::Number> {
    if years.fract() == 0.0 && years <= u64::MAX as f64 {
        Some((years as u64).into())
    } else {
        serde_json::Number::from_f64(years)
    }
}

fn parse_sample_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    // Full timestamps carry the calendar date in their first ten characters.
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| format!("sampleDate must be YYYY-MM-DD, got {raw:?}: {e}"))
}

impl TryFrom<PatientWire> for Patient {
    type Error = String;

    fn try_from(wire: PatientWire) -> Result<Self, Self::Error> {
        let age = if wire.is_new_born {
            Age::NewBorn
        } else {
            parse_age(wire.age)?
        };

        Ok(Patient {
            id: wire.id,
            name: wire.name,
            gender: Gender::from_wire(&wire.gender),
            age,
            mobile: wire.mobile,
            email: wire.email,
            referred_by: wire.referred_by,
            consultant_doctor: wire.consultant_doctor,
            sample_date: parse_sample_date(&wire.sample_date)?,
            sample_type: wire.sample_type,
            status: wire.status,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            selected_tests: wire.selected_tests,
        })
    }
}

impl From<Patient> for PatientWire {
    fn from(patient: Patient) -> Self {
        let (age, is_new_born) = match patient.age {
            Age::Years(years) => (age_number(years).map(Scalar::Number), false),
            Age::NewBorn => (None, true),
            Age::Unknown => (None, false),
        };

        PatientWire {
            id: patient.id,
            name: patient.name,
            gender: patient.gender.to_wire(),
            age,
            is_new_born,
            mobile: patient.mobile,
            email: patient.email,
            referred_by: patient.referred_by,
            consultant_doctor: patient.consultant_doctor,
            sample_date: patient
                .sample_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            sample_type: patient.sample_type,
            status: patient.status,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
            selected_tests: patient.selected_tests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_intake_form_shape() {
        let patient: Patient = serde_json::from_value(json!({
            "id": "1718000000123",
            "name": "Asha",
            "gender": "Female",
            "age": "30",
            "mobile": "9876543210",
            "referredBy": "Dr. Shah",
            "sampleDate": "2024-06-10",
            "sampleType": "Blood",
            "selectedTests": ["g1", "g2"]
        }))
        .expect("parse patient");

        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.age, Age::Years(30.0));
        assert_eq!(patient.status, PatientStatus::Pending);
        assert_eq!(
            patient.sample_date,
            Some(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
        );
        assert_eq!(patient.selected_tests.len(), 2);
    }

    #[test]
    fn new_born_flag_wins_over_age() {
        let patient: Patient = serde_json::from_value(json!({
            "id": "p1",
            "age": 3,
            "isNewBorn": true
        }))
        .expect("parse patient");
        assert_eq!(patient.age, Age::NewBorn);

        let wire = serde_json::to_value(&patient).unwrap();
        assert_eq!(wire["isNewBorn"], json!(true));
        assert!(wire.get("age").is_none());
    }

    #[test]
    fn unknown_gender_is_preserved_without_salutation() {
        let patient: Patient =
            serde_json::from_value(json!({"id": "p1", "gender": "New Born"})).unwrap();
        assert_eq!(patient.gender, Gender::Other("New Born".into()));
        assert_eq!(patient.gender.salutation(), "");
        assert_eq!(patient.gender.range_category(), None);
        assert!(patient.is_new_born());

        let wire = serde_json::to_value(&patient).unwrap();
        assert_eq!(wire["gender"], json!("New Born"));
    }

    #[test]
    fn rejects_non_numeric_age() {
        let err = serde_json::from_value::<Patient>(json!({"id": "p1", "age": "thirty"}))
            .expect_err("should reject");
        assert!(err.to_string().contains("number of years"));

        let err = serde_json::from_value::<Patient>(json!({"id": "p1", "age": "-2"}))
            .expect_err("should reject");
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn keeps_fractional_ages() {
        let patient: Patient =
            serde_json::from_value(json!({"id": "p1", "age": "1.5"})).expect("parse patient");
        assert_eq!(patient.age, Age::Years(1.5));
        assert_eq!(patient.age.to_string(), "1.5");

        let wire = serde_json::to_value(&patient).unwrap();
        assert_eq!(wire["age"], json!(1.5));
    }

    #[test]
    fn whole_ages_are_written_as_integers() {
        let patient: Patient =
            serde_json::from_value(json!({"id": "p1", "age": 30})).expect("parse patient");
        assert_eq!(patient.age.to_string(), "30");
        let wire = serde_json::to_value(&patient).unwrap();
        assert_eq!(wire["age"], json!(30));
    }

    #[test]
    fn rejects_missing_id() {
        assert!(serde_json::from_value::<Patient>(json!({"name": "A"})).is_err());
    }

    #[test]
    fn accepts_full_timestamp_sample_date() {
        let patient: Patient = serde_json::from_value(json!({
            "id": "p1",
            "sampleDate": "2024-06-10T08:30:00.000Z"
        }))
        .unwrap();
        assert_eq!(
            patient.sample_date,
            Some(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
        );
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut patient = Patient::new(RecordId::parse("p1").unwrap());
        patient.name = "Asha".into();
        patient.mobile = "123".into();

        PatientUpdate {
            mobile: Some("456".into()),
            status: Some(PatientStatus::Active),
            ..Default::default()
        }
        .apply(&mut patient);

        assert_eq!(patient.name, "Asha");
        assert_eq!(patient.mobile, "456");
        assert_eq!(patient.status, PatientStatus::Active);
    }

    #[test]
    fn search_matches_name_mobile_and_date() {
        let mut patient = Patient::new(RecordId::parse("p1").unwrap());
        patient.name = "Asha Rao".into();
        patient.mobile = "9876543210".into();
        patient.sample_date = NaiveDate::from_ymd_opt(2024, 6, 10);

        assert!(patient.matches_search("asha"));
        assert!(patient.matches_search("6543"));
        assert!(patient.matches_search("2024-06"));
        assert!(!patient.matches_search("zzz"));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            "Complete".parse::<PatientStatus>().unwrap(),
            PatientStatus::Complete
        );
        assert!("done".parse::<PatientStatus>().is_err());
    }
}
