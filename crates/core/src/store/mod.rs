//! The record store.
//!
//! [`RecordStore`] provides typed CRUD over the three tables of the local database:
//!
//! - `patients`, keyed by patient id
//! - `testResults`, keyed by patient id
//! - `labInfo`, holding the lab-details singleton and the taxonomy aggregate
//!
//! Rows are stored in their camelCase wire shape so a database can be exported and imported
//! by earlier releases of the lab application.

mod backend;
mod fs;
mod memory;

pub use backend::{Backend, Snapshot, Table, TableRows};
pub use fs::FsBackend;
pub use memory::MemoryBackend;

use crate::config::CoreConfig;
use crate::constants::{LAB_DETAILS_KEY, TEST_GROUPS_KEY};
use crate::models::taxonomy::decode_taxonomy;
use crate::models::{
    decode_slice, decode_value, Group, GroupDetails, LabDetails, LabDetailsRecord,
    LabDetailsUpdate, Parameter, Patient, PatientStatus, PatientUpdate, ResultsRecord, Subgroup,
    TestGroupsRecord, TestResults,
};
use crate::report_data::ReportData;
use crate::taxonomy::{Taxonomy, TaxonomyResult};
use crate::{StoreError, StoreResult};
use chrono::Utc;
use pathlab_types::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

const MIN_NAME_QUERY: usize = 3;
const MIN_MOBILE_QUERY: usize = 6;

/// First-run setup progress: the lab must be configured and at least one test group defined
/// before patients are recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetupStatus {
    pub lab_details: bool,
    pub taxonomy: bool,
}

impl SetupStatus {
    pub fn is_complete(&self) -> bool {
        self.lab_details && self.taxonomy
    }

    pub fn steps_completed(&self) -> usize {
        usize::from(self.lab_details) + usize::from(self.taxonomy)
    }
}

/// Typed access to the local database.
#[derive(Debug)]
pub struct RecordStore<B = FsBackend> {
    backend: B,
    last_id: Option<RecordId>,
}

impl RecordStore<FsBackend> {
    /// Opens (or creates) the filesystem database described by `cfg`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Open` if the database directory cannot be created. Nothing else in
    /// the application can work without it.
    pub fn open(cfg: &CoreConfig) -> StoreResult<Self> {
        let backend = FsBackend::open(cfg.database_dir())?;
        tracing::debug!("opened record store at {}", cfg.database_dir().display());
        Ok(Self::with_backend(backend))
    }
}

impl RecordStore<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }
}

impl<B: Backend> RecordStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            last_id: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Issues a fresh record id, strictly greater than any id issued by this store.
    pub fn next_id(&mut self) -> RecordId {
        let id = RecordId::generate(self.last_id.as_ref());
        self.last_id = Some(id.clone());
        id
    }

    // ------------------------------------------------------------------
    // Row helpers
    // ------------------------------------------------------------------

    fn read<T: DeserializeOwned>(&self, table: Table, key: &str) -> StoreResult<Option<T>> {
        match self.backend.get(table, key)? {
            Some(row) => decode_value(row, table.name())
                .map(Some)
                .map_err(StoreError::Deserialization),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&mut self, table: Table, key: &str, record: &T) -> StoreResult<()> {
        let row = serde_json::to_value(record).map_err(StoreError::Serialization)?;
        self.backend.put(table, key, &row)
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    /// Inserts or replaces a patient. Only the id is validated.
    pub fn put_patient(&mut self, patient: &Patient) -> StoreResult<()> {
        self.write(Table::Patients, patient.id.as_str(), patient)?;
        tracing::info!("saved patient {}", patient.id);
        Ok(())
    }

    pub fn get_patient_by_id(&self, id: &RecordId) -> StoreResult<Option<Patient>> {
        self.read(Table::Patients, id.as_str())
    }

    fn require_patient(&self, id: &RecordId) -> StoreResult<Patient> {
        self.get_patient_by_id(id)?
            .ok_or_else(|| StoreError::not_found("patient", id))
    }

    /// All readable patients in id order. Rows that no longer parse are skipped with a warning.
    pub fn get_all_patients(&self) -> StoreResult<Vec<Patient>> {
        let rows = self.backend.scan(Table::Patients)?;
        let mut patients = Vec::with_capacity(rows.len());
        for (key, row) in rows {
            match decode_value::<Patient>(row, "patient") {
                Ok(patient) => patients.push(patient),
                Err(e) => tracing::warn!("skipping patient {key}: {e}"),
            }
        }
        Ok(patients)
    }

    /// Shallow-merges `update` into an existing patient.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no patient has this id.
    pub fn update_patient(&mut self, id: &RecordId, update: PatientUpdate) -> StoreResult<Patient> {
        let mut patient = self.require_patient(id)?;
        update.apply(&mut patient);
        self.put_patient(&patient)?;
        Ok(patient)
    }

    /// Sets the workflow status and stamps `updatedAt`.
    pub fn update_patient_status(
        &mut self,
        id: &RecordId,
        status: PatientStatus,
    ) -> StoreResult<Patient> {
        self.update_patient(
            id,
            PatientUpdate {
                status: Some(status),
                updated_at: Some(Utc::now()),
                ..Default::default()
            },
        )
    }

    /// Removes a patient and their results. Deleting an unknown id is a no-op.
    pub fn delete_patient(&mut self, id: &RecordId) -> StoreResult<()> {
        self.backend.delete(Table::Patients, id.as_str())?;
        self.backend.delete(Table::TestResults, id.as_str())?;
        tracing::info!("deleted patient {id}");
        Ok(())
    }

    pub fn get_selected_tests(&self, id: &RecordId) -> StoreResult<Vec<RecordId>> {
        Ok(self.require_patient(id)?.selected_tests)
    }

    /// Records which test groups were ordered for a patient and stamps `updatedAt`.
    pub fn put_selected_tests(
        &mut self,
        id: &RecordId,
        group_ids: Vec<RecordId>,
    ) -> StoreResult<Patient> {
        self.update_patient(
            id,
            PatientUpdate {
                selected_tests: Some(group_ids),
                updated_at: Some(Utc::now()),
                ..Default::default()
            },
        )
    }

    /// Patients newest first, by `updatedAt`, falling back to `sampleDate` then `createdAt`,
    /// filtered by a search over name, mobile and sample date.
    pub fn recent_patients(&self, search: Option<&str>) -> StoreResult<Vec<Patient>> {
        let mut patients = self.get_all_patients()?;
        if let Some(term) = search {
            patients.retain(|p| p.matches_search(term));
        }
        // Stable sort keeps id order among patients without any timestamp.
        patients.sort_by(|a, b| b.recency().cmp(&a.recency()));
        Ok(patients)
    }

    /// Earlier patients matching what is being typed into the intake form.
    ///
    /// The name is matched case-insensitively once at least three characters are given; the
    /// mobile number once at least six digits are given.
    pub fn history_matches(&self, name: &str, mobile: &str) -> StoreResult<Vec<Patient>> {
        let name = name.trim().to_lowercase();
        let mobile = mobile.trim();
        let by_name = name.chars().count() >= MIN_NAME_QUERY;
        let by_mobile = mobile.chars().count() >= MIN_MOBILE_QUERY;
        if !by_name && !by_mobile {
            return Ok(Vec::new());
        }

        Ok(self
            .get_all_patients()?
            .into_iter()
            .filter(|p| {
                (by_name && p.name.to_lowercase().contains(&name))
                    || (by_mobile && p.mobile.contains(mobile))
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Test results
    // ------------------------------------------------------------------

    /// Replaces the whole result set of a patient.
    pub fn put_test_results(
        &mut self,
        patient_id: &RecordId,
        results: TestResults,
    ) -> StoreResult<()> {
        let record = ResultsRecord::new(patient_id.clone(), results);
        self.write(Table::TestResults, patient_id.as_str(), &record)?;
        tracing::info!(
            "saved {} results for patient {patient_id}",
            record.results.len()
        );
        Ok(())
    }

    /// Merges `partial` into the patient's result set, creating it if needed.
    pub fn update_test_results(
        &mut self,
        patient_id: &RecordId,
        partial: TestResults,
    ) -> StoreResult<TestResults> {
        let mut results = self.get_test_results(patient_id)?;
        results.extend(partial);
        self.put_test_results(patient_id, results.clone())?;
        Ok(results)
    }

    /// The patient's results; empty when none were entered.
    pub fn get_test_results(&self, patient_id: &RecordId) -> StoreResult<TestResults> {
        Ok(self
            .read::<ResultsRecord>(Table::TestResults, patient_id.as_str())?
            .map(|r| r.results)
            .unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Taxonomy
    // ------------------------------------------------------------------

    pub fn get_test_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(self
            .read::<TestGroupsRecord>(Table::LabInfo, TEST_GROUPS_KEY)?
            .map(|r| r.data)
            .unwrap_or_default())
    }

    pub fn taxonomy(&self) -> StoreResult<Taxonomy> {
        self.get_test_groups().map(Taxonomy::new)
    }

    /// Replaces the whole taxonomy.
    pub fn put_test_groups(&mut self, groups: Vec<Group>) -> StoreResult<()> {
        let taxonomy = Taxonomy::validated(groups)?;
        self.write_taxonomy(taxonomy)
    }

    fn write_taxonomy(&mut self, taxonomy: Taxonomy) -> StoreResult<()> {
        let record = TestGroupsRecord::new(taxonomy.into_groups());
        self.write(Table::LabInfo, TEST_GROUPS_KEY, &record)?;
        tracing::info!("saved taxonomy with {} test groups", record.data.len());
        Ok(())
    }

    /// Reads the aggregate, applies `edit` and writes the result back.
    fn edit_taxonomy(
        &mut self,
        edit: impl FnOnce(Taxonomy) -> TaxonomyResult<Taxonomy>,
    ) -> StoreResult<()> {
        let edited = edit(self.taxonomy()?)?;
        self.write_taxonomy(edited)
    }

    /// Subgroups of a group; empty when the group does not exist.
    pub fn get_subgroups_by_group_id(&self, group_id: &RecordId) -> StoreResult<Vec<Subgroup>> {
        Ok(self
            .taxonomy()?
            .group(group_id)
            .map(|g| g.sub_groups.clone())
            .unwrap_or_default())
    }

    /// Parameters of a subgroup; empty when the group or subgroup does not exist.
    pub fn get_parameters_from_subgroup(
        &self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
    ) -> StoreResult<Vec<Parameter>> {
        Ok(self
            .taxonomy()?
            .subgroup(group_id, subgroup_id)
            .map(|sg| sg.parameters.clone())
            .unwrap_or_default())
    }

    pub fn add_group(&mut self, group: Group) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_group_added(group))
    }

    pub fn update_group(&mut self, group_id: &RecordId, details: GroupDetails) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_group_updated(group_id, details))
    }

    pub fn delete_group(&mut self, group_id: &RecordId) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_group_removed(group_id))
    }

    pub fn add_subgroup(&mut self, group_id: &RecordId, subgroup: Subgroup) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_subgroup_added(group_id, subgroup))
    }

    pub fn update_subgroup(&mut self, group_id: &RecordId, subgroup: Subgroup) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_subgroup_updated(group_id, subgroup))
    }

    pub fn delete_subgroup(
        &mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
    ) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_subgroup_removed(group_id, subgroup_id))
    }

    pub fn add_parameter_to_subgroup(
        &mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
        parameter: Parameter,
    ) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_parameter_added(group_id, subgroup_id, parameter))
    }

    pub fn update_parameter_in_subgroup(
        &mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
        parameter: Parameter,
    ) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_parameter_updated(group_id, subgroup_id, parameter))
    }

    pub fn delete_parameter_from_subgroup(
        &mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
        parameter_id: &RecordId,
    ) -> StoreResult<()> {
        self.edit_taxonomy(|t| t.with_parameter_removed(group_id, subgroup_id, parameter_id))
    }

    /// The taxonomy as a pretty-printed JSON array, the format of `testGroups.json`.
    pub fn export_taxonomy(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec_pretty(&self.get_test_groups()?).map_err(StoreError::Serialization)
    }

    /// Replaces the taxonomy with an exported file.
    ///
    /// The file is fully validated first; on any error the stored taxonomy is unchanged.
    pub fn import_taxonomy(&mut self, bytes: &[u8]) -> StoreResult<usize> {
        let value: Value = decode_slice(bytes, "taxonomy file").map_err(StoreError::Import)?;
        let groups = decode_taxonomy(value).map_err(StoreError::Import)?;
        let taxonomy =
            Taxonomy::validated(groups).map_err(|e| StoreError::Import(e.to_string()))?;
        let count = taxonomy.groups().len();
        self.write_taxonomy(taxonomy)?;
        tracing::info!("imported {count} test groups");
        Ok(count)
    }

    /// Loads the default taxonomy from `path` if no test groups are defined yet.
    ///
    /// Returns whether the taxonomy was seeded.
    pub fn seed_taxonomy_if_empty(&mut self, path: &Path) -> StoreResult<bool> {
        if !self.get_test_groups()?.is_empty() {
            return Ok(false);
        }
        let bytes = std::fs::read(path).map_err(StoreError::FileRead)?;
        self.import_taxonomy(&bytes)?;
        tracing::info!("seeded default taxonomy from {}", path.display());
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Lab details
    // ------------------------------------------------------------------

    pub fn get_lab_details(&self) -> StoreResult<Option<LabDetails>> {
        Ok(self
            .read::<LabDetailsRecord>(Table::LabInfo, LAB_DETAILS_KEY)?
            .map(|r| r.details))
    }

    pub fn put_lab_details(&mut self, details: &LabDetails) -> StoreResult<()> {
        let record = LabDetailsRecord::new(details.clone());
        self.write(Table::LabInfo, LAB_DETAILS_KEY, &record)?;
        tracing::info!("saved lab details");
        Ok(())
    }

    /// The stored lab details as pretty-printed JSON, the format of `lab-details.json`.
    pub fn export_lab_details(&self) -> StoreResult<Vec<u8>> {
        let details = self
            .get_lab_details()?
            .ok_or_else(|| StoreError::not_found("lab details", LAB_DETAILS_KEY))?;
        serde_json::to_vec_pretty(&details).map_err(StoreError::Serialization)
    }

    /// Merges the fields present in an exported file over the stored lab details.
    pub fn import_lab_details(&mut self, bytes: &[u8]) -> StoreResult<LabDetails> {
        let update: LabDetailsUpdate =
            decode_slice(bytes, "lab details file").map_err(StoreError::Import)?;
        let mut details = self.get_lab_details()?.unwrap_or_default();
        update.apply(&mut details);
        self.put_lab_details(&details)?;
        Ok(details)
    }

    pub fn setup_status(&self) -> StoreResult<SetupStatus> {
        Ok(SetupStatus {
            lab_details: self.get_lab_details()?.is_some(),
            taxonomy: !self.get_test_groups()?.is_empty(),
        })
    }

    // ------------------------------------------------------------------
    // Reports and whole-database access
    // ------------------------------------------------------------------

    /// Joins everything needed to print one patient's report.
    pub fn report_data(&self, patient_id: &RecordId) -> StoreResult<ReportData> {
        let patient = self.require_patient(patient_id)?;
        let lab_details = self.get_lab_details()?.unwrap_or_default();
        let taxonomy = self.taxonomy()?;
        let results = self.get_test_results(patient_id)?;
        Ok(ReportData::assemble(
            patient,
            lab_details,
            &taxonomy,
            results,
        ))
    }

    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        self.backend.snapshot()
    }

    pub fn replace_all(&mut self, snapshot: &Snapshot) -> StoreResult<()> {
        self.backend.replace_all(snapshot)
    }
}
