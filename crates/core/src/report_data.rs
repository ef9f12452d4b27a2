//! Render-ready view of one patient's report.
//!
//! [`ReportData::assemble`] joins a patient with the lab details, the test groups selected
//! for them and their entered results. Groups keep taxonomy order and are pruned to the
//! subgroups and parameters that actually have a result, so everything downstream can print
//! what it is given.

use crate::models::{
    Group, LabDetails, Parameter, Patient, RangeCategory, ReferenceRange, TestResults,
};
use crate::taxonomy::Taxonomy;
use serde::Serialize;

/// Picks the reference range that applies to `patient`.
///
/// A `NewBorn` range applies to new-born patients when it is defined. Otherwise new-born
/// patients use `Common`, and everyone else uses their gender's range before `Common`.
pub fn resolve_range<'a>(parameter: &'a Parameter, patient: &Patient) -> Option<&'a ReferenceRange> {
    let ranges = &parameter.ranges;
    if patient.is_new_born() {
        return ranges
            .get(&RangeCategory::NewBorn)
            .or_else(|| ranges.get(&RangeCategory::Common));
    }
    patient
        .gender
        .range_category()
        .and_then(|category| ranges.get(&category))
        .or_else(|| ranges.get(&RangeCategory::Common))
}

/// Whether an entered value lies outside the patient's reference range.
///
/// Only values that parse completely as a finite number can be abnormal; text results such
/// as "Reactive" are never flagged.
pub fn is_abnormal(raw: &str, parameter: &Parameter, patient: &Patient) -> bool {
    let Ok(value) = raw.trim().parse::<f64>() else {
        return false;
    };
    if !value.is_finite() {
        return false;
    }
    resolve_range(parameter, patient).is_some_and(|range| range.excludes(value))
}

/// Everything needed to compose one patient's report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub patient: Patient,
    pub lab_details: LabDetails,
    pub groups: Vec<Group>,
    pub results: TestResults,
}

impl ReportData {
    pub fn assemble(
        patient: Patient,
        lab_details: LabDetails,
        taxonomy: &Taxonomy,
        results: TestResults,
    ) -> Self {
        let groups = taxonomy
            .groups()
            .iter()
            .filter(|g| patient.selected_tests.contains(&g.id))
            .map(|g| prune_group(g, &results))
            .collect();

        Self {
            patient,
            lab_details,
            groups,
            results,
        }
    }

    /// The entered value for a parameter, if it is non-blank.
    pub fn entered_value(&self, parameter: &Parameter) -> Option<&str> {
        entered(&self.results, parameter)
    }

    pub fn range_for<'a>(&self, parameter: &'a Parameter) -> Option<&'a ReferenceRange> {
        resolve_range(parameter, &self.patient)
    }

    pub fn is_abnormal(&self, parameter: &Parameter) -> bool {
        self.entered_value(parameter)
            .is_some_and(|raw| is_abnormal(raw, parameter, &self.patient))
    }

    /// Number of parameters in `group` that have an entered value.
    pub fn entered_parameter_count(&self, group: &Group) -> usize {
        group
            .parameters()
            .filter(|p| self.entered_value(p).is_some())
            .count()
    }
}

fn entered<'r>(results: &'r TestResults, parameter: &Parameter) -> Option<&'r str> {
    results
        .get(&parameter.id)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

/// Drops parameters without a result and subgroups left empty. A group with nothing entered
/// is kept (without subgroups) so its heading and remarks still print.
fn prune_group(group: &Group, results: &TestResults) -> Group {
    let mut pruned = group.clone();
    for subgroup in &mut pruned.sub_groups {
        subgroup
            .parameters
            .retain(|p| entered(results, p).is_some());
    }
    pruned.sub_groups.retain(|sg| !sg.parameters.is_empty());
    pruned
}
