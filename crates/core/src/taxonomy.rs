//! Structural transforms over the test-group taxonomy.
//!
//! The taxonomy is persisted as one aggregate. Every edit consumes a [`Taxonomy`] and returns
//! the edited tree, which the store then writes back whole. A transform that addresses an id
//! which does not exist, or that would introduce a duplicate id, fails and leaves the caller's
//! copy untouched (the consumed value is simply dropped).

use crate::models::{Group, GroupDetails, Parameter, Subgroup};
use pathlab_types::RecordId;
use std::collections::HashSet;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("test group not found: {0}")]
    GroupNotFound(RecordId),
    #[error("subgroup {subgroup} not found in test group {group}")]
    SubgroupNotFound { group: RecordId, subgroup: RecordId },
    #[error("parameter {parameter} not found in subgroup {subgroup}")]
    ParameterNotFound {
        subgroup: RecordId,
        parameter: RecordId,
    },
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: RecordId },
}

pub type TaxonomyResult<T> = std::result::Result<T, TaxonomyError>;

/// An ordered list of test groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Taxonomy {
    groups: Vec<Group>,
}

impl Taxonomy {
    /// Wraps stored groups without checking them.
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    /// Wraps groups after checking that ids are unique.
    ///
    /// Group ids must be unique, subgroup ids must be unique within their group, and parameter
    /// ids must be unique across the whole taxonomy because they key entered results.
    pub fn validated(groups: Vec<Group>) -> TaxonomyResult<Self> {
        let mut group_ids = HashSet::new();
        let mut parameter_ids = HashSet::new();

        for group in &groups {
            if !group_ids.insert(&group.id) {
                return Err(duplicate("test group", &group.id));
            }
            let mut subgroup_ids = HashSet::new();
            for subgroup in &group.sub_groups {
                if !subgroup_ids.insert(&subgroup.id) {
                    return Err(duplicate("subgroup", &subgroup.id));
                }
                for parameter in &subgroup.parameters {
                    if !parameter_ids.insert(&parameter.id) {
                        return Err(duplicate("parameter", &parameter.id));
                    }
                }
            }
        }

        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<Group> {
        self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, group_id: &RecordId) -> Option<&Group> {
        self.groups.iter().find(|g| &g.id == group_id)
    }

    pub fn subgroup(&self, group_id: &RecordId, subgroup_id: &RecordId) -> Option<&Subgroup> {
        self.group(group_id)?
            .sub_groups
            .iter()
            .find(|sg| &sg.id == subgroup_id)
    }

    fn contains_parameter(&self, parameter_id: &RecordId) -> bool {
        self.groups
            .iter()
            .flat_map(Group::parameters)
            .any(|p| &p.id == parameter_id)
    }

    fn group_mut(&mut self, group_id: &RecordId) -> TaxonomyResult<&mut Group> {
        self.groups
            .iter_mut()
            .find(|g| &g.id == group_id)
            .ok_or_else(|| TaxonomyError::GroupNotFound(group_id.clone()))
    }

    fn subgroup_mut(
        &mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
    ) -> TaxonomyResult<&mut Subgroup> {
        self.group_mut(group_id)?
            .sub_groups
            .iter_mut()
            .find(|sg| &sg.id == subgroup_id)
            .ok_or_else(|| TaxonomyError::SubgroupNotFound {
                group: group_id.clone(),
                subgroup: subgroup_id.clone(),
            })
    }

    /// Appends a group. Its subgroups and parameters must not collide with existing ids.
    pub fn with_group_added(self, group: Group) -> TaxonomyResult<Self> {
        let mut groups = self.groups;
        groups.push(group);
        Self::validated(groups)
    }

    /// Replaces a group's editable attributes, keeping its subgroups.
    pub fn with_group_updated(
        mut self,
        group_id: &RecordId,
        details: GroupDetails,
    ) -> TaxonomyResult<Self> {
        let group = self.group_mut(group_id)?;
        group.name = details.name;
        group.classification = details.classification;
        group.desc = details.desc;
        group.has_ranges = details.has_ranges;
        Ok(self)
    }

    pub fn with_group_removed(mut self, group_id: &RecordId) -> TaxonomyResult<Self> {
        let before = self.groups.len();
        self.groups.retain(|g| &g.id != group_id);
        if self.groups.len() == before {
            return Err(TaxonomyError::GroupNotFound(group_id.clone()));
        }
        Ok(self)
    }

    pub fn with_subgroup_added(
        mut self,
        group_id: &RecordId,
        subgroup: Subgroup,
    ) -> TaxonomyResult<Self> {
        for parameter in &subgroup.parameters {
            if self.contains_parameter(&parameter.id) {
                return Err(duplicate("parameter", &parameter.id));
            }
        }
        let group = self.group_mut(group_id)?;
        if group.sub_groups.iter().any(|sg| sg.id == subgroup.id) {
            return Err(duplicate("subgroup", &subgroup.id));
        }
        group.sub_groups.push(subgroup);
        Ok(self)
    }

    /// Replaces the subgroup with the same id as `subgroup`.
    pub fn with_subgroup_updated(
        mut self,
        group_id: &RecordId,
        subgroup: Subgroup,
    ) -> TaxonomyResult<Self> {
        let slot = self.subgroup_mut(group_id, &subgroup.id)?;
        *slot = subgroup;
        // The replacement may bring parameters that clash with other subgroups.
        Self::validated(self.groups)
    }

    pub fn with_subgroup_removed(
        mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
    ) -> TaxonomyResult<Self> {
        let group = self.group_mut(group_id)?;
        let before = group.sub_groups.len();
        group.sub_groups.retain(|sg| &sg.id != subgroup_id);
        if group.sub_groups.len() == before {
            return Err(TaxonomyError::SubgroupNotFound {
                group: group_id.clone(),
                subgroup: subgroup_id.clone(),
            });
        }
        Ok(self)
    }

    pub fn with_parameter_added(
        mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
        parameter: Parameter,
    ) -> TaxonomyResult<Self> {
        if self.contains_parameter(&parameter.id) {
            return Err(duplicate("parameter", &parameter.id));
        }
        self.subgroup_mut(group_id, subgroup_id)?
            .parameters
            .push(parameter);
        Ok(self)
    }

    /// Replaces the parameter with the same id as `parameter`, keeping its position.
    pub fn with_parameter_updated(
        mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
        parameter: Parameter,
    ) -> TaxonomyResult<Self> {
        let subgroup = self.subgroup_mut(group_id, subgroup_id)?;
        let slot = subgroup
            .parameters
            .iter_mut()
            .find(|p| p.id == parameter.id)
            .ok_or_else(|| TaxonomyError::ParameterNotFound {
                subgroup: subgroup_id.clone(),
                parameter: parameter.id.clone(),
            })?;
        *slot = parameter;
        Ok(self)
    }

    pub fn with_parameter_removed(
        mut self,
        group_id: &RecordId,
        subgroup_id: &RecordId,
        parameter_id: &RecordId,
    ) -> TaxonomyResult<Self> {
        let subgroup = self.subgroup_mut(group_id, subgroup_id)?;
        let before = subgroup.parameters.len();
        subgroup.parameters.retain(|p| &p.id != parameter_id);
        if subgroup.parameters.len() == before {
            return Err(TaxonomyError::ParameterNotFound {
                subgroup: subgroup_id.clone(),
                parameter: parameter_id.clone(),
            });
        }
        Ok(self)
    }
}

fn duplicate(kind: &'static str, id: &RecordId) -> TaxonomyError {
    TaxonomyError::DuplicateId {
        kind,
        id: id.clone(),
    }
}
