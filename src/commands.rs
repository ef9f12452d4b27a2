//! Command handlers. Each handler runs one operation against the store and prints the result.

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{NaiveDate, Utc};
use std::path::Path;
use std::sync::Arc;

use pathlab_core::models::{
    Age, Gender, Group, GroupDetails, Parameter, Patient, PatientStatus, PatientUpdate,
    RangeCategory, ReferenceRange, Subgroup, TestResults,
};
use pathlab_core::{
    BackupService, CoreConfig, NonEmptyText, RecordId, RecordStore, RestoreStrategy,
    ShareOutcome, ShareTarget,
};
use pathlab_report::{compose, ReportArtifacts, ReportOptions};

use crate::cli::{
    BackupCommand, Commands, LabCommand, ParameterEdit, PatientCommand, PatientFields,
    ReportArgs, ReportCommand, ResultsCommand, TaxonomyCommand,
};

pub struct App {
    pub cfg: Arc<CoreConfig>,
    pub store: RecordStore,
    pub share_target: Box<dyn ShareTarget>,
}

pub fn run(app: &mut App, command: Commands) -> Result<()> {
    match command {
        Commands::SetupStatus => {
            let status = app.store.setup_status()?;
            println!("Lab details: {}", done(status.lab_details));
            println!("Test groups: {}", done(status.taxonomy));
            println!("{} of 2 steps completed", status.steps_completed());
            Ok(())
        }
        Commands::Patient(cmd) => patient(app, cmd),
        Commands::Results(cmd) => results(app, cmd),
        Commands::Taxonomy(cmd) => taxonomy(app, cmd),
        Commands::Lab(cmd) => lab(app, cmd),
        Commands::Backup(cmd) => backup(app, cmd),
        Commands::Report(cmd) => report(app, cmd),
    }
}

fn done(flag: bool) -> &'static str {
    if flag {
        "done"
    } else {
        "missing"
    }
}

fn id(raw: &str) -> Result<RecordId> {
    RecordId::parse(raw).with_context(|| format!("invalid id {raw:?}"))
}

fn text(raw: &str) -> Result<NonEmptyText> {
    NonEmptyText::new(raw).with_context(|| format!("invalid name {raw:?}"))
}

fn print_shared(outcome: ShareOutcome, what: &str) {
    match outcome {
        ShareOutcome::Shared => println!("Shared {what}"),
        ShareOutcome::Downloaded(path) => println!("Saved {what} to {}", path.display()),
    }
}

fn write_output(bytes: &[u8], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", String::from_utf8_lossy(bytes)),
    }
    Ok(())
}

// ===== PATIENTS =====

fn patient_update(fields: PatientFields) -> Result<PatientUpdate> {
    let age = if fields.new_born {
        Some(Age::NewBorn)
    } else {
        fields
            .age
            .map(Age::years)
            .transpose()
            .map_err(|e| anyhow!(e))?
    };
    let sample_date = fields
        .sample_date
        .map(|raw| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .with_context(|| format!("invalid sample date {raw:?}, expected YYYY-MM-DD"))
        })
        .transpose()?;
    let selected_tests = fields
        .tests
        .map(|ids| ids.iter().map(|s| id(s.trim())).collect::<Result<Vec<_>>>())
        .transpose()?;

    Ok(PatientUpdate {
        name: fields.name,
        gender: fields.gender.as_deref().map(Gender::from),
        age,
        mobile: fields.mobile,
        email: fields.email,
        referred_by: fields.referred_by,
        consultant_doctor: fields.consultant_doctor,
        sample_date: sample_date.map(Some),
        sample_type: fields.sample_type,
        status: None,
        updated_at: Some(Utc::now()),
        selected_tests,
    })
}

fn print_patient_line(patient: &Patient) {
    let sample = patient
        .sample_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "ID: {}, Name: {}, Gender: {}, Age: {}, Mobile: {}, Sample: {}, Status: {}",
        patient.id, patient.name, patient.gender, patient.age, patient.mobile, sample, patient.status
    );
}

fn patient(app: &mut App, cmd: PatientCommand) -> Result<()> {
    let store = &mut app.store;
    match cmd {
        PatientCommand::Add(fields) => {
            let update = patient_update(fields)?;
            let mut patient = Patient::new(store.next_id());
            patient.created_at = Some(Utc::now());
            update.apply(&mut patient);
            if patient.name.trim().is_empty() {
                bail!("--name is required");
            }
            store.put_patient(&patient)?;
            println!("Added patient {}", patient.id);
        }
        PatientCommand::Update { id: raw, fields } => {
            let update = patient_update(fields)?;
            let patient = store.update_patient(&id(&raw)?, update)?;
            println!("Updated patient {}", patient.id);
        }
        PatientCommand::Status { id: raw, status } => {
            let status: PatientStatus = status.parse().map_err(anyhow::Error::msg)?;
            let patient = store.update_patient_status(&id(&raw)?, status)?;
            println!("Patient {} is now {}", patient.id, patient.status);
        }
        PatientCommand::Delete { id: raw } => {
            store.delete_patient(&id(&raw)?)?;
            println!("Deleted patient {raw}");
        }
        PatientCommand::List { search } => {
            let patients = store.recent_patients(search.as_deref())?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            patients.iter().for_each(print_patient_line);
        }
        PatientCommand::Show { id: raw } => {
            let patient = store
                .get_patient_by_id(&id(&raw)?)?
                .ok_or_else(|| anyhow!("patient {raw} not found"))?;
            println!("{}", serde_json::to_string_pretty(&patient)?);
        }
        PatientCommand::History { name, mobile } => {
            let matches = store.history_matches(&name, &mobile)?;
            if matches.is_empty() {
                println!("No earlier patients match.");
            }
            matches.iter().for_each(print_patient_line);
        }
        PatientCommand::SelectTests { id: raw, groups } => {
            let groups = groups
                .iter()
                .map(|g| id(g))
                .collect::<Result<Vec<_>>>()?;
            let patient = store.put_selected_tests(&id(&raw)?, groups)?;
            println!(
                "Patient {} has {} test group(s) selected",
                patient.id,
                patient.selected_tests.len()
            );
        }
    }
    Ok(())
}

// ===== RESULTS =====

fn results(app: &mut App, cmd: ResultsCommand) -> Result<()> {
    let store = &mut app.store;
    match cmd {
        ResultsCommand::Set { patient, values } => {
            let mut partial = TestResults::new();
            for pair in &values {
                let (param, value) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("expected PARAMETER_ID=VALUE, got {pair:?}"))?;
                partial.insert(id(param.trim())?, value.trim().to_string());
            }
            let merged = store.update_test_results(&id(&patient)?, partial)?;
            println!("Patient {patient} has {} result(s)", merged.len());
        }
        ResultsCommand::Show { patient } => {
            let results = store.get_test_results(&id(&patient)?)?;
            if results.is_empty() {
                println!("No results entered.");
                return Ok(());
            }
            let taxonomy = store.taxonomy()?;
            let names: Vec<&Parameter> = taxonomy.groups().iter().flat_map(Group::parameters).collect();
            for (param, value) in &results {
                let name = names
                    .iter()
                    .find(|p| &p.id == param)
                    .map(|p| p.name.as_str())
                    .unwrap_or("?");
                println!("{param} ({name}): {value}");
            }
        }
    }
    Ok(())
}

// ===== TAXONOMY =====

/// Parses `CATEGORY:MIN:MAX`; either bound may be empty.
fn parse_range(raw: &str) -> Result<(RangeCategory, ReferenceRange)> {
    let mut parts = raw.splitn(3, ':');
    let (Some(category), Some(min), Some(max)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("expected CATEGORY:MIN:MAX, got {raw:?}");
    };
    let category: RangeCategory = category.parse().map_err(anyhow::Error::msg)?;
    let bound = |s: &str| -> Result<Option<f64>> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        s.parse::<f64>()
            .map(Some)
            .with_context(|| format!("invalid range bound {s:?}"))
    };
    Ok((category, ReferenceRange::new(bound(min)?, bound(max)?)))
}

fn group_details(
    name: &str,
    classification: Option<String>,
    desc: String,
    has_ranges: bool,
) -> Result<GroupDetails> {
    Ok(GroupDetails {
        name: text(name)?,
        classification: classification.filter(|c| !c.trim().is_empty()),
        desc,
        has_ranges,
    })
}

fn apply_parameter_edit(parameter: &mut Parameter, edit: ParameterEdit) -> Result<()> {
    let ranges = edit
        .ranges
        .iter()
        .map(|raw| parse_range(raw))
        .collect::<Result<Vec<_>>>()?;
    if let Some(name) = edit.name {
        parameter.name = text(&name)?;
    }
    if let Some(unit) = edit.unit {
        parameter.unit = unit;
    }
    if let Some(note) = edit.note {
        parameter.note = note;
    }
    if edit.clear_ranges {
        parameter.ranges.clear();
    }
    parameter.ranges.extend(ranges);
    Ok(())
}

fn taxonomy(app: &mut App, cmd: TaxonomyCommand) -> Result<()> {
    let store = &mut app.store;
    match cmd {
        TaxonomyCommand::List => {
            let taxonomy = store.taxonomy()?;
            if taxonomy.is_empty() {
                println!("No test groups defined.");
            }
            for group in taxonomy.groups() {
                println!("{} {}", group.id, group.heading());
                for subgroup in &group.sub_groups {
                    println!("  {} {}", subgroup.id, subgroup.name);
                    for param in &subgroup.parameters {
                        println!("    {} {} {}", param.id, param.name, param.unit);
                    }
                }
            }
        }
        TaxonomyCommand::Export { output } => {
            write_output(&store.export_taxonomy()?, output.as_deref())?;
        }
        TaxonomyCommand::Import { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let count = store.import_taxonomy(&bytes)?;
            println!("Imported {count} test group(s)");
        }
        TaxonomyCommand::Seed { file } => {
            let path = file
                .or_else(|| app.cfg.seed_taxonomy().map(Path::to_path_buf))
                .ok_or_else(|| anyhow!("no seed file given or configured"))?;
            if store.seed_taxonomy_if_empty(&path)? {
                println!("Seeded test groups from {}", path.display());
            } else {
                println!("Test groups already defined; nothing seeded");
            }
        }
        TaxonomyCommand::AddGroup {
            name,
            classification,
            desc,
            has_ranges,
        } => {
            let details = group_details(&name, classification, desc, has_ranges)?;
            let group = Group::new(store.next_id(), details);
            let group_id = group.id.clone();
            store.add_group(group)?;
            println!("Added group {group_id}");
        }
        TaxonomyCommand::UpdateGroup {
            group,
            name,
            classification,
            desc,
            has_ranges,
        } => {
            let details = group_details(&name, classification, desc, has_ranges)?;
            store.update_group(&id(&group)?, details)?;
            println!("Updated group {group}");
        }
        TaxonomyCommand::DeleteGroup { group } => {
            store.delete_group(&id(&group)?)?;
            println!("Deleted group {group}");
        }
        TaxonomyCommand::AddSubgroup { group, name } => {
            let subgroup = Subgroup::new(store.next_id(), text(&name)?);
            let subgroup_id = subgroup.id.clone();
            store.add_subgroup(&id(&group)?, subgroup)?;
            println!("Added subgroup {subgroup_id}");
        }
        TaxonomyCommand::RenameSubgroup {
            group,
            subgroup,
            name,
        } => {
            let group_id = id(&group)?;
            let subgroup_id = id(&subgroup)?;
            let mut existing = store
                .get_subgroups_by_group_id(&group_id)?
                .into_iter()
                .find(|sg| sg.id == subgroup_id)
                .ok_or_else(|| anyhow!("subgroup {subgroup} not found in group {group}"))?;
            existing.name = text(&name)?;
            store.update_subgroup(&group_id, existing)?;
            println!("Renamed subgroup {subgroup}");
        }
        TaxonomyCommand::DeleteSubgroup { group, subgroup } => {
            store.delete_subgroup(&id(&group)?, &id(&subgroup)?)?;
            println!("Deleted subgroup {subgroup}");
        }
        TaxonomyCommand::AddParameter {
            group,
            subgroup,
            name,
            unit,
            note,
            ranges,
        } => {
            let mut parameter = Parameter::new(store.next_id(), text(&name)?);
            parameter.unit = unit;
            parameter.note = note;
            for raw in &ranges {
                let (category, range) = parse_range(raw)?;
                parameter.ranges.insert(category, range);
            }
            let parameter_id = parameter.id.clone();
            store.add_parameter_to_subgroup(&id(&group)?, &id(&subgroup)?, parameter)?;
            println!("Added parameter {parameter_id}");
        }
        TaxonomyCommand::UpdateParameter {
            group,
            subgroup,
            parameter,
            edit,
        } => {
            let group_id = id(&group)?;
            let subgroup_id = id(&subgroup)?;
            let parameter_id = id(&parameter)?;
            let mut existing = store
                .get_parameters_from_subgroup(&group_id, &subgroup_id)?
                .into_iter()
                .find(|p| p.id == parameter_id)
                .ok_or_else(|| anyhow!("parameter {parameter} not found in subgroup {subgroup}"))?;
            apply_parameter_edit(&mut existing, edit)?;
            store.update_parameter_in_subgroup(&group_id, &subgroup_id, existing)?;
            println!("Updated parameter {parameter}");
        }
        TaxonomyCommand::DeleteParameter {
            group,
            subgroup,
            parameter,
        } => {
            store.delete_parameter_from_subgroup(&id(&group)?, &id(&subgroup)?, &id(&parameter)?)?;
            println!("Deleted parameter {parameter}");
        }
    }
    Ok(())
}

// ===== LAB =====

fn image_media_type(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => Ok("image/png"),
        Some("jpg" | "jpeg") => Ok("image/jpeg"),
        _ => bail!("signature must be a PNG or JPEG file"),
    }
}

fn lab(app: &mut App, cmd: LabCommand) -> Result<()> {
    let store = &mut app.store;
    match cmd {
        LabCommand::Show => {
            let Some(mut details) = store.get_lab_details()? else {
                println!("Lab details not set.");
                return Ok(());
            };
            if details.has_signature() {
                details.signature = "<set>".into();
            }
            println!("{}", serde_json::to_string_pretty(&details)?);
            let missing = details.missing_required_fields();
            if !missing.is_empty() {
                println!("Missing: {}", missing.join(", "));
            }
        }
        LabCommand::Export { output } => {
            write_output(&store.export_lab_details()?, output.as_deref())?;
        }
        LabCommand::Import { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let details = store.import_lab_details(&bytes)?;
            println!("Imported lab details for {}", details.lab_name);
        }
        LabCommand::SetSignature { image } => {
            let media_type = image_media_type(&image)?;
            let bytes = std::fs::read(&image)
                .with_context(|| format!("failed to read {}", image.display()))?;
            let mut details = store.get_lab_details()?.unwrap_or_default();
            details.signature = format!(
                "data:{media_type};base64,{}",
                general_purpose::STANDARD.encode(bytes)
            );
            store.put_lab_details(&details)?;
            println!("Signature updated");
        }
    }
    Ok(())
}

// ===== BACKUP =====

fn backup(app: &mut App, cmd: BackupCommand) -> Result<()> {
    let service = BackupService::new(app.cfg.clone());
    match cmd {
        BackupCommand::Create => {
            let backup = service.backup_now(&app.store)?;
            println!("Backup written to {}", backup.path.display());
        }
        BackupCommand::Restore { file, strategy } => {
            let strategy: RestoreStrategy = strategy.parse().map_err(anyhow::Error::msg)?;
            let summary = service.restore_from_file(&mut app.store, &file, strategy)?;
            println!(
                "Restored {} patient(s), {} result record(s), {} lab record(s)",
                summary.patients, summary.test_results, summary.lab_info
            );
        }
        BackupCommand::Share => {
            let outcome = service.share_latest_now(&app.store, app.share_target.as_ref())?;
            print_shared(outcome, "backup");
        }
    }
    Ok(())
}

// ===== REPORTS =====

fn report_options(args: &ReportArgs) -> ReportOptions {
    ReportOptions {
        show_ranges: !args.no_ranges,
        show_notes: !args.no_notes,
    }
}

fn report(app: &mut App, cmd: ReportCommand) -> Result<()> {
    match cmd {
        ReportCommand::Pdf { args, share } => {
            let data = app.store.report_data(&id(&args.patient)?)?;
            let options = report_options(&args);
            let artifacts = ReportArtifacts::new(app.cfg.clone());
            if share {
                let outcome = artifacts.share(&data, &options, app.share_target.as_ref())?;
                print_shared(outcome, "report");
            } else {
                let path = artifacts.download(&data, &options)?;
                println!("Report written to {}", path.display());
            }
        }
        ReportCommand::Describe { args } => {
            let data = app.store.report_data(&id(&args.patient)?)?;
            let document = compose(&data, &report_options(&args));
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges_with_open_bounds() {
        let (category, range) = parse_range("Female:12:15").unwrap();
        assert_eq!(category, RangeCategory::Female);
        assert_eq!(range, ReferenceRange::new(Some(12.0), Some(15.0)));

        let (category, range) = parse_range("common::200").unwrap();
        assert_eq!(category, RangeCategory::Common);
        assert_eq!(range, ReferenceRange::new(None, Some(200.0)));

        assert!(parse_range("Female:12").is_err());
        assert!(parse_range("Adult:1:2").is_err());
        assert!(parse_range("Male:x:2").is_err());
    }

    #[test]
    fn parameter_edit_keeps_absent_fields() {
        let mut parameter = Parameter::new(id("hb").unwrap(), text("Hemoglobin").unwrap());
        parameter.unit = "g/dL".into();
        parameter
            .ranges
            .insert(RangeCategory::Male, ReferenceRange::new(Some(13.0), Some(17.0)));

        apply_parameter_edit(
            &mut parameter,
            ParameterEdit {
                note: Some("Fasting sample".into()),
                ranges: vec!["Female:12:15".into()],
                ..ParameterEdit::default()
            },
        )
        .unwrap();
        assert_eq!(parameter.name.as_str(), "Hemoglobin");
        assert_eq!(parameter.unit, "g/dL");
        assert_eq!(parameter.note, "Fasting sample");
        assert_eq!(parameter.ranges.len(), 2);

        apply_parameter_edit(
            &mut parameter,
            ParameterEdit {
                clear_ranges: true,
                ranges: vec!["Common::200".into()],
                ..ParameterEdit::default()
            },
        )
        .unwrap();
        assert_eq!(
            parameter.ranges.keys().copied().collect::<Vec<_>>(),
            vec![RangeCategory::Common]
        );
    }

    #[test]
    fn parameter_edit_rejects_bad_range_without_changes() {
        let mut parameter = Parameter::new(id("hb").unwrap(), text("Hemoglobin").unwrap());
        let err = apply_parameter_edit(
            &mut parameter,
            ParameterEdit {
                unit: Some("g/dL".into()),
                ranges: vec!["Adult:1:2".into()],
                ..ParameterEdit::default()
            },
        );
        assert!(err.is_err());
        assert_eq!(parameter.unit, "");
    }

    #[test]
    fn new_born_flag_wins_over_age() {
        let update = patient_update(PatientFields {
            new_born: true,
            sample_date: Some("2024-03-07".into()),
            ..PatientFields::default()
        })
        .unwrap();
        assert_eq!(update.age, Some(Age::NewBorn));
        assert_eq!(update.sample_date, Some(NaiveDate::from_ymd_opt(2024, 3, 7)));
    }

    #[test]
    fn accepts_fractional_and_rejects_negative_ages() {
        let update = patient_update(PatientFields {
            age: Some(1.5),
            ..PatientFields::default()
        })
        .unwrap();
        assert_eq!(update.age, Some(Age::Years(1.5)));

        let fields = PatientFields {
            age: Some(-1.0),
            ..PatientFields::default()
        };
        assert!(patient_update(fields).is_err());
    }

    #[test]
    fn rejects_bad_sample_dates() {
        let fields = PatientFields {
            sample_date: Some("07/03/2024".into()),
            ..PatientFields::default()
        };
        assert!(patient_update(fields).is_err());
    }
}
