//! Finished report files: download into the export directory or hand to a share target.

use crate::compose::{compose, ReportOptions};
use crate::pdf;
use crate::ReportResult;
use pathlab_core::share::{share_or_download, write_download};
use pathlab_core::validation::filename_fragment;
use pathlab_core::{CoreConfig, ReportData, ShareOutcome, ShareTarget, SharedFile};
use std::path::PathBuf;
use std::sync::Arc;

pub const REPORT_MEDIA_TYPE: &str = "application/pdf";
const SHARE_TEXT: &str = "Please find the patient report attached.";

/// `Summary_Report_<patient name>.pdf`, or `Summary_Report_Patient.pdf` for unnamed patients.
pub fn report_filename(data: &ReportData) -> String {
    format!(
        "Summary_Report_{}.pdf",
        filename_fragment(&data.patient.name, "Patient")
    )
}

pub struct ReportArtifacts {
    cfg: Arc<CoreConfig>,
}

impl ReportArtifacts {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Composes and renders the report to PDF bytes.
    pub fn render(&self, data: &ReportData, options: &ReportOptions) -> ReportResult<Vec<u8>> {
        pdf::render(&compose(data, options))
    }

    /// Writes the report PDF into the export directory.
    pub fn download(&self, data: &ReportData, options: &ReportOptions) -> ReportResult<PathBuf> {
        let bytes = self.render(data, options)?;
        let path = write_download(self.cfg.export_dir(), &report_filename(data), &bytes)?;
        tracing::info!("report for patient {} saved to {}", data.patient.id, path.display());
        Ok(path)
    }

    /// Shares the report PDF, falling back to a download when `target` cannot take it.
    pub fn share(
        &self,
        data: &ReportData,
        options: &ReportOptions,
        target: &dyn ShareTarget,
    ) -> ReportResult<ShareOutcome> {
        let file = SharedFile {
            filename: report_filename(data),
            media_type: REPORT_MEDIA_TYPE.to_string(),
            title: format!("Patient Report - {}", data.patient.name),
            text: SHARE_TEXT.to_string(),
            bytes: self.render(data, options)?,
        };
        Ok(share_or_download(target, &file, self.cfg.export_dir())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathlab_core::models::{LabDetails, Patient};
    use pathlab_core::{NoShareTarget, RecordId, StoreResult, Taxonomy};
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn data(name: &str) -> ReportData {
        let mut patient = Patient::new(RecordId::parse("42").unwrap());
        patient.name = name.into();
        ReportData::assemble(
            patient,
            LabDetails::default(),
            &Taxonomy::default(),
            Default::default(),
        )
    }

    fn artifacts(temp: &TempDir) -> ReportArtifacts {
        let cfg = CoreConfig::new(
            temp.path().join("data"),
            "PathoReportDB",
            temp.path().join("exports"),
            None,
        )
        .unwrap();
        ReportArtifacts::new(Arc::new(cfg))
    }

    #[test]
    fn filenames_fall_back_to_patient() {
        assert_eq!(report_filename(&data("Asha K")), "Summary_Report_Asha K.pdf");
        assert_eq!(report_filename(&data("  ")), "Summary_Report_Patient.pdf");
        assert_eq!(report_filename(&data("a/b")), "Summary_Report_a_b.pdf");
    }

    #[test]
    fn download_writes_pdf_into_export_dir() {
        let temp = TempDir::new().unwrap();
        let path = artifacts(&temp)
            .download(&data("Asha"), &ReportOptions::default())
            .unwrap();
        assert_eq!(path, temp.path().join("exports/Summary_Report_Asha.pdf"));
        assert!(std::fs::read(path).unwrap().starts_with(b"%PDF"));
    }

    struct PdfTarget {
        titles: RefCell<Vec<String>>,
    }

    impl ShareTarget for PdfTarget {
        fn can_share(&self, file: &SharedFile) -> bool {
            file.media_type == REPORT_MEDIA_TYPE
        }

        fn share(&self, file: &SharedFile) -> StoreResult<()> {
            self.titles.borrow_mut().push(file.title.clone());
            Ok(())
        }
    }

    #[test]
    fn share_uses_target_or_downloads() {
        let temp = TempDir::new().unwrap();
        let artifacts = artifacts(&temp);
        let target = PdfTarget {
            titles: RefCell::new(Vec::new()),
        };

        let outcome = artifacts
            .share(&data("Asha"), &ReportOptions::default(), &target)
            .unwrap();
        assert_eq!(outcome, ShareOutcome::Shared);
        assert_eq!(*target.titles.borrow(), vec!["Patient Report - Asha"]);

        let outcome = artifacts
            .share(&data("Asha"), &ReportOptions::default(), &NoShareTarget)
            .unwrap();
        assert!(matches!(outcome, ShareOutcome::Downloaded(_)));
    }
}
