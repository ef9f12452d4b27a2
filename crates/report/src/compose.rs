//! Document Composer: turns a [`ReportData`] into a page-independent [`Document`].
//!
//! Each selected group becomes a heading plus a results table. Groups with many entered
//! parameters, or with an interpretation remark, are isolated onto their own pages and each
//! run of pages closes with an end-of-report marker.

use crate::document::{
    Align, Block, Boxed, Cell, Column, ColumnWidth, Columns, Document, FooterData, ImageBlock,
    Margin, PageBreak, Paragraph, Rgb, Rule, Span, Stack, Table, TextStyle, A4_HEIGHT, A4_WIDTH,
};
use pathlab_core::models::{Group, LabDetails, Parameter, Patient};
use pathlab_core::ReportData;

/// Body margins: room for the repeated header above and the footer below.
pub const PAGE_MARGINS: Margin = Margin::new(20.0, 150.0, 20.0, 105.0);
pub const HEADER_MARGIN: Margin = Margin::new(20.0, 20.0, 20.0, 0.0);
pub const FOOTER_MARGIN: Margin = Margin::new(40.0, 0.0, 40.0, 40.0);

/// Entered-parameter count from which a group gets its own page.
pub const ISOLATION_THRESHOLD: usize = 10;

pub const END_OF_REPORT: &str = "-- End of Report --";
pub const CORRELATE_NOTE: &str = "Please Correlate Clinically.";
/// Tallest the doctor's signature may be drawn, so the footer stays inside its margin.
pub const SIGNATURE_MAX_HEIGHT: f32 = 40.0;

const ATTRIBUTION: &str = "This report was digitally generated using app ";
const ATTRIBUTION_APP: &str = "pathology-lab";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportOptions {
    /// Print reference ranges. The range column stays when this is off.
    pub show_ranges: bool,
    /// Print parameter notes under the parameter name.
    pub show_notes: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            show_ranges: true,
            show_notes: true,
        }
    }
}

// ===== STYLES =====

fn lab_title() -> TextStyle {
    TextStyle::sized(20.0).bold().color(Rgb::DARK)
}

fn lab_sub() -> TextStyle {
    TextStyle::sized(11.0).italic().color(Rgb::MUTED)
}

fn section_title() -> TextStyle {
    TextStyle::sized(13.0).bold().color(Rgb::INK)
}

fn body_value() -> TextStyle {
    TextStyle::sized(9.0).color(Rgb::INK)
}

fn abnormal_value() -> TextStyle {
    body_value().bold().underline()
}

fn note_text() -> TextStyle {
    TextStyle::sized(8.0).italic().color(Rgb::MUTED)
}

fn table_header() -> TextStyle {
    TextStyle::sized(10.0).bold().color(Rgb::INK).underline()
}

/// Bold label followed by its value, in body style.
fn label_value(label: &str, value: &str) -> Paragraph {
    Paragraph::from_spans(vec![
        Span::new(label, body_value().bold()),
        Span::new(value, body_value()),
    ])
}

fn end_marker() -> Paragraph {
    Paragraph::new(END_OF_REPORT, body_value().bold())
        .align(Align::Center)
        .margin(Margin::vertical(20.0, 4.0))
}

// ===== COMPOSITION =====

/// Whether `group` starts on a fresh page.
pub fn should_isolate(group: &Group, data: &ReportData) -> bool {
    data.entered_parameter_count(group) >= ISOLATION_THRESHOLD || !group.desc.trim().is_empty()
}

/// Composes the whole report.
pub fn compose(data: &ReportData, options: &ReportOptions) -> Document {
    let groups = &data.groups;
    let isolated: Vec<bool> = groups.iter().map(|g| should_isolate(g, data)).collect();
    let mut content = Vec::new();

    for (index, group) in groups.iter().enumerate() {
        let is_first = index == 0;
        let is_last = index + 1 == groups.len();
        let next_isolated = isolated.get(index + 1).copied().unwrap_or(false);

        let mut blocks = group_blocks(group, data, options);
        if next_isolated && !is_last {
            blocks.push(end_marker().into());
        }

        let mut stack = Stack::new(blocks).keep_together();
        if isolated[index] && !is_first {
            stack = stack.page_break(PageBreak::Before);
        }
        content.push(stack.into());

        if isolated[index] && !is_last && !next_isolated {
            content.push(end_marker().into());
            content.push(Stack::default().page_break(PageBreak::After).into());
        } else if !is_last {
            content.push(Block::Spacer { height: 20.0 });
        }
    }

    if !groups.is_empty() {
        content.push(Stack::new(vec![end_marker().into()]).into());
    }

    tracing::debug!(
        "composed report for patient {} with {} groups",
        data.patient.id,
        groups.len()
    );

    Document {
        title: format!("Patient Report - {}", data.patient.name),
        page_width: A4_WIDTH,
        page_height: A4_HEIGHT,
        page_margins: PAGE_MARGINS,
        header_margin: HEADER_MARGIN,
        footer_margin: FOOTER_MARGIN,
        header: header_blocks(&data.patient, &data.lab_details),
        footer: FooterData {
            signature: data
                .lab_details
                .has_signature()
                .then(|| data.lab_details.signature.clone()),
            doctor_name: data.lab_details.doctor_name.clone(),
            doctor_qualification: data.lab_details.doctor_qualification.clone(),
        },
        content,
    }
}

fn group_blocks(group: &Group, data: &ReportData, options: &ReportOptions) -> Vec<Block> {
    let columns = if group.has_ranges { 3 } else { 2 };
    let mut blocks = vec![Paragraph::new(group.heading(), section_title())
        .align(Align::Center)
        .margin(Margin::vertical(8.0, 4.0))
        .into()];

    let mut header = vec![
        Cell::new(Paragraph::new("TEST DESCRIPTION", table_header())),
        Cell::new(Paragraph::new("OBSERVED VALUE", table_header()).align(Align::Center)),
    ];
    if group.has_ranges {
        header.push(Cell::new(
            Paragraph::new("REFERENCE RANGE", table_header()).align(Align::Right),
        ));
    }

    let mut rows = vec![header];
    for subgroup in &group.sub_groups {
        let sub_rows: Vec<Vec<Cell>> = subgroup
            .parameters
            .iter()
            .filter_map(|p| parameter_row(p, group.has_ranges, data, options))
            .collect();
        if sub_rows.is_empty() {
            continue;
        }
        let divider = TextStyle::sized(9.0).bold().underline();
        rows.push(vec![
            Cell::new(Paragraph::new(subgroup.name.as_str(), divider)).span(columns)
        ]);
        rows.extend(sub_rows);
    }

    let widths = if group.has_ranges {
        vec![
            ColumnWidth::Percent(33.34),
            ColumnWidth::Percent(33.33),
            ColumnWidth::Percent(33.33),
        ]
    } else {
        vec![ColumnWidth::Star, ColumnWidth::Auto]
    };
    blocks.push(
        Table {
            widths,
            header_rows: 1,
            rows,
        }
        .into(),
    );

    if !group.desc.is_empty() {
        blocks.push(
            Stack::new(vec![
                Paragraph::new("Interpretation & Remark:", TextStyle::sized(10.0).bold())
                    .margin(Margin::vertical(16.0, 4.0))
                    .into(),
                Block::text(group.desc.clone(), TextStyle::sized(9.0)),
            ])
            .keep_together()
            .into(),
        );
    }
    blocks
}

/// One results row, or `None` when nothing was entered for `parameter`.
fn parameter_row(
    parameter: &Parameter,
    has_ranges: bool,
    data: &ReportData,
    options: &ReportOptions,
) -> Option<Vec<Cell>> {
    let value = data.entered_value(parameter)?;
    let abnormal = data.is_abnormal(parameter);

    let mut name = Cell::new(Paragraph::new(parameter.name.as_str(), body_value()));
    if options.show_notes {
        if let Some(note) = parameter_note(parameter, data) {
            name = name.with(Paragraph::new(note, note_text()));
        }
    }

    let style = if abnormal {
        abnormal_value()
    } else {
        body_value()
    };
    let align = if has_ranges { Align::Center } else { Align::Left };
    let mut row = vec![name, Cell::new(Paragraph::new(value, style).align(align))];

    if has_ranges {
        let text = if options.show_ranges {
            range_text(parameter, data)
        } else {
            String::new()
        };
        row.push(Cell::new(
            Paragraph::new(text, body_value())
                .align(Align::Right)
                .no_wrap(),
        ));
    }
    Some(row)
}

fn parameter_note<'a>(parameter: &'a Parameter, data: &'a ReportData) -> Option<&'a str> {
    let note = parameter.note.trim();
    if !note.is_empty() {
        return Some(note);
    }
    data.range_for(parameter)
        .and_then(|r| r.note.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

/// `"{min}–{max}"` with the unit in parentheses; missing bounds print as nothing.
pub fn range_text(parameter: &Parameter, data: &ReportData) -> String {
    let range = data.range_for(parameter);
    let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_default();
    let mut text = format!(
        "{}–{}",
        bound(range.and_then(|r| r.min)),
        bound(range.and_then(|r| r.max))
    );
    if !parameter.unit.is_empty() {
        text.push_str(&format!(" ({})", parameter.unit));
    }
    text
}

// ===== HEADER & FOOTER =====

fn header_blocks(patient: &Patient, lab: &LabDetails) -> Vec<Block> {
    let mut contact: Vec<Block> = Vec::new();
    if !lab.address.is_empty() {
        contact.push(Block::text(lab.address.clone(), body_value()));
    }
    contact.push(label_value("Phone: ", &lab.phone).into());
    if !lab.email.is_empty() {
        contact.push(label_value("Email: ", &lab.email).into());
    }

    let specialist = vec![
        Paragraph::new(lab.specialist_name.clone(), body_value().bold())
            .align(Align::Right)
            .into(),
        Paragraph::new(lab.specialist_qualification.clone(), body_value())
            .align(Align::Right)
            .into(),
    ];

    let mut left: Vec<Block> = vec![
        label_value(
            "Patient's Name: ",
            &format!("{}{}", patient.gender.salutation(), patient.name),
        )
        .into(),
        Columns {
            columns: vec![
                Column {
                    width: ColumnWidth::Auto,
                    blocks: vec![label_value("Age: ", &patient.age.to_string()).into()],
                },
                Column {
                    width: ColumnWidth::Auto,
                    blocks: vec![label_value("Gender: ", patient.gender.as_str())
                        .align(Align::Right)
                        .into()],
                },
            ],
            gap: 15.0,
            margin: Margin::ZERO,
        }
        .into(),
    ];
    if !patient.mobile.is_empty() {
        left.push(label_value("Mobile: ", &patient.mobile).into());
    }

    let sample_date = patient
        .sample_date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default();
    let right = vec![
        label_value("Referred By: ", &patient.referred_by)
            .align(Align::Right)
            .into(),
        label_value("Sample Collected On: ", &sample_date)
            .align(Align::Right)
            .into(),
    ];

    vec![
        Paragraph::new(lab.lab_name.clone(), lab_title())
            .align(Align::Center)
            .margin(Margin::vertical(0.0, 4.0))
            .into(),
        Paragraph::new(lab.sub_heading.clone(), lab_sub())
            .align(Align::Center)
            .margin(Margin::vertical(0.0, 6.0))
            .into(),
        Block::Rule(Rule {
            length: 515.0,
            thickness: 0.5,
            color: Rgb::WHITE,
            margin: Margin::vertical(4.0, 4.0),
        }),
        Columns {
            columns: vec![
                Column {
                    width: ColumnWidth::Star,
                    blocks: contact,
                },
                Column {
                    width: ColumnWidth::Star,
                    blocks: specialist,
                },
            ],
            gap: 0.0,
            margin: Margin::ZERO,
        }
        .into(),
        Block::Boxed(Boxed {
            left,
            right,
            border: 0.5,
            border_color: Rgb::INK,
            margin: Margin::vertical(5.0, 10.0),
        }),
    ]
}

/// Footer for page `page` (1-based) of `page_count`.
pub fn footer_blocks(footer: &FooterData, page: usize, page_count: usize) -> Vec<Block> {
    let is_last = page == page_count;

    let correlate = if is_last {
        Paragraph::new(CORRELATE_NOTE, body_value()).margin(Margin::vertical(6.0, 0.0))
    } else {
        Paragraph::new("", TextStyle::default()).margin(Margin::vertical(20.0, 0.0))
    };
    let technologist = Cell::stacked(vec![
        correlate.into(),
        Paragraph::new("", TextStyle::default())
            .margin(Margin::vertical(20.0, 20.0))
            .into(),
        Block::text("Technologist", TextStyle::default().bold().color(Rgb::INK)),
    ]);

    let signature: Block = match &footer.signature {
        Some(data_url) => Block::Image(ImageBlock {
            data_url: data_url.clone(),
            width: 60.0,
            max_height: Some(SIGNATURE_MAX_HEIGHT),
            align: Align::Right,
            margin: Margin::vertical(0.0, 4.0),
        }),
        None => Block::text("", TextStyle::default()),
    };
    let doctor = Cell::stacked(vec![
        signature,
        Paragraph::new(
            footer.doctor_name.clone(),
            TextStyle::default().bold().color(Rgb::INK),
        )
        .align(Align::Right)
        .into(),
        Paragraph::new(footer.doctor_qualification.clone(), TextStyle::sized(8.0))
            .align(Align::Right)
            .into(),
    ]);

    let mut blocks = vec![
        Table {
            widths: vec![ColumnWidth::Percent(50.0), ColumnWidth::Percent(50.0)],
            header_rows: 0,
            rows: vec![vec![technologist, doctor]],
        }
        .into(),
        Paragraph::new(
            format!("Page {page} of {page_count}"),
            TextStyle::sized(8.0).color(Rgb::MUTED),
        )
        .align(Align::Right)
        .margin(Margin::vertical(6.0, 0.0))
        .into(),
    ];

    if is_last {
        let plain = TextStyle::sized(7.0).color(Rgb::FAINT);
        blocks.push(
            Paragraph::from_spans(vec![
                Span::new(ATTRIBUTION, plain),
                Span::new(ATTRIBUTION_APP, plain.color(Rgb::LINK).underline()),
            ])
            .margin(Margin::vertical(4.0, 0.0))
            .into(),
        );
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathlab_core::models::{
        Age, Gender, GroupDetails, RangeCategory, ReferenceRange, Subgroup, TestResults,
    };
    use pathlab_core::{NonEmptyText, RecordId, Taxonomy};

    fn id(s: &str) -> RecordId {
        RecordId::parse(s).unwrap()
    }

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    fn hemoglobin() -> Parameter {
        let mut p = Parameter::new(id("hb"), text("Hemoglobin"));
        p.unit = "g/dL".into();
        p.ranges.insert(
            RangeCategory::Female,
            ReferenceRange::new(Some(12.0), Some(15.0)),
        );
        p
    }

    /// A group `gid` with `count` parameters named `{gid}-p{n}`.
    fn group(gid: &str, count: usize, desc: &str) -> Group {
        let mut details = GroupDetails::named(text(gid));
        details.desc = desc.into();
        details.has_ranges = true;
        let mut g = Group::new(id(gid), details);
        let mut sub = Subgroup::new(id(&format!("{gid}-s")), text("Sub"));
        for n in 0..count {
            let pid = format!("{gid}-p{n}");
            sub.parameters.push(Parameter::new(id(&pid), text(&pid)));
        }
        g.sub_groups.push(sub);
        g
    }

    fn female() -> Patient {
        let mut p = Patient::new(id("p1"));
        p.name = "Asha".into();
        p.gender = Gender::Female;
        p.age = Age::Years(30.0);
        p
    }

    fn report(groups: Vec<Group>, results: &[(&str, &str)]) -> ReportData {
        let mut patient = female();
        patient.selected_tests = groups.iter().map(|g| g.id.clone()).collect();
        let results: TestResults = results
            .iter()
            .map(|(k, v)| (id(k), v.to_string()))
            .collect();
        ReportData::assemble(
            patient,
            LabDetails::default(),
            &Taxonomy::new(groups),
            results,
        )
    }

    fn all_entered(groups: &[Group]) -> Vec<(String, String)> {
        groups
            .iter()
            .flat_map(|g| g.parameters())
            .map(|p| (p.id.to_string(), "1".to_string()))
            .collect()
    }

    fn report_all_entered(groups: Vec<Group>) -> ReportData {
        let entered = all_entered(&groups);
        let pairs: Vec<(&str, &str)> = entered
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        report(groups, &pairs)
    }

    fn paragraphs(block: &Block, out: &mut Vec<Paragraph>) {
        match block {
            Block::Text(p) => out.push(p.clone()),
            Block::Stack(s) => s.blocks.iter().for_each(|b| paragraphs(b, out)),
            Block::Table(t) => t
                .rows
                .iter()
                .flatten()
                .flat_map(|c| &c.blocks)
                .for_each(|b| paragraphs(b, out)),
            Block::Columns(c) => c
                .columns
                .iter()
                .flat_map(|c| &c.blocks)
                .for_each(|b| paragraphs(b, out)),
            Block::Boxed(b) => b
                .left
                .iter()
                .chain(&b.right)
                .for_each(|b| paragraphs(b, out)),
            _ => {}
        }
    }

    fn texts(blocks: &[Block]) -> Vec<String> {
        let mut out = Vec::new();
        blocks.iter().for_each(|b| paragraphs(b, &mut out));
        out.iter().map(Paragraph::plain_text).collect()
    }

    fn stack(block: &Block) -> &Stack {
        match block {
            Block::Stack(s) => s,
            other => panic!("expected stack, got {other:?}"),
        }
    }

    fn table(group_stack: &Stack) -> &Table {
        group_stack
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .expect("group has a table")
    }

    #[test]
    fn isolation_thresholds() {
        let data = report_all_entered(vec![
            group("ten", 10, ""),
            group("nine", 9, ""),
            group("remark", 1, "Correlate with history"),
            group("blank", 9, "   "),
        ]);
        let isolated: Vec<bool> = data.groups.iter().map(|g| should_isolate(g, &data)).collect();
        assert_eq!(isolated, vec![true, false, true, false]);
    }

    #[test]
    fn hemoglobin_scenario() {
        let mut g = Group::new(id("cbc"), {
            let mut d = GroupDetails::named(text("CBC"));
            d.has_ranges = true;
            d
        });
        let mut sub = Subgroup::new(id("haem"), text("Haemogram"));
        sub.parameters.push(hemoglobin());
        sub.parameters.push(Parameter::new(id("wbc"), text("WBC")));
        g.sub_groups.push(sub);

        let data = report(vec![g], &[("hb", "10")]);
        let doc = compose(&data, &ReportOptions::default());
        let t = table(stack(&doc.content[0]));

        // header, subgroup divider, hemoglobin; WBC has no value and no row
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[1][0].col_span, 3);

        let row = &t.rows[2];
        let Block::Text(value) = &row[1].blocks[0] else {
            panic!("value cell is text")
        };
        assert_eq!(value.plain_text(), "10");
        assert!(value.spans[0].style.bold);
        assert!(value.spans[0].style.underline);
        assert_eq!(value.align, Align::Center);

        let Block::Text(range) = &row[2].blocks[0] else {
            panic!("range cell is text")
        };
        assert_eq!(range.plain_text(), "12–15 (g/dL)");
        assert!(range.no_wrap);
    }

    #[test]
    fn normal_value_is_plain_and_ranges_can_be_hidden() {
        let mut g = group("cbc", 0, "");
        g.sub_groups[0].parameters.push(hemoglobin());
        let data = report(vec![g], &[("hb", "13")]);
        let options = ReportOptions {
            show_ranges: false,
            show_notes: false,
        };
        let doc = compose(&data, &options);
        let t = table(stack(&doc.content[0]));
        let row = &t.rows[2];
        let Block::Text(value) = &row[1].blocks[0] else {
            panic!("value cell is text")
        };
        assert!(!value.spans[0].style.bold);
        assert!(!value.spans[0].style.underline);
        assert_eq!(row.len(), 3);
        assert_eq!(texts(&row[2].blocks), vec![String::new()]);
    }

    #[test]
    fn groups_without_ranges_use_two_columns() {
        let mut g = group("urine", 1, "");
        g.has_ranges = false;
        let data = report_all_entered(vec![g]);
        let doc = compose(&data, &ReportOptions::default());
        let t = table(stack(&doc.content[0]));
        assert_eq!(t.widths, vec![ColumnWidth::Star, ColumnWidth::Auto]);
        assert_eq!(t.rows[0].len(), 2);
        assert_eq!(t.rows[1][0].col_span, 2);
        assert_eq!(t.rows[2].len(), 2);
    }

    #[test]
    fn notes_follow_parameter_names() {
        let mut g = group("cbc", 0, "");
        let mut hb = hemoglobin();
        hb.note = "Fasting sample".into();
        g.sub_groups[0].parameters.push(hb);
        let data = report(vec![g], &[("hb", "13")]);

        let doc = compose(&data, &ReportOptions::default());
        let name_cell = &table(stack(&doc.content[0])).rows[2][0];
        assert_eq!(texts(&name_cell.blocks), vec!["Hemoglobin", "Fasting sample"]);

        let quiet = ReportOptions {
            show_notes: false,
            ..ReportOptions::default()
        };
        let doc = compose(&data, &quiet);
        let name_cell = &table(stack(&doc.content[0])).rows[2][0];
        assert_eq!(texts(&name_cell.blocks), vec!["Hemoglobin"]);
    }

    #[test]
    fn end_markers_and_page_breaks() {
        // plain, isolated, plain
        let data = report_all_entered(vec![
            group("a", 1, ""),
            group("b", 10, ""),
            group("c", 1, ""),
        ]);
        let doc = compose(&data, &ReportOptions::default());
        let c = &doc.content;

        // a: marker inside its stack because b is isolated
        let a = stack(&c[0]);
        assert!(a.keep_together);
        assert_eq!(a.page_break, None);
        assert_eq!(texts(&a.blocks).last().map(String::as_str), Some(END_OF_REPORT));
        assert_eq!(c[1], Block::Spacer { height: 20.0 });

        // b: breaks before, then a marker and a break after
        let b = stack(&c[2]);
        assert_eq!(b.page_break, Some(PageBreak::Before));
        assert_eq!(texts(&c[3..4]), vec![END_OF_REPORT]);
        assert_eq!(stack(&c[4]).page_break, Some(PageBreak::After));

        // c: last group, final marker stack
        let last = stack(&c[5]);
        assert_eq!(last.page_break, None);
        assert_eq!(texts(&c[6..]), vec![END_OF_REPORT]);
        assert_eq!(c.len(), 7);
    }

    #[test]
    fn first_isolated_group_does_not_break() {
        let data = report_all_entered(vec![group("a", 1, "Remark")]);
        let doc = compose(&data, &ReportOptions::default());
        assert_eq!(stack(&doc.content[0]).page_break, None);
        assert_eq!(doc.content.len(), 2);
    }

    #[test]
    fn empty_report_has_no_marker() {
        let data = report(vec![], &[]);
        let doc = compose(&data, &ReportOptions::default());
        assert!(doc.content.is_empty());
        assert_eq!(doc.title, "Patient Report - Asha");
    }

    #[test]
    fn remark_block_is_kept_together() {
        let data = report_all_entered(vec![group("a", 1, "Repeat after two weeks")]);
        let doc = compose(&data, &ReportOptions::default());
        let remark = stack(&doc.content[0])
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Stack(s) => Some(s),
                _ => None,
            })
            .next()
            .expect("remark stack");
        assert!(remark.keep_together);
        assert_eq!(
            texts(&remark.blocks),
            vec!["Interpretation & Remark:", "Repeat after two weeks"]
        );
    }

    #[test]
    fn header_shows_patient_block() {
        let mut data = report(vec![], &[]);
        data.patient.mobile = "9876543210".into();
        data.patient.sample_date = chrono::NaiveDate::from_ymd_opt(2024, 3, 7);
        data.lab_details.lab_name = "City Lab".into();
        let doc = compose(&data, &ReportOptions::default());
        let header = texts(&doc.header);
        assert_eq!(header[0], "City Lab");
        assert!(header.contains(&"Patient's Name: Ms. Asha".to_string()));
        assert!(header.contains(&"Age: 30".to_string()));
        assert!(header.contains(&"Mobile: 9876543210".to_string()));
        assert!(header.contains(&"Sample Collected On: 07/03/2024".to_string()));
        assert!(!header.iter().any(|t| t.starts_with("Email")));
    }

    #[test]
    fn footer_varies_by_page() {
        let footer = FooterData {
            signature: None,
            doctor_name: "Dr. Rao".into(),
            doctor_qualification: "MD".into(),
        };
        let middle = texts(&footer_blocks(&footer, 1, 2));
        assert!(!middle.contains(&CORRELATE_NOTE.to_string()));
        assert!(middle.contains(&"Page 1 of 2".to_string()));
        assert!(!middle.iter().any(|t| t.contains(ATTRIBUTION_APP)));

        let last = texts(&footer_blocks(&footer, 2, 2));
        assert!(last.contains(&CORRELATE_NOTE.to_string()));
        assert!(last.contains(&"Dr. Rao".to_string()));
        assert!(last.iter().any(|t| t.ends_with(ATTRIBUTION_APP)));
    }
}
