//! Printable report rendering.
//!
//! [`ReportRenderer::render`] turns records into one self-contained HTML document with a
//! page section per record. It is a pure transform: no store access, no clock, and the
//! same input always produces the same bytes.
//!
//! Formatting rules:
//!
//! - multi-select values are comma-joined, or "Not specified" when nothing is selected;
//! - empty scalars render as "Not specified"; a unit suffix follows present values only;
//! - the lab table has one row per parameter and one column per non-blank test, with
//!   flags shown as Positive / Negative and empty cells as "-".
//!
//! Every value is passed through [`escape_html`] before it is written, so a stored value
//! appears in the document in its escaped form. Values free of `& < > " '` appear verbatim.

use crate::catalogue::{self, FieldSpec, SectionSpec};
use crate::constants::{EMPTY_CELL, NOT_SPECIFIED};
use crate::form::{FieldValue, FormModel};
use crate::lab::{LabParameter, LabTestRow, LabValue};
use crate::record::PatientRecord;

const DOCUMENT_TITLE: &str = "Patient Reports Export";
const NO_LAB_DATA: &str = "No laboratory investigation data available.";

const STYLESHEET: &str = r#"body {
  font-family: Arial, sans-serif;
  margin: 20px;
  font-size: 12px;
  line-height: 1.4;
}
.form-container {
  page-break-after: always;
  margin-bottom: 30px;
  border: 2px solid #333;
  padding: 20px;
}
.form-header {
  background-color: #f5f5f5;
  padding: 15px;
  margin-bottom: 20px;
  border-radius: 5px;
  border: 1px solid #ddd;
}
.form-header h1 {
  text-align: center;
  color: #007bff;
  margin: 0 0 15px 0;
  font-size: 24px;
}
.form-meta {
  display: flex;
  justify-content: space-between;
  margin-bottom: 10px;
}
.patient-name {
  text-align: center;
  font-size: 18px;
}
.form-section {
  margin-bottom: 20px;
  border: 1px solid #e0e0e0;
  padding: 15px;
  border-radius: 5px;
}
.form-section h4 {
  color: #333;
  border-bottom: 2px solid #007bff;
  padding-bottom: 8px;
  margin-bottom: 15px;
  font-size: 16px;
}
.field-grid {
  display: grid;
  grid-template-columns: 1fr 1fr;
  gap: 10px;
}
.lab-section {
  page-break-inside: avoid;
}
.lab-empty {
  text-align: center;
  color: #888;
  font-style: italic;
  padding: 20px;
}
table {
  width: 100%;
  border-collapse: collapse;
  margin: 15px 0;
  font-size: 10px;
  page-break-inside: avoid;
}
th, td {
  border: 1px solid #333;
  padding: 6px;
  text-align: center;
}
th {
  background-color: #007bff;
  color: white;
  font-weight: bold;
}
td.parameter {
  text-align: left;
  font-weight: bold;
  background-color: #f0f0f0;
}
tr:nth-child(even) {
  background-color: #f9f9f9;
}
@media print {
  .form-container {
    page-break-after: always;
  }
  body {
    font-size: 11px;
  }
  table {
    page-break-inside: avoid;
  }
}
"#;

/// Renders patient records into a printable HTML document.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Renders `records`, in the order given, into one HTML document.
    pub fn render<'a>(&self, records: impl IntoIterator<Item = &'a PatientRecord>) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str(&format!("<title>{}</title>\n", DOCUMENT_TITLE));
        out.push_str("<style>\n");
        out.push_str(STYLESHEET);
        out.push_str("</style>\n</head>\n<body>\n");
        for record in records {
            self.render_record(&mut out, record);
        }
        out.push_str("</body>\n</html>\n");
        out
    }

    fn render_record(&self, out: &mut String, record: &PatientRecord) {
        out.push_str("<div class=\"form-container\">\n");

        out.push_str("<div class=\"form-header\">\n<h1>Patient Report</h1>\n");
        out.push_str(&format!(
            "<div class=\"form-meta\"><div><strong>Form ID:</strong> {}</div><div><strong>Date Created:</strong> {}</div></div>\n",
            escape_html(record.id.as_str()),
            escape_html(&record.date_created)
        ));
        out.push_str(&format!(
            "<div class=\"patient-name\"><strong>Patient Name:</strong> {}</div>\n",
            escape_html(&record.patient_name)
        ));
        out.push_str("</div>\n");

        for section in catalogue::SECTIONS {
            render_section(out, section, &record.form_data);
        }
        render_lab_section(out, record.form_data.lab_tests());

        out.push_str("</div>\n");
    }
}

fn render_section(out: &mut String, section: &SectionSpec, form: &FormModel) {
    out.push_str("<div class=\"form-section\">\n");
    out.push_str(&format!("<h4>{}</h4>\n", escape_html(section.title)));
    out.push_str("<div class=\"field-grid\">\n");
    for spec in section.fields {
        out.push_str(&format!(
            "<div><strong>{}:</strong> {}</div>\n",
            escape_html(spec.label),
            escape_html(&format_field(spec, form.value(spec.key)))
        ));
    }
    out.push_str("</div>\n</div>\n");
}

/// Display text for one field.
pub fn format_field(spec: &FieldSpec, value: Option<FieldValue<'_>>) -> String {
    let text = match value {
        Some(FieldValue::MultiSelect(values)) if !values.is_empty() => values.join(", "),
        Some(FieldValue::Scalar(value)) if !value.trim().is_empty() => value.to_string(),
        _ => return NOT_SPECIFIED.to_string(),
    };

    match spec.unit {
        Some(unit) => format!("{} {}", text, unit),
        None => text,
    }
}

fn render_lab_section(out: &mut String, rows: &[LabTestRow]) {
    out.push_str("<div class=\"form-section lab-section\">\n<h4>Laboratory Investigations</h4>\n");

    let tests: Vec<&LabTestRow> = rows.iter().filter(|row| !row.is_blank()).collect();
    if tests.is_empty() {
        out.push_str(&format!("<div class=\"lab-empty\">{}</div>\n", NO_LAB_DATA));
        out.push_str("</div>\n");
        return;
    }

    out.push_str("<table>\n<thead>\n<tr><th>Parameter</th>");
    for index in 1..=tests.len() {
        out.push_str(&format!("<th>Test {}</th>", index));
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");

    for param in LabParameter::ALL {
        out.push_str(&format!(
            "<tr><td class=\"parameter\">{}</td>",
            escape_html(param.label())
        ));
        for test in &tests {
            out.push_str(&format!(
                "<td>{}</td>",
                escape_html(&format_lab_cell(&test.get(param)))
            ));
        }
        out.push_str("</tr>\n");
    }

    out.push_str("</tbody>\n</table>\n</div>\n");
}

/// Display text for one lab cell.
pub fn format_lab_cell(value: &LabValue) -> String {
    match value {
        LabValue::Flag(Some(true)) => "Positive".to_string(),
        LabValue::Flag(Some(false)) => "Negative".to_string(),
        LabValue::Flag(None) => EMPTY_CELL.to_string(),
        LabValue::Text(text) if text.trim().is_empty() => EMPTY_CELL.to_string(),
        LabValue::Text(text) => text.clone(),
    }
}

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordStatus;
    use scribe_types::RecordId;

    fn record_with(form: FormModel) -> PatientRecord {
        PatientRecord {
            id: RecordId::new("F123456").unwrap(),
            patient_name: form.display_name().to_string(),
            status: RecordStatus::Draft,
            date_created: "2024-05-01".into(),
            form_data: form,
        }
    }

    #[test]
    fn test_document_shell() {
        let html = ReportRenderer::new().render(&[record_with(FormModel::new())]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Patient Reports Export</title>"));
        assert!(html.contains("page-break-after: always"));
        assert_eq!(html.matches("<div class=\"form-container\">").count(), 1);
        assert!(html.contains("<strong>Form ID:</strong> F123456"));
        assert!(html.contains("<strong>Date Created:</strong> 2024-05-01"));
        assert!(html.contains("<strong>Patient Name:</strong> Unnamed"));
    }

    #[test]
    fn test_sections_in_order() {
        let html = ReportRenderer::new().render(&[record_with(FormModel::new())]);
        let mut last = 0;
        for title in catalogue::SECTIONS
            .iter()
            .map(|s| s.title)
            .chain(["Laboratory Investigations"])
        {
            let escaped = escape_html(title);
            let at = html[last..]
                .find(&format!("<h4>{}</h4>", escaped))
                .unwrap_or_else(|| panic!("missing section {}", title));
            last += at;
        }
    }

    #[test]
    fn test_every_scalar_appears_or_is_not_specified() {
        let mut form = FormModel::new();
        form.name = "Asha".into();
        form.age = "34".into();
        form.occupation = "Weaver".into();
        form.cavity_number = "2".into();
        let html = ReportRenderer::new().render(&[record_with(form.clone())]);

        for spec in catalogue::fields() {
            let shown = format_field(spec, form.value(spec.key));
            let line = format!(
                "<strong>{}:</strong> {}</div>",
                escape_html(spec.label),
                escape_html(&shown)
            );
            assert!(html.contains(&line), "missing line {}", line);
            if let Some(FieldValue::Scalar(value)) = form.value(spec.key) {
                if value.is_empty() {
                    assert_eq!(shown, NOT_SPECIFIED);
                } else {
                    assert!(shown.starts_with(value));
                }
            }
        }
    }

    #[test]
    fn test_units_only_follow_present_values() {
        let weight = catalogue::field_spec("weight").unwrap();
        assert_eq!(format_field(weight, Some(FieldValue::Scalar("61.5"))), "61.5 kg");
        assert_eq!(format_field(weight, Some(FieldValue::Scalar(""))), "Not specified");
    }

    #[test]
    fn test_multi_select_formatting() {
        let habits = catalogue::field_spec("habits").unwrap();
        let picked = vec!["Alcohol".to_string(), "Smoking".to_string()];
        assert_eq!(
            format_field(habits, Some(FieldValue::MultiSelect(&picked))),
            "Alcohol, Smoking"
        );
        assert_eq!(
            format_field(habits, Some(FieldValue::MultiSelect(&[]))),
            "Not specified"
        );
    }

    #[test]
    fn test_empty_lab_section() {
        let html = ReportRenderer::new().render(&[record_with(FormModel::new())]);
        assert!(html.contains(NO_LAB_DATA));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_lab_table_skips_blank_tests() {
        let mut form = FormModel::new();
        form.set_lab_value(0, LabParameter::Cd4, LabValue::Text("500".into()))
            .unwrap();
        form.add_lab_test();
        let third = form.add_lab_test();
        form.set_lab_value(third, LabParameter::Hbsag, LabValue::Flag(Some(false)))
            .unwrap();

        let html = ReportRenderer::new().render(&[record_with(form)]);
        assert!(html.contains("<th>Test 1</th><th>Test 2</th></tr>"));
        assert!(!html.contains("Test 3"));
        assert!(html.contains("<tr><td class=\"parameter\">CD4 Count</td><td>500</td><td>-</td></tr>"));
        assert!(html.contains("<tr><td class=\"parameter\">HBsAg</td><td>-</td><td>Negative</td></tr>"));
        assert_eq!(html.matches("<td class=\"parameter\">").count(), 25);
    }

    #[test]
    fn test_lab_cells() {
        assert_eq!(format_lab_cell(&LabValue::Flag(Some(true))), "Positive");
        assert_eq!(format_lab_cell(&LabValue::Flag(None)), "-");
        assert_eq!(format_lab_cell(&LabValue::Text("  ".into())), "-");
        assert_eq!(format_lab_cell(&LabValue::Text("12.1".into())), "12.1");
    }

    #[test]
    fn test_values_are_escaped() {
        let mut form = FormModel::new();
        form.name = "<script>alert('x')</script>".into();
        form.address = "Lane 4 & 5".into();
        let html = ReportRenderer::new().render(&[record_with(form)]);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("Lane 4 &amp; 5"));
    }

    #[test]
    fn test_every_scalar_appears_in_escaped_form() {
        let mut form = FormModel::new();
        for (index, key) in FormModel::SCALAR_KEYS.iter().enumerate() {
            form.set_scalar(key, format!("A&B <{}> \"q\" '{}'", key, index))
                .unwrap();
        }
        let html = ReportRenderer::new().render(&[record_with(form.clone())]);

        for key in FormModel::SCALAR_KEYS {
            let Some(FieldValue::Scalar(value)) = form.value(key) else {
                panic!("{} is not a scalar", key);
            };
            assert!(html.contains(&escape_html(value)), "missing value of {}", key);
            assert!(!html.contains(value), "{} written unescaped", key);
        }
    }

    #[test]
    fn test_render_is_deterministic_and_ordered() {
        let mut first = FormModel::new();
        first.name = "Asha".into();
        let mut second = FormModel::new();
        second.name = "Rahul".into();
        let records = vec![record_with(first), record_with(second)];

        let renderer = ReportRenderer::new();
        let html = renderer.render(&records);
        assert_eq!(html, renderer.render(&records));
        assert_eq!(html.matches("<div class=\"form-container\">").count(), 2);
        assert!(html.find("Asha").unwrap() < html.find("Rahul").unwrap());
    }
}
