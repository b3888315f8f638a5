//! Laboratory test rows and legacy input normalisation.
//!
//! A record carries a variable-length list of [`LabTestRow`]s, one per testing occasion.
//! Rows have no identity beyond their position; the list only ever grows.
//!
//! Two persisted shapes exist for the list:
//!
//! ```text
//! rows:     [{"date": "2024-01-02", "cd4": "500", ...}, {"cd4": "450"}]
//! columns:  {"cd4": ["500", "450"], "hemoglobin": ["12.1"]}
//! ```
//!
//! Rows are canonical. The column shape is accepted only on input and is zipped into rows
//! by [`normalize_lab_tests`]: the row count is the longest column and short columns leave
//! their trailing cells empty.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One parameter of a lab panel, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabParameter {
    Date,
    Cd4,
    ViralLoad,
    Hemoglobin,
    Tlc,
    Alc,
    Platelets,
    Esr,
    BloodGlucoseFasting,
    BloodGlucosePostPrandial,
    BloodGlucoseRandom,
    Urea,
    Creatinine,
    Sodium,
    Potassium,
    Calcium,
    Phosphate,
    Bilirubin,
    Ast,
    Alt,
    Alp,
    Albumin,
    Globulin,
    Hbsag,
    AntiHcv,
}

impl LabParameter {
    pub const ALL: [LabParameter; 25] = [
        LabParameter::Date,
        LabParameter::Cd4,
        LabParameter::ViralLoad,
        LabParameter::Hemoglobin,
        LabParameter::Tlc,
        LabParameter::Alc,
        LabParameter::Platelets,
        LabParameter::Esr,
        LabParameter::BloodGlucoseFasting,
        LabParameter::BloodGlucosePostPrandial,
        LabParameter::BloodGlucoseRandom,
        LabParameter::Urea,
        LabParameter::Creatinine,
        LabParameter::Sodium,
        LabParameter::Potassium,
        LabParameter::Calcium,
        LabParameter::Phosphate,
        LabParameter::Bilirubin,
        LabParameter::Ast,
        LabParameter::Alt,
        LabParameter::Alp,
        LabParameter::Albumin,
        LabParameter::Globulin,
        LabParameter::Hbsag,
        LabParameter::AntiHcv,
    ];

    /// Persisted key of the parameter.
    pub fn key(self) -> &'static str {
        match self {
            LabParameter::Date => "date",
            LabParameter::Cd4 => "cd4",
            LabParameter::ViralLoad => "viral_load",
            LabParameter::Hemoglobin => "hemoglobin",
            LabParameter::Tlc => "tlc",
            LabParameter::Alc => "alc",
            LabParameter::Platelets => "platelets",
            LabParameter::Esr => "esr",
            LabParameter::BloodGlucoseFasting => "blood_glucose_f",
            LabParameter::BloodGlucosePostPrandial => "blood_glucose_pp",
            LabParameter::BloodGlucoseRandom => "blood_glucose_r",
            LabParameter::Urea => "urea",
            LabParameter::Creatinine => "creatinine",
            LabParameter::Sodium => "sodium",
            LabParameter::Potassium => "potassium",
            LabParameter::Calcium => "calcium",
            LabParameter::Phosphate => "phosphate",
            LabParameter::Bilirubin => "bilirubin",
            LabParameter::Ast => "ast",
            LabParameter::Alt => "alt",
            LabParameter::Alp => "alp",
            LabParameter::Albumin => "albumin",
            LabParameter::Globulin => "globulin",
            LabParameter::Hbsag => "hbsag",
            LabParameter::AntiHcv => "anti_hcv",
        }
    }

    /// Label used in the printed lab table.
    pub fn label(self) -> &'static str {
        match self {
            LabParameter::Date => "Date",
            LabParameter::Cd4 => "CD4 Count",
            LabParameter::ViralLoad => "Viral Load",
            LabParameter::Hemoglobin => "Hemoglobin (g/dL)",
            LabParameter::Tlc => "Total Leukocyte Count",
            LabParameter::Alc => "Absolute Lymphocyte Count",
            LabParameter::Platelets => "Platelets",
            LabParameter::Esr => "ESR (mm/hr)",
            LabParameter::BloodGlucoseFasting => "Blood Glucose Fasting (mg/dL)",
            LabParameter::BloodGlucosePostPrandial => "Blood Glucose PP (mg/dL)",
            LabParameter::BloodGlucoseRandom => "Blood Glucose Random (mg/dL)",
            LabParameter::Urea => "Urea (mg/dL)",
            LabParameter::Creatinine => "Creatinine (mg/dL)",
            LabParameter::Sodium => "Sodium (mEq/L)",
            LabParameter::Potassium => "Potassium (mEq/L)",
            LabParameter::Calcium => "Calcium (mg/dL)",
            LabParameter::Phosphate => "Phosphate (mg/dL)",
            LabParameter::Bilirubin => "Total Bilirubin (mg/dL)",
            LabParameter::Ast => "AST (IU/L)",
            LabParameter::Alt => "ALT (IU/L)",
            LabParameter::Alp => "ALP (IU/L)",
            LabParameter::Albumin => "Albumin (g/dL)",
            LabParameter::Globulin => "Globulin (g/dL)",
            LabParameter::Hbsag => "HBsAg",
            LabParameter::AntiHcv => "Anti-HCV",
        }
    }

    /// True for the two serology flags, which hold positive/negative rather than text.
    pub fn is_flag(self) -> bool {
        matches!(self, LabParameter::Hbsag | LabParameter::AntiHcv)
    }

    /// True for parameters holding a measured quantity.
    pub fn is_numeric(self) -> bool {
        !self.is_flag() && self != LabParameter::Date
    }
}

/// A value for one cell of a lab row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LabValue {
    Text(String),
    Flag(Option<bool>),
}

/// One occasion's panel of laboratory values.
///
/// Text cells are kept exactly as entered (numbers included) and are empty when not
/// recorded. The serology flags are tri-state: `None` means the test was not recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LabTestRow {
    pub date: String,
    pub cd4: String,
    pub viral_load: String,
    pub hemoglobin: String,
    pub tlc: String,
    pub alc: String,
    pub platelets: String,
    pub esr: String,
    pub blood_glucose_f: String,
    pub blood_glucose_pp: String,
    pub blood_glucose_r: String,
    pub urea: String,
    pub creatinine: String,
    pub sodium: String,
    pub potassium: String,
    pub calcium: String,
    pub phosphate: String,
    pub bilirubin: String,
    pub ast: String,
    pub alt: String,
    pub alp: String,
    pub albumin: String,
    pub globulin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hbsag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anti_hcv: Option<bool>,
}

impl LabTestRow {
    /// Returns the text cell for `param`, or `None` for the flag parameters.
    pub fn text(&self, param: LabParameter) -> Option<&str> {
        let cell = match param {
            LabParameter::Date => &self.date,
            LabParameter::Cd4 => &self.cd4,
            LabParameter::ViralLoad => &self.viral_load,
            LabParameter::Hemoglobin => &self.hemoglobin,
            LabParameter::Tlc => &self.tlc,
            LabParameter::Alc => &self.alc,
            LabParameter::Platelets => &self.platelets,
            LabParameter::Esr => &self.esr,
            LabParameter::BloodGlucoseFasting => &self.blood_glucose_f,
            LabParameter::BloodGlucosePostPrandial => &self.blood_glucose_pp,
            LabParameter::BloodGlucoseRandom => &self.blood_glucose_r,
            LabParameter::Urea => &self.urea,
            LabParameter::Creatinine => &self.creatinine,
            LabParameter::Sodium => &self.sodium,
            LabParameter::Potassium => &self.potassium,
            LabParameter::Calcium => &self.calcium,
            LabParameter::Phosphate => &self.phosphate,
            LabParameter::Bilirubin => &self.bilirubin,
            LabParameter::Ast => &self.ast,
            LabParameter::Alt => &self.alt,
            LabParameter::Alp => &self.alp,
            LabParameter::Albumin => &self.albumin,
            LabParameter::Globulin => &self.globulin,
            LabParameter::Hbsag | LabParameter::AntiHcv => return None,
        };
        Some(cell.as_str())
    }

    fn text_mut(&mut self, param: LabParameter) -> Option<&mut String> {
        let cell = match param {
            LabParameter::Date => &mut self.date,
            LabParameter::Cd4 => &mut self.cd4,
            LabParameter::ViralLoad => &mut self.viral_load,
            LabParameter::Hemoglobin => &mut self.hemoglobin,
            LabParameter::Tlc => &mut self.tlc,
            LabParameter::Alc => &mut self.alc,
            LabParameter::Platelets => &mut self.platelets,
            LabParameter::Esr => &mut self.esr,
            LabParameter::BloodGlucoseFasting => &mut self.blood_glucose_f,
            LabParameter::BloodGlucosePostPrandial => &mut self.blood_glucose_pp,
            LabParameter::BloodGlucoseRandom => &mut self.blood_glucose_r,
            LabParameter::Urea => &mut self.urea,
            LabParameter::Creatinine => &mut self.creatinine,
            LabParameter::Sodium => &mut self.sodium,
            LabParameter::Potassium => &mut self.potassium,
            LabParameter::Calcium => &mut self.calcium,
            LabParameter::Phosphate => &mut self.phosphate,
            LabParameter::Bilirubin => &mut self.bilirubin,
            LabParameter::Ast => &mut self.ast,
            LabParameter::Alt => &mut self.alt,
            LabParameter::Alp => &mut self.alp,
            LabParameter::Albumin => &mut self.albumin,
            LabParameter::Globulin => &mut self.globulin,
            LabParameter::Hbsag | LabParameter::AntiHcv => return None,
        };
        Some(cell)
    }

    /// Returns the flag for `param`, or `None` if `param` is a text parameter or unrecorded.
    pub fn flag(&self, param: LabParameter) -> Option<bool> {
        match param {
            LabParameter::Hbsag => self.hbsag,
            LabParameter::AntiHcv => self.anti_hcv,
            _ => None,
        }
    }

    pub fn get(&self, param: LabParameter) -> LabValue {
        match self.text(param) {
            Some(text) => LabValue::Text(text.to_string()),
            None => LabValue::Flag(self.flag(param)),
        }
    }

    /// Sets one cell. Returns `false` if the value kind does not match the parameter.
    pub fn set(&mut self, param: LabParameter, value: LabValue) -> bool {
        match value {
            LabValue::Text(text) => match self.text_mut(param) {
                Some(cell) => {
                    *cell = text;
                    true
                }
                None => false,
            },
            LabValue::Flag(flag) => match param {
                LabParameter::Hbsag => {
                    self.hbsag = flag;
                    true
                }
                LabParameter::AntiHcv => {
                    self.anti_hcv = flag;
                    true
                }
                _ => false,
            },
        }
    }

    /// True when no cell carries a value.
    pub fn is_blank(&self) -> bool {
        LabParameter::ALL.iter().all(|&param| match self.get(param) {
            LabValue::Text(text) => text.trim().is_empty(),
            LabValue::Flag(flag) => flag.is_none(),
        })
    }

    /// Builds a row from a persisted row object, ignoring unknown keys.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut row = Self::default();
        for param in LabParameter::ALL {
            if let Some(cell) = object.get(param.key()) {
                row.set_from_json(param, cell);
            }
        }
        row
    }

    fn set_from_json(&mut self, param: LabParameter, cell: &Value) {
        let value = if param.is_flag() {
            LabValue::Flag(json_flag(cell))
        } else {
            LabValue::Text(json_text(cell))
        };
        self.set(param, value);
    }
}

impl<'de> Deserialize<'de> for LabTestRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Object(object) => Ok(Self::from_json_object(&object)),
            Value::Null => Ok(Self::default()),
            other => Err(serde::de::Error::custom(format!(
                "expected a lab test row object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Normalises either persisted shape of `lab_tests` into canonical rows.
///
/// The result always holds at least one row, so a freshly hydrated form has somewhere to
/// enter values.
pub fn normalize_lab_tests(value: &Value) -> Vec<LabTestRow> {
    let mut rows = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(row_from_item).collect(),
        Value::Object(object) if is_column_shape(object) => rows_from_columns(object),
        Value::Object(object) => vec![LabTestRow::from_json_object(object)],
        other => {
            tracing::warn!(
                "ignoring lab_tests of unexpected type {}",
                json_kind(other)
            );
            Vec::new()
        }
    };

    if rows.is_empty() {
        rows.push(LabTestRow::default());
    }
    rows
}

fn row_from_item(item: &Value) -> LabTestRow {
    match item {
        Value::Object(object) => LabTestRow::from_json_object(object),
        _ => LabTestRow::default(),
    }
}

fn is_column_shape(object: &Map<String, Value>) -> bool {
    LabParameter::ALL
        .iter()
        .any(|param| matches!(object.get(param.key()), Some(Value::Array(_))))
}

fn rows_from_columns(object: &Map<String, Value>) -> Vec<LabTestRow> {
    let columns: Vec<(LabParameter, Vec<&Value>)> = LabParameter::ALL
        .iter()
        .filter_map(|&param| {
            let cells = match object.get(param.key())? {
                Value::Array(items) => items.iter().collect(),
                Value::Null => Vec::new(),
                single => vec![single],
            };
            Some((param, cells))
        })
        .collect();

    let row_count = columns
        .iter()
        .map(|(_, cells)| cells.len())
        .max()
        .unwrap_or(0);

    (0..row_count)
        .map(|index| {
            let mut row = LabTestRow::default();
            for (param, cells) in &columns {
                if let Some(cell) = cells.get(index) {
                    row.set_from_json(*param, cell);
                }
            }
            row
        })
        .collect()
}

/// Text form of a legacy cell: strings verbatim, numbers in decimal, null as empty.
pub(crate) fn json_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn json_flag(cell: &Value) -> Option<bool> {
    match cell {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "positive" => Some(true),
            "false" | "negative" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_parameter_keys_are_unique() {
        let keys: HashSet<&str> = LabParameter::ALL.iter().map(|p| p.key()).collect();
        assert_eq!(keys.len(), LabParameter::ALL.len());
    }

    #[test]
    fn test_parallel_arrays_zip_into_rows() {
        let input = json!({"cd4": ["500", "450"], "hemoglobin": ["12.1"]});
        let rows = normalize_lab_tests(&input);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cd4, "500");
        assert_eq!(rows[0].hemoglobin, "12.1");
        assert_eq!(rows[0].viral_load, "");
        assert_eq!(rows[1].cd4, "450");
        assert_eq!(rows[1].hemoglobin, "");
        assert_eq!(rows[1].hbsag, None);
    }

    #[test]
    fn test_row_objects_pass_through() {
        let input = json!([
            {"date": "2024-03-01", "cd4": "320", "hbsag": true},
            {"viral_load": "1500", "anti_hcv": false}
        ]);
        let rows = normalize_lab_tests(&input);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-03-01");
        assert_eq!(rows[0].cd4, "320");
        assert_eq!(rows[0].hbsag, Some(true));
        assert_eq!(rows[1].viral_load, "1500");
        assert_eq!(rows[1].anti_hcv, Some(false));
        assert_eq!(rows[1].hbsag, None);
    }

    #[test]
    fn test_legacy_cells_are_coerced() {
        let input = json!([{"cd4": 500, "esr": null, "hbsag": "true", "anti_hcv": "maybe"}]);
        let rows = normalize_lab_tests(&input);

        assert_eq!(rows[0].cd4, "500");
        assert_eq!(rows[0].esr, "");
        assert_eq!(rows[0].hbsag, Some(true));
        assert_eq!(rows[0].anti_hcv, None);
    }

    #[test]
    fn test_flag_columns_zip() {
        let input = json!({"hbsag": [true, false], "cd4": ["1"]});
        let rows = normalize_lab_tests(&input);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hbsag, Some(true));
        assert_eq!(rows[1].hbsag, Some(false));
        assert_eq!(rows[1].cd4, "");
    }

    #[test]
    fn test_missing_or_empty_yields_one_blank_row() {
        for input in [json!(null), json!([]), json!({"cd4": []}), json!(7)] {
            let rows = normalize_lab_tests(&input);
            assert_eq!(rows.len(), 1, "input {} should give one row", input);
            assert!(rows[0].is_blank());
        }
    }

    #[test]
    fn test_empty_row_object_is_blank() {
        let rows = normalize_lab_tests(&json!([{}]));
        assert_eq!(rows, vec![LabTestRow::default()]);
        assert!(rows[0].is_blank());
    }

    #[test]
    fn test_negative_flag_is_not_blank() {
        let mut row = LabTestRow::default();
        assert!(row.set(LabParameter::AntiHcv, LabValue::Flag(Some(false))));
        assert!(!row.is_blank());
    }

    #[test]
    fn test_set_rejects_mismatched_kind() {
        let mut row = LabTestRow::default();
        assert!(!row.set(LabParameter::Hbsag, LabValue::Text("yes".into())));
        assert!(!row.set(LabParameter::Cd4, LabValue::Flag(Some(true))));
        assert!(row.is_blank());
    }

    #[test]
    fn test_row_deserialises_leniently() {
        let row: LabTestRow =
            serde_json::from_value(json!({"cd4": 210, "unknown": "x"})).unwrap();
        assert_eq!(row.cd4, "210");

        let err = serde_json::from_value::<LabTestRow>(json!("not a row"));
        assert!(err.is_err());
    }

    #[test]
    fn test_row_serialises_without_unrecorded_flags() {
        let row = LabTestRow {
            cd4: "500".into(),
            hbsag: Some(false),
            ..LabTestRow::default()
        };
        let value = serde_json::to_value(&row).unwrap();

        assert_eq!(value["cd4"], json!("500"));
        assert_eq!(value["hbsag"], json!(false));
        assert!(value.get("anti_hcv").is_none());
    }
}
