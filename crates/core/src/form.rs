//! In-memory patient assessment form.
//!
//! [`FormModel`] is what the editing surface mutates field by field before the form is
//! frozen into a [`PatientRecord`](crate::record::PatientRecord). A fresh form has every
//! field empty and exactly one blank lab row.
//!
//! Persisted forms are read leniently: unknown keys are ignored, missing keys keep their
//! empty default, numbers become text and a lone string in a multi-select becomes a
//! one-item list. Older builds wrote forms with fields missing, so hydration always starts
//! from [`FormModel::default`] and overlays whatever the stored object carries.

use crate::constants::UNNAMED_PATIENT;
use crate::lab::{json_kind, json_text, normalize_lab_tests, LabParameter, LabTestRow, LabValue};
use crate::{ScribeError, ScribeResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Declares the form struct and the key-based accessors the catalogue relies on.
macro_rules! form_model {
    (
        scalars { $($scalar:ident),* $(,)? }
        multi_selects { $($multi:ident),* $(,)? }
    ) => {
        /// One patient assessment while it is being authored or edited.
        #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
        pub struct FormModel {
            $(pub $scalar: String,)*
            $(pub $multi: Vec<String>,)*
            lab_tests: Vec<LabTestRow>,
        }

        impl Default for FormModel {
            fn default() -> Self {
                Self {
                    $($scalar: String::new(),)*
                    $($multi: Vec::new(),)*
                    lab_tests: vec![LabTestRow::default()],
                }
            }
        }

        impl FormModel {
            /// Keys of every single-valued field.
            pub const SCALAR_KEYS: &'static [&'static str] = &[$(stringify!($scalar)),*];

            /// Keys of every multi-select field.
            pub const MULTI_SELECT_KEYS: &'static [&'static str] = &[$(stringify!($multi)),*];

            fn scalar_ref(&self, key: &str) -> Option<&String> {
                match key {
                    $(stringify!($scalar) => Some(&self.$scalar),)*
                    _ => None,
                }
            }

            fn scalar_mut(&mut self, key: &str) -> Option<&mut String> {
                match key {
                    $(stringify!($scalar) => Some(&mut self.$scalar),)*
                    _ => None,
                }
            }

            fn multi_ref(&self, key: &str) -> Option<&Vec<String>> {
                match key {
                    $(stringify!($multi) => Some(&self.$multi),)*
                    _ => None,
                }
            }

            fn multi_mut(&mut self, key: &str) -> Option<&mut Vec<String>> {
                match key {
                    $(stringify!($multi) => Some(&mut self.$multi),)*
                    _ => None,
                }
            }
        }
    };
}

form_model! {
    scalars {
        name, age, sex, id_no, address, telephone, enroll_date,
        education, occupation, marital_status, living_with_family, contraceptives,
        heard_of_aids,
        tb_past_history, tb_present_history, att_initiation_date,
        weight, bmi, weight_loss, symptoms_duration, mantoux_test, bacillary_load,
        bcg_vaccine,
        pleural_effusion, smear_culture_results,
        sex_risk_group, transmission_category, last_transfusion_date,
        last_transfusion_place, occupational_exposure, sexual_partners, tattooed,
        other_illnesses,
        art_type, art_initiation_date, att_treatment_details, att_treatment_date,
        other_treatments, other_treatment_desc,
        radiograph_result, unilateral_bilateral, severity, cavity_type, cavity_number,
    }
    multi_selects {
        habits, symptoms, physical_symptoms, ptb_symptoms, tb_type, exposure, hiv_cause,
        illnesses,
    }
}

/// Borrowed view of one field's current value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Scalar(&'a str),
    MultiSelect(&'a [String]),
}

impl FieldValue<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Scalar(value) => value.trim().is_empty(),
            FieldValue::MultiSelect(values) => values.is_empty(),
        }
    }
}

impl FormModel {
    /// A blank form with one empty lab row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the field named `key`, or `None` if no such field exists.
    pub fn value(&self, key: &str) -> Option<FieldValue<'_>> {
        if let Some(value) = self.scalar_ref(key) {
            return Some(FieldValue::Scalar(value));
        }
        self.multi_ref(key)
            .map(|values| FieldValue::MultiSelect(values.as_slice()))
    }

    /// Sets a single-valued field.
    ///
    /// # Errors
    ///
    /// Returns `ScribeError::UnknownField` if `key` names no scalar field.
    pub fn set_scalar(&mut self, key: &str, value: impl Into<String>) -> ScribeResult<()> {
        let slot = self
            .scalar_mut(key)
            .ok_or_else(|| ScribeError::UnknownField(key.to_string()))?;
        *slot = value.into();
        Ok(())
    }

    /// Replaces the selection of a multi-select field, dropping repeated options.
    ///
    /// # Errors
    ///
    /// Returns `ScribeError::UnknownField` if `key` names no multi-select field.
    pub fn set_multi(&mut self, key: &str, values: Vec<String>) -> ScribeResult<()> {
        let slot = self
            .multi_mut(key)
            .ok_or_else(|| ScribeError::UnknownField(key.to_string()))?;
        slot.clear();
        for value in values {
            if !slot.contains(&value) {
                slot.push(value);
            }
        }
        Ok(())
    }

    /// Checks or unchecks one option of a multi-select field.
    ///
    /// Returns whether the option is selected afterwards.
    pub fn toggle_option(&mut self, key: &str, option: &str) -> ScribeResult<bool> {
        let slot = self
            .multi_mut(key)
            .ok_or_else(|| ScribeError::UnknownField(key.to_string()))?;
        if let Some(index) = slot.iter().position(|value| value == option) {
            slot.remove(index);
            Ok(false)
        } else {
            slot.push(option.to_string());
            Ok(true)
        }
    }

    pub fn lab_tests(&self) -> &[LabTestRow] {
        &self.lab_tests
    }

    /// Appends a blank lab row and returns its index.
    pub fn add_lab_test(&mut self) -> usize {
        self.lab_tests.push(LabTestRow::default());
        self.lab_tests.len() - 1
    }

    /// Sets one cell of the lab row at `row`.
    ///
    /// # Errors
    ///
    /// Returns `ScribeError::InvalidInput` if the row does not exist or the value kind
    /// does not fit the parameter.
    pub fn set_lab_value(
        &mut self,
        row: usize,
        param: LabParameter,
        value: LabValue,
    ) -> ScribeResult<()> {
        let row_count = self.lab_tests.len();
        let target = self.lab_tests.get_mut(row).ok_or_else(|| {
            ScribeError::InvalidInput(format!(
                "lab row {} does not exist ({} rows)",
                row, row_count
            ))
        })?;

        if target.set(param, value) {
            Ok(())
        } else {
            Err(ScribeError::InvalidInput(format!(
                "value kind does not match lab parameter {}",
                param.key()
            )))
        }
    }

    /// Name to list the record under: the trimmed name, or "Unnamed".
    pub fn display_name(&self) -> &str {
        match self.name.trim() {
            "" => UNNAMED_PATIENT,
            name => name,
        }
    }

    /// Overlays a persisted form object onto a blank form.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut form = Self::default();
        for (key, value) in object {
            if key == "lab_tests" {
                form.lab_tests = normalize_lab_tests(value);
            } else if let Some(slot) = form.scalar_mut(key) {
                *slot = json_text(value);
            } else if let Some(slot) = form.multi_mut(key) {
                *slot = json_list(value);
            }
        }
        form
    }

    /// Parses a form from JSON text.
    pub fn from_json_str(input: &str) -> ScribeResult<Self> {
        serde_json::from_str(input).map_err(ScribeError::Deserialization)
    }

    /// Parses a form from YAML text.
    pub fn from_yaml_str(input: &str) -> ScribeResult<Self> {
        serde_yaml::from_str(input).map_err(ScribeError::YamlDeserialization)
    }

    pub fn to_json_pretty(&self) -> ScribeResult<String> {
        serde_json::to_string_pretty(self).map_err(ScribeError::Serialization)
    }

    pub fn to_yaml(&self) -> ScribeResult<String> {
        serde_yaml::to_string(self).map_err(ScribeError::YamlSerialization)
    }
}

impl<'de> Deserialize<'de> for FormModel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Object(object) => Ok(Self::from_json_object(&object)),
            Value::Null => Ok(Self::default()),
            other => Err(serde::de::Error::custom(format!(
                "expected a form object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().map(json_text).collect(),
        Value::Null => Vec::new(),
        single => vec![json_text(single)],
    };

    let mut list = Vec::with_capacity(items.len());
    for item in items {
        if !item.trim().is_empty() && !list.contains(&item) {
            list.push(item);
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{self, FieldKind};
    use serde_json::json;

    /// Keys of every catalogued field whose kind disagrees with the struct layout.
    fn catalogue_mismatches() -> Vec<&'static str> {
        let form = FormModel::default();
        catalogue::fields()
            .filter(|spec| match (spec.kind, form.value(spec.key)) {
                (FieldKind::MultiSelect(_), Some(FieldValue::MultiSelect(_))) => false,
                (FieldKind::MultiSelect(_), _) => true,
                (_, Some(FieldValue::Scalar(_))) => false,
                _ => true,
            })
            .map(|spec| spec.key)
            .collect()
    }

    #[test]
    fn test_new_form_is_blank_with_one_lab_row() {
        let form = FormModel::new();
        assert_eq!(form.lab_tests().len(), 1);
        assert!(form.lab_tests()[0].is_blank());
        for key in FormModel::SCALAR_KEYS.iter().chain(FormModel::MULTI_SELECT_KEYS) {
            assert!(form.value(key).unwrap().is_empty(), "{} should be empty", key);
        }
    }

    #[test]
    fn test_catalogue_covers_every_field() {
        assert!(catalogue_mismatches().is_empty());
        let catalogued = catalogue::fields().count();
        assert_eq!(
            catalogued,
            FormModel::SCALAR_KEYS.len() + FormModel::MULTI_SELECT_KEYS.len()
        );
    }

    #[test]
    fn test_set_scalar_and_read_back() {
        let mut form = FormModel::new();
        form.set_scalar("age", "34").unwrap();
        assert_eq!(form.age, "34");
        assert_eq!(form.value("age"), Some(FieldValue::Scalar("34")));
    }

    #[test]
    fn test_set_scalar_rejects_unknown_and_multi_keys() {
        let mut form = FormModel::new();
        assert!(matches!(
            form.set_scalar("favourite_colour", "red"),
            Err(ScribeError::UnknownField(_))
        ));
        assert!(matches!(
            form.set_scalar("habits", "Smoking"),
            Err(ScribeError::UnknownField(_))
        ));
    }

    #[test]
    fn test_set_multi_drops_repeats() {
        let mut form = FormModel::new();
        form.set_multi(
            "symptoms",
            vec!["Fever".into(), "Diarrhea".into(), "Fever".into()],
        )
        .unwrap();
        assert_eq!(form.symptoms, vec!["Fever", "Diarrhea"]);
    }

    #[test]
    fn test_toggle_option() {
        let mut form = FormModel::new();
        assert!(form.toggle_option("habits", "Smoking").unwrap());
        assert!(form.toggle_option("habits", "Alcohol").unwrap());
        assert!(!form.toggle_option("habits", "Smoking").unwrap());
        assert_eq!(form.habits, vec!["Alcohol"]);
    }

    #[test]
    fn test_lab_rows_only_append() {
        let mut form = FormModel::new();
        assert_eq!(form.add_lab_test(), 1);
        form.set_lab_value(1, LabParameter::Cd4, LabValue::Text("410".into()))
            .unwrap();

        assert_eq!(form.lab_tests().len(), 2);
        assert_eq!(form.lab_tests()[1].cd4, "410");
        assert!(form
            .set_lab_value(5, LabParameter::Cd4, LabValue::Text("1".into()))
            .is_err());
        assert!(form
            .set_lab_value(0, LabParameter::Hbsag, LabValue::Text("1".into()))
            .is_err());
    }

    #[test]
    fn test_display_name_falls_back_to_unnamed() {
        let mut form = FormModel::new();
        assert_eq!(form.display_name(), "Unnamed");
        form.name = "  Asha ".into();
        assert_eq!(form.display_name(), "Asha");
    }

    #[test]
    fn test_hydration_merges_onto_defaults() {
        let stored = json!({
            "name": "Rahul",
            "age": 41,
            "habits": "Smoking",
            "illnesses": ["Pneumonia", "", "Pneumonia"],
            "retired_field": "ignored",
            "lab_tests": {"cd4": ["300", "280"]}
        });
        let form: FormModel = serde_json::from_value(stored).unwrap();

        assert_eq!(form.name, "Rahul");
        assert_eq!(form.age, "41");
        assert_eq!(form.habits, vec!["Smoking"]);
        assert_eq!(form.illnesses, vec!["Pneumonia"]);
        assert_eq!(form.sex, "");
        assert_eq!(form.lab_tests().len(), 2);
        assert_eq!(form.lab_tests()[1].cd4, "280");
    }

    #[test]
    fn test_missing_lab_tests_gives_one_row() {
        let form: FormModel = serde_json::from_value(json!({"name": "A"})).unwrap();
        assert_eq!(form.lab_tests().len(), 1);
    }

    #[test]
    fn test_json_round_trip_preserves_form() {
        let mut form = FormModel::new();
        form.name = "Asha".into();
        form.set_multi("tb_type", vec!["EPTB".into()]).unwrap();
        form.set_lab_value(0, LabParameter::Hbsag, LabValue::Flag(Some(true)))
            .unwrap();

        let json = form.to_json_pretty().unwrap();
        assert_eq!(FormModel::from_json_str(&json).unwrap(), form);
    }

    #[test]
    fn test_yaml_input_is_accepted() {
        let yaml = "name: Asha\nage: 34\nsex: Female\nsymptoms:\n  - Fever\nlab_tests:\n  - cd4: 500\n    hbsag: false\n";
        let form = FormModel::from_yaml_str(yaml).unwrap();

        assert_eq!(form.name, "Asha");
        assert_eq!(form.age, "34");
        assert_eq!(form.symptoms, vec!["Fever"]);
        assert_eq!(form.lab_tests()[0].cd4, "500");
        assert_eq!(form.lab_tests()[0].hbsag, Some(false));
    }

    #[test]
    fn test_non_object_form_is_rejected() {
        assert!(FormModel::from_json_str("[1, 2]").is_err());
    }
}
