//! Field catalogue for the patient assessment form.
//!
//! Every scalar and multi-select field of [`FormModel`](crate::form::FormModel) appears here
//! exactly once, grouped into the sections a printed report uses. The catalogue is the
//! single source for report labels, unit suffixes, input kinds and the option
//! vocabularies that validation checks against.

/// Options shared by the many yes/no questions.
const YES_NO: &[&str] = &["Yes", "No"];

/// The kind of input a field takes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Ten-digit telephone number.
    Phone,
    /// Non-negative number, optionally whole and bounded above.
    Number { whole: bool, max: Option<f64> },
    /// One value out of a fixed vocabulary.
    Choice(&'static [&'static str]),
    /// Any subset of a fixed vocabulary, kept in selection order.
    MultiSelect(&'static [&'static str]),
}

/// Description of one form field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSpec {
    /// Persisted key, also the `FormModel` field name.
    pub key: &'static str,
    /// Label shown in reports.
    pub label: &'static str,
    pub kind: FieldKind,
    /// Unit appended after a present value in reports.
    pub unit: Option<&'static str>,
    /// Whether a form may not be submitted without this field.
    pub required: bool,
}

/// A titled group of fields.
#[derive(Clone, Copy, Debug)]
pub struct SectionSpec {
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind,
        unit: None,
        required: false,
    }
}

const fn required(spec: FieldSpec) -> FieldSpec {
    FieldSpec {
        required: true,
        ..spec
    }
}

const fn with_unit(spec: FieldSpec, unit: &'static str) -> FieldSpec {
    FieldSpec {
        unit: Some(unit),
        ..spec
    }
}

const DECIMAL: FieldKind = FieldKind::Number {
    whole: false,
    max: None,
};

const WHOLE: FieldKind = FieldKind::Number {
    whole: true,
    max: None,
};

/// Report sections in print order. The lab table follows the last section.
pub const SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        title: "Patient Demographics",
        fields: &[
            required(field("name", "Name", FieldKind::Text)),
            required(field(
                "age",
                "Age",
                FieldKind::Number {
                    whole: true,
                    max: Some(120.0),
                },
            )),
            required(field(
                "sex",
                "Sex",
                FieldKind::Choice(&["Male", "Female", "Other"]),
            )),
            required(field("id_no", "ID Number", FieldKind::Text)),
            field("address", "Address", FieldKind::Text),
            field("telephone", "Telephone", FieldKind::Phone),
            field("enroll_date", "Enrollment Date", FieldKind::Date),
        ],
    },
    SectionSpec {
        title: "Socio-Economic & Marital Information",
        fields: &[
            required(field(
                "education",
                "Education",
                FieldKind::Choice(&["None", "School", "Higher"]),
            )),
            field("occupation", "Occupation", FieldKind::Text),
            required(field(
                "marital_status",
                "Marital Status",
                FieldKind::Choice(&["Never Married", "Married", "Widowed", "Divorced"]),
            )),
            required(field(
                "living_with_family",
                "Living with Family",
                FieldKind::Choice(YES_NO),
            )),
            required(field(
                "contraceptives",
                "Contraceptives",
                FieldKind::Choice(YES_NO),
            )),
            required(field(
                "heard_of_aids",
                "Heard of AIDS",
                FieldKind::Choice(YES_NO),
            )),
            field(
                "habits",
                "Habits",
                FieldKind::MultiSelect(&["Alcohol", "Drug Addiction", "Smoking"]),
            ),
        ],
    },
    SectionSpec {
        title: "Clinical History",
        fields: &[
            field(
                "symptoms",
                "Symptoms",
                FieldKind::MultiSelect(&["Fever", "Weight Loss", "Diarrhea", "Oral Ulcers"]),
            ),
            field("tb_past_history", "TB Past History", FieldKind::Choice(YES_NO)),
            field(
                "tb_present_history",
                "TB Present History",
                FieldKind::Choice(YES_NO),
            ),
            field(
                "att_initiation_date",
                "ATT Initiation Date",
                FieldKind::Date,
            ),
        ],
    },
    SectionSpec {
        title: "Physical Examination",
        fields: &[
            field(
                "physical_symptoms",
                "Physical Symptoms",
                FieldKind::MultiSelect(&["Cough", "Expectoration", "Dyspnea"]),
            ),
            with_unit(field("weight", "Weight", DECIMAL), "kg"),
            field("bmi", "BMI", DECIMAL),
            with_unit(field("weight_loss", "Weight Loss", DECIMAL), "kg"),
            with_unit(field("symptoms_duration", "Symptoms Duration", WHOLE), "weeks"),
            with_unit(
                field(
                    "mantoux_test",
                    "Mantoux Test",
                    FieldKind::Number {
                        whole: true,
                        max: Some(100.0),
                    },
                ),
                "mm",
            ),
            field(
                "bacillary_load",
                "Bacillary Load",
                FieldKind::Choice(&["3+", "2+", "1+", "scanty", "negative"]),
            ),
            field("bcg_vaccine", "BCG Vaccine", FieldKind::Choice(YES_NO)),
        ],
    },
    SectionSpec {
        title: "TB Classification",
        fields: &[
            field(
                "ptb_symptoms",
                "PTB Symptoms",
                FieldKind::MultiSelect(&["Cough", "Hemoptysis", "Chest Pain"]),
            ),
            field(
                "tb_type",
                "TB Type",
                FieldKind::MultiSelect(&["EPTB", "DTB", "MTB"]),
            ),
            field(
                "pleural_effusion",
                "Pleural Effusion",
                FieldKind::Choice(YES_NO),
            ),
            field(
                "smear_culture_results",
                "Smear/Culture Results",
                FieldKind::Text,
            ),
        ],
    },
    SectionSpec {
        title: "Risk Factors & Exposure History",
        fields: &[
            field(
                "exposure",
                "Exposure",
                FieldKind::MultiSelect(&["CSW", "Premarital", "Extramarital"]),
            ),
            field(
                "sex_risk_group",
                "Sex Risk Group",
                FieldKind::Choice(&["Heterosexual", "MSM", "IVDA", "Other"]),
            ),
            field(
                "hiv_cause",
                "HIV Cause",
                FieldKind::MultiSelect(&["HIV", "TB", "HIV+TB"]),
            ),
            field(
                "transmission_category",
                "Transmission Category",
                FieldKind::Choice(&["Heterosexual", "IVDA", "Mother-to-Child", "Others"]),
            ),
            field(
                "last_transfusion_date",
                "Last Transfusion Date",
                FieldKind::Date,
            ),
            field(
                "last_transfusion_place",
                "Transfusion Place",
                FieldKind::Text,
            ),
            field(
                "occupational_exposure",
                "Occupational Exposure",
                FieldKind::Choice(&["Yes", "No", "Unknown"]),
            ),
            field(
                "sexual_partners",
                "Sexual Partners",
                FieldKind::Choice(&["1", ">1"]),
            ),
            field("tattooed", "Tattooed", FieldKind::Choice(YES_NO)),
        ],
    },
    SectionSpec {
        title: "HIV-Related Illnesses",
        fields: &[
            field(
                "illnesses",
                "Illnesses",
                FieldKind::MultiSelect(&[
                    "Oral Candidiasis",
                    "Pulmonary TB",
                    "Extra Pulmonary TB",
                    "Pneumonia",
                ]),
            ),
            field("other_illnesses", "Other Illnesses", FieldKind::Text),
        ],
    },
    SectionSpec {
        title: "Treatment Information",
        fields: &[
            field(
                "art_type",
                "ART Type",
                FieldKind::Choice(&["Mono", "Two drugs", "HAART", "Modified HAART"]),
            ),
            field(
                "art_initiation_date",
                "ART Initiation Date",
                FieldKind::Date,
            ),
            field(
                "att_treatment_details",
                "ATT Treatment Details",
                FieldKind::Text,
            ),
            field("att_treatment_date", "ATT Treatment Date", FieldKind::Date),
            field(
                "other_treatments",
                "Other Treatments",
                FieldKind::Choice(YES_NO),
            ),
            field(
                "other_treatment_desc",
                "Treatment Description",
                FieldKind::Text,
            ),
        ],
    },
    SectionSpec {
        title: "Radiology Findings",
        fields: &[
            field(
                "radiograph_result",
                "Radiograph Result",
                FieldKind::Choice(&["Normal", "Abnormal"]),
            ),
            field(
                "unilateral_bilateral",
                "Unilateral/Bilateral",
                FieldKind::Choice(&["Unilateral", "Bilateral"]),
            ),
            field(
                "severity",
                "Severity",
                FieldKind::Choice(&["Minimal", "Moderate", "Far Advanced"]),
            ),
            field(
                "cavity_type",
                "Cavity Type",
                FieldKind::Choice(&["Type 1", "Type 2"]),
            ),
            field("cavity_number", "Cavity Number", WHOLE),
        ],
    },
];

/// Iterates every field in print order.
pub fn fields() -> impl Iterator<Item = &'static FieldSpec> {
    SECTIONS.iter().flat_map(|section| section.fields.iter())
}

/// Looks a field up by its persisted key.
pub fn field_spec(key: &str) -> Option<&'static FieldSpec> {
    fields().find(|spec| spec.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_are_unique() {
        let mut seen = HashSet::new();
        for spec in fields() {
            assert!(seen.insert(spec.key), "duplicate key {}", spec.key);
        }
    }

    #[test]
    fn test_field_spec_lookup() {
        let weight = field_spec("weight").expect("weight is catalogued");
        assert_eq!(weight.unit, Some("kg"));
        assert!(!weight.required);

        let habits = field_spec("habits").expect("habits is catalogued");
        assert!(matches!(habits.kind, FieldKind::MultiSelect(_)));

        assert!(field_spec("lab_tests").is_none());
        assert!(field_spec("nope").is_none());
    }

    #[test]
    fn test_required_fields() {
        let required: Vec<&str> = fields()
            .filter(|spec| spec.required)
            .map(|spec| spec.key)
            .collect();
        assert_eq!(
            required,
            vec![
                "name",
                "age",
                "sex",
                "id_no",
                "education",
                "marital_status",
                "living_with_family",
                "contraceptives",
                "heard_of_aids",
            ]
        );
    }
}
