//! Fixed column names of the METABRIC clinical patient file and the option
//! lists offered by each widget.

pub const SUBTYPE: &str = "Pam50 + Claudin-low subtype";
pub const OVERALL_SURVIVAL_MONTHS: &str = "Overall Survival (Months)";

/// Every column of the clinical file, offered by the multi-dimensional explorer.
pub const EXPLORER_OPTIONS: [&str; 24] = [
    "#Patient Identifier",
    "Lymph nodes examined positive",
    "Nottingham prognostic index",
    "Cellularity",
    "Chemotherapy",
    "Cohort",
    "ER status measured by IHC",
    "HER2 status measured by SNP6",
    "Hormone Therapy",
    "Inferred Menopausal State",
    "Sex",
    "Integrative Cluster",
    "Age at Diagnosis",
    "Overall Survival (Months)",
    "Overall Survival Status",
    "Pam50 + Claudin-low subtype",
    "3-Gene classifier subtype",
    "Patient's Vital Status",
    "Primary Tumor Laterality",
    "Radio Therapy",
    "Tumor Other Histologic Subtype",
    "Type of Breast Surgery",
    "Relapse Free Status",
    "Relapse Free Status (Months)",
];

pub const EXPLORER_DEFAULT: [&str; 3] = [
    "Age at Diagnosis",
    "Relapse Free Status (Months)",
    "Overall Survival (Months)",
];

/// Categorical columns used by the flow diagram and the violin plot.
pub const CATEGORY_OPTIONS: [&str; 16] = [
    "Cellularity",
    "Chemotherapy",
    "ER status measured by IHC",
    "HER2 status measured by SNP6",
    "Hormone Therapy",
    "Inferred Menopausal State",
    "Sex",
    "Integrative Cluster",
    "Overall Survival Status",
    "3-Gene classifier subtype",
    "Patient's Vital Status",
    "Primary Tumor Laterality",
    "Radio Therapy",
    "Tumor Other Histologic Subtype",
    "Type of Breast Surgery",
    "Relapse Free Status",
];

pub const CLUSTER_OPTIONS: [&str; 6] = [
    "Lymph nodes examined positive",
    "Nottingham prognostic index",
    "Cohort",
    "Age at Diagnosis",
    "Overall Survival (Months)",
    "Relapse Free Status (Months)",
];

pub const CLUSTER_DEFAULT: [&str; 4] = [
    "Age at Diagnosis",
    "Relapse Free Status (Months)",
    "Overall Survival (Months)",
    "Lymph nodes examined positive",
];

pub fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
