//! Canonicalization of raw panel and component names.
//!
//! Both tables are ordered: the first canonical label whose pattern matches
//! wins, and for a given label its patterns are tried in the order supplied.
//! Several entries overlap on purpose (OCR-tolerant catch-alls live near the
//! bottom so the specific spellings above them stay reachable), which makes
//! the ordering a correctness invariant rather than a cosmetic choice.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

type Entry = (&'static str, Vec<Regex>);

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("invalid vocabulary pattern")
}

/// Standard panel name mappings, raw header text to canonical label.
static PANEL_TABLE: Lazy<Vec<Entry>> = Lazy::new(|| {
    vec![
        (
            "Comprehensive Metabolic Panel (CMP)",
            vec![
                ci(r"Comprehensive\s*Metabolic"),
                ci(r"^CMP"),
                ci(r"ABNORMAL_COMPREHENSIVE_METABOLIC"),
            ],
        ),
        (
            "Complete Blood Count (CBC)",
            vec![ci(r"^CBC"), ci(r"ABNORMAL_CBC")],
        ),
        ("Lipid Panel", vec![ci(r"Lipid\s*Panel")]),
        ("Thyroid Stimulating Hormone (TSH)", vec![ci(r"^TSH")]),
        ("Urinalysis (UA)", vec![ci(r"LABS-UA"), ci(r"URINALYSIS")]),
        ("Iron Panel", vec![ci(r"LABS-IRON")]),
        (
            "Vitamin B12 and Folate",
            vec![ci(r"Vitamin\s*B12\s*and\s*Folate")],
        ),
        ("Vitamin B12 (Cobalamin)", vec![ci(r"VITAMIN\s*B12")]),
        (
            "Serum Protein Electrophoresis (SPEP)",
            vec![ci(r"PROTEIN\s*ELECTROPHORESIS")],
        ),
        ("Parathyroid Hormone (PTH)", vec![ci(r"^PTH")]),
        ("Hemoglobin A1c (HbA1c)", vec![ci(r"^A1C")]),
    ]
});

/// Standard component name mappings. Larger vocabulary covering chemistry,
/// hematology, and urinalysis, with accepted spelling/abbreviation variants.
static COMPONENT_TABLE: Lazy<Vec<Entry>> = Lazy::new(|| {
    vec![
        ("Albumin", vec![ci(r"^ALB(UMIN)?(\s+SPEP)?$")]),
        (
            "Alkaline Phosphatase (ALP)",
            vec![ci(r"^AL(KP|KALINE)(\s+Phosphatase)?$")],
        ),
        (
            "Alanine Aminotransferase (ALT)",
            vec![ci(r"^ALT(\s+\(SGPT\))?.*$"), ci(r"^ALT.*$")],
        ),
        ("Aspartate Aminotransferase (AST)", vec![ci(r"^AST.*$")]),
        ("Basophils Absolute", vec![ci(r"^BASO\s*#$")]),
        ("Basophils %", vec![ci(r"^BASO(PHILS)?\s*%?,?$")]),
        (
            "Total Bilirubin",
            vec![ci(r"^(TBIL|BILIRUBIN,\s*TOTAL|Total\s+Bilirubin)$")],
        ),
        ("Blood Urea Nitrogen (BUN)", vec![ci(r"^BUN(\s+\d+)?$")]),
        ("Calcium", vec![ci(r"^(CA|CALCIUM)$")]),
        ("Chloride", vec![ci(r"^(CHLORIDE|Cl-)$")]),
        ("Total Cholesterol", vec![ci(r"^(CHOL(ESTEROL)?)$")]),
        ("Carbon Dioxide (CO2)", vec![ci(r"^CO2$")]),
        (
            "Calcium, Corrected",
            vec![ci(r"^(CORR\s+CA|Corrected\s+Calcium)$")],
        ),
        ("Creatinine", vec![ci(r"^(CREA|CREATININE)$")]),
        ("Creatinine, Urine 24H", vec![ci(r"^Creatinine,\s*24H\s*Ur$")]),
        ("Estimated Average Glucose (eAG)", vec![ci(r"^EAG$")]),
        ("Eosinophils Absolute", vec![ci(r"^EOS\s*#$")]),
        ("Eosinophils %", vec![ci(r"^EOS(INOPHILS)?\s*%?,?$")]),
        ("Iron (Fe)", vec![ci(r"^FE$")]),
        ("Folate", vec![ci(r"^FOLAT$")]),
        ("Glucose", vec![ci(r"^GLU(COSE)?(,\s*RANDOM)?$")]),
        ("Hematocrit (Hct)", vec![ci(r"^(HCT|HEMATOCRIT)(,\s*AUTO)?$")]),
        ("HDL Cholesterol", vec![ci(r"^d?HDL$")]),
        ("Hemoglobin (Hgb)", vec![ci(r"^HGB|Hemoglobin$")]),
        ("Immature Granulocytes Absolute", vec![ci(r"^IG\s*#$")]),
        ("Immature Granulocytes %", vec![ci(r"^IMMATURE\s+GRAN\s*%$")]),
        ("Calcium, Ionized", vec![ci(r"^IONIZED\s+CALCIUM$")]),
        ("Potassium", vec![ci(r"^(K\+|POTASSIUM)$")]),
        (
            "LDL Cholesterol",
            vec![ci(r"^LDL(\s+(DIRECT|CALCULATED))?$")],
        ),
        ("Lymphocytes Absolute", vec![ci(r"^LYMPH\s*#$")]),
        ("Lymphocytes %", vec![ci(r"^LYMPH(OCYTES)?\s*%?,?$")]),
        ("Mean Corpuscular Hemoglobin (MCH)", vec![ci(r"^MCH$")]),
        (
            "Mean Corpuscular Hemoglobin Concentration (MCHC)",
            vec![ci(r"^MCHC$")],
        ),
        ("Mean Corpuscular Volume (MCV)", vec![ci(r"^MCV$")]),
        ("Monocytes Absolute", vec![ci(r"^MONO\s*#$")]),
        ("Monocytes %", vec![ci(r"^MONO(CYTES)?\s*%?,?$")]),
        ("Mean Platelet Volume (MPV)", vec![ci(r"^MPV$")]),
        ("Sodium", vec![ci(r"^(NA\+|SODIUM)$")]),
        ("Neutrophils Absolute", vec![ci(r"^NEUT\s*#$")]),
        ("Neutrophils %", vec![ci(r"^NEUT(ROPHILS)?\s*%?,?$")]),
        (
            "Platelet Count",
            vec![ci(r"^(PLT|PLATELETS(,\s*AUTOMATED)?)$")],
        ),
        (
            "Total Protein",
            vec![ci(r"^(TP|TOTAL\s+PROTEIN|PROTEIN\s+TOTAL)$")],
        ),
        (
            "Parathyroid Hormone (PTH), Intact",
            vec![ci(r"^PTH(\s+INTACT)?$")],
        ),
        ("Red Blood Cell Count (RBC)", vec![ci(r"^RBC(,\s*AUTO)?$")]),
        (
            "Red Cell Distribution Width (RDW)",
            vec![ci(r"^RDW(,\s*BLOOD)?.*$"), ci(r"^RDW,\s*RATIO.*$")],
        ),
        ("Total Iron Binding Capacity (TIBC)", vec![ci(r"^TIBC$")]),
        ("Triglycerides", vec![ci(r"^TRIG(LYCERIDE)?$")]),
        ("Thyroid Stimulating Hormone (TSH)", vec![ci(r"^TSH$")]),
        ("Vitamin B12", vec![ci(r"^VIT(AMIN)?\s*B12$")]),
        (
            "White Blood Cell Count (WBC)",
            vec![ci(r"^(WBC|WBC'S)(,?\s*AUTO)?$")],
        ),
        ("Hemoglobin A1c (HbA1c)", vec![ci(r"^(d%A1c|A1C)$")]),
        ("Anion Gap", vec![ci(r"^Anion\s+Gap$")]),
        ("Lipase", vec![ci(r"^Lipase$")]),
        ("Magnesium", vec![ci(r"^Magnesium$")]),
        ("Phosphorus", vec![ci(r"^Phosphorus$")]),
        ("Urine pH", vec![ci(r"^(F\s+)?U\s+PH|PH,\s+UA$")]),
        ("Calcium, Urine", vec![ci(r"^Calcium,\s*Urine$")]),
        ("Glucose, Urine", vec![ci(r"^GLUCOSE,\s+UA$")]),
        (
            "Specific Gravity, Urine",
            vec![ci(r"^SPECIFIC\s+GRAVITY,\s+UA$")],
        ),
        ("Protein, Urine", vec![ci(r"^PROTEIN,\s+UA$")]),
        ("Ketones, Urine", vec![ci(r"^KETONES,\s+UA|KET$")]),
        ("Bilirubin, Urine", vec![ci(r"^BILIRUBIN,\s+UA$")]),
        ("Urobilinogen, Urine", vec![ci(r"^UROBILINOGEN,.*$")]),
        ("Nitrite, Urine", vec![ci(r"^NITRITE,\s+UA$")]),
        (
            "Leukocyte Esterase, Urine",
            vec![ci(r"^LEUKOCYTE\s+ESTERASE,.*$")],
        ),
        ("Blood, Urine", vec![ci(r"^UA\s+HGB$")]),
        ("Mucus, Urine", vec![ci(r"^MUCUS,\s+URINE$")]),
        ("Granulocytes %", vec![ci(r"^GRANULOCYTES\s*%,.*$")]),
        ("Granulocytes", vec![ci(r"^GRANULOCYTES$")]),
        // OCR-tolerant catch-alls. These also match strings claimed by the
        // stricter entries above, so they must stay at the bottom.
        (
            "Monocytes %",
            vec![ci(r"^MONO(CYTES|S)?\s*%?(,?\s*AUTO)?.*$")],
        ),
        (
            "Immature Granulocytes %",
            vec![ci(r"^(IMMATURE|IMMATURE\s+GRAN\s*%)$")],
        ),
        ("WBC, Urine", vec![ci(r"^WBC,\s*Urine.*$")]),
        ("Urine pH", vec![ci(r"^(F\s+)?U\s+PH|PH,\s+(UA|Urine)$")]),
    ]
});

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_all_uppercase(text: &str) -> bool {
    let mut saw_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            saw_cased = true;
        }
    }
    saw_cased
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a raw panel header to its canonical label. Unmatched names fall
/// back to title case when fully uppercase, or pass through unchanged; a raw
/// label is never dropped.
pub fn normalize_panel(raw: &str) -> String {
    let clean = raw.trim();
    if clean.is_empty() {
        return String::new();
    }
    for (label, patterns) in PANEL_TABLE.iter() {
        if patterns.iter().any(|p| p.is_match(clean)) {
            return (*label).to_string();
        }
    }
    if is_all_uppercase(clean) {
        return title_case(clean);
    }
    clean.to_string()
}

/// Normalize a raw component name to its canonical label. The raw text is
/// whitespace-collapsed first; unmatched names pass through cleaned.
pub fn normalize_component(raw: &str) -> String {
    let clean = collapse_whitespace(raw);
    if clean.is_empty() {
        return clean;
    }
    for (label, patterns) in COMPONENT_TABLE.iter() {
        if patterns.iter().any(|p| p.is_match(&clean)) {
            return (*label).to_string();
        }
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_abbreviations() {
        assert_eq!(normalize_component("CA"), "Calcium");
        assert_eq!(normalize_component("CHOLESTEROL"), "Total Cholesterol");
        assert_eq!(normalize_component("WBC, AUTO"), "White Blood Cell Count (WBC)");
        assert_eq!(normalize_component("GLU"), "Glucose");
        assert_eq!(normalize_component("d%A1c"), "Hemoglobin A1c (HbA1c)");
    }

    #[test]
    fn test_component_whitespace_collapsed_before_lookup() {
        assert_eq!(
            normalize_component("  IONIZED   CALCIUM "),
            "Calcium, Ionized"
        );
    }

    #[test]
    fn test_component_table_order_breaks_overlaps() {
        // "MONO #" matches both the absolute-count entry and the OCR-tolerant
        // "Monocytes %" catch-all near the bottom; the earlier entry wins.
        assert_eq!(normalize_component("MONO #"), "Monocytes Absolute");
        // The catch-all still picks up spellings the strict entries reject.
        assert_eq!(normalize_component("MONOS, AUTO"), "Monocytes %");
    }

    #[test]
    fn test_component_fallback_passes_through() {
        assert_eq!(normalize_component("Something Odd"), "Something Odd");
    }

    #[test]
    fn test_panel_lookup() {
        assert_eq!(
            normalize_panel("CMP (Complete Metabolic Panel)"),
            "Comprehensive Metabolic Panel (CMP)"
        );
        assert_eq!(normalize_panel("LIPID PANEL"), "Lipid Panel");
        assert_eq!(normalize_panel("TSH"), "Thyroid Stimulating Hormone (TSH)");
    }

    #[test]
    fn test_panel_fallback_title_cases_uppercase() {
        assert_eq!(normalize_panel("RANDOM SPECIAL STUDY"), "Random Special Study");
        assert_eq!(normalize_panel("Oddball Study"), "Oddball Study");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for label in ["Anion Gap", "Magnesium", "Phosphorus", "Lipase"] {
            assert_eq!(normalize_component(&normalize_component(label)), label);
        }
        assert_eq!(normalize_panel("Lipid Panel"), "Lipid Panel");
        assert_eq!(
            normalize_panel(&normalize_panel("URINALYSIS COMPLETE")),
            "Urinalysis (UA)"
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(normalize_panel("   "), "");
        assert_eq!(normalize_component(""), "");
    }
}
