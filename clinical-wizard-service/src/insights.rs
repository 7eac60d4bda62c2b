use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::PatientData;

/// Advisory output of the history screen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub insights: Vec<String>,
    pub red_flags: Vec<RedFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    pub id: String,
    pub message: String,
}

struct RedFlagPattern {
    id: &'static str,
    keywords: &'static [&'static str],
    message: &'static str,
}

/// A pattern fires when every keyword occurs somewhere in the answers.
/// Word order and distance are not considered.
const RED_FLAG_PATTERNS: &[RedFlagPattern] = &[
    RedFlagPattern {
        id: "chest_pain_radiation",
        keywords: &["chest", "pain", "radiat"],
        message: "Chest pain with radiation: rule out acute coronary syndrome",
    },
    RedFlagPattern {
        id: "fever_night_sweats",
        keywords: &["fever", "night", "sweats"],
        message: "Fever with night sweats: evaluate for infection (including tuberculosis) or malignancy",
    },
    RedFlagPattern {
        id: "worst_headache",
        keywords: &["worst", "headache"],
        message: "Worst headache of life: rule out subarachnoid haemorrhage",
    },
    RedFlagPattern {
        id: "focal_weakness",
        keywords: &["weakness", "one side"],
        message: "Unilateral weakness: assess for stroke immediately",
    },
    RedFlagPattern {
        id: "slurred_speech",
        keywords: &["slurred", "speech"],
        message: "Slurred speech: assess for stroke immediately",
    },
    RedFlagPattern {
        id: "blood_in_stool",
        keywords: &["blood", "stool"],
        message: "Blood in stool: evaluate for gastrointestinal bleeding",
    },
    RedFlagPattern {
        id: "vomiting_blood",
        keywords: &["vomit", "blood"],
        message: "Haematemesis: evaluate for upper gastrointestinal bleeding",
    },
    RedFlagPattern {
        id: "breathless_at_rest",
        keywords: &["short", "breath", "rest"],
        message: "Breathlessness at rest: check oxygen saturation urgently",
    },
    RedFlagPattern {
        id: "unintentional_weight_loss",
        keywords: &["weight", "loss", "unintentional"],
        message: "Unintentional weight loss: consider malignancy work-up",
    },
];

/// Concatenate every answer, lower-cased, in key order
fn answer_text(answers: &BTreeMap<String, String>) -> String {
    answers
        .values()
        .map(|answer| answer.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn red_flags(answers: &BTreeMap<String, String>) -> Vec<RedFlag> {
    let text = answer_text(answers);
    RED_FLAG_PATTERNS
        .iter()
        .filter(|pattern| pattern.keywords.iter().all(|k| text.contains(k)))
        .map(|pattern| RedFlag {
            id: pattern.id.to_string(),
            message: pattern.message.to_string(),
        })
        .collect()
}

/// Run every insight check and red-flag pattern.
///
/// Insights are independent checks appended in the order below; the same
/// advice can appear twice if two checks produce it.
pub fn analyze(
    complaint: &str,
    answers: &BTreeMap<String, String>,
    patient: &PatientData,
) -> Analysis {
    let complaint = complaint.to_lowercase();
    let text = answer_text(answers);
    let age = patient.demographics.age.unwrap_or(0);
    let mut insights = Vec::new();

    if complaint.contains("chest") && age >= 40 {
        insights.push(
            "Chest complaint over age 40: perform cardiovascular risk stratification (ECG, troponin)"
                .to_string(),
        );
    }
    if text.contains("smok") {
        insights.push("Smoking history noted: increases cardiopulmonary risk".to_string());
    }
    if text.contains("diabet") {
        insights.push(
            "Diabetes reported: atypical presentations of cardiac disease are more likely"
                .to_string(),
        );
    }
    if text.contains("exertion") || text.contains("climbing stairs") {
        insights.push("Exertional symptoms: consider stress testing".to_string());
    }
    if text.contains("fever") {
        insights.push("Fever reported: consider infectious etiology and blood cultures".to_string());
    }
    if complaint.contains("cough") && text.contains("fever") {
        insights.push("Cough with fever: chest imaging recommended".to_string());
    }
    if text.contains("sudden") {
        insights.push("Sudden onset: prioritise vascular causes".to_string());
    }
    if let Some(allergies) = patient.allergies.as_deref().filter(|a| !a.trim().is_empty()) {
        insights.push(format!("Documented allergies ({allergies}): verify before prescribing"));
    }
    let medications = patient.medications.as_deref().unwrap_or("").to_lowercase();
    if medications.contains("warfarin") || medications.contains("anticoagul") || text.contains("blood thinner") {
        insights.push("Anticoagulant use: increased bleeding risk".to_string());
    }
    if text.contains("family") && text.contains("heart") {
        insights.push("Family history of heart disease: elevated cardiovascular risk".to_string());
    }
    if age >= 65 {
        insights.push("Age 65 or older: consider atypical presentations and polypharmacy".to_string());
    }

    Analysis {
        insights,
        red_flags: red_flags(answers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const FEVER_MESSAGE: &str =
        "Fever with night sweats: evaluate for infection (including tuberculosis) or malignancy";

    #[test]
    fn fever_night_sweats_fires() {
        let flags = red_flags(&answers(&[(
            "resp_fever",
            "patient reports fever and night sweats for two weeks",
        )]));
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].message, FEVER_MESSAGE);
    }

    #[test]
    fn word_order_does_not_matter() {
        let flags = red_flags(&answers(&[(
            "resp_fever",
            "sweats at night for two weeks, patient also reports fever",
        )]));
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].message, FEVER_MESSAGE);
    }

    #[test]
    fn keywords_may_span_different_answers() {
        let flags = red_flags(&answers(&[
            ("onset", "started last night"),
            ("associated_symptoms", "Fever and drenching sweats"),
        ]));
        assert!(flags.iter().any(|f| f.id == "fever_night_sweats"));
    }

    #[test]
    fn partial_match_does_not_fire() {
        let flags = red_flags(&answers(&[("resp_fever", "fever only, no sweating")]));
        assert!(flags.is_empty());
    }

    #[test]
    fn insights_follow_check_order() {
        let mut patient = PatientData::new("p1");
        patient.demographics.age = Some(58);
        patient.allergies = Some("penicillin".to_string());

        let analysis = analyze(
            "Chest pain",
            &answers(&[("social_history", "Smokes 20 a day"), ("cardiac_exertion", "yes on exertion")]),
            &patient,
        );
        assert_eq!(
            analysis.insights,
            vec![
                "Chest complaint over age 40: perform cardiovascular risk stratification (ECG, troponin)".to_string(),
                "Smoking history noted: increases cardiopulmonary risk".to_string(),
                "Exertional symptoms: consider stress testing".to_string(),
                "Documented allergies (penicillin): verify before prescribing".to_string(),
            ]
        );
    }

    #[test]
    fn empty_inputs_produce_nothing() {
        let analysis = analyze("", &BTreeMap::new(), &PatientData::default());
        assert_eq!(analysis, Analysis::default());
    }
}
