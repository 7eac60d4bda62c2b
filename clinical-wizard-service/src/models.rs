use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::insights::Analysis;
use crate::refinement::TestOrder;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub name: String,
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub date_of_birth: Option<String>,
    pub contact: Option<String>,
}

/// Findings recorded on the examination screen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalExam {
    pub vitals: Option<Vitals>,
    pub general: Option<String>,
    pub cardiovascular: Option<String>,
    pub respiratory: Option<String>,
    pub abdominal: Option<String>,
    pub neurological: Option<String>,
    pub other: Option<String>,
}

impl PhysicalExam {
    /// True when no finding at all has been entered
    pub fn is_empty(&self) -> bool {
        self == &PhysicalExam::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub temperature_c: Option<f64>,
    pub heart_rate: Option<u32>,
    pub respiratory_rate: Option<u32>,
    pub blood_pressure: Option<String>,
    pub oxygen_saturation: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A candidate condition shown on the differential review screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Differential {
    pub name: String,
    pub icd10: String,
    pub probability: f64,
    pub confidence: Confidence,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub suggested_tests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionHistoryEntry {
    pub id: String,
    pub question: String,
    pub answer: Option<String>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub skip_context: Option<String>,
}

/// The record carried through every wizard step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientData {
    pub id: String,
    pub demographics: Demographics,
    pub chief_complaint: String,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub medications: Option<String>,
    pub allergies: Option<String>,
    pub social_history: Option<String>,
    pub family_history: Option<String>,
    pub review_of_systems: Option<String>,
    pub physical_exam: PhysicalExam,
    pub differentials: Vec<Differential>,
    pub ordered_tests: Vec<TestOrder>,
    pub test_results: BTreeMap<String, String>,
    pub final_diagnosis: Option<String>,
    pub prescriptions: Vec<Prescription>,
    pub question_history: Vec<QuestionHistoryEntry>,
    pub analysis: Option<Analysis>,
}

impl PatientData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Answers keyed by question id. Skipped entries are left out.
    pub fn answers(&self) -> BTreeMap<String, String> {
        self.question_history
            .iter()
            .filter(|entry| !entry.skipped)
            .filter_map(|entry| {
                entry
                    .answer
                    .as_ref()
                    .map(|answer| (entry.id.clone(), answer.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    General,
    Progress,
    Assessment,
    Plan,
    Consult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A clinician note, stored as one element of a flat JSON array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub patient_id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    #[serde(default)]
    pub priority: NotePriority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub patient_id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    #[serde(default)]
    pub priority: NotePriority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_by: String,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub note_type: Option<NoteType>,
    pub priority: Option<NotePriority>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartWizardRequest {
    #[serde(default)]
    pub patient_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StepRequest {
    /// Free-form input for the current screen; the step decides how to read it
    #[serde(default)]
    pub input: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub status: String,
    pub current_step: String,
    pub step_number: Option<usize>,
    pub total_steps: usize,
    pub status_message: Option<String>,
    pub prompt: Option<serde_json::Value>,
    pub patient: Option<PatientData>,
    pub waiting_for_input: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_skip_skipped_entries() {
        let mut patient = PatientData::new("p1");
        patient.question_history.push(QuestionHistoryEntry {
            id: "onset".to_string(),
            question: "When did it start?".to_string(),
            answer: Some("two days ago".to_string()),
            skipped: false,
            skip_context: None,
        });
        patient.question_history.push(QuestionHistoryEntry {
            id: "severity".to_string(),
            question: "How severe?".to_string(),
            answer: None,
            skipped: true,
            skip_context: Some("patient unsure".to_string()),
        });

        let answers = patient.answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers["onset"], "two days ago");
    }

    #[test]
    fn note_uses_camel_case_keys() {
        let json = r#"{
            "id": "n1",
            "patientId": "p1",
            "title": "Follow up",
            "content": "Recheck in a week",
            "type": "plan",
            "priority": "high",
            "tags": ["cough"],
            "createdAt": "2024-03-01T10:00:00Z",
            "createdBy": "dr.lee"
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.patient_id, "p1");
        assert_eq!(note.note_type, NoteType::Plan);
        assert_eq!(note.priority, NotePriority::High);
    }
}
