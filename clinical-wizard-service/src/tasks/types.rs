use serde::{Deserialize, Serialize};

use crate::models::{Demographics, Differential, PhysicalExam, Prescription};

/// Keys used in the session context
pub mod session_keys {
    pub const PATIENT: &str = "patient";
    pub const STEP_INPUT: &str = "step_input";
    pub const CURRENT_QUESTION: &str = "current_question";
    pub const TEST_TRACKER: &str = "test_tracker";
    /// Category whose starting differential is in the patient record
    pub const DIFFERENTIAL_CATEGORY: &str = "differential_category";
    pub const LAST_PROMPT: &str = "last_prompt";
    pub const WORKFLOW_COMPLETED: &str = "workflow_completed";
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IntakeInput {
    pub demographics: Option<Demographics>,
    pub chief_complaint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryInput {
    /// Answer to the question currently on screen
    pub answer: Option<String>,
    pub skip: bool,
    pub skip_context: Option<String>,
    /// Steer the next question towards a topic
    pub focus: Option<String>,
    /// Stop questioning and move on
    pub finish: bool,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub medications: Option<String>,
    pub allergies: Option<String>,
    pub social_history: Option<String>,
    pub family_history: Option<String>,
    pub review_of_systems: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExamInput {
    pub physical_exam: PhysicalExam,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DifferentialReviewInput {
    pub accept: bool,
    pub add: Vec<Differential>,
    /// Names to drop from the list
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestActionKind {
    Order,
    Complete,
}

#[derive(Debug, Deserialize)]
pub struct TestAction {
    pub test: String,
    pub action: TestActionKind,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TestOrderingInput {
    /// Extra tests not suggested by any differential
    pub add: Vec<String>,
    pub actions: Vec<TestAction>,
    pub done: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FinalDiagnosisInput {
    pub final_diagnosis: Option<String>,
    pub prescriptions: Vec<Prescription>,
}

/// What a step shows the user, serialized into the task response
#[derive(Debug, Serialize, Deserialize)]
pub struct Screen {
    pub step: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}
