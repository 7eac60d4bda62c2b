use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use wizard_flow::{Context, NextAction, Result, Task, TaskResult};

use super::types::{ExamInput, session_keys};
use super::utils::{load_patient, save_patient, screen, take_input};
use crate::questions::{Category, categorize};
use crate::refinement::initial_differentials;

pub const STEP: &str = "examination";

/// Physical exam findings. Once the exam is recorded the starting
/// differential for the complaint category is filled in, and filled in again
/// if the complaint has since moved to another category.
pub struct ExaminationTask;

#[async_trait]
impl Task for ExaminationTask {
    fn id(&self) -> &str {
        STEP
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut patient = load_patient(&context).await?;

        if let Some(input) = take_input::<ExamInput>(&context, STEP).await? {
            patient.physical_exam = input.physical_exam;
        }

        if patient.physical_exam.is_empty() {
            save_patient(&context, &patient).await;
            return Ok(TaskResult::new_with_status(
                screen(
                    &context,
                    STEP,
                    "Record vitals and examination findings",
                    json!({ "physical_exam": patient.physical_exam }),
                )
                .await?,
                NextAction::WaitForInput,
                Some("Waiting for examination findings".to_string()),
            ));
        }

        let category = categorize(&patient.chief_complaint);
        let seeded_for: Option<Category> = context.get(session_keys::DIFFERENTIAL_CATEGORY).await;
        if patient.differentials.is_empty() || seeded_for != Some(category) {
            patient.differentials = initial_differentials(category);
            // Tests were suggested for the old differential
            patient.ordered_tests.clear();
            patient.test_results.clear();
            context.remove(session_keys::TEST_TRACKER).await;
            context.set(session_keys::DIFFERENTIAL_CATEGORY, category).await;
            info!(
                patient_id = %patient.id,
                category = category.as_str(),
                count = patient.differentials.len(),
                "Initial differential generated"
            );
        }
        save_patient(&context, &patient).await;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some("Examination recorded".to_string()),
        ))
    }
}
