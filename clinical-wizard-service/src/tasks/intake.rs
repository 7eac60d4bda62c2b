use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};
use wizard_flow::{Context, NextAction, Result, Task, TaskResult};

use super::types::{IntakeInput, session_keys};
use super::utils::{load_patient, save_patient, screen, take_input};
use crate::questions::categorize;

pub const STEP: &str = "intake";

/// Demographics and chief complaint. Both a name and a complaint are needed
/// before the wizard moves on.
pub struct IntakeTask;

#[async_trait]
impl Task for IntakeTask {
    fn id(&self) -> &str {
        STEP
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut patient = load_patient(&context).await?;

        if let Some(input) = take_input::<IntakeInput>(&context, STEP).await? {
            if let Some(demographics) = input.demographics {
                patient.demographics = demographics;
            }
            if let Some(complaint) = input.chief_complaint {
                let complaint = complaint.trim().to_string();
                let previous = categorize(&patient.chief_complaint);
                if !patient.chief_complaint.is_empty() && categorize(&complaint) != previous {
                    // Answers to the old category's questions no longer apply
                    warn!(
                        patient_id = %patient.id,
                        discarded = patient.question_history.len(),
                        "Complaint category changed, clearing question history"
                    );
                    patient.question_history.clear();
                    patient.analysis = None;
                    context.remove(session_keys::CURRENT_QUESTION).await;
                }
                patient.chief_complaint = complaint;
            }
            save_patient(&context, &patient).await;
        }

        let mut missing = Vec::new();
        if patient.demographics.name.trim().is_empty() {
            missing.push("demographics.name");
        }
        if patient.chief_complaint.is_empty() {
            missing.push("chief_complaint");
        }

        if !missing.is_empty() {
            return Ok(TaskResult::new_with_status(
                screen(
                    &context,
                    STEP,
                    "Enter patient demographics and the chief complaint",
                    json!({ "missing": missing }),
                )
                .await?,
                NextAction::WaitForInput,
                Some("Waiting for patient intake".to_string()),
            ));
        }

        info!(patient_id = %patient.id, "Patient intake complete");

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some(format!("Intake recorded for {}", patient.demographics.name)),
        ))
    }
}
