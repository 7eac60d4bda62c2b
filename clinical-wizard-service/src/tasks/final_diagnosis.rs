use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use wizard_flow::{Context, NextAction, Result, Task, TaskResult};

use super::types::{FinalDiagnosisInput, session_keys};
use super::utils::{load_patient, save_patient, screen, take_input};

pub const STEP: &str = "final_diagnosis";

/// Final diagnosis and prescriptions; ends the wizard
pub struct FinalDiagnosisTask;

#[async_trait]
impl Task for FinalDiagnosisTask {
    fn id(&self) -> &str {
        STEP
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut patient = load_patient(&context).await?;

        if let Some(input) = take_input::<FinalDiagnosisInput>(&context, STEP).await? {
            if let Some(diagnosis) = input.final_diagnosis.filter(|d| !d.trim().is_empty()) {
                patient.final_diagnosis = Some(diagnosis.trim().to_string());
            }
            patient.prescriptions.extend(input.prescriptions);
            save_patient(&context, &patient).await;
        }

        let Some(diagnosis) = patient.final_diagnosis.clone() else {
            let suggestion = patient.differentials.first().map(|d| d.name.clone());
            return Ok(TaskResult::new_with_status(
                screen(
                    &context,
                    STEP,
                    "Enter the final diagnosis and any prescriptions",
                    json!({ "suggested": suggestion }),
                )
                .await?,
                NextAction::WaitForInput,
                Some("Waiting for final diagnosis".to_string()),
            ));
        };

        let completed = patient
            .ordered_tests
            .iter()
            .filter(|t| t.result.is_some())
            .count();
        info!(patient_id = %patient.id, diagnosis = %diagnosis, "Workflow finished");
        context.set(session_keys::WORKFLOW_COMPLETED, true).await;

        Ok(TaskResult::new_with_status(
            screen(
                &context,
                STEP,
                format!("Final diagnosis recorded: {diagnosis}"),
                json!({
                    "patient_id": patient.id,
                    "name": patient.demographics.name,
                    "chief_complaint": patient.chief_complaint,
                    "final_diagnosis": diagnosis,
                    "prescriptions": patient.prescriptions,
                    "tests_completed": completed,
                    "tests_total": patient.ordered_tests.len(),
                }),
            )
            .await?,
            NextAction::End,
            Some("Workflow complete".to_string()),
        ))
    }
}
