use async_trait::async_trait;
use serde_json::json;
use wizard_flow::{Context, NextAction, Result, Task, TaskResult};

use super::types::DifferentialReviewInput;
use super::utils::{load_patient, save_patient, screen, take_input};

pub const STEP: &str = "differential_review";

pub struct DifferentialReviewTask;

#[async_trait]
impl Task for DifferentialReviewTask {
    fn id(&self) -> &str {
        STEP
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut patient = load_patient(&context).await?;
        let mut accepted = false;

        if let Some(input) = take_input::<DifferentialReviewInput>(&context, STEP).await? {
            patient
                .differentials
                .retain(|d| !input.remove.iter().any(|name| name == &d.name));
            patient.differentials.extend(input.add);
            patient
                .differentials
                .sort_by(|a, b| b.probability.total_cmp(&a.probability));
            accepted = input.accept;
            save_patient(&context, &patient).await;
        }

        if accepted && !patient.differentials.is_empty() {
            return Ok(TaskResult::new_with_status(
                None,
                NextAction::ContinueAndExecute,
                Some(format!("{} differentials accepted", patient.differentials.len())),
            ));
        }

        let (insights, red_flags) = patient
            .analysis
            .as_ref()
            .map(|a| (a.insights.clone(), a.red_flags.clone()))
            .unwrap_or_default();

        Ok(TaskResult::new_with_status(
            screen(
                &context,
                STEP,
                "Review the differential diagnosis",
                json!({
                    "differentials": patient.differentials,
                    "insights": insights,
                    "red_flags": red_flags,
                }),
            )
            .await?,
            NextAction::WaitForInput,
            Some("Waiting for differential review".to_string()),
        ))
    }
}
