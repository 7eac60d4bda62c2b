use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};
use wizard_flow::{Context, NextAction, Result, Task, TaskResult};

use super::types::{TestActionKind, TestOrderingInput, session_keys};
use super::utils::{load_patient, save_patient, screen, take_input};
use crate::refinement::{TestTracker, refine_differentials, suggest_tests};

pub const STEP: &str = "test_ordering";

/// Order tests, enter results, and watch the differential re-rank.
///
/// Rejected actions (unknown test, completing before ordering, empty result)
/// are reported back on the screen; the other actions in the same submission
/// still apply.
pub struct TestOrderingTask;

#[async_trait]
impl Task for TestOrderingTask {
    fn id(&self) -> &str {
        STEP
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut patient = load_patient(&context).await?;
        let mut tracker: TestTracker = context
            .get(session_keys::TEST_TRACKER)
            .await
            .unwrap_or_else(|| TestTracker::from_differentials(&patient.differentials));
        // Differentials may have changed since the last visit
        for suggested in suggest_tests(&patient.differentials) {
            tracker.add(&suggested.name);
        }
        let mut problems = Vec::new();
        let mut done = false;

        if let Some(input) = take_input::<TestOrderingInput>(&context, STEP).await? {
            for name in &input.add {
                tracker.add(name);
            }
            for action in &input.actions {
                let outcome = match action.action {
                    TestActionKind::Order => tracker.order(&action.test).map(|_| ()),
                    TestActionKind::Complete => tracker
                        .complete(&action.test, action.result.as_deref().unwrap_or(""))
                        .map(|_| ()),
                };
                if let Err(e) = outcome {
                    warn!(test = %action.test, error = %e, "Test action rejected");
                    problems.push(e.to_string());
                }
            }
            done = input.done;
        }

        patient.test_results = tracker.results();
        refine_differentials(&mut patient.differentials, &patient.test_results);
        patient.ordered_tests = tracker.tests().to_vec();
        let summary = tracker.summary();
        context.set(session_keys::TEST_TRACKER, &tracker).await;
        save_patient(&context, &patient).await;

        if done && problems.is_empty() {
            info!(
                patient_id = %patient.id,
                completed = summary.completed,
                total = summary.total,
                "Test ordering finished"
            );
            return Ok(TaskResult::new_with_status(
                None,
                NextAction::ContinueAndExecute,
                Some(format!("{}/{} tests completed", summary.completed, summary.total)),
            ));
        }

        Ok(TaskResult::new_with_status(
            screen(
                &context,
                STEP,
                format!("{}/{} tests completed", summary.completed, summary.total),
                json!({
                    "tests": tracker.tests(),
                    "summary": summary,
                    "differentials": patient.differentials,
                    "problems": problems,
                }),
            )
            .await?,
            NextAction::WaitForInput,
            Some("Waiting for test orders and results".to_string()),
        ))
    }
}
