use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};
use wizard_flow::{Context, NextAction, Result, Task, TaskResult};

use super::types::{HistoryInput, session_keys};
use super::utils::{load_patient, save_patient, screen, take_input};
use crate::insights;
use crate::models::{PatientData, QuestionHistoryEntry};
use crate::questions::{Question, QuestionGenerator};

pub const STEP: &str = "history";

/// Question-by-question history taking.
///
/// Each submission answers (or skips) the question on screen, then the
/// generator picks the next one. When it runs out, or the user finishes
/// early, the answers are analysed and the wizard moves to the exam.
pub struct HistoryTask {
    generator: QuestionGenerator,
}

impl HistoryTask {
    pub fn new(generator: QuestionGenerator) -> Self {
        Self { generator }
    }
}

fn apply_free_text(patient: &mut PatientData, input: &mut HistoryInput) {
    let fields = [
        (&mut patient.history_of_present_illness, input.history_of_present_illness.take()),
        (&mut patient.past_medical_history, input.past_medical_history.take()),
        (&mut patient.medications, input.medications.take()),
        (&mut patient.allergies, input.allergies.take()),
        (&mut patient.social_history, input.social_history.take()),
        (&mut patient.family_history, input.family_history.take()),
        (&mut patient.review_of_systems, input.review_of_systems.take()),
    ];
    for (field, value) in fields {
        if value.is_some() {
            *field = value;
        }
    }
}

#[async_trait]
impl Task for HistoryTask {
    fn id(&self) -> &str {
        STEP
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut patient = load_patient(&context).await?;
        let current: Option<Question> = context.get(session_keys::CURRENT_QUESTION).await;
        let mut focus = None;
        let mut finish = false;
        let mut problems = Vec::new();

        if let Some(mut input) = take_input::<HistoryInput>(&context, STEP).await? {
            apply_free_text(&mut patient, &mut input);

            if input.skip || input.answer.is_some() {
                match &current {
                    Some(question) => patient.question_history.push(QuestionHistoryEntry {
                        id: question.id.clone(),
                        question: question.text.clone(),
                        answer: if input.skip { None } else { input.answer.take() },
                        skipped: input.skip,
                        skip_context: input.skip_context.take(),
                    }),
                    None => {
                        warn!(patient_id = %patient.id, "Answer submitted with no question on screen");
                        problems.push("No question is awaiting an answer; the answer was not recorded".to_string());
                    }
                }
            }
            focus = input.focus.take();
            finish = input.finish;
        } else if let Some(question) = current {
            // Nothing submitted: show the same question again
            return Ok(TaskResult::new_with_status(
                screen(&context, STEP, question.text.clone(), json!({ "question": question })).await?,
                NextAction::WaitForInput,
                Some("Waiting for an answer".to_string()),
            ));
        }

        let next = if finish {
            None
        } else {
            self.generator
                .generate(&patient.chief_complaint, &patient.question_history, focus.as_deref())
                .await
        };

        match next {
            Some(question) => {
                context.set(session_keys::CURRENT_QUESTION, &question).await;
                save_patient(&context, &patient).await;
                let asked = patient.question_history.len();
                Ok(TaskResult::new_with_status(
                    screen(
                        &context,
                        STEP,
                        question.text.clone(),
                        json!({ "question": question, "asked": asked, "problems": problems }),
                    )
                    .await?,
                    NextAction::WaitForInput,
                    Some(format!("Question {} of the {} history", asked + 1, question.category.as_str())),
                ))
            }
            None => {
                context.remove(session_keys::CURRENT_QUESTION).await;
                let analysis =
                    insights::analyze(&patient.chief_complaint, &patient.answers(), &patient);
                info!(
                    patient_id = %patient.id,
                    questions = patient.question_history.len(),
                    red_flags = analysis.red_flags.len(),
                    "History assessment complete"
                );
                let response = screen(
                    &context,
                    STEP,
                    "Assessment complete",
                    json!({ "analysis": analysis, "problems": problems }),
                )
                .await?;
                patient.analysis = Some(analysis);
                save_patient(&context, &patient).await;

                Ok(TaskResult::new_with_status(
                    response,
                    NextAction::Continue,
                    Some("History complete, proceed to examination".to_string()),
                ))
            }
        }
    }
}
