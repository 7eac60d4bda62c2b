use crate::models::PatientData;
use crate::questions::QuestionGenerator;
use crate::tasks::*;
use std::sync::Arc;
use uuid::Uuid;
use wizard_flow::{FlowRunner, Graph, GraphBuilder, Session, SessionStorage, Task};

pub const GRAPH_ID: &str = "clinical_wizard";

/// intake → history → examination → differential review → test ordering → final diagnosis
pub fn build_clinical_workflow(generator: QuestionGenerator) -> Graph {
    let intake = Arc::new(IntakeTask);
    let intake_id = intake.id().to_string();

    let history = Arc::new(HistoryTask::new(generator));
    let history_id = history.id().to_string();

    let examination = Arc::new(ExaminationTask);
    let examination_id = examination.id().to_string();

    let review = Arc::new(DifferentialReviewTask);
    let review_id = review.id().to_string();

    let test_ordering = Arc::new(TestOrderingTask);
    let test_ordering_id = test_ordering.id().to_string();

    let final_diagnosis = Arc::new(FinalDiagnosisTask);
    let final_diagnosis_id = final_diagnosis.id().to_string();

    GraphBuilder::new(GRAPH_ID)
        .add_task(intake)
        .add_task(history)
        .add_task(examination)
        .add_task(review)
        .add_task(test_ordering)
        .add_task(final_diagnosis)
        .add_edge(&intake_id, &history_id)
        .add_edge(&history_id, &examination_id)
        .add_edge(&examination_id, &review_id)
        .add_edge(&review_id, &test_ordering_id)
        .add_edge(&test_ordering_id, &final_diagnosis_id)
        .build()
}

/// New session parked on the intake step with an empty patient record
pub async fn create_wizard_session(patient_id: Option<String>) -> Session {
    let patient_id = patient_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let session = Session::new_from_task(Uuid::new_v4().to_string(), intake::STEP)
        .with_graph_id(GRAPH_ID);
    session
        .context
        .set(session_keys::PATIENT, PatientData::new(patient_id))
        .await;
    session
}

pub fn create_flow_runner(
    session_storage: Arc<dyn SessionStorage>,
    generator: QuestionGenerator,
) -> FlowRunner {
    let graph = Arc::new(build_clinical_workflow(generator));
    FlowRunner::new(graph, session_storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinement::TestStatus;
    use crate::tasks::types::Screen;
    use serde_json::{Value, json};
    use wizard_flow::{ExecutionStatus, InMemorySessionStorage};

    struct Harness {
        runner: FlowRunner,
        storage: Arc<dyn SessionStorage>,
        session_id: String,
    }

    impl Harness {
        async fn new() -> Self {
            let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
            let runner = create_flow_runner(storage.clone(), QuestionGenerator::default());
            let session = create_wizard_session(Some("patient-1".to_string())).await;
            let session_id = session.id.clone();
            storage.save(session).await.unwrap();
            Self {
                runner,
                storage,
                session_id,
            }
        }

        async fn submit(&self, input: Value) -> (ExecutionStatus, Option<Screen>) {
            let session = self.storage.get(&self.session_id).await.unwrap().unwrap();
            session.context.set(session_keys::STEP_INPUT, input).await;
            self.storage.save(session).await.unwrap();
            let result = self.runner.run(&self.session_id).await.unwrap();
            let screen = result
                .response
                .map(|r| serde_json::from_str::<Screen>(&r).unwrap());
            (result.status, screen)
        }

        async fn session(&self) -> Session {
            self.storage.get(&self.session_id).await.unwrap().unwrap()
        }

        async fn patient(&self) -> PatientData {
            self.session()
                .await
                .context
                .get(session_keys::PATIENT)
                .await
                .unwrap()
        }
    }

    #[test]
    fn steps_are_in_screen_order() {
        let graph = build_clinical_workflow(QuestionGenerator::default());
        assert_eq!(
            graph.task_ids(),
            &[
                "intake",
                "history",
                "examination",
                "differential_review",
                "test_ordering",
                "final_diagnosis"
            ]
        );
    }

    #[tokio::test]
    async fn intake_waits_for_required_fields() {
        let h = Harness::new().await;
        let (status, screen) = h.submit(json!({ "chief_complaint": "cough" })).await;
        assert_eq!(status, ExecutionStatus::WaitingForInput);
        assert_eq!(screen.unwrap().data["missing"], json!(["demographics.name"]));
        assert_eq!(h.session().await.current_task_id, "intake");
    }

    #[tokio::test]
    async fn intake_runs_straight_into_first_question() {
        let h = Harness::new().await;
        let (_, screen) = h
            .submit(json!({
                "demographics": { "name": "Sam Rivera", "age": 47 },
                "chief_complaint": "Productive cough for a week"
            }))
            .await;
        let screen = screen.unwrap();
        assert_eq!(screen.step, "history");
        assert_eq!(screen.data["question"]["id"], "resp_cough_type");
        assert_eq!(h.session().await.current_task_id, "history");
    }

    #[tokio::test]
    async fn back_from_history_returns_to_intake() {
        let h = Harness::new().await;
        h.submit(json!({
            "demographics": { "name": "Sam Rivera" },
            "chief_complaint": "cough"
        }))
        .await;

        let session = h.runner.back(&h.session_id).await.unwrap();
        assert_eq!(session.current_task_id, "intake");
        let session = h.runner.back(&h.session_id).await.unwrap();
        assert_eq!(session.current_task_id, "intake");
    }

    #[tokio::test]
    async fn full_respiratory_walkthrough() {
        let h = Harness::new().await;
        h.submit(json!({
            "demographics": { "name": "Sam Rivera", "age": 47 },
            "chief_complaint": "cough"
        }))
        .await;

        h.submit(json!({ "answer": "green sputum" })).await;
        let (_, screen) = h
            .submit(json!({ "answer": "patient reports fever and night sweats for two weeks" }))
            .await;
        assert_eq!(screen.unwrap().data["question"]["id"], "resp_dyspnea");

        let (_, screen) = h.submit(json!({ "finish": true })).await;
        let screen = screen.unwrap();
        assert_eq!(screen.message, "Assessment complete");
        assert_eq!(
            screen.data["analysis"]["red_flags"][0]["id"],
            "fever_night_sweats"
        );
        assert_eq!(h.session().await.current_task_id, "examination");

        let (_, screen) = h
            .submit(json!({ "physical_exam": { "respiratory": "crackles right base" } }))
            .await;
        assert_eq!(screen.unwrap().step, "differential_review");

        let (_, screen) = h.submit(json!({ "accept": true })).await;
        let screen = screen.unwrap();
        assert_eq!(screen.step, "test_ordering");
        assert_eq!(screen.data["summary"]["total"], 7);

        let (_, screen) = h
            .submit(json!({ "actions": [{ "test": "Chest X-ray", "action": "order" }] }))
            .await;
        assert_eq!(screen.unwrap().data["summary"]["completed"], 0);

        let (_, screen) = h
            .submit(json!({ "actions": [{
                "test": "Chest X-ray",
                "action": "complete",
                "result": "right lower lobe consolidation"
            }] }))
            .await;
        let screen = screen.unwrap();
        assert_eq!(screen.message, "1/7 tests completed");
        assert_eq!(screen.data["differentials"][0]["name"], "Community-Acquired Pneumonia");
        assert_eq!(screen.data["differentials"][0]["probability"], 0.85);

        let patient = h.patient().await;
        let xray = patient
            .ordered_tests
            .iter()
            .find(|t| t.name == "Chest X-ray")
            .unwrap();
        assert_eq!(xray.status, TestStatus::Completed);

        let (_, screen) = h.submit(json!({ "done": true })).await;
        let screen = screen.unwrap();
        assert_eq!(screen.step, "final_diagnosis");
        assert_eq!(screen.data["suggested"], "Community-Acquired Pneumonia");

        let (status, screen) = h
            .submit(json!({
                "final_diagnosis": "Community-Acquired Pneumonia",
                "prescriptions": [{
                    "medication": "Amoxicillin",
                    "dosage": "1 g",
                    "frequency": "three times daily",
                    "duration": "5 days"
                }]
            }))
            .await;
        assert_eq!(status, ExecutionStatus::Completed);
        assert_eq!(screen.unwrap().data["tests_completed"], 1);

        let patient = h.patient().await;
        assert_eq!(patient.final_diagnosis.as_deref(), Some("Community-Acquired Pneumonia"));
        assert_eq!(patient.prescriptions.len(), 1);
        assert_eq!(patient.question_history.len(), 2);
    }

    #[tokio::test]
    async fn changed_complaint_category_reseeds_differentials() {
        let h = Harness::new().await;
        h.submit(json!({ "demographics": { "name": "A" }, "chief_complaint": "cough" }))
            .await;
        h.submit(json!({ "answer": "green sputum" })).await;
        h.submit(json!({ "finish": true })).await;
        let (_, screen) = h
            .submit(json!({ "physical_exam": { "general": "well" } }))
            .await;
        assert_eq!(screen.unwrap().data["differentials"][0]["name"], "Acute Bronchitis");

        for _ in 0..3 {
            h.runner.back(&h.session_id).await.unwrap();
        }
        assert_eq!(h.session().await.current_task_id, "intake");

        let (_, screen) = h
            .submit(json!({ "chief_complaint": "heartburn after meals" }))
            .await;
        assert_eq!(screen.unwrap().data["question"]["id"], "gi_location");
        assert!(h.patient().await.question_history.is_empty());

        h.submit(json!({ "finish": true })).await;
        let (_, screen) = h
            .submit(json!({ "physical_exam": { "abdominal": "epigastric tenderness" } }))
            .await;
        let screen = screen.unwrap();
        assert_eq!(screen.step, "differential_review");
        assert_eq!(screen.data["differentials"][0]["name"], "Gastroenteritis");
    }

    #[tokio::test]
    async fn answer_without_open_question_is_reported() {
        let h = Harness::new().await;
        h.submit(json!({ "demographics": { "name": "A" }, "chief_complaint": "cough" }))
            .await;
        h.submit(json!({ "finish": true })).await;
        let session = h.runner.back(&h.session_id).await.unwrap();
        assert_eq!(session.current_task_id, "history");

        let (_, screen) = h.submit(json!({ "answer": "late answer" })).await;
        let screen = screen.unwrap();
        assert_eq!(screen.step, "history");
        assert_eq!(screen.data["problems"].as_array().unwrap().len(), 1);
        assert!(h.patient().await.question_history.is_empty());
    }

    #[tokio::test]
    async fn rejected_test_action_is_reported() {
        let h = Harness::new().await;
        h.submit(json!({ "demographics": { "name": "A" }, "chief_complaint": "cough" }))
            .await;
        h.submit(json!({ "finish": true })).await;
        h.submit(json!({ "physical_exam": { "general": "well" } })).await;
        h.submit(json!({ "accept": true })).await;

        let (_, screen) = h
            .submit(json!({
                "actions": [{ "test": "ECG", "action": "complete", "result": "normal" }],
                "done": true
            }))
            .await;
        let screen = screen.unwrap();
        assert_eq!(screen.step, "test_ordering");
        assert_eq!(screen.data["problems"].as_array().unwrap().len(), 1);
    }
}
