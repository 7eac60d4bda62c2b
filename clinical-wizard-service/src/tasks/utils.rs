use serde::de::DeserializeOwned;
use serde_json::Value;
use wizard_flow::{Context, GraphError, Result};

use super::types::{Screen, session_keys};
use crate::models::PatientData;

pub async fn load_patient(context: &Context) -> Result<PatientData> {
    context
        .get(session_keys::PATIENT)
        .await
        .ok_or_else(|| GraphError::ContextError("patient not found in context".to_string()))
}

pub async fn save_patient(context: &Context, patient: &PatientData) {
    context.set(session_keys::PATIENT, patient).await;
}

/// Take the pending input for this step out of the context.
///
/// `Ok(None)` when nothing was submitted; an error when the input does not
/// fit the step.
pub async fn take_input<T: DeserializeOwned>(context: &Context, step: &str) -> Result<Option<T>> {
    match context.remove(session_keys::STEP_INPUT).await {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GraphError::ContextError(format!("Invalid input for {step}: {e}"))),
    }
}

/// Serialize a screen for the task response and remember it as the last prompt
pub async fn screen(
    context: &Context,
    step: &str,
    message: impl Into<String>,
    data: Value,
) -> Result<Option<String>> {
    let screen = Screen {
        step: step.to_string(),
        message: message.into(),
        data,
    };
    context.set(session_keys::LAST_PROMPT, &screen).await;
    Ok(Some(serde_json::to_string(&screen)?))
}
