pub mod config;
pub mod error;
pub mod insights;
pub mod models;
pub mod notes;
pub mod questions;
pub mod refinement;
pub mod service;
pub mod tasks;
pub mod workflow;

pub use config::{LogFormat, ServiceConfig};
pub use error::{Result, WizardError};
pub use service::{AppState, build_router, create_app};
pub use workflow::{build_clinical_workflow, create_flow_runner, create_wizard_session};
pub use models::*;
