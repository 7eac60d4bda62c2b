// Wizard steps, in screen order
pub mod intake;
pub mod history;
pub mod examination;
pub mod differential_review;
pub mod test_ordering;
pub mod final_diagnosis;

// Shared modules
pub mod types;
pub mod utils;

pub use differential_review::DifferentialReviewTask;
pub use examination::ExaminationTask;
pub use final_diagnosis::FinalDiagnosisTask;
pub use history::HistoryTask;
pub use intake::IntakeTask;
pub use test_ordering::TestOrderingTask;

pub use types::session_keys;
