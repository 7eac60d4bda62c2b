//! Suggested tests, test tracking and differential re-ranking.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

use crate::error::{Result, WizardError};
use crate::models::{Confidence, Differential};
use crate::questions::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Laboratory,
    Imaging,
    Cardiac,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestPriority {
    Stat,
    Urgent,
    Routine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Ordered,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOrder {
    pub name: String,
    pub category: TestCategory,
    pub priority: TestPriority,
    pub status: TestStatus,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub completed: usize,
    pub ordered: usize,
    pub total: usize,
}

const TEST_CATEGORIES: &[(&str, TestCategory)] = &[
    ("Complete Blood Count", TestCategory::Laboratory),
    ("Basic Metabolic Panel", TestCategory::Laboratory),
    ("C-Reactive Protein", TestCategory::Laboratory),
    ("Blood Cultures", TestCategory::Laboratory),
    ("D-dimer", TestCategory::Laboratory),
    ("Lipase", TestCategory::Laboratory),
    ("Liver Function Tests", TestCategory::Laboratory),
    ("Urinalysis", TestCategory::Laboratory),
    ("Stool Occult Blood", TestCategory::Laboratory),
    ("Sputum Culture", TestCategory::Laboratory),
    ("Chest X-ray", TestCategory::Imaging),
    ("CT Pulmonary Angiogram", TestCategory::Imaging),
    ("CT Head", TestCategory::Imaging),
    ("MRI Brain", TestCategory::Imaging),
    ("Abdominal Ultrasound", TestCategory::Imaging),
    ("CT Abdomen", TestCategory::Imaging),
    ("ECG", TestCategory::Cardiac),
    ("Troponin", TestCategory::Cardiac),
    ("Echocardiogram", TestCategory::Cardiac),
    ("Stress Test", TestCategory::Cardiac),
];

const TEST_PRIORITIES: &[(&str, TestPriority)] = &[
    ("ECG", TestPriority::Stat),
    ("Troponin", TestPriority::Stat),
    ("CT Head", TestPriority::Stat),
    ("CT Pulmonary Angiogram", TestPriority::Stat),
    ("Chest X-ray", TestPriority::Urgent),
    ("D-dimer", TestPriority::Urgent),
    ("Blood Cultures", TestPriority::Urgent),
    ("Lipase", TestPriority::Urgent),
    ("Complete Blood Count", TestPriority::Urgent),
];

/// Exact-match lookup; unknown names are `Other`
pub fn test_category(name: &str) -> TestCategory {
    TEST_CATEGORIES
        .iter()
        .find(|(test, _)| *test == name)
        .map(|(_, category)| *category)
        .unwrap_or(TestCategory::Other)
}

/// Exact-match lookup; unknown names are `Routine`
pub fn test_priority(name: &str) -> TestPriority {
    TEST_PRIORITIES
        .iter()
        .find(|(test, _)| *test == name)
        .map(|(_, priority)| *priority)
        .unwrap_or(TestPriority::Routine)
}

fn differential(
    name: &str,
    icd10: &str,
    probability: f64,
    confidence: Confidence,
    reasoning: &str,
    tests: &[&str],
) -> Differential {
    Differential {
        name: name.to_string(),
        icd10: icd10.to_string(),
        probability,
        confidence,
        reasoning: reasoning.to_string(),
        suggested_tests: tests.iter().map(|t| t.to_string()).collect(),
    }
}

/// Hardcoded starting differential for each complaint category
pub fn initial_differentials(category: Category) -> Vec<Differential> {
    match category {
        Category::Cardiac => vec![
            differential(
                "Acute Coronary Syndrome",
                "I24.9",
                0.45,
                Confidence::Medium,
                "Chest pain with cardiac features",
                &["ECG", "Troponin", "Chest X-ray"],
            ),
            differential(
                "Stable Angina",
                "I20.9",
                0.25,
                Confidence::Medium,
                "Exertional chest discomfort",
                &["ECG", "Stress Test"],
            ),
            differential(
                "Gastroesophageal Reflux Disease",
                "K21.9",
                0.15,
                Confidence::Low,
                "Burning retrosternal pain",
                &["ECG"],
            ),
            differential(
                "Costochondritis",
                "M94.0",
                0.15,
                Confidence::Low,
                "Reproducible chest wall tenderness",
                &["Chest X-ray"],
            ),
        ],
        Category::Respiratory => vec![
            differential(
                "Acute Bronchitis",
                "J20.9",
                0.40,
                Confidence::Medium,
                "Cough without focal chest signs",
                &["Chest X-ray", "Complete Blood Count"],
            ),
            differential(
                "Community-Acquired Pneumonia",
                "J18.9",
                0.35,
                Confidence::Medium,
                "Cough with fever and sputum",
                &["Chest X-ray", "Complete Blood Count", "C-Reactive Protein", "Sputum Culture"],
            ),
            differential(
                "Asthma Exacerbation",
                "J45.901",
                0.15,
                Confidence::Low,
                "Wheeze and breathlessness",
                &["Chest X-ray"],
            ),
            differential(
                "Pulmonary Embolism",
                "I26.99",
                0.10,
                Confidence::Low,
                "Pleuritic pain or immobility",
                &["D-dimer", "CT Pulmonary Angiogram", "ECG"],
            ),
        ],
        Category::Neurological => vec![
            differential(
                "Migraine",
                "G43.909",
                0.45,
                Confidence::Medium,
                "Recurrent headache with visual features",
                &["Complete Blood Count"],
            ),
            differential(
                "Tension-Type Headache",
                "G44.209",
                0.30,
                Confidence::Medium,
                "Band-like headache without focal signs",
                &[],
            ),
            differential(
                "Subarachnoid Haemorrhage",
                "I60.9",
                0.15,
                Confidence::Low,
                "Sudden severe headache",
                &["CT Head"],
            ),
            differential(
                "Transient Ischaemic Attack",
                "G45.9",
                0.10,
                Confidence::Low,
                "Transient focal deficit",
                &["CT Head", "MRI Brain", "ECG"],
            ),
        ],
        Category::Gastrointestinal => vec![
            differential(
                "Gastroenteritis",
                "A09",
                0.40,
                Confidence::Medium,
                "Nausea, vomiting and diarrhoea",
                &["Basic Metabolic Panel", "Complete Blood Count"],
            ),
            differential(
                "Acute Cholecystitis",
                "K81.0",
                0.25,
                Confidence::Medium,
                "Right upper quadrant pain after meals",
                &["Abdominal Ultrasound", "Liver Function Tests", "Complete Blood Count"],
            ),
            differential(
                "Acute Pancreatitis",
                "K85.90",
                0.20,
                Confidence::Low,
                "Epigastric pain radiating to the back",
                &["Lipase", "Abdominal Ultrasound"],
            ),
            differential(
                "Appendicitis",
                "K35.80",
                0.15,
                Confidence::Low,
                "Right lower quadrant pain",
                &["Complete Blood Count", "CT Abdomen", "Urinalysis"],
            ),
        ],
        Category::General => vec![
            differential(
                "Viral Syndrome",
                "B34.9",
                0.50,
                Confidence::Medium,
                "Non-specific systemic symptoms",
                &["Complete Blood Count"],
            ),
            differential(
                "Anaemia",
                "D64.9",
                0.30,
                Confidence::Low,
                "Fatigue and pallor",
                &["Complete Blood Count"],
            ),
            differential(
                "Hypothyroidism",
                "E03.9",
                0.20,
                Confidence::Low,
                "Fatigue and weight change",
                &["Basic Metabolic Panel"],
            ),
        ],
    }
}

/// Every test suggested by any differential, deduplicated by exact name in
/// first-seen order.
pub fn suggest_tests(differentials: &[Differential]) -> Vec<TestOrder> {
    let mut seen = HashSet::new();
    differentials
        .iter()
        .flat_map(|d| d.suggested_tests.iter())
        .filter(|name| seen.insert(name.as_str()))
        .map(|name| TestOrder {
            name: name.clone(),
            category: test_category(name),
            priority: test_priority(name),
            status: TestStatus::Pending,
            result: None,
        })
        .collect()
}

/// Re-rank differentials after results come in.
///
/// Only a result whose test name contains "Chest X-ray" has any effect: every
/// pneumonia entry is set to 0.85 with high confidence. The list is then
/// sorted by probability, highest first, keeping the existing order for ties.
pub fn refine_differentials(differentials: &mut [Differential], results: &BTreeMap<String, String>) {
    let chest_xray = results.keys().any(|name| name.contains("Chest X-ray"));
    if chest_xray {
        for d in differentials
            .iter_mut()
            .filter(|d| d.name.to_lowercase().contains("pneumonia"))
        {
            info!(diagnosis = %d.name, "Chest X-ray result raises pneumonia probability");
            d.probability = 0.85;
            d.confidence = Confidence::High;
        }
    }
    differentials.sort_by(|a, b| b.probability.total_cmp(&a.probability));
}

/// Order/complete bookkeeping for the test ordering screen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestTracker {
    tests: Vec<TestOrder>,
}

impl TestTracker {
    pub fn new(tests: Vec<TestOrder>) -> Self {
        Self { tests }
    }

    pub fn from_differentials(differentials: &[Differential]) -> Self {
        Self::new(suggest_tests(differentials))
    }

    pub fn tests(&self) -> &[TestOrder] {
        &self.tests
    }

    /// Add a test that no differential suggested. Existing names are left alone.
    pub fn add(&mut self, name: &str) {
        if self.tests.iter().all(|t| t.name != name) {
            self.tests.push(TestOrder {
                name: name.to_string(),
                category: test_category(name),
                priority: test_priority(name),
                status: TestStatus::Pending,
                result: None,
            });
        }
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut TestOrder> {
        self.tests
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| WizardError::UnknownTest(name.to_string()))
    }

    /// `pending → ordered`. Ordering an already ordered test is a no-op.
    pub fn order(&mut self, name: &str) -> Result<&TestOrder> {
        let test = self.find_mut(name)?;
        match test.status {
            TestStatus::Pending => test.status = TestStatus::Ordered,
            TestStatus::Ordered => {}
            TestStatus::Completed => {
                return Err(WizardError::InvalidTestTransition {
                    test: name.to_string(),
                    from: TestStatus::Completed,
                    to: TestStatus::Ordered,
                });
            }
        }
        Ok(&*test)
    }

    /// `ordered → completed`, recording the result value.
    pub fn complete(&mut self, name: &str, result: &str) -> Result<&TestOrder> {
        if result.trim().is_empty() {
            return Err(WizardError::MissingResult(name.to_string()));
        }
        let test = self.find_mut(name)?;
        if test.status != TestStatus::Ordered {
            return Err(WizardError::InvalidTestTransition {
                test: name.to_string(),
                from: test.status,
                to: TestStatus::Completed,
            });
        }
        test.status = TestStatus::Completed;
        test.result = Some(result.to_string());
        Ok(&*test)
    }

    /// Results of completed tests keyed by test name
    pub fn results(&self) -> BTreeMap<String, String> {
        self.tests
            .iter()
            .filter_map(|t| t.result.clone().map(|r| (t.name.clone(), r)))
            .collect()
    }

    pub fn summary(&self) -> TestSummary {
        TestSummary {
            completed: self
                .tests
                .iter()
                .filter(|t| t.status == TestStatus::Completed)
                .count(),
            ordered: self
                .tests
                .iter()
                .filter(|t| t.status == TestStatus::Ordered)
                .count(),
            total: self.tests.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggested_tests_are_deduplicated_in_first_seen_order() {
        let tests = suggest_tests(&initial_differentials(Category::Respiratory));
        let names: Vec<_> = tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Chest X-ray",
                "Complete Blood Count",
                "C-Reactive Protein",
                "Sputum Culture",
                "D-dimer",
                "CT Pulmonary Angiogram",
                "ECG",
            ]
        );
        assert!(tests.iter().all(|t| t.status == TestStatus::Pending));
    }

    #[test]
    fn category_and_priority_use_exact_names() {
        assert_eq!(test_category("Chest X-ray"), TestCategory::Imaging);
        assert_eq!(test_category("chest x-ray"), TestCategory::Other);
        assert_eq!(test_priority("ECG"), TestPriority::Stat);
        assert_eq!(test_priority("Urinalysis"), TestPriority::Routine);
    }

    #[test]
    fn order_then_complete_updates_summary() {
        let mut tracker = TestTracker::from_differentials(&initial_differentials(Category::Cardiac));
        let total = tracker.summary().total;
        assert_eq!(tracker.tests()[0].status, TestStatus::Pending);

        assert_eq!(tracker.order("ECG").unwrap().status, TestStatus::Ordered);
        assert_eq!(tracker.summary().completed, 0);

        let test = tracker.complete("ECG", "ST elevation in V2-V4").unwrap();
        assert_eq!(test.status, TestStatus::Completed);
        assert_eq!(test.result.as_deref(), Some("ST elevation in V2-V4"));
        assert_eq!(
            tracker.summary(),
            TestSummary {
                completed: 1,
                ordered: 0,
                total
            }
        );
    }

    #[test]
    fn completing_requires_order_and_result() {
        let mut tracker = TestTracker::from_differentials(&initial_differentials(Category::Cardiac));
        assert!(matches!(
            tracker.complete("ECG", "normal"),
            Err(WizardError::InvalidTestTransition { from: TestStatus::Pending, .. })
        ));
        tracker.order("ECG").unwrap();
        assert!(matches!(
            tracker.complete("ECG", "  "),
            Err(WizardError::MissingResult(_))
        ));
        assert!(matches!(
            tracker.order("Unknown scan"),
            Err(WizardError::UnknownTest(_))
        ));
    }

    #[test]
    fn chest_xray_result_promotes_pneumonia() {
        let mut differentials = initial_differentials(Category::Respiratory);
        assert_ne!(differentials[0].name, "Community-Acquired Pneumonia");

        let mut results = BTreeMap::new();
        results.insert("Chest X-ray".to_string(), "right lower lobe consolidation".to_string());
        refine_differentials(&mut differentials, &results);

        assert_eq!(differentials[0].name, "Community-Acquired Pneumonia");
        assert_eq!(differentials[0].probability, 0.85);
        assert_eq!(differentials[0].confidence, Confidence::High);
    }

    #[test]
    fn other_results_are_ignored() {
        let mut differentials = initial_differentials(Category::Respiratory);
        let before = differentials.clone();

        let mut results = BTreeMap::new();
        results.insert("C-Reactive Protein".to_string(), "180 mg/L".to_string());
        refine_differentials(&mut differentials, &results);

        assert_eq!(differentials, before);
    }
}
