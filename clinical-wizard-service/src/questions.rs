//! Keyword-driven history questions.
//!
//! The complaint picks a category from a fixed trigger table; questions then
//! come from that category's bank followed by the general bank, skipping any
//! id already in the history. Nothing here is learned or scored.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::models::QuestionHistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cardiac,
    Respiratory,
    Neurological,
    Gastrointestinal,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cardiac => "cardiac",
            Category::Respiratory => "respiratory",
            Category::Neurological => "neurological",
            Category::Gastrointestinal => "gastrointestinal",
            Category::General => "general",
        }
    }
}

/// Trigger table, checked in this order. First hit wins.
const CATEGORY_TRIGGERS: &[(Category, &[&str])] = &[
    (
        Category::Cardiac,
        &[
            "chest pain",
            "chest tightness",
            "palpitation",
            "heart racing",
            "heart pain",
            "cardiac",
            "angina",
        ],
    ),
    (
        Category::Respiratory,
        &["cough", "shortness of breath", "breathing", "wheez", "sputum", "dyspnea"],
    ),
    (
        Category::Neurological,
        &["headache", "dizz", "numb", "seizure", "weakness", "vision", "faint"],
    ),
    (
        Category::Gastrointestinal,
        &["abdominal", "stomach", "nausea", "vomit", "diarrh", "constipation", "heartburn"],
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    FreeText,
    YesNo,
    Choice { options: Vec<String> },
    Scale { min: u8, max: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    pub category: Category,
    pub rationale: String,
}

struct QuestionTemplate {
    id: &'static str,
    text: &'static str,
    kind: Kind,
    rationale: &'static str,
}

enum Kind {
    FreeText,
    YesNo,
    Choice(&'static [&'static str]),
    Scale(u8, u8),
}

impl QuestionTemplate {
    fn to_question(&self, category: Category) -> Question {
        let kind = match self.kind {
            Kind::FreeText => QuestionKind::FreeText,
            Kind::YesNo => QuestionKind::YesNo,
            Kind::Choice(options) => QuestionKind::Choice {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
            Kind::Scale(min, max) => QuestionKind::Scale { min, max },
        };
        Question {
            id: self.id.to_string(),
            text: self.text.to_string(),
            kind,
            category,
            rationale: self.rationale.to_string(),
        }
    }
}

const CARDIAC_BANK: &[QuestionTemplate] = &[
    QuestionTemplate {
        id: "cardiac_character",
        text: "How would you describe the chest discomfort (pressure, sharp, burning, tearing)?",
        kind: Kind::Choice(&["pressure", "sharp", "burning", "tearing", "other"]),
        rationale: "Character of pain separates ischemic from pleuritic or aortic causes",
    },
    QuestionTemplate {
        id: "cardiac_radiation",
        text: "Does the pain spread to your arm, jaw, neck or back?",
        kind: Kind::FreeText,
        rationale: "Radiation raises suspicion of acute coronary syndrome",
    },
    QuestionTemplate {
        id: "cardiac_exertion",
        text: "Is the pain brought on by exertion and relieved by rest?",
        kind: Kind::YesNo,
        rationale: "Exertional pattern suggests stable angina",
    },
    QuestionTemplate {
        id: "cardiac_associated",
        text: "Have you had sweating, nausea or shortness of breath with the pain?",
        kind: Kind::FreeText,
        rationale: "Associated autonomic symptoms increase cardiac likelihood",
    },
    QuestionTemplate {
        id: "cardiac_risk_factors",
        text: "Do you have high blood pressure, diabetes, high cholesterol, or do you smoke?",
        kind: Kind::FreeText,
        rationale: "Cardiovascular risk factor screen",
    },
];

const RESPIRATORY_BANK: &[QuestionTemplate] = &[
    QuestionTemplate {
        id: "resp_cough_type",
        text: "Is the cough dry or are you bringing up sputum? What colour is it?",
        kind: Kind::FreeText,
        rationale: "Productive coloured sputum points towards bacterial infection",
    },
    QuestionTemplate {
        id: "resp_fever",
        text: "Have you had fever, chills or night sweats?",
        kind: Kind::FreeText,
        rationale: "Systemic features suggest infection",
    },
    QuestionTemplate {
        id: "resp_dyspnea",
        text: "Are you short of breath, and if so at rest or only on exertion?",
        kind: Kind::FreeText,
        rationale: "Breathlessness at rest is a severity marker",
    },
    QuestionTemplate {
        id: "resp_pleuritic",
        text: "Does it hurt when you take a deep breath?",
        kind: Kind::YesNo,
        rationale: "Pleuritic pain suggests pneumonia, pleurisy or pulmonary embolism",
    },
    QuestionTemplate {
        id: "resp_exposures",
        text: "Any recent travel, sick contacts, or long periods of immobility?",
        kind: Kind::FreeText,
        rationale: "Exposure and thromboembolic risk screen",
    },
];

const NEUROLOGICAL_BANK: &[QuestionTemplate] = &[
    QuestionTemplate {
        id: "neuro_onset_speed",
        text: "Did the symptom start suddenly (seconds to minutes) or gradually?",
        kind: Kind::Choice(&["sudden", "gradual"]),
        rationale: "Thunderclap onset needs urgent exclusion of haemorrhage",
    },
    QuestionTemplate {
        id: "neuro_worst",
        text: "Is this the worst headache or symptom you have ever had?",
        kind: Kind::FreeText,
        rationale: "Worst-ever headache is a red flag for subarachnoid haemorrhage",
    },
    QuestionTemplate {
        id: "neuro_focal",
        text: "Any weakness on one side, facial droop, or slurred speech?",
        kind: Kind::FreeText,
        rationale: "Focal deficits suggest stroke",
    },
    QuestionTemplate {
        id: "neuro_visual",
        text: "Have you noticed changes in your vision?",
        kind: Kind::YesNo,
        rationale: "Visual disturbance may indicate migraine aura or raised pressure",
    },
];

const GASTROINTESTINAL_BANK: &[QuestionTemplate] = &[
    QuestionTemplate {
        id: "gi_location",
        text: "Where exactly is the pain located?",
        kind: Kind::Choice(&[
            "upper right",
            "upper middle",
            "upper left",
            "lower right",
            "lower left",
            "all over",
        ]),
        rationale: "Location narrows the organ system involved",
    },
    QuestionTemplate {
        id: "gi_bowel",
        text: "Any change in bowel habit, or blood in your stool?",
        kind: Kind::FreeText,
        rationale: "Blood in stool suggests gastrointestinal bleeding",
    },
    QuestionTemplate {
        id: "gi_vomiting",
        text: "Have you been vomiting? Is there any blood in it?",
        kind: Kind::FreeText,
        rationale: "Haematemesis and dehydration screen",
    },
    QuestionTemplate {
        id: "gi_food",
        text: "Is the pain related to eating?",
        kind: Kind::YesNo,
        rationale: "Meal relation suggests biliary or peptic causes",
    },
];

const GENERAL_BANK: &[QuestionTemplate] = &[
    QuestionTemplate {
        id: "onset",
        text: "When did your symptoms start?",
        kind: Kind::FreeText,
        rationale: "Timeline of the presenting complaint",
    },
    QuestionTemplate {
        id: "severity",
        text: "On a scale of 1 to 10, how severe are your symptoms?",
        kind: Kind::Scale(1, 10),
        rationale: "Baseline severity",
    },
    QuestionTemplate {
        id: "associated_symptoms",
        text: "Have you noticed any other symptoms, such as fever, weight loss or fatigue?",
        kind: Kind::FreeText,
        rationale: "Systemic review",
    },
    QuestionTemplate {
        id: "current_medications",
        text: "What medications are you currently taking?",
        kind: Kind::FreeText,
        rationale: "Medication reconciliation",
    },
    QuestionTemplate {
        id: "allergies",
        text: "Do you have any allergies to medications?",
        kind: Kind::FreeText,
        rationale: "Prescribing safety",
    },
    QuestionTemplate {
        id: "social_history",
        text: "Do you smoke, drink alcohol, or use any other substances?",
        kind: Kind::FreeText,
        rationale: "Lifestyle risk factors",
    },
];

/// Focus keyword → question id. Checked in order against the lower-cased focus.
const FOCUS_OVERRIDES: &[(&str, &str)] = &[
    ("onset", "onset"),
    ("timing", "onset"),
    ("severity", "severity"),
    ("pain scale", "severity"),
    ("radiation", "cardiac_radiation"),
    ("exertion", "cardiac_exertion"),
    ("risk", "cardiac_risk_factors"),
    ("sputum", "resp_cough_type"),
    ("fever", "resp_fever"),
    ("breath", "resp_dyspnea"),
    ("travel", "resp_exposures"),
    ("stroke", "neuro_focal"),
    ("vision", "neuro_visual"),
    ("bleeding", "gi_bowel"),
    ("stool", "gi_bowel"),
    ("medication", "current_medications"),
    ("allerg", "allergies"),
    ("smok", "social_history"),
    ("alcohol", "social_history"),
];

fn bank_for(category: Category) -> &'static [QuestionTemplate] {
    match category {
        Category::Cardiac => CARDIAC_BANK,
        Category::Respiratory => RESPIRATORY_BANK,
        Category::Neurological => NEUROLOGICAL_BANK,
        Category::Gastrointestinal => GASTROINTESTINAL_BANK,
        Category::General => &[],
    }
}

/// Pick the category for a complaint: the first table entry whose trigger
/// occurs in the lower-cased complaint, otherwise `General`.
pub fn categorize(complaint: &str) -> Category {
    let complaint = complaint.to_lowercase();
    CATEGORY_TRIGGERS
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| complaint.contains(t)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::General)
}

/// Every question in the order it would be asked for this category
pub fn progression(category: Category) -> Vec<Question> {
    bank_for(category)
        .iter()
        .map(|t| t.to_question(category))
        .chain(GENERAL_BANK.iter().map(|t| t.to_question(Category::General)))
        .collect()
}

/// Look up any known question by id, tagged with the category it belongs to
pub fn find_question(id: &str) -> Option<Question> {
    [
        Category::Cardiac,
        Category::Respiratory,
        Category::Neurological,
        Category::Gastrointestinal,
    ]
    .into_iter()
    .find_map(|category| {
        bank_for(category)
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.to_question(category))
    })
    .or_else(|| {
        GENERAL_BANK
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.to_question(Category::General))
    })
}

/// Next unasked question, or `None` when the assessment is complete.
///
/// A `focus` matching the override table wins over the progression as long as
/// its question has not been asked yet.
pub fn next_question(
    complaint: &str,
    history: &[QuestionHistoryEntry],
    focus: Option<&str>,
) -> Option<Question> {
    let asked = |id: &str| history.iter().any(|entry| entry.id == id);

    if let Some(focus) = focus {
        let focus = focus.to_lowercase();
        let focused = FOCUS_OVERRIDES
            .iter()
            .filter(|(keyword, _)| focus.contains(keyword))
            .map(|(_, id)| *id)
            .find(|id| !asked(id))
            .and_then(find_question);
        if let Some(question) = focused {
            debug!(question_id = %question.id, "Focus override selected question");
            return Some(question);
        }
    }

    let category = categorize(complaint);
    progression(category).into_iter().find(|q| !asked(&q.id))
}

/// Wraps the lookup with a fixed artificial delay before answering.
#[derive(Debug, Clone, Default)]
pub struct QuestionGenerator {
    delay: Duration,
}

impl QuestionGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn generate(
        &self,
        complaint: &str,
        history: &[QuestionHistoryEntry],
        focus: Option<&str>,
    ) -> Option<Question> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        next_question(complaint, history, focus)
    }
}
