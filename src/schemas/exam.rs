use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// A single multiple-choice question. Scoring matches `answer` against
/// option text byte for byte, so the authoring side keeps both identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub question_image: Option<String>,
    #[serde(default)]
    pub explanation_image: Option<String>,
}

/// The question set and metadata a session runs against. Built once per
/// session by the loader and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamPayload {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(
        rename = "duration",
        alias = "duration_minutes",
        default = "default_duration",
        deserialize_with = "deserialize_duration_flexible"
    )]
    pub duration_minutes: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// An exam row as the record store returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredExam {
    pub id: String,
    pub teacher_id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(
        default = "default_duration",
        deserialize_with = "deserialize_duration_flexible"
    )]
    pub duration_minutes: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Insert shape for a freshly authored exam; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewExam {
    pub title: String,
    pub duration_minutes: u32,
    pub questions: Vec<Question>,
    pub teacher_id: String,
}

fn default_title() -> String {
    "Exam".to_string()
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

// Authored payloads carry the duration as a number, but hand-edited preview
// links and older rows send strings or nothing at all. Anything that is not
// a positive integer falls back to the default.
fn deserialize_duration_flexible<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let parsed = match Raw::deserialize(deserializer)? {
        Raw::Number(value) => u32::try_from(value).ok().filter(|minutes| *minutes > 0),
        Raw::Text(value) => value.trim().parse::<u32>().ok().filter(|minutes| *minutes > 0),
        Raw::Other(_) => None,
    };

    Ok(parsed.unwrap_or(DEFAULT_DURATION_MINUTES))
}
