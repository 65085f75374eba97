use serde::{Deserialize, Serialize};

/// One persisted attempt, shaped like the `results` row the record store
/// keeps per student. Unanswered questions stay `null` in `answers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub exam_id: String,
    pub teacher_id: String,
    pub student_name: String,
    pub score: u32,
    pub total_questions: u32,
    pub percent: u32,
    pub rating: String,
    pub answers: Vec<Option<String>>,
    pub cheating_attempts: u32,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}
