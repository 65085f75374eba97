use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;
use validator::Validate;

use crate::loader;
use crate::schemas::{ExamPayload, NewExam, Question, StoredExam, DEFAULT_DURATION_MINUTES};
use crate::services::shortener::ShortenerService;
use crate::services::store::{RecordStore, StoreError};

// Matches the exam list page: newest first, capped.
const EXAM_LIST_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("invalid exam draft: {0}")]
    Invalid(String),
    #[error("exam must contain at least one question")]
    NoQuestions,
    #[error("question {index} needs at least two options")]
    TooFewOptions { index: usize },
    #[error("question {index} answer does not match any option")]
    AnswerMismatch { index: usize },
    #[error("question bank rejected: {0}")]
    InvalidBank(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raw teacher input before normalization. `answer` may be omitted and then
/// defaults to the first option.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionDraft {
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub text: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub question_image: Option<String>,
    #[serde(default)]
    pub explanation_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExamDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[validate(nested)]
    pub questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedExam {
    pub exam: StoredExam,
    pub share_url: String,
    pub short_url: String,
}

/// Normalizes a draft into the immutable payload students run against:
/// trims everything, drops empty options, resolves the answer key and the
/// defaults for title, duration and explanation.
pub fn build_payload(draft: ExamDraft) -> Result<ExamPayload, AuthoringError> {
    draft.validate().map_err(|err| AuthoringError::Invalid(err.to_string()))?;

    if draft.questions.is_empty() {
        return Err(AuthoringError::NoQuestions);
    }

    let mut questions = Vec::with_capacity(draft.questions.len());
    for (position, draft_question) in draft.questions.into_iter().enumerate() {
        let index = position + 1;

        let text = draft_question.text.trim().to_string();
        if text.is_empty() {
            return Err(AuthoringError::Invalid(format!("question {index} has no text")));
        }

        let options: Vec<String> = draft_question
            .options
            .iter()
            .map(|option| option.trim().to_string())
            .filter(|option| !option.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(AuthoringError::TooFewOptions { index });
        }

        let answer = match draft_question
            .answer
            .as_deref()
            .map(str::trim)
            .filter(|answer| !answer.is_empty())
        {
            Some(answer) => {
                if !options.iter().any(|option| option == answer) {
                    return Err(AuthoringError::AnswerMismatch { index });
                }
                answer.to_string()
            }
            None => options[0].clone(),
        };

        let explanation = draft_question.explanation.trim();
        let explanation = if explanation.is_empty() {
            "No explanation.".to_string()
        } else {
            explanation.to_string()
        };

        questions.push(Question {
            text,
            options,
            answer,
            explanation,
            question_image: draft_question.question_image,
            explanation_image: draft_question.explanation_image,
        });
    }

    let title = draft.title.trim();
    let title = if title.is_empty() { "Untitled Exam".to_string() } else { title.to_string() };

    Ok(ExamPayload {
        title,
        duration_minutes: draft
            .duration_minutes
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_DURATION_MINUTES),
        questions,
    })
}

/// Validates an uploaded question-bank file: a JSON array where every row
/// carries `question`, `options` and `answer`.
pub fn parse_question_bank(raw: &str) -> Result<Vec<Question>, AuthoringError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| AuthoringError::InvalidBank(err.to_string()))?;

    let rows = value
        .as_array()
        .ok_or_else(|| AuthoringError::InvalidBank("expected a JSON array".to_string()))?;

    for (position, row) in rows.iter().enumerate() {
        let well_formed = row.get("question").is_some_and(Value::is_string)
            && row.get("options").is_some_and(Value::is_array)
            && row.get("answer").is_some_and(Value::is_string);
        if !well_formed {
            return Err(AuthoringError::InvalidBank(format!(
                "question {} is missing question/options/answer",
                position + 1
            )));
        }
    }

    serde_json::from_value(value).map_err(|err| AuthoringError::InvalidBank(err.to_string()))
}

/// Saves the exam and produces the share link, shortened when the shortener
/// cooperates and unshortened otherwise.
pub async fn publish_exam(
    store: &dyn RecordStore,
    shortener: Option<&ShortenerService>,
    public_base_url: &str,
    teacher_id: &str,
    payload: ExamPayload,
) -> Result<PublishedExam, AuthoringError> {
    let exam = store
        .insert_exam(&NewExam {
            title: payload.title,
            duration_minutes: payload.duration_minutes,
            questions: payload.questions,
            teacher_id: teacher_id.to_string(),
        })
        .await?;

    let share_url = exam_url(public_base_url, &exam.id);
    let short_url = match shortener {
        Some(shortener) => shortener.shorten(&share_url).await,
        None => share_url.clone(),
    };

    tracing::info!(teacher_id, exam_id = %exam.id, "Exam published");

    Ok(PublishedExam { exam, share_url, short_url })
}

pub async fn list_teacher_exams(
    store: &dyn RecordStore,
    teacher_id: &str,
) -> Result<Vec<StoredExam>, AuthoringError> {
    Ok(store.list_exams(teacher_id, EXAM_LIST_LIMIT).await?)
}

/// Deleting an exam also drops its results on the store side; callers
/// confirm with the teacher first.
pub async fn delete_exam(store: &dyn RecordStore, exam_id: &str) -> Result<(), AuthoringError> {
    store.delete_exam(exam_id).await?;
    tracing::info!(exam_id, "Exam deleted");
    Ok(())
}

pub async fn delete_all_exams(
    store: &dyn RecordStore,
    teacher_id: &str,
) -> Result<(), AuthoringError> {
    store.delete_exams_by_teacher(teacher_id).await?;
    tracing::info!(teacher_id, "All exams deleted");
    Ok(())
}

pub fn exam_url(public_base_url: &str, exam_id: &str) -> String {
    format!("{}/exam?id={exam_id}", public_base_url.trim_end_matches('/'))
}

/// Preview links carry the whole payload inline, so drafts can be test-run
/// without saving anything.
pub fn preview_url(public_base_url: &str, payload: &ExamPayload) -> String {
    let encoded = loader::encode_preview_payload(payload);
    let base = format!("{}/exam", public_base_url.trim_end_matches('/'));

    match Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("data", &encoded);
            url.into()
        }
        Err(_) => format!("{base}?data={encoded}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(questions: Vec<QuestionDraft>) -> ExamDraft {
        ExamDraft { title: "  Algebra Basics ".to_string(), duration_minutes: Some(20), questions }
    }

    fn question_draft(text: &str, options: &[&str], answer: Option<&str>) -> QuestionDraft {
        QuestionDraft {
            text: text.to_string(),
            options: options.iter().map(|option| option.to_string()).collect(),
            answer: answer.map(|answer| answer.to_string()),
            explanation: String::new(),
            question_image: None,
            explanation_image: None,
        }
    }

    #[test]
    fn build_payload_normalizes_and_defaults() {
        let payload = build_payload(draft(vec![question_draft(
            " 2+2? ",
            &[" 3 ", "4", "  "],
            None,
        )]))
        .expect("payload");

        assert_eq!(payload.title, "Algebra Basics");
        assert_eq!(payload.duration_minutes, 20);
        assert_eq!(payload.questions[0].text, "2+2?");
        assert_eq!(payload.questions[0].options, vec!["3".to_string(), "4".to_string()]);
        // No answer picked: the first option is the key.
        assert_eq!(payload.questions[0].answer, "3");
        assert_eq!(payload.questions[0].explanation, "No explanation.");
    }

    #[test]
    fn build_payload_rejects_empty_drafts() {
        let error = build_payload(draft(Vec::new())).unwrap_err();
        assert!(matches!(error, AuthoringError::NoQuestions));
    }

    #[test]
    fn build_payload_rejects_single_option_questions() {
        let error =
            build_payload(draft(vec![question_draft("Q", &["only", " "], None)])).unwrap_err();
        assert!(matches!(error, AuthoringError::TooFewOptions { index: 1 }));
    }

    #[test]
    fn build_payload_rejects_unmatched_answers() {
        let error =
            build_payload(draft(vec![question_draft("Q", &["a", "b"], Some("c"))])).unwrap_err();
        assert!(matches!(error, AuthoringError::AnswerMismatch { index: 1 }));
    }

    #[test]
    fn build_payload_defaults_missing_title_and_duration() {
        let draft = ExamDraft {
            title: "   ".to_string(),
            duration_minutes: None,
            questions: vec![question_draft("Q", &["a", "b"], Some("b"))],
        };

        let payload = build_payload(draft).expect("payload");
        assert_eq!(payload.title, "Untitled Exam");
        assert_eq!(payload.duration_minutes, DEFAULT_DURATION_MINUTES);
    }

    #[test]
    fn question_bank_accepts_well_formed_rows() {
        let questions = parse_question_bank(
            r#"[{"question":"2+2?","options":["3","4"],"answer":"4","explanation":"sum"}]"#,
        )
        .expect("bank");

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "4");
    }

    #[test]
    fn question_bank_rejects_malformed_input() {
        assert!(matches!(parse_question_bank("not json"), Err(AuthoringError::InvalidBank(_))));
        assert!(matches!(
            parse_question_bank(r#"{"question":"q"}"#),
            Err(AuthoringError::InvalidBank(_))
        ));
        assert!(matches!(
            parse_question_bank(r#"[{"question":"q","options":["a","b"]}]"#),
            Err(AuthoringError::InvalidBank(_))
        ));
    }

    #[test]
    fn exam_links_follow_the_url_contract() {
        assert_eq!(
            exam_url("https://exams.example.org/", "abc-123"),
            "https://exams.example.org/exam?id=abc-123"
        );
    }

    #[test]
    fn preview_links_round_trip_through_the_loader() {
        let payload = build_payload(draft(vec![question_draft("2+2?", &["3", "4"], Some("4"))]))
            .expect("payload");

        let url = preview_url("https://exams.example.org", &payload);
        let source = crate::loader::parse_exam_url(&url).expect("source");
        let crate::loader::ExamSource::Preview(encoded) = source else {
            panic!("expected a preview source");
        };
        let decoded = crate::loader::decode_preview_payload(&encoded).expect("decode");
        assert_eq!(decoded, payload);
    }
}
