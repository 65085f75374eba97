use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;
use url::Url;

use crate::schemas::ExamPayload;
use crate::services::store::RecordStore;
use crate::session::ExamOrigin;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("invalid or missing exam link")]
    MissingSource,
    #[error("preview payload could not be decoded")]
    Malformed,
    #[error("exam not found")]
    NotFound,
    #[error("record store is not configured")]
    Unconfigured,
}

/// The two ways an exam link resolves: an inline encoded payload (preview)
/// or an identifier looked up in the record store (live).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamSource {
    Preview(String),
    Stored(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedExam {
    pub payload: ExamPayload,
    pub origin: ExamOrigin,
}

/// Picks the source out of an `exam?id=…` / `exam?data=…` link. An inline
/// payload wins over an id when both are present, matching the student page.
pub fn parse_exam_url(raw: &str) -> Result<ExamSource, LoadError> {
    let url = Url::parse(raw).map_err(|_| LoadError::MissingSource)?;

    let mut exam_id = None;
    let mut encoded = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "id" if exam_id.is_none() => exam_id = Some(value.into_owned()),
            "data" if encoded.is_none() => encoded = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(encoded) = encoded.filter(|value| !value.is_empty()) {
        return Ok(ExamSource::Preview(encoded));
    }
    if let Some(id) = exam_id.filter(|value| !value.is_empty()) {
        return Ok(ExamSource::Stored(id));
    }

    Err(LoadError::MissingSource)
}

/// Decodes a preview payload: the query parser already percent-decoded the
/// value, leaving base64-wrapped JSON.
pub fn decode_preview_payload(encoded: &str) -> Result<ExamPayload, LoadError> {
    let bytes = BASE64.decode(encoded.trim()).map_err(|err| {
        tracing::debug!(error = %err, "Preview payload is not valid base64");
        LoadError::Malformed
    })?;

    serde_json::from_slice(&bytes).map_err(|err| {
        tracing::debug!(error = %err, "Preview payload is not valid JSON");
        LoadError::Malformed
    })
}

/// Inverse of [`decode_preview_payload`]; authoring puts this in the `data`
/// query parameter of a preview link.
pub fn encode_preview_payload(payload: &ExamPayload) -> String {
    let json = serde_json::to_vec(payload).unwrap_or_default();
    BASE64.encode(json)
}

pub async fn load(
    source: &ExamSource,
    store: Option<&dyn RecordStore>,
) -> Result<LoadedExam, LoadError> {
    match source {
        ExamSource::Preview(encoded) => {
            let payload = decode_preview_payload(encoded)?;
            Ok(LoadedExam { payload, origin: ExamOrigin::Preview })
        }
        ExamSource::Stored(id) => {
            let store = store.ok_or(LoadError::Unconfigured)?;
            let exam = match store.fetch_exam(id).await {
                Ok(Some(exam)) => exam,
                Ok(None) => return Err(LoadError::NotFound),
                Err(err) => {
                    // A failed lookup reads the same as a missing exam.
                    tracing::warn!(error = %err, exam_id = %id, "Exam lookup failed");
                    return Err(LoadError::NotFound);
                }
            };

            Ok(LoadedExam {
                payload: ExamPayload {
                    title: exam.title,
                    duration_minutes: exam.duration_minutes,
                    questions: exam.questions,
                },
                origin: ExamOrigin::Stored { exam_id: exam.id, teacher_id: exam.teacher_id },
            })
        }
    }
}

pub async fn load_from_url(
    raw: &str,
    store: Option<&dyn RecordStore>,
) -> Result<LoadedExam, LoadError> {
    let source = parse_exam_url(raw)?;
    load(&source, store).await
}
