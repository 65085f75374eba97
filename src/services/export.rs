use crate::schemas::ExamPayload;
use crate::session::score::{self, ScoreResult};
use crate::session::AttemptState;

/// Renders the downloadable result document as self-contained styled
/// markup. The document renderer that turns this into a PDF lives outside
/// the crate; everything here is a pure transformation of the attempt.
pub fn render_result_document(
    payload: &ExamPayload,
    attempt: &AttemptState,
    score: &ScoreResult,
) -> String {
    let mut html = String::new();

    html.push_str(
        "<div style=\"padding:20px; font-family:Inter, Arial, sans-serif; \
         max-width:800px; margin:0 auto;\">\n",
    );

    html.push_str(&format!(
        "<div style=\"text-align:center; margin-bottom:30px; \
         border-bottom:2px solid #8e44ad; padding-bottom:20px;\">\n\
         <h1 style=\"color:#8e44ad; margin:0;\">{}</h1>\n\
         <h2 style=\"color:#6c3483; margin:10px 0;\">Exam Result</h2>\n\
         <p style=\"font-size:18px; margin:10px 0;\">Student: <strong>{}</strong></p>\n\
         <p style=\"font-size:20px; color:#2ecc71;\">Score: {}/{} ({}%)</p>\n\
         <p style=\"font-size:18px;\">{}</p>\n",
        escape_html(&payload.title),
        escape_html(&attempt.student_name),
        score.correct,
        score.total,
        score.percent,
        escape_html(score.rating),
    ));

    if score.cheating_attempts > 0 {
        html.push_str(&format!(
            "<p style=\"color:#e74c3c; font-weight:bold;\">Cheating attempts: {}</p>\n",
            score.cheating_attempts
        ));
    }
    html.push_str("</div>\n");

    for (index, review) in score::review(payload, attempt).iter().enumerate() {
        let answer_color = if review.is_correct { "#27ae60" } else { "#e74c3c" };
        let verdict = if review.is_correct { "&#9989;" } else { "&#10060;" };
        let selected = review.selected.as_deref().unwrap_or("Not answered");
        let correct_answer = payload
            .questions
            .get(index)
            .map(|question| question.answer.as_str())
            .unwrap_or_default();

        html.push_str(&format!(
            "<div style=\"margin-bottom:25px; padding-bottom:15px; \
             border-bottom:1px solid #eee;\">\n\
             <p style=\"font-weight:bold; margin:0 0 10px 0;\">Q{}: {}</p>\n\
             <p style=\"margin:8px 0; color:{};\"><strong>Your Answer:</strong> {} {}</p>\n\
             <p style=\"margin:8px 0;\"><strong>Correct Answer:</strong> {}</p>\n\
             <p style=\"margin:8px 0; color:#555;\"><strong>Explanation:</strong> {}</p>\n",
            index + 1,
            escape_html(&review.text),
            answer_color,
            escape_html(selected),
            verdict,
            escape_html(correct_answer),
            escape_html(&review.explanation),
        ));

        if let Some(image) = &review.explanation_image {
            html.push_str(&format!(
                "<img src=\"{}\" style=\"max-width:100%; margin-top:8px; border-radius:4px;\">\n",
                escape_html(image)
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str("</div>\n");
    html
}

/// `Algebra Basics` + `Dana Lee` -> `Algebra_Basics_Result_Dana_Lee.pdf`.
pub fn suggested_filename(title: &str, student_name: &str) -> String {
    format!("{}_Result_{}.pdf", collapse_whitespace(title), collapse_whitespace(student_name))
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for character in raw.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
