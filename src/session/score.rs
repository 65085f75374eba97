use serde::Serialize;

use crate::schemas::ExamPayload;
use crate::session::machine::AttemptState;

/// Computed exactly once per attempt; both the inline result card and the
/// exported document read from the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub correct: u32,
    pub total: u32,
    pub percent: u32,
    pub rating: &'static str,
    pub cheating_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMark {
    Correct,
    SelectedWrong,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionReview {
    pub text: String,
    pub mark: OptionMark,
}

/// Per-question breakdown for the post-exam review screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionReview {
    pub text: String,
    pub options: Vec<OptionReview>,
    pub selected: Option<String>,
    pub is_correct: bool,
    pub explanation: String,
    pub explanation_image: Option<String>,
}

pub fn score(payload: &ExamPayload, attempt: &AttemptState) -> ScoreResult {
    let total = payload.questions.len() as u32;
    let correct = payload
        .questions
        .iter()
        .zip(attempt.answers.iter())
        .filter(|(question, answer)| answer.as_deref() == Some(question.answer.as_str()))
        .count() as u32;

    let percent = percent_of(correct, total);

    ScoreResult {
        correct,
        total,
        percent,
        rating: rating_label(percent),
        cheating_attempts: attempt.cheating_attempts,
    }
}

/// An exam with no questions scores 0% instead of dividing by zero.
pub fn percent_of(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(correct) * 100.0 / f64::from(total)).round() as u32
}

pub fn rating_label(percent: u32) -> &'static str {
    match percent {
        100.. => "Perfect! You're a genius!",
        95..=99 => "Outstanding!",
        90..=94 => "Excellent work!",
        85..=89 => "Very impressive!",
        80..=84 => "Great job!",
        75..=79 => "Well done!",
        70..=74 => "Good effort!",
        65..=69 => "You're getting there!",
        60..=64 => "Fair try!",
        55..=59 => "Needs improvement!",
        50..=54 => "Just made it!",
        _ => "Keep practicing!",
    }
}

pub fn review(payload: &ExamPayload, attempt: &AttemptState) -> Vec<QuestionReview> {
    payload
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let selected = attempt.answers.get(index).cloned().flatten();
            let options = question
                .options
                .iter()
                .map(|option| {
                    let mark = if *option == question.answer {
                        OptionMark::Correct
                    } else if Some(option.as_str()) == selected.as_deref() {
                        OptionMark::SelectedWrong
                    } else {
                        OptionMark::Neutral
                    };
                    OptionReview { text: option.clone(), mark }
                })
                .collect();

            let explanation = if question.explanation.trim().is_empty() {
                "No explanation provided.".to_string()
            } else {
                question.explanation.clone()
            };

            QuestionReview {
                text: question.text.clone(),
                is_correct: selected.as_deref() == Some(question.answer.as_str()),
                options,
                selected,
                explanation,
                explanation_image: question.explanation_image.clone(),
            }
        })
        .collect()
}
