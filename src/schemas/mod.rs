pub mod exam;
pub mod result;
pub mod user;

pub use exam::{ExamPayload, NewExam, Question, StoredExam, DEFAULT_DURATION_MINUTES};
pub use result::ResultRecord;
pub use user::User;
