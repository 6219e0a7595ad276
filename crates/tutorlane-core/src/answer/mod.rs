//! Answer checking: numeric, multiple-choice, short and open answers.

mod checker;
pub mod numbers;
mod question;

pub use checker::check_answer;
pub use question::extract_question;
