//! Standalone answer checking.
//!
//! POST /api/v1/answers/check

use serde::Deserialize;

use tutorlane_core::answer::check_answer;
use tutorlane_types::answer::{AnswerCheck, QuestionType};

use crate::http::extractors::ApiJson;
use crate::http::response::{ApiResponse, RequestTimer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub answer: String,
    pub expected: String,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
}

pub async fn check(ApiJson(request): ApiJson<CheckRequest>) -> ApiResponse<AnswerCheck> {
    let timer = RequestTimer::start();
    let verdict = check_answer(
        &request.answer,
        &request.expected,
        request.question_type,
        &request.options,
    );
    timer.finish(verdict)
}
