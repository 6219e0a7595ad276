//! `tutorlane check`: run the answer checker directly.

use anyhow::Result;
use console::style;

use tutorlane_core::answer::check_answer;
use tutorlane_types::answer::QuestionType;

pub fn check(answer: &str, expected: &str, question_type: &str, options: &[String], json: bool) -> Result<()> {
    let question_type = QuestionType::parse_lenient(question_type);
    let verdict = check_answer(answer, expected, question_type, options);

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    let mark = if verdict.is_correct {
        style("✓ correct").green()
    } else {
        style("✗ incorrect").red()
    };
    println!();
    println!(
        "  {mark}  {}",
        style(format!("({question_type}, confidence {:.2})", verdict.confidence)).dim()
    );
    if let Some(correction) = &verdict.correction {
        println!("  {correction}");
    }
    if let Some(explanation) = &verdict.explanation {
        println!("  {}", style(explanation).dim());
    }
    println!();
    Ok(())
}
