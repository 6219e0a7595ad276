//! Turn a model plan into one short spoken utterance.

use tutorlane_types::llm::TutorPlan;

fn is_pictograph(c: char) -> bool {
    let code = c as u32;
    (0x1F000..=0x1FAFF).contains(&code)
        || (0x2600..=0x27BF).contains(&code)
        || (0xFE00..=0xFE0F).contains(&code)
        || code == 0x200D
}

/// Strip markdown markers, list bullets and pictographs; collapse whitespace.
pub fn clean_for_speech(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            let line = line.trim_start();
            let line = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("• "))
                .unwrap_or(line);
            let digits = line.chars().take_while(char::is_ascii_digit).count();
            let line = if digits > 0 && line[digits..].starts_with(". ") {
                &line[digits + 2..]
            } else {
                line
            };
            line.trim_start_matches('#').to_string()
        })
        .collect();
    let joined = lines.join(" ");
    let cleaned: String = joined
        .chars()
        .filter(|c| !matches!(c, '*' | '`' | '#') && !is_pictograph(*c))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The text the tutor will say for `plan`.
///
/// Uses `next_prompt`, else the first plan step, else the goal. When the
/// result asks nothing and follow-up options exist, the first option is
/// appended as a question.
pub fn to_spoken(plan: &TutorPlan) -> String {
    let base = [plan.next_prompt.as_str()]
        .into_iter()
        .chain(plan.plan_steps.iter().map(String::as_str))
        .chain(std::iter::once(plan.goal.as_str()))
        .map(clean_for_speech)
        .find(|text| !text.is_empty())
        .unwrap_or_default();

    if base.contains('?') {
        return base;
    }
    let Some(option) = plan
        .followup_options
        .iter()
        .map(|o| clean_for_speech(o))
        .find(|o| !o.is_empty())
    else {
        return base;
    };

    let option = option.trim_end_matches(['.', '!', '?']);
    if base.is_empty() {
        return format!("{option}?");
    }
    let base = if base.ends_with(['.', '!']) {
        base
    } else {
        format!("{base}.")
    };
    format!("{base} {option}?")
}
