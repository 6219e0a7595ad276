//! Numeric extraction from spoken or typed answers.

use std::sync::LazyLock;

use regex::Regex;

static NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid numeral regex"));

const NUMBER_WORDS: [&str; 21] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen", "twenty",
];

/// Value of a single number word from zero to twenty.
fn word_value(word: &str) -> Option<f64> {
    NUMBER_WORDS
        .iter()
        .position(|candidate| *candidate == word)
        .map(|value| value as f64)
}

/// First numeric value in `text`: a decimal/negative numeral, else a
/// number word from zero to twenty.
pub fn extract_number(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase();
    if let Some(found) = NUMERAL.find(&lowered) {
        return found.as_str().parse().ok();
    }
    lowered
        .split(|c: char| !c.is_alphabetic())
        .find_map(word_value)
}

/// Parse one operand token: a numeral or a number word.
pub(crate) fn parse_operand(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .or_else(|| word_value(&token.to_lowercase()))
}

/// Render a value without a trailing `.0` for whole numbers.
pub fn format_number(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rendered = format!("{value:.3}");
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_numerals() {
        assert_eq!(extract_number("4"), Some(4.0));
        assert_eq!(extract_number("I think it's -3"), Some(-3.0));
        assert_eq!(extract_number("maybe 2.5?"), Some(2.5));
    }

    #[test]
    fn extracts_number_words_up_to_twenty() {
        assert_eq!(extract_number("three"), Some(3.0));
        assert_eq!(extract_number("It is Ten!"), Some(10.0));
        assert_eq!(extract_number("zero"), Some(0.0));
        assert_eq!(extract_number("twelve"), Some(12.0));
        assert_eq!(extract_number("sixteen"), Some(16.0));
        assert_eq!(extract_number("twenty"), Some(20.0));
        assert_eq!(extract_number("someone"), None);
        assert_eq!(extract_number("twentyone"), None);
    }

    #[test]
    fn operands_accept_larger_words() {
        assert_eq!(parse_operand("twelve"), Some(12.0));
        assert_eq!(parse_operand("7"), Some(7.0));
        assert_eq!(parse_operand("many"), None);
    }

    #[test]
    fn formats_whole_and_fractional_values() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.333");
    }
}
