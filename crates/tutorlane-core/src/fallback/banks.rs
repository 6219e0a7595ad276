//! Curated scripted prompts, partitioned by subject.

use tutorlane_types::answer::QuestionType;
use tutorlane_types::lesson::Subject;

/// One scripted prompt. `answer` is set when the expected reply can't be
/// derived from the text itself.
#[derive(Debug, Clone, Copy)]
pub struct BankEntry {
    pub text: &'static str,
    pub answer: Option<&'static str>,
    pub question_type: QuestionType,
}

const fn open(text: &'static str) -> BankEntry {
    BankEntry {
        text,
        answer: None,
        question_type: QuestionType::Open,
    }
}

const fn short(text: &'static str, answer: &'static str) -> BankEntry {
    BankEntry {
        text,
        answer: Some(answer),
        question_type: QuestionType::Short,
    }
}

const fn math(text: &'static str) -> BankEntry {
    BankEntry {
        text,
        answer: None,
        question_type: QuestionType::Math,
    }
}

const MATH: &[BankEntry] = &[
    math("Quick tip: counting on from the bigger number is faster. What is 6 + 3?"),
    math("Let's warm up with adding. What is 7 + 5?"),
    math("Taking away means fewer. What is 10 minus 4?"),
    math("Times tables help a lot. What is 3 times 4?"),
    math("Sharing equally is dividing. What is 12 divided by 3?"),
    math("Doubles are easy to remember. What is 8 + 8?"),
];

const ENGLISH: &[BankEntry] = &[
    short("Opposites are fun. What is the opposite of hot?", "cold"),
    short("Let's rhyme. What word rhymes with cat and starts with h?", "hat"),
    open("A noun is a person, place, or thing. Can you name a noun you see every day?"),
    open("Verbs are action words. What is a verb you did today?"),
    short("Plurals usually add an s. What is more than one dog?", "dogs"),
];

const SPANISH: &[BankEntry] = &[
    short("Let's practice animals. How do you say cat in Spanish?", "gato"),
    short("Greetings first. How do you say hello in Spanish?", "hola"),
    short("Colors are useful. What is the Spanish word for red?", "rojo"),
    short("Let's count. How do you say three in Spanish?", "tres"),
    short("Polite words matter. How do you say thank you in Spanish?", "gracias"),
];

const GENERAL: &[BankEntry] = &[
    open("Learning works best in small steps. What is one thing you learned today?"),
    open("Explaining an idea helps you remember it. Can you tell me about something you know well?"),
    open("Mistakes help us learn. What is something you found tricky recently?"),
    open("Curiosity is a superpower. What is a question you have been wondering about?"),
];

pub fn bank(subject: Subject) -> &'static [BankEntry] {
    match subject {
        Subject::Math => MATH,
        Subject::English => ENGLISH,
        Subject::Spanish => SPANISH,
        Subject::General => GENERAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::extract_question;
    use crate::guard::format::is_well_formed;

    #[test]
    fn every_entry_is_speakable() {
        for subject in Subject::ALL {
            let entries = bank(subject);
            assert!(entries.len() > 3, "{subject} bank must outlast the rotation window");
            for entry in entries {
                assert!(is_well_formed(entry.text), "{}", entry.text);
            }
        }
    }

    #[test]
    fn math_entries_have_extractable_answers() {
        for entry in bank(Subject::Math) {
            assert!(extract_question(entry.text).is_some(), "{}", entry.text);
        }
    }
}
