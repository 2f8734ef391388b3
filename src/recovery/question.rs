//! Challenge question model and the built-in default question sets.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claim dialect the default question set ids live under.
pub const CLAIM_DIALECT: &str = "http://wso2.org/claims";
pub const LOCALE_EN_US: &str = "en_US";

const DEFAULT_SET_01: &[&str] = &[
    "City where you were born?",
    "Father's middle name?",
    "Favorite food?",
    "Favorite vacation location?",
];

const DEFAULT_SET_02: &[&str] = &[
    "Model of your first car?",
    "Name of the hospital where you were born?",
    "Name of your first pet?",
    "Favorite sport?",
];

/// A single security question. Equality is over all four fields.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChallengeQuestion {
    pub question_set_id: String,
    pub question_id: String,
    pub question: String,
    pub locale: String,
}

impl ChallengeQuestion {
    pub fn new(
        question_set_id: impl Into<String>,
        question_id: impl Into<String>,
        question: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            question_set_id: question_set_id.into(),
            question_id: question_id.into(),
            question: question.into(),
            locale: locale.into(),
        }
    }

    /// Identity used for upserts: two records with the same key are the
    /// same question, possibly with different text.
    #[must_use]
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.question_set_id, &self.question_id, &self.locale)
    }

    /// Case-insensitive locale comparison (`en_US` == `en_us`).
    #[must_use]
    pub fn has_locale(&self, locale: &str) -> bool {
        self.locale.eq_ignore_ascii_case(locale)
    }
}

/// Build the two canonical `en_US` question sets.
///
/// Pure: the output depends only on the built-in banks, ids restart at
/// `question1` for each set.
#[must_use]
pub fn default_questions() -> Vec<ChallengeQuestion> {
    let banks = [
        ("challengeQuestion1", DEFAULT_SET_01),
        ("challengeQuestion2", DEFAULT_SET_02),
    ];

    banks
        .iter()
        .flat_map(|(set, bank)| {
            let set_id = format!("{CLAIM_DIALECT}/{set}");
            bank.iter().enumerate().map(move |(index, text)| {
                ChallengeQuestion::new(
                    set_id.clone(),
                    format!("question{}", index + 1),
                    *text,
                    LOCALE_EN_US,
                )
            })
        })
        .collect()
}

/// Number of questions [`default_questions`] produces.
#[must_use]
pub const fn default_question_count() -> usize {
    DEFAULT_SET_01.len() + DEFAULT_SET_02.len()
}

/// Last path segment of a question set uri.
///
/// `http://wso2.org/claims/challengeQuestion1` → `challengeQuestion1`.
/// Blank input is returned unchanged.
#[must_use]
pub fn challenge_set_dir_from_uri(uri: &str) -> &str {
    if uri.trim().is_empty() {
        return uri;
    }
    uri.rsplit_once('/').map_or(uri, |(_, last)| last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_deterministic() {
        assert_eq!(default_questions(), default_questions());
    }

    #[test]
    fn defaults_cover_both_banks() {
        let questions = default_questions();
        assert_eq!(questions.len(), default_question_count());
        assert_eq!(questions.len(), DEFAULT_SET_01.len() + DEFAULT_SET_02.len());
        assert!(questions.iter().all(|q| q.locale == LOCALE_EN_US));
    }

    #[test]
    fn question_ids_restart_per_set() {
        let questions = default_questions();
        let set1: Vec<_> = questions
            .iter()
            .filter(|q| q.question_set_id == "http://wso2.org/claims/challengeQuestion1")
            .map(|q| q.question_id.as_str())
            .collect();
        let set2: Vec<_> = questions
            .iter()
            .filter(|q| q.question_set_id == "http://wso2.org/claims/challengeQuestion2")
            .map(|q| q.question_id.as_str())
            .collect();

        assert_eq!(set1, ["question1", "question2", "question3", "question4"]);
        assert_eq!(set2, ["question1", "question2", "question3", "question4"]);
    }

    #[test]
    fn set_dir_is_last_segment() {
        assert_eq!(
            challenge_set_dir_from_uri("http://wso2.org/claims/challengeQuestion1"),
            "challengeQuestion1"
        );
        assert_eq!(challenge_set_dir_from_uri("plain"), "plain");
        assert_eq!(challenge_set_dir_from_uri("  "), "  ");
    }

    #[test]
    fn locale_match_ignores_case() {
        let question = ChallengeQuestion::new("set1", "q1", "What city?", "en_US");
        assert!(question.has_locale("EN_us"));
        assert!(!question.has_locale("fr_FR"));
    }
}
