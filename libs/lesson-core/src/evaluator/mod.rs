//! Answer evaluation.
//!
//! A learner answer is classified by running a fixed, ordered chain of rules.
//! Each rule looks at the question and the pre-normalized inputs and either
//! decides the result or passes. The first rule that decides wins; rules
//! further down the chain never see the answer once a result exists.

mod equivalence;
mod markers;
mod rules;

use crate::matching::{normalize, tokenize};
use crate::types::{AnswerEvaluation, Language, Question, ReasonCode};

/// A single step of the evaluation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    BlankFill,
    ExactMatch,
    PlaceholderTemplate,
    NamedEquivalence,
    WrongLanguage,
    ArticleMismatch,
    WordOrder,
    Typo,
}

/// Evaluation order. Anything no rule decides falls back to wrong/OTHER.
pub const RULE_ORDER: [Rule; 8] = [
    Rule::BlankFill,
    Rule::ExactMatch,
    Rule::PlaceholderTemplate,
    Rule::NamedEquivalence,
    Rule::WrongLanguage,
    Rule::ArticleMismatch,
    Rule::WordOrder,
    Rule::Typo,
];

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BlankFill => "blank_fill",
            Self::ExactMatch => "exact_match",
            Self::PlaceholderTemplate => "placeholder_template",
            Self::NamedEquivalence => "named_equivalence",
            Self::WrongLanguage => "wrong_language",
            Self::ArticleMismatch => "article_mismatch",
            Self::WordOrder => "word_order",
            Self::Typo => "typo",
        }
    }

    /// Run this rule. `None` passes to the next rule in the chain.
    pub fn apply(&self, ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
        match self {
            Self::BlankFill => rules::blank_fill(ctx),
            Self::ExactMatch => rules::exact_match(ctx),
            Self::PlaceholderTemplate => rules::placeholder_template(ctx),
            Self::NamedEquivalence => equivalence::named_equivalence(ctx),
            Self::WrongLanguage => rules::wrong_language(ctx),
            Self::ArticleMismatch => rules::article_mismatch(ctx),
            Self::WordOrder => rules::word_order(ctx),
            Self::Typo => rules::typo(ctx),
        }
    }
}

/// Inputs shared by every rule, normalized once up front.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    pub question: &'a Question,
    pub language: &'a Language,
    pub user: String,
    pub user_tokens: Vec<String>,
    pub canonical: String,
    pub accepted: Vec<String>,
    pub examples: Vec<String>,
    /// Literal text before a `[name]`-style slot in the canonical answer.
    pub placeholder_prefix: Option<String>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(question: &'a Question, user_answer: &str, language: &'a Language) -> Self {
        let normalize_all = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| normalize(s))
                .filter(|s| !s.is_empty())
                .collect()
        };

        Self {
            question,
            language,
            user: normalize(user_answer),
            user_tokens: tokenize(user_answer),
            canonical: normalize(&question.answer),
            accepted: normalize_all(&question.accepted_answers),
            examples: normalize_all(&question.examples),
            placeholder_prefix: rules::placeholder_prefix(&question.answer),
        }
    }

    /// Canonical answer followed by accepted answers.
    pub fn expected_forms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str())
            .chain(self.accepted.iter().map(String::as_str))
            .filter(|s| !s.is_empty())
    }

    /// Expected forms followed by examples.
    pub fn all_forms(&self) -> impl Iterator<Item = &str> {
        self.expected_forms()
            .chain(self.examples.iter().map(String::as_str))
    }

    fn has_blank_answers(&self) -> bool {
        self.question
            .blank
            .as_ref()
            .is_some_and(|b| !b.answers.is_empty())
    }
}

/// Classify a learner answer to `question`, taught in `language`.
///
/// Total and deterministic: malformed questions and empty answers produce
/// wrong/OTHER rather than an error.
pub fn evaluate_answer(question: &Question, user_answer: &str, language: &Language) -> AnswerEvaluation {
    let ctx = EvaluationContext::new(question, user_answer, language);

    if ctx.user.is_empty() || (ctx.canonical.is_empty() && !ctx.has_blank_answers()) {
        return AnswerEvaluation::wrong(ReasonCode::Other);
    }

    RULE_ORDER
        .iter()
        .find_map(|rule| rule.apply(&ctx))
        .unwrap_or_else(|| AnswerEvaluation::wrong(ReasonCode::Other))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlankFill, EvaluationResult};
    use pretty_assertions::assert_eq;

    fn question(answer: &str) -> Question {
        Question::new("q1", "Translate", answer, "general")
    }

    fn eval_en(q: &Question, answer: &str) -> AnswerEvaluation {
        evaluate_answer(q, answer, &Language::English)
    }

    #[test]
    fn rule_order_is_fixed() {
        assert_eq!(
            RULE_ORDER.iter().map(Rule::name).collect::<Vec<_>>(),
            vec![
                "blank_fill",
                "exact_match",
                "placeholder_template",
                "named_equivalence",
                "wrong_language",
                "article_mismatch",
                "word_order",
                "typo",
            ]
        );
    }

    #[test]
    fn exact_match_ignores_case_and_punctuation() {
        let q = question("Good morning!");
        assert_eq!(eval_en(&q, "good morning"), AnswerEvaluation::correct());
        assert_eq!(eval_en(&q, "  GOOD   Morning. "), AnswerEvaluation::correct());
    }

    #[test]
    fn accepted_answers_and_examples_are_correct() {
        let mut q = question("Goodbye");
        q.accepted_answers = vec!["Bye".to_string()];
        q.examples = vec!["See you".to_string()];
        assert!(eval_en(&q, "bye").is_correct());
        assert!(eval_en(&q, "see you!").is_correct());
    }

    #[test]
    fn greeting_with_there_matches_examples() {
        let mut q = question("Hello");
        q.examples = vec!["Hello".to_string(), "Hi".to_string(), "Hey".to_string()];
        assert_eq!(eval_en(&q, "hi there"), AnswerEvaluation::correct());
        assert_eq!(eval_en(&q, "Hey there!"), AnswerEvaluation::correct());
    }

    #[test]
    fn placeholder_slot_missing_and_filled() {
        let q = question("My name is [Your name]");
        assert_eq!(
            eval_en(&q, "My name is"),
            AnswerEvaluation::almost(ReasonCode::MissingSlot)
        );
        assert_eq!(eval_en(&q, "My name is Hillary"), AnswerEvaluation::correct());
        assert_eq!(eval_en(&q, "my name is Hillary."), AnswerEvaluation::correct());
    }

    #[test]
    fn placeholder_variants() {
        let q = question("I live in {city}");
        assert!(eval_en(&q, "I live in Berlin").is_correct());
        let q = question("I am <name>");
        assert!(eval_en(&q, "I am Sam").is_correct());
        let q = question("My name is your name");
        assert!(eval_en(&q, "My name is Sam").is_correct());
    }

    #[test]
    fn question_containing_your_name_is_not_a_template() {
        let q = question("What is your name?");
        assert_ne!(eval_en(&q, "what is this").result, EvaluationResult::Correct);
    }

    #[test]
    fn contracted_self_introduction() {
        let q = question("I am Anna");
        assert!(eval_en(&q, "I'm Anna").is_correct());
        let q = question("I am [your name]");
        assert!(eval_en(&q, "I\u{2019}m Hillary").is_correct());
        let q = question("I'm tired");
        assert!(eval_en(&q, "I am tired").is_correct());
    }

    #[test]
    fn contracted_whats_your_name() {
        let q = question("What is your name?");
        assert!(eval_en(&q, "What's your name?").is_correct());
    }

    #[test]
    fn short_fine_reply() {
        let mut q = question("I am fine, thank you");
        q.prompt = "How are you?".to_string();
        assert!(eval_en(&q, "Fine").is_correct());
        assert!(eval_en(&q, "fine thanks").is_correct());
    }

    #[test]
    fn bare_morning() {
        let q = question("Good morning");
        assert!(eval_en(&q, "Morning!").is_correct());
    }

    #[test]
    fn german_article_mismatch() {
        let q = question("der Tisch");
        assert_eq!(
            evaluate_answer(&q, "die Tisch", &Language::German),
            AnswerEvaluation::almost(ReasonCode::Article)
        );
    }

    #[test]
    fn spanish_article_mismatch() {
        let q = question("el gato");
        assert_eq!(
            evaluate_answer(&q, "la gato", &Language::Spanish),
            AnswerEvaluation::almost(ReasonCode::Article)
        );
        assert_eq!(
            evaluate_answer(&question("las casas"), "los casas", &Language::Spanish),
            AnswerEvaluation::almost(ReasonCode::Article)
        );
    }

    #[test]
    fn french_article_mismatch() {
        let q = question("le chat");
        // One edit away, but the article rule runs before typo.
        assert_eq!(
            evaluate_answer(&q, "la chat", &Language::French),
            AnswerEvaluation::almost(ReasonCode::Article)
        );
        assert_eq!(
            evaluate_answer(&question("un livre"), "une livre", &Language::French),
            AnswerEvaluation::almost(ReasonCode::Article)
        );
    }

    #[test]
    fn article_rule_needs_matching_rest() {
        let q = question("der Tisch");
        let eval = evaluate_answer(&q, "die Lampe", &Language::German);
        assert_eq!(eval, AnswerEvaluation::wrong(ReasonCode::Other));
    }

    #[test]
    fn english_has_no_article_rule() {
        let q = question("the table");
        let eval = evaluate_answer(&q, "a table", &Language::English);
        assert_ne!(eval.reason, Some(ReasonCode::Article));
    }

    #[test]
    fn word_order_mismatch() {
        let q = question("I am very happy");
        assert_eq!(
            eval_en(&q, "I am happy very"),
            AnswerEvaluation::almost(ReasonCode::WordOrder)
        );
    }

    #[test]
    fn typo_budget_depends_on_length() {
        let q = question("Hello");
        assert_eq!(eval_en(&q, "helo"), AnswerEvaluation::almost(ReasonCode::Typo));
        assert_eq!(eval_en(&q, "hxllx"), AnswerEvaluation::wrong(ReasonCode::Other));

        let q = question("Good evening");
        assert_eq!(
            eval_en(&q, "god evenin"),
            AnswerEvaluation::almost(ReasonCode::Typo)
        );
    }

    #[test]
    fn typo_against_examples() {
        let mut q = question("Thank you very much");
        q.examples = vec!["Thanks".to_string()];
        assert_eq!(eval_en(&q, "thnks"), AnswerEvaluation::almost(ReasonCode::Typo));
    }

    #[test]
    fn earlier_rules_win_over_typo() {
        let mut q = question("Hello");
        q.examples = vec!["Hallo".to_string()];
        assert_eq!(eval_en(&q, "hallo"), AnswerEvaluation::correct());
    }

    #[test]
    fn wrong_language_detected() {
        let q = question("Ich bin müde");
        assert_eq!(
            evaluate_answer(&q, "I am tired", &Language::German),
            AnswerEvaluation::wrong(ReasonCode::WrongLanguage)
        );
    }

    #[test]
    fn wrong_language_is_conservative() {
        let q = question("Ich bin müde");
        let eval = evaluate_answer(&q, "ich bin the müde", &Language::German);
        assert_ne!(eval.reason, Some(ReasonCode::WrongLanguage));

        // Two foreign markers are not enough without a curated target set.
        let q = question("Sono stanco");
        let eval = evaluate_answer(&q, "I am tired", &Language::from_code("it"));
        assert_ne!(eval.reason, Some(ReasonCode::WrongLanguage));
        let eval = evaluate_answer(&q, "I am the tired one", &Language::from_code("it"));
        assert_eq!(eval.reason, Some(ReasonCode::WrongLanguage));
    }

    #[test]
    fn blank_fill_accepts_value_or_sentence() {
        let mut q = question("Ich bin Anna");
        q.blank = Some(BlankFill {
            template: Some("Ich ___ Anna".to_string()),
            answers: vec!["bin".to_string()],
        });
        assert!(evaluate_answer(&q, "bin", &Language::German).is_correct());
        assert!(evaluate_answer(&q, "Ich bin Anna.", &Language::German).is_correct());
        assert!(!evaluate_answer(&q, "ist", &Language::German).is_correct());
    }

    #[test]
    fn blank_fill_without_canonical_answer() {
        let mut q = question("");
        q.blank = Some(BlankFill {
            template: None,
            answers: vec!["bin".to_string()],
        });
        assert!(evaluate_answer(&q, "bin", &Language::German).is_correct());
    }

    #[test]
    fn malformed_question_is_wrong_other() {
        let q = question("");
        assert_eq!(eval_en(&q, "anything"), AnswerEvaluation::wrong(ReasonCode::Other));
        assert_eq!(eval_en(&q, ""), AnswerEvaluation::wrong(ReasonCode::Other));
    }

    #[test]
    fn empty_answer_is_wrong_other() {
        let q = question("a");
        assert_eq!(eval_en(&q, "  ?! "), AnswerEvaluation::wrong(ReasonCode::Other));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut q = question("der Tisch");
        q.examples = vec!["ein Tisch".to_string()];
        for input in ["die Tisch", "Tisch der", "der Tish", "the table", "der Tisch"] {
            let first = evaluate_answer(&q, input, &Language::German);
            for _ in 0..5 {
                assert_eq!(evaluate_answer(&q, input, &Language::German), first);
            }
        }
    }

    #[test]
    fn canonical_equality_is_always_correct() {
        let answers = [
            "der Tisch",
            "My name is [Your name]",
            "I am fine, thank you",
            "¿Cómo estás?",
            "x",
        ];
        for answer in answers {
            let q = question(answer);
            for language in [Language::English, Language::German, Language::Spanish] {
                assert!(
                    evaluate_answer(&q, &answer.to_uppercase(), &language).is_correct(),
                    "{} / {}",
                    answer,
                    language
                );
            }
        }
    }
}
