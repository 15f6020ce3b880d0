//! Keyword routing for free-text questions
//!
//! A single-pass, case-insensitive substring gate. There is no scoring: a query
//! that mentions both vocabularies ("exam" and "lambda") is treated the same as
//! one that mentions neither.

use serde::Serialize;

/// Terms that point at the university knowledge base
pub const SCHOOL_KEYWORDS: &[&str] = &[
    "trimester",
    "semester",
    "academic",
    "calendar",
    "graduation",
    "fees",
    "university",
    "campus",
    "student",
    "registration",
    "exam",
    "attendance",
    "virtual campus",
    "add/drop",
    "clearance",
    "gown",
    "rules",
    "regulations",
    "kcau",
    "kca",
    "school",
    "class",
    "course",
    "degree",
    "bachelor",
    "postgraduate",
    "doctoral",
    "faq",
    "distance learning",
];

/// Terms that point at cloud technical documentation
pub const TECHNICAL_KEYWORDS: &[&str] = &[
    "aws",
    "amazon",
    "ec2",
    "s3",
    "lambda",
    "cloudformation",
    "vpc",
    "rds",
    "dynamodb",
    "iam",
    "cloudwatch",
    "sns",
    "sqs",
    "api gateway",
    "bedrock",
    "cloud",
    "serverless",
    "kubernetes",
    "container",
    "docker",
    "devops",
];

/// Minimum length of a fallback answer before it is trusted
pub const MIN_FALLBACK_ANSWER_LENGTH: usize = 50;

/// Where a query should be answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Only university terms matched
    KnowledgeBase,
    /// Only technical terms matched
    TechnicalDoc,
    /// Both or neither vocabulary matched
    General,
}

fn mentions_any(query_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| query_lower.contains(keyword))
}

/// Classify a query by keyword membership
pub fn classify(query: &str) -> Route {
    let query_lower = query.to_lowercase();

    let school = mentions_any(&query_lower, SCHOOL_KEYWORDS);
    let technical = mentions_any(&query_lower, TECHNICAL_KEYWORDS);

    match (school, technical) {
        (true, false) => Route::KnowledgeBase,
        (false, true) => Route::TechnicalDoc,
        _ => Route::General,
    }
}

/// Decide whether a best-effort knowledge base answer is good enough to show.
///
/// Known false negative: a genuine passage that talks about "error codes" or
/// similar is rejected because it contains the word "error".
pub fn accept_fallback_answer(answer: &str) -> bool {
    answer.chars().count() > MIN_FALLBACK_ANSWER_LENGTH
        && !answer.to_lowercase().contains("error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_examples() {
        assert_eq!(classify("lambda function pricing"), Route::TechnicalDoc);
        assert_eq!(classify("trimester start date"), Route::KnowledgeBase);
        assert_eq!(classify("hello"), Route::General);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(
            classify("What is the TRIMESTER schedule?"),
            classify("what is the trimester schedule?")
        );
        assert_eq!(classify("What is the TRIMESTER schedule?"), Route::KnowledgeBase);
        assert_eq!(classify("How do I configure EC2?"), Route::TechnicalDoc);
    }

    #[test]
    fn test_classify_mixed_vocabulary_is_general() {
        assert_eq!(classify("exam on lambda calculus"), Route::General);
    }

    #[test]
    fn test_classify_matches_substrings() {
        // "class" is found inside "classroom"
        assert_eq!(classify("where is the classroom"), Route::KnowledgeBase);
        // "iam" is found inside "William"
        assert_eq!(classify("who is William"), Route::TechnicalDoc);
    }

    #[test]
    fn test_accept_fallback_answer() {
        let long = "The January trimester begins on the sixth of January for all programmes.";
        assert!(accept_fallback_answer(long));

        assert!(!accept_fallback_answer("Too short."));

        let with_error =
            "Registration error codes are listed in the student handbook under section four.";
        assert!(!accept_fallback_answer(with_error));

        let exactly_fifty = "a".repeat(MIN_FALLBACK_ANSWER_LENGTH);
        assert!(!accept_fallback_answer(&exactly_fifty));
    }
}
