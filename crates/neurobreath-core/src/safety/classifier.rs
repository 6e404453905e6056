//! Crisis indicator matching.
//!
//! The pipeline only sees the [`SafetyClassifier`] trait; [`KeywordClassifier`] is the
//! default phrase-list implementation and can be swapped for a stronger model without
//! touching the gate.

use super::SafetyLevel;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classification failed: {0}")]
    Failed(String),
}

/// Result of matching one query against the indicator lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub level: SafetyLevel,
    pub matched: Vec<String>,
}

impl Classification {
    pub fn none() -> Self {
        Self {
            level: SafetyLevel::None,
            matched: Vec::new(),
        }
    }
}

pub trait SafetyClassifier: Send + Sync {
    fn classify(&self, query: &str) -> Result<Classification, ClassifierError>;
}

/// Phrase lists grouped by the level they escalate to.
#[derive(Debug, Clone)]
pub struct IndicatorLists {
    /// 999 / A&E territory.
    pub emergency: Vec<String>,
    /// Child protection, abuse.
    pub safeguarding: Vec<String>,
    /// Mental health crisis.
    pub crisis: Vec<String>,
    /// NHS 111 territory.
    pub urgent: Vec<String>,
}

const EMERGENCY_PHRASES: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "overdose",
    "self-harm crisis",
    "immediate danger",
    "life threatening",
    "chest pain",
    "severe bleeding",
    "can't breathe",
    "unconscious",
];

const SAFEGUARDING_PHRASES: &[&str] = &[
    "abuse",
    "being hurt",
    "unsafe at home",
    "adult hurting me",
    "someone touching me",
    "scared of my dad",
    "scared of my mum",
    "scared of my mom",
    "scared of my parent",
    "scared of my stepdad",
    "scared of my stepmum",
    "scared of my partner",
    "scared to go home",
    "child protection",
    "domestic violence",
    "neglect",
];

const CRISIS_PHRASES: &[&str] = &[
    "self-harm",
    "hurting myself",
    "suicidal thoughts",
    "want to die",
    "hopeless",
    "no point",
    "better off dead",
];

const URGENT_PHRASES: &[&str] = &[
    "very depressed",
    "can't cope",
    "urgent help",
    "crisis",
    "breakdown",
    "severe anxiety",
    "panic attack lasting hours",
    "not eating",
    "can't sleep for days",
];

impl Default for IndicatorLists {
    fn default() -> Self {
        fn owned(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            emergency: owned(EMERGENCY_PHRASES),
            safeguarding: owned(SAFEGUARDING_PHRASES),
            crisis: owned(CRISIS_PHRASES),
            urgent: owned(URGENT_PHRASES),
        }
    }
}

/// Case-insensitive substring matcher. Levels are checked highest first and the first
/// level with any hit wins.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    lists: IndicatorLists,
}

impl KeywordClassifier {
    pub fn new(lists: IndicatorLists) -> Self {
        Self { lists }
    }

    fn hits(list: &[String], haystack: &str) -> Vec<String> {
        list.iter()
            .filter(|phrase| haystack.contains(&phrase.to_lowercase()))
            .cloned()
            .collect()
    }
}

impl SafetyClassifier for KeywordClassifier {
    fn classify(&self, query: &str) -> Result<Classification, ClassifierError> {
        let lower = query.to_lowercase().replace('\u{2019}', "'");
        let ordered = [
            (SafetyLevel::Emergency, &self.lists.emergency),
            (SafetyLevel::Safeguarding, &self.lists.safeguarding),
            (SafetyLevel::Crisis, &self.lists.crisis),
            (SafetyLevel::Urgent, &self.lists.urgent),
        ];
        for (level, list) in ordered {
            let matched = Self::hits(list, &lower);
            if !matched.is_empty() {
                return Ok(Classification { level, matched });
            }
        }
        Ok(Classification::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> Classification {
        KeywordClassifier::default().classify(q).unwrap()
    }

    #[test]
    fn emergency_phrase_wins_over_lower_levels() {
        let c = classify("I feel hopeless and want to kill myself");
        assert_eq!(c.level, SafetyLevel::Emergency);
        assert_eq!(c.matched, vec!["kill myself".to_string()]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify("SUICIDE hotline").level, SafetyLevel::Emergency);
        assert_eq!(classify("Domestic Violence at home").level, SafetyLevel::Safeguarding);
    }

    #[test]
    fn curly_apostrophe_still_matches() {
        assert_eq!(classify("I can\u{2019}t cope anymore").level, SafetyLevel::Urgent);
    }

    #[test]
    fn ordinary_questions_are_none() {
        assert_eq!(classify("what works for low mood").level, SafetyLevel::None);
        assert_eq!(classify("how do I get to the breathing tools").level, SafetyLevel::None);
    }

    #[test]
    fn everyday_fears_are_not_safeguarding() {
        assert_eq!(
            classify("my son is scared of the dark, what helps with sleep?").level,
            SafetyLevel::None
        );
        assert_eq!(classify("I'm scared of exams").level, SafetyLevel::None);
        assert_eq!(classify("I'm scared to go home tonight").level, SafetyLevel::Safeguarding);
        assert_eq!(classify("she is scared of my partner").level, SafetyLevel::Safeguarding);
    }

    #[test]
    fn custom_lists_replace_defaults() {
        let classifier = KeywordClassifier::new(IndicatorLists {
            emergency: vec!["red alert".into()],
            safeguarding: vec![],
            crisis: vec![],
            urgent: vec![],
        });
        assert_eq!(classifier.classify("suicide").unwrap().level, SafetyLevel::None);
        assert_eq!(classifier.classify("Red Alert now").unwrap().level, SafetyLevel::Emergency);
    }
}
