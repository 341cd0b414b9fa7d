//! Mode classification from trigger words

use neo_config::VocabularyConfig;
use neo_core::Mode;

/// Substring-based intent router
///
/// Strong triggers win over weak ones; a message with neither is general.
#[derive(Debug, Clone)]
pub struct ModeClassifier {
    strong: Vec<String>,
    weak: Vec<String>,
}

impl Default for ModeClassifier {
    fn default() -> Self {
        Self::new(&VocabularyConfig::default())
    }
}

impl ModeClassifier {
    pub fn new(vocabulary: &VocabularyConfig) -> Self {
        Self {
            strong: vocabulary.strong_triggers.clone(),
            weak: vocabulary.weak_triggers.clone(),
        }
    }

    pub fn classify(&self, message: &str) -> Mode {
        let lowered = message.to_lowercase();

        if self.strong.iter().any(|t| lowered.contains(t.as_str())) {
            Mode::RagStrong
        } else if self.weak.iter().any(|t| lowered.contains(t.as_str())) {
            Mode::RagWeak
        } else {
            Mode::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_beats_weak() {
        let router = ModeClassifier::default();
        assert_eq!(
            router.classify("What is the Cogneoverse internal architecture?"),
            Mode::RagStrong
        );
    }

    #[test]
    fn test_weak_trigger() {
        let router = ModeClassifier::default();
        assert_eq!(router.classify("Tell me about internal docs"), Mode::RagWeak);
    }

    #[test]
    fn test_general() {
        let router = ModeClassifier::default();
        assert_eq!(router.classify("hi there"), Mode::General);
        assert_eq!(router.classify(""), Mode::General);
    }

    #[test]
    fn test_case_insensitive_substring() {
        let router = ModeClassifier::default();
        assert_eq!(router.classify("ORION status?"), Mode::RagStrong);
        // substring semantics: "neo" inside "neon"
        assert_eq!(router.classify("neon lights"), Mode::RagStrong);
        assert_eq!(router.classify("ecosystems"), Mode::RagWeak);
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocab = VocabularyConfig {
            strong_triggers: vec!["atlas".to_string()],
            weak_triggers: vec![],
            ..Default::default()
        };
        let router = ModeClassifier::new(&vocab);
        assert_eq!(router.classify("Atlas roadmap"), Mode::RagStrong);
        assert_eq!(router.classify("internal docs"), Mode::General);
    }
}
