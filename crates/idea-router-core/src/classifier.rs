//! Keyword classification of incoming ideas.
//!
//! Priority comes from urgent/deferred word lists, category from an ordered
//! list of keyword rules. Rules are plain data: the built-in Russian set can
//! be replaced by a JSON file without code changes.
//!
//! Matching is substring containment on lower-cased text, so word stems such
//! as `"разработ"` match every inflected form. The first matching category in
//! declaration order wins.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::types::{Assignee, Classification, Priority};

/// Category used when no rule matches.
pub const DEFAULT_CATEGORY: &str = "общее";

/// One category with its keywords and owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default = "Assignee::unassigned")]
    pub assignee: Assignee,
}

impl CategoryRule {
    fn new(name: &str, keywords: &[&str], assignee: &str, tracker_id: u32) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            assignee: Assignee {
                name: assignee.to_string(),
                tracker_id,
            },
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Word lists and category rules driving [`Classifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRules {
    /// Any of these makes the idea high priority.
    pub urgent: Vec<String>,
    /// Any of these (and no urgent term) makes the idea low priority.
    pub deferred: Vec<String>,
    /// Ordered; earlier rules win.
    pub categories: Vec<CategoryRule>,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "Assignee::unassigned")]
    pub default_assignee: Assignee,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            urgent: ["срочн", "немедленн", "asap", "критичн", "сегодня же"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            deferred: ["потом", "когда-нибудь", "позже", "на будущее", "не горит", "со временем"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            categories: vec![
                CategoryRule::new(
                    "разработка",
                    &["api", "код", "баг", "разработ", "сервер", "приложени", "сайт", "интеграц", "база данных"],
                    "Технический директор",
                    2,
                ),
                CategoryRule::new(
                    "маркетинг",
                    &["маркетинг", "реклам", "продвижени", "smm", "контент", "бренд", "соцсет"],
                    "Маркетолог",
                    3,
                ),
                CategoryRule::new(
                    "продажи",
                    &["продаж", "клиент", "сделк", "заказ", "коммерческ", "воронк"],
                    "Руководитель отдела продаж",
                    4,
                ),
                CategoryRule::new(
                    "финансы",
                    &["бюджет", "финанс", "оплат", "счет", "счёт", "расход", "деньг"],
                    "Финансовый директор",
                    5,
                ),
                CategoryRule::new(
                    "персонал",
                    &["сотрудник", "найм", "ваканси", "обучени", "команд", "hr"],
                    "HR-менеджер",
                    6,
                ),
            ],
            default_category: default_category(),
            default_assignee: Assignee::unassigned(),
        }
    }
}

impl ClassifierRules {
    /// Load rules from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let rules = serde_json::from_str(&content)?;
        Ok(rules)
    }

    /// Lower-case every keyword so matching only lower-cases the input.
    fn normalized(mut self) -> Self {
        let lower = |list: &mut Vec<String>| {
            for word in list.iter_mut() {
                *word = word.to_lowercase();
            }
            list.retain(|w| !w.is_empty());
        };
        lower(&mut self.urgent);
        lower(&mut self.deferred);
        for rule in &mut self.categories {
            lower(&mut rule.keywords);
        }
        self
    }
}

/// Pure keyword classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: ClassifierRules,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierRules::default())
    }
}

impl Classifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self {
            rules: rules.normalized(),
        }
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Classify a message text. Never fails.
    pub fn classify(&self, text: &str) -> Classification {
        let text = text.to_lowercase();

        let priority = self.priority(&text);
        let (category, assignee) = match self
            .rules
            .categories
            .iter()
            .find(|rule| contains_any(&text, &rule.keywords))
        {
            Some(rule) => (rule.name.clone(), rule.assignee.clone()),
            None => (
                self.rules.default_category.clone(),
                self.rules.default_assignee.clone(),
            ),
        };

        debug!(category = %category, priority = %priority, "Message classified");

        Classification {
            category,
            priority,
            assignee,
        }
    }

    fn priority(&self, text: &str) -> Priority {
        if contains_any(text, &self.rules.urgent) {
            Priority::High
        } else if contains_any(text, &self.rules.deferred) {
            Priority::Low
        } else {
            Priority::Medium
        }
    }
}

fn contains_any(text: &str, words: &[String]) -> bool {
    words.iter().any(|w| starts_word_in(text, w))
}

/// Whether `keyword` occurs in `text` at the start of a word.
///
/// Stems still match inflected forms ("срочн" in "срочно"), but not words
/// that merely contain them ("несрочная").
fn starts_word_in(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(idx, _)| {
        text[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn classify(text: &str) -> Classification {
        Classifier::default().classify(text)
    }

    #[test]
    fn test_urgent_update_is_development_high() {
        let c = classify("срочно нужно обновить API");
        assert_eq!(c.category, "разработка");
        assert_eq!(c.priority, Priority::High);
        assert_eq!(c.priority.label(), "высокий");
        assert_eq!(c.assignee.name, "Технический директор");
    }

    #[test]
    fn test_urgent_wins_over_deferred() {
        let c = classify("Срочно, но можно и позже: поправить рекламу");
        assert_eq!(c.priority, Priority::High);
    }

    #[test]
    fn test_urgent_is_case_insensitive() {
        assert_eq!(classify("ASAP").priority, Priority::High);
        assert_eq!(classify("СРОЧНО").priority, Priority::High);
    }

    #[test]
    fn test_not_burning_is_low() {
        let c = classify("это не горит, сделаем потом");
        assert_eq!(c.priority, Priority::Low);
    }

    #[test]
    fn test_negated_urgency_is_not_high() {
        assert_eq!(classify("несрочная мысль").priority, Priority::Medium);
        assert_eq!(classify("несрочно, можно позже").priority, Priority::Low);
    }

    #[test]
    fn test_keywords_match_at_word_start_only() {
        assert!(starts_word_in("срочно нужно", "срочн"));
        assert!(starts_word_in("очень срочно", "срочн"));
        assert!(starts_word_in("(срочно)", "срочн"));
        assert!(!starts_word_in("несрочно", "срочн"));
        assert!(starts_word_in("это не горит", "не горит"));
        assert!(starts_word_in("когда-нибудь потом", "когда-нибудь"));
    }

    #[test]
    fn test_deferred_is_low() {
        let c = classify("когда-нибудь сделать рассылку");
        assert_eq!(c.priority, Priority::Low);
    }

    #[test]
    fn test_single_category_match() {
        assert_eq!(classify("запустить рекламу в соцсетях").category, "маркетинг");
        assert_eq!(classify("новый клиент просит скидку").category, "продажи");
        assert_eq!(classify("пересмотреть бюджет на квартал").category, "финансы");
        assert_eq!(classify("открыть вакансию дизайнера").category, "персонал");
    }

    #[test]
    fn test_earlier_category_wins() {
        // "реклам" is marketing, "клиент" is sales; marketing is declared first.
        let c = classify("реклама для нового клиента");
        assert_eq!(c.category, "маркетинг");

        // "сайт" is development and declared before marketing.
        let c = classify("реклама на сайте");
        assert_eq!(c.category, "разработка");
    }

    #[test]
    fn test_no_match_is_general_medium() {
        let c = classify("просто мысль вслух");
        assert_eq!(c.category, DEFAULT_CATEGORY);
        assert_eq!(c.priority, Priority::Medium);
        assert_eq!(c.assignee, Assignee::unassigned());
    }

    #[test]
    fn test_empty_text_is_general_medium() {
        let c = classify("");
        assert_eq!(c.category, "общее");
        assert_eq!(c.priority, Priority::Medium);
    }

    #[test]
    fn test_custom_rules_are_normalized() {
        let rules = ClassifierRules {
            urgent: vec!["NOW".to_string()],
            deferred: vec![],
            categories: vec![CategoryRule {
                name: "ops".to_string(),
                keywords: vec!["Deploy".to_string(), String::new()],
                assignee: Assignee::unassigned(),
            }],
            default_category: "misc".to_string(),
            default_assignee: Assignee::unassigned(),
        };
        let classifier = Classifier::new(rules);

        let c = classifier.classify("deploy it now");
        assert_eq!(c.category, "ops");
        assert_eq!(c.priority, Priority::High);

        // The empty keyword was dropped instead of matching everything.
        assert_eq!(classifier.classify("hello").category, "misc");
    }

    #[test]
    fn test_rules_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "urgent": ["urgent"],
                "deferred": ["later"],
                "categories": [
                    {{"name": "dev", "keywords": ["bug"], "assignee": {{"name": "Ann", "tracker_id": 7}}}}
                ]
            }}"#
        )
        .unwrap();

        let rules = ClassifierRules::from_file(file.path()).unwrap();
        assert_eq!(rules.default_category, DEFAULT_CATEGORY);

        let c = Classifier::new(rules).classify("fix this bug later");
        assert_eq!(c.category, "dev");
        assert_eq!(c.priority, Priority::Low);
        assert_eq!(c.assignee.tracker_id, 7);
    }

    #[test]
    fn test_rules_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            ClassifierRules::from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
