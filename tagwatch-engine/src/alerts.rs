//! Threshold rule evaluation.

use std::collections::BTreeMap;

use tagwatch_types::{AlertEvaluation, AlertRule, TagId, TagValue};

/// Holds the current rule set and evaluates it against tag values.
///
/// Evaluation depends only on the values passed in and the rules; nothing
/// is remembered between calls, so an alert stays triggered for exactly as
/// long as its condition holds.
#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    rules: Vec<AlertRule>,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<AlertRule>) -> Self {
        Self { rules }
    }

    /// Replace the whole rule set.
    pub fn set_rules(&mut self, rules: Vec<AlertRule>) {
        self.rules = rules;
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Triggered rules, in rule order.
    ///
    /// Rules whose tag is absent from `values` are skipped.
    pub fn evaluate(&self, values: &BTreeMap<TagId, TagValue>) -> Vec<AlertEvaluation> {
        self.evaluate_all(values)
            .into_iter()
            .filter(|e| e.triggered)
            .collect()
    }

    /// Every rule whose tag is present in `values`, triggered or not.
    pub fn evaluate_all(&self, values: &BTreeMap<TagId, TagValue>) -> Vec<AlertEvaluation> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let value = *values.get(&rule.tag_id)?;
                Some(AlertEvaluation {
                    rule: rule.clone(),
                    value,
                    triggered: rule.matches(&value),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, TagValue)]) -> BTreeMap<TagId, TagValue> {
        pairs.iter().map(|(id, v)| (id.to_string(), *v)).collect()
    }

    #[test]
    fn greater_than_triggers_above_threshold() {
        let engine = AlertEngine::with_rules(vec![AlertRule::greater_than("T", 40.0, "high")]);

        let triggered = engine.evaluate(&values(&[("T", TagValue::Number(42.0))]));
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].rule.message, "high");
        assert_eq!(triggered[0].value, TagValue::Number(42.0));

        assert!(engine.evaluate(&values(&[("T", TagValue::Number(39.0))])).is_empty());
    }

    #[test]
    fn equal_does_not_coerce_booleans() {
        let engine = AlertEngine::with_rules(vec![AlertRule::equal("T", 1.0, "on")]);
        assert!(engine.evaluate(&values(&[("T", TagValue::Bool(true))])).is_empty());
        assert_eq!(
            engine.evaluate(&values(&[("T", TagValue::Number(1.0))])).len(),
            1
        );
    }

    #[test]
    fn ordering_comparisons_coerce_booleans() {
        let engine = AlertEngine::with_rules(vec![AlertRule::greater_than("T", 0.5, "on")]);
        assert_eq!(engine.evaluate(&values(&[("T", TagValue::Bool(true))])).len(), 1);
        assert!(engine.evaluate(&values(&[("T", TagValue::Bool(false))])).is_empty());
    }

    #[test]
    fn rules_for_absent_tags_are_skipped() {
        let engine = AlertEngine::with_rules(vec![
            AlertRule::less_than("gone", 10.0, "low"),
            AlertRule::less_than("T", 10.0, "low"),
        ]);
        let all = engine.evaluate_all(&values(&[("T", TagValue::Number(5.0))]));
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].rule.tag_id, "T");
    }

    #[test]
    fn results_follow_rule_order() {
        let engine = AlertEngine::with_rules(vec![
            AlertRule::greater_than("b", 0.0, "second tag first"),
            AlertRule::greater_than("a", 0.0, "first tag second"),
            AlertRule::less_than("a", 100.0, "also a"),
        ]);
        let triggered = engine.evaluate(&values(&[
            ("a", TagValue::Number(1.0)),
            ("b", TagValue::Number(1.0)),
        ]));
        let messages: Vec<&str> = triggered.iter().map(|e| e.rule.message.as_str()).collect();
        assert_eq!(messages, vec!["second tag first", "first tag second", "also a"]);
    }

    #[test]
    fn evaluate_all_keeps_untriggered() {
        let engine = AlertEngine::with_rules(vec![AlertRule::greater_than("T", 40.0, "high")]);
        let all = engine.evaluate_all(&values(&[("T", TagValue::Number(39.0))]));
        assert_eq!(all.len(), 1);
        assert!(!all[0].triggered);
    }

    #[test]
    fn set_rules_round_trip() {
        let rules = vec![
            AlertRule::greater_than("a", 1.0, "x"),
            AlertRule::equal("b", 0.0, "y"),
            AlertRule::less_than("a", -1.0, "z"),
        ];
        let mut engine = AlertEngine::new();
        engine.set_rules(vec![AlertRule::equal("old", 1.0, "replaced")]);
        engine.set_rules(rules.clone());
        assert_eq!(engine.rules(), rules.as_slice());
    }
}
