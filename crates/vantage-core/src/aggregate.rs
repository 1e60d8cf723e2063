//! Aggregation rules and the default weighted aggregator.
//!
//! A rule groups audit results into items; each item is the weighted mean
//! of its audits' contributions. Audits missing from the results (for
//! example whitelisted out) are skipped. Failed audits contribute zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::audit::{AuditResult, Score};

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

/// What an audit is expected to report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    /// Binary audits: full credit when the score equals this value.
    Binary(bool),
    /// Numeric audits: full credit at or above this threshold, proportional
    /// credit below it.
    Threshold(f64),
}

/// One audit's participation in an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditExpectation {
    #[serde(rename = "value")]
    pub expected: Expected,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// A weighted group of audits inside a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub audits: BTreeMap<String, AuditExpectation>,
}

/// A named category score definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unscored rules report their items but no total.
    #[serde(default = "default_true")]
    pub scored: bool,
    pub items: Vec<AggregationItem>,
}

/// Contribution of one audit to an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubScore {
    pub audit: String,
    pub expected: Expected,
    pub weight: f64,
    /// Raw score reported by the audit; `None` if the audit failed.
    pub value: Option<Score>,
    /// Credit in `[0, 1]`.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemScore {
    pub name: String,
    pub description: String,
    /// Weighted mean of the subscores; `None` when no audit contributed.
    pub overall: Option<f64>,
    pub subscores: Vec<SubScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub name: String,
    pub description: String,
    pub scored: bool,
    /// Mean of the item scores; `None` for unscored rules or when no item
    /// had a score.
    pub total: Option<f64>,
    pub items: Vec<ItemScore>,
}

/// Ordered category scores, one per rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateReport {
    pub categories: Vec<CategoryScore>,
}

impl AggregateReport {
    pub fn category(&self, name: &str) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Malformed aggregation input. Fatal to the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("audit '{audit}' in item '{item}' has invalid weight {weight}")]
    InvalidWeight {
        item: String,
        audit: String,
        weight: f64,
    },

    #[error("audit '{audit}' in item '{item}' has invalid threshold {threshold}")]
    InvalidThreshold {
        item: String,
        audit: String,
        threshold: f64,
    },

    #[error("audit '{audit}' reported malformed score {score}")]
    MalformedScore { audit: String, score: f64 },

    #[error("audit '{audit}' reported a {actual} score but item '{item}' expects a {expected} one")]
    ExpectationMismatch {
        item: String,
        audit: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Folds audit results into category scores.
pub trait Aggregator: Send + Sync {
    fn aggregate(
        &self,
        rules: &[AggregationRule],
        results: &[AuditResult],
    ) -> Result<AggregateReport, AggregationError>;
}

/// Weighted-mean aggregator.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAggregator;

impl Aggregator for WeightedAggregator {
    fn aggregate(
        &self,
        rules: &[AggregationRule],
        results: &[AuditResult],
    ) -> Result<AggregateReport, AggregationError> {
        let by_name: BTreeMap<&str, &AuditResult> =
            results.iter().map(|r| (r.name.as_str(), r)).collect();

        let categories = rules
            .iter()
            .map(|rule| score_rule(rule, &by_name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AggregateReport { categories })
    }
}

fn score_rule(
    rule: &AggregationRule,
    results: &BTreeMap<&str, &AuditResult>,
) -> Result<CategoryScore, AggregationError> {
    let items = rule
        .items
        .iter()
        .map(|item| score_item(item, results))
        .collect::<Result<Vec<_>, _>>()?;

    let total = if rule.scored {
        mean(items.iter().filter_map(|i| i.overall))
    } else {
        None
    };

    Ok(CategoryScore {
        name: rule.name.clone(),
        description: rule.description.clone(),
        scored: rule.scored,
        total,
        items,
    })
}

fn score_item(
    item: &AggregationItem,
    results: &BTreeMap<&str, &AuditResult>,
) -> Result<ItemScore, AggregationError> {
    let mut subscores = Vec::new();
    for (audit, expectation) in &item.audits {
        if !expectation.weight.is_finite() || expectation.weight < 0.0 {
            return Err(AggregationError::InvalidWeight {
                item: item.name.clone(),
                audit: audit.clone(),
                weight: expectation.weight,
            });
        }
        if let Expected::Threshold(threshold) = expectation.expected {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(AggregationError::InvalidThreshold {
                    item: item.name.clone(),
                    audit: audit.clone(),
                    threshold,
                });
            }
        }

        let Some(result) = results.get(audit.as_str()) else {
            continue;
        };
        let value = result.score();
        let score = match value {
            None => 0.0,
            Some(value) => credit(&item.name, audit, expectation.expected, value)?,
        };
        subscores.push(SubScore {
            audit: audit.clone(),
            expected: expectation.expected,
            weight: expectation.weight,
            value,
            score,
        });
    }

    let total_weight: f64 = subscores.iter().map(|s| s.weight).sum();
    let overall = if total_weight > 0.0 {
        Some(subscores.iter().map(|s| s.weight * s.score).sum::<f64>() / total_weight)
    } else {
        None
    };

    Ok(ItemScore {
        name: item.name.clone(),
        description: item.description.clone(),
        overall,
        subscores,
    })
}

fn credit(item: &str, audit: &str, expected: Expected, value: Score) -> Result<f64, AggregationError> {
    match (expected, value) {
        (Expected::Binary(want), Score::Binary(got)) => Ok(if want == got { 1.0 } else { 0.0 }),
        (Expected::Threshold(threshold), Score::Numeric(got)) => {
            if !got.is_finite() || !(0.0..=1.0).contains(&got) {
                return Err(AggregationError::MalformedScore {
                    audit: audit.to_string(),
                    score: got,
                });
            }
            Ok((got / threshold).min(1.0))
        }
        (Expected::Binary(_), Score::Numeric(_)) => Err(AggregationError::ExpectationMismatch {
            item: item.to_string(),
            audit: audit.to_string(),
            expected: "binary",
            actual: "numeric",
        }),
        (Expected::Threshold(_), Score::Binary(_)) => Err(AggregationError::ExpectationMismatch {
            item: item.to_string(),
            audit: audit.to_string(),
            expected: "numeric",
            actual: "binary",
        }),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditError, AuditMeta, AuditOutput};
    use serde_json::json;

    fn completed(name: &str, output: AuditOutput) -> AuditResult {
        AuditResult::completed(&AuditMeta::new(name, "test", name, Vec::<String>::new()), output)
    }

    fn failed(name: &str) -> AuditResult {
        AuditResult::failed(
            &AuditMeta::new(name, "test", name, Vec::<String>::new()),
            &AuditError::Computation("boom".to_string()),
        )
    }

    fn rule(value: serde_json::Value) -> AggregationRule {
        serde_json::from_value(value).expect("rule parses")
    }

    fn pwa_rule() -> AggregationRule {
        rule(json!({
            "name": "Progressive Web App",
            "items": [
                {
                    "name": "Secure",
                    "audits": {
                        "is-on-https": { "value": true, "weight": 3 },
                        "redirects-http": { "value": true }
                    }
                },
                {
                    "name": "Fast",
                    "audits": { "first-meaningful-paint": { "value": 0.5 } }
                }
            ]
        }))
    }

    #[test]
    fn test_weighted_mean() {
        let results = vec![
            completed("is-on-https", AuditOutput::binary(true)),
            completed("redirects-http", AuditOutput::binary(false)),
            completed("first-meaningful-paint", AuditOutput::numeric(0.25)),
        ];
        let report = WeightedAggregator
            .aggregate(&[pwa_rule()], &results)
            .unwrap();
        let category = report.category("Progressive Web App").unwrap();

        assert_eq!(category.items[0].overall, Some(0.75));
        assert_eq!(category.items[1].overall, Some(0.5));
        assert_eq!(category.total, Some(0.625));
    }

    #[test]
    fn test_failed_audit_scores_zero() {
        let results = vec![
            failed("is-on-https"),
            completed("redirects-http", AuditOutput::binary(true)),
        ];
        let report = WeightedAggregator
            .aggregate(&[pwa_rule()], &results)
            .unwrap();
        let secure = &report.categories[0].items[0];
        assert_eq!(secure.overall, Some(0.25));
        assert_eq!(secure.subscores[0].value, None);
    }

    #[test]
    fn test_missing_audits_are_skipped() {
        let results = vec![completed("is-on-https", AuditOutput::binary(true))];
        let report = WeightedAggregator
            .aggregate(&[pwa_rule()], &results)
            .unwrap();
        let category = &report.categories[0];
        assert_eq!(category.items[0].overall, Some(1.0));
        assert_eq!(category.items[1].overall, None);
        assert_eq!(category.total, Some(1.0));
    }

    #[test]
    fn test_unscored_rule_has_no_total() {
        let mut unscored = pwa_rule();
        unscored.scored = false;
        let results = vec![completed("is-on-https", AuditOutput::binary(true))];
        let report = WeightedAggregator
            .aggregate(&[unscored], &results)
            .unwrap();
        assert_eq!(report.categories[0].total, None);
    }

    #[test]
    fn test_mismatched_score_kind_fails() {
        let results = vec![completed("is-on-https", AuditOutput::numeric(0.9))];
        let err = WeightedAggregator
            .aggregate(&[pwa_rule()], &results)
            .unwrap_err();
        assert!(matches!(err, AggregationError::ExpectationMismatch { .. }));
    }

    #[test]
    fn test_out_of_range_numeric_score_fails() {
        let results = vec![completed("first-meaningful-paint", AuditOutput::numeric(4.0))];
        let err = WeightedAggregator
            .aggregate(&[pwa_rule()], &results)
            .unwrap_err();
        assert_eq!(
            err,
            AggregationError::MalformedScore {
                audit: "first-meaningful-paint".to_string(),
                score: 4.0
            }
        );
    }

    #[test]
    fn test_negative_weight_fails() {
        let bad = rule(json!({
            "name": "Bad",
            "items": [{ "name": "i", "audits": { "x": { "value": true, "weight": -1 } } }]
        }));
        let err = WeightedAggregator.aggregate(&[bad], &[]).unwrap_err();
        assert!(matches!(err, AggregationError::InvalidWeight { .. }));
    }
}
