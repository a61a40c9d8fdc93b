/// Ranking weights, penalties and boosts

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingCriteria {
    // Core weights, always normalized to sum to 1.0
    pub relevance_weight: f64,
    pub urgency_weight: f64,
    pub confidence_weight: f64,
    pub personalization_weight: f64,

    // Context weights
    pub context_fit_weight: f64,
    pub timing_weight: f64,
    pub pattern_match_weight: f64,

    pub recency_penalty: f64,
    pub repetition_penalty: f64,
    pub complexity_penalty: f64,

    pub productivity_boost: f64,
    pub focus_boost: f64,
    pub goal_alignment_boost: f64,

    pub learning_rate: f64,
    pub exploration_factor: f64,
    /// Largest share of the results a single suggestion type may take
    pub diversity_target: f64,
}

impl Default for RankingCriteria {
    fn default() -> Self {
        Self {
            relevance_weight: 0.30,
            urgency_weight: 0.25,
            confidence_weight: 0.20,
            personalization_weight: 0.25,
            context_fit_weight: 0.15,
            timing_weight: 0.10,
            pattern_match_weight: 0.15,
            recency_penalty: 0.2,
            repetition_penalty: 0.3,
            complexity_penalty: 0.1,
            productivity_boost: 0.15,
            focus_boost: 0.10,
            goal_alignment_boost: 0.20,
            learning_rate: 0.1,
            exploration_factor: 0.2,
            diversity_target: 0.3,
        }
    }
}

impl RankingCriteria {
    pub fn core_weight_sum(&self) -> f64 {
        self.relevance_weight + self.urgency_weight + self.confidence_weight + self.personalization_weight
    }

    /// Rescale the four core weights so they sum to 1.0. Negative weights are
    /// floored at zero first; if nothing is left the defaults come back.
    pub fn normalize(&mut self) {
        self.relevance_weight = self.relevance_weight.max(0.0);
        self.urgency_weight = self.urgency_weight.max(0.0);
        self.confidence_weight = self.confidence_weight.max(0.0);
        self.personalization_weight = self.personalization_weight.max(0.0);

        let total = self.core_weight_sum();
        if total <= f64::EPSILON || !total.is_finite() {
            let defaults = Self::default();
            self.relevance_weight = defaults.relevance_weight;
            self.urgency_weight = defaults.urgency_weight;
            self.confidence_weight = defaults.confidence_weight;
            self.personalization_weight = defaults.personalization_weight;
            return;
        }

        self.relevance_weight /= total;
        self.urgency_weight /= total;
        self.confidence_weight /= total;
        self.personalization_weight /= total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_sum_to_one() {
        assert!((RankingCriteria::default().core_weight_sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_all_zero_restores_defaults() {
        let mut criteria = RankingCriteria {
            relevance_weight: 0.0,
            urgency_weight: 0.0,
            confidence_weight: 0.0,
            personalization_weight: 0.0,
            ..Default::default()
        };
        criteria.normalize();
        assert_eq!(criteria.relevance_weight, 0.30);
    }

    proptest! {
        #[test]
        fn normalize_sums_to_one(
            r in 0.0f64..5.0,
            u in 0.0f64..5.0,
            c in 0.0f64..5.0,
            p in 0.01f64..5.0,
        ) {
            let mut criteria = RankingCriteria {
                relevance_weight: r,
                urgency_weight: u,
                confidence_weight: c,
                personalization_weight: p,
                ..Default::default()
            };
            criteria.normalize();
            prop_assert!((criteria.core_weight_sum() - 1.0).abs() < 1e-9);
        }
    }
}
