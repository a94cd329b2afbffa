//! Apartment searches: the agent must reach the canonical results page.

use crate::canonical::apartments::canonicalize;
use crate::coverage::ScoringPolicy;
use crate::domain::error::{GradeError, Result};
use crate::domain::goal::GoalSpecification;
use crate::domain::result::{FinalResult, UrlMatchResult};
use crate::metric::Evaluator;

use super::url_match::{UrlGrader, UrlRule};

pub struct ApartmentsRule;

impl UrlRule for ApartmentsRule {
    type Key = String;

    const NAME: &'static str = "apartments_url_match";
    const POLICY: ScoringPolicy = ScoringPolicy::AllOrNothing;
    const NOUN: &'static str = "required URLs";

    fn key(&self, url: &str) -> Option<String> {
        Some(canonicalize(url))
    }

    fn wrap(result: UrlMatchResult) -> FinalResult {
        FinalResult::ApartmentsUrlMatch(result)
    }
}

pub type ApartmentsUrlMatch = Evaluator<UrlGrader<ApartmentsRule>>;

/// Build from the acceptable ground-truth URLs (a single requirement group).
pub fn build(gt_urls: Vec<String>) -> Result<ApartmentsUrlMatch> {
    let goal = GoalSpecification::try_from_raw(vec![gt_urls], |url| {
        let canonical = canonicalize(&url);
        if canonical.is_empty() {
            return Err(GradeError::config("empty ground-truth URL"));
        }
        Ok(canonical)
    })?;
    Ok(Evaluator::new(UrlGrader::new(ApartmentsRule, goal)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricContract, StepInputs};

    #[tokio::test]
    async fn test_any_alternative_matches() {
        let ev = build(vec![
            "https://www.apartments.com/apartments/hudson-yards-new-york-ny/2-to-3-bedrooms/?n=midtown-west_new-york_ny".into(),
            "https://www.apartments.com/hudson-yards-new-york-ny/2-to-3-bedrooms/?n=midtown-west_new-york_ny".into(),
        ])
        .expect("build");
        ev.reset();
        ev.update(StepInputs::url("https://www.apartments.com/")).await;
        assert_eq!(ev.compute().score(), 0.0);
        ev.update(StepInputs::url(
            "https://www.apartments.com/midtown-west-new-york-ny/2-to-3-bedrooms/?n=hudson-yards_new-york_ny&bb=zzz",
        ))
        .await;
        assert_eq!(ev.compute().score(), 1.0);
    }

    #[test]
    fn test_empty_ground_truth_rejected() {
        assert!(build(vec![]).is_err());
        assert!(build(vec![String::new()]).is_err());
    }
}
