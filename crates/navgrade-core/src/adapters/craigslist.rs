//! Classified-listing searches: every required search must have been run
//! with exactly the right filters.

use crate::canonical::craigslist::param_set;
use crate::canonical::QueryParams;
use crate::coverage::ScoringPolicy;
use crate::domain::error::{GradeError, Result};
use crate::domain::goal::GoalSpecification;
use crate::domain::result::{FinalResult, UrlMatchResult};
use crate::metric::Evaluator;

use super::url_match::{UrlGrader, UrlRule};

pub struct CraigslistRule;

impl UrlRule for CraigslistRule {
    type Key = QueryParams;

    const NAME: &'static str = "craigslist_url_match";
    const POLICY: ScoringPolicy = ScoringPolicy::Fractional;
    const NOUN: &'static str = "required URLs";

    fn key(&self, url: &str) -> Option<QueryParams> {
        Some(param_set(url))
    }

    fn wrap(result: UrlMatchResult) -> FinalResult {
        FinalResult::CraigslistUrlMatch(result)
    }
}

pub type CraigslistUrlMatch = Evaluator<UrlGrader<CraigslistRule>>;

/// Build from groups × alternatives of ground-truth URLs.
pub fn build(gt_urls: &[Vec<String>]) -> Result<CraigslistUrlMatch> {
    let goal = GoalSpecification::try_from_raw(gt_urls.to_vec(), |url| {
        if url.trim().is_empty() {
            return Err(GradeError::config("empty ground-truth URL"));
        }
        Ok(param_set(&url))
    })?;
    Ok(Evaluator::new(UrlGrader::new(CraigslistRule, goal)))
}
