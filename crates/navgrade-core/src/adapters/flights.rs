//! Flight searches: each required search must be decoded from a results
//! page. Every ground-truth entry is its own requirement group.

use tracing::debug;

use crate::coverage::ScoringPolicy;
use crate::domain::error::{DecodeError, Result};
use crate::domain::goal::GoalSpecification;
use crate::domain::result::{FinalResult, UrlMatchResult};
use crate::metric::Evaluator;
use crate::metrics::METRICS;
use crate::obs;
use crate::payload::{decode_search_url, FlightInfoSpec, FlightQuery};

use super::url_match::{UrlGrader, UrlRule};

pub struct FlightsRule;

impl UrlRule for FlightsRule {
    type Key = FlightQuery;

    const NAME: &'static str = "google_flights_search_match";
    const POLICY: ScoringPolicy = ScoringPolicy::AllOrNothing;
    const NOUN: &'static str = "required flight searches";

    fn key(&self, url: &str) -> Option<FlightQuery> {
        match decode_search_url(url) {
            Ok(query) => Some(query),
            Err(DecodeError::NotSearchPage | DecodeError::MissingParam(_)) => {
                debug!(url = %url, "not a flight search results page");
                None
            }
            Err(err) => {
                METRICS.inc_observations_discarded();
                obs::emit_observation_discarded(Self::NAME, &err);
                None
            }
        }
    }

    fn wrap(result: UrlMatchResult) -> FinalResult {
        FinalResult::GoogleFlightsSearchMatch(result)
    }
}

pub type GoogleFlightsSearchMatch = Evaluator<UrlGrader<FlightsRule>>;

pub fn build(gt_info: &[FlightInfoSpec]) -> Result<GoogleFlightsSearchMatch> {
    let raw: Vec<Vec<FlightInfoSpec>> = gt_info.iter().cloned().map(|i| vec![i]).collect();
    let goal = GoalSpecification::try_from_raw(raw, |info| info.to_query())?;
    Ok(Evaluator::new(UrlGrader::new(FlightsRule, goal)))
}
