//! Per-domain evaluators.
//!
//! Every adapter is a [`Grader`](crate::metric::Grader) wrapped in the shared
//! [`Evaluator`](crate::metric::Evaluator). [`build`] turns a task's
//! [`EvaluatorConfig`] into a ready-to-use, type-erased evaluator.

pub mod apartments;
pub mod craigslist;
pub mod flights;
pub mod opentable;
pub mod resy;
pub mod url_match;

use tracing::info;

use crate::domain::error::Result;
use crate::domain::task::EvaluatorConfig;
use crate::metric::MetricContract;
use crate::scripts::ScriptRegistry;

/// Construct the evaluator a config names.
///
/// Fails with [`GradeError::Configuration`](crate::GradeError::Configuration)
/// when the goal is malformed or a required extraction script is missing.
pub fn build(config: &EvaluatorConfig, scripts: &ScriptRegistry) -> Result<Box<dyn MetricContract>> {
    let evaluator: Box<dyn MetricContract> = match config {
        EvaluatorConfig::CraigslistUrlMatch { gt_urls } => Box::new(craigslist::build(gt_urls)?),
        EvaluatorConfig::ApartmentsUrlMatch { gt_url } => {
            Box::new(apartments::build(gt_url.clone().into_vec())?)
        }
        EvaluatorConfig::GoogleFlightsSearchMatch { gt_info } => {
            Box::new(flights::build(gt_info)?)
        }
        EvaluatorConfig::ResyUrlMatch { queries } => Box::new(resy::build(queries, scripts)?),
        EvaluatorConfig::OpenTableInfoGathering { queries } => {
            Box::new(opentable::build(queries, scripts)?)
        }
    };
    info!(evaluator = evaluator.name(), "evaluator constructed");
    Ok(evaluator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_names_match_config_kind() {
        let configs = [
            json!({"evaluator": "craigslist_url_match", "gt_urls": [["https://sfbay.craigslist.org/search/apa?a=1"]]}),
            json!({"evaluator": "apartments_url_match", "gt_url": "https://www.apartments.com/chelsea-new-york-ny/"}),
            json!({"evaluator": "resy_url_match", "queries": [["https://resy.com/cities/ny/venues/x?date=2025-07-01&seats=2&time=1900"]]}),
            json!({"evaluator": "open_table_info_gathering", "queries": [[{"restaurant_names": ["Lilia"]}]]}),
        ];
        let scripts = ScriptRegistry::embedded();
        for raw in configs {
            let config: EvaluatorConfig = serde_json::from_value(raw).expect("config");
            let evaluator = build(&config, &scripts).expect("build");
            assert_eq!(evaluator.name(), config.kind());
        }
    }

    #[test]
    fn test_malformed_goal_is_configuration_error() {
        let config = EvaluatorConfig::CraigslistUrlMatch { gt_urls: vec![] };
        let err = build(&config, &ScriptRegistry::embedded())
            .err()
            .expect("should fail");
        assert!(matches!(err, crate::domain::error::GradeError::Configuration(_)));
    }
}
