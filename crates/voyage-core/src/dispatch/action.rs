use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DispatchError;

/// The closed set of actions the endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GetPlans,
    SavePlan,
    DeletePlan,
    GeneratePlan,
    SearchInfo,
}

impl Action {
    /// Whether the action calls the upstream model.
    pub fn needs_model(self) -> bool {
        matches!(self, Self::GeneratePlan | Self::SearchInfo)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GetPlans => "getPlans",
            Self::SavePlan => "savePlan",
            Self::DeletePlan => "deletePlan",
            Self::GeneratePlan => "generatePlan",
            Self::SearchInfo => "searchInfo",
        };
        f.write_str(s)
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getPlans" => Ok(Self::GetPlans),
            "savePlan" => Ok(Self::SavePlan),
            "deletePlan" => Ok(Self::DeletePlan),
            "generatePlan" => Ok(Self::GeneratePlan),
            "searchInfo" => Ok(Self::SearchInfo),
            other => Err(DispatchError::UnknownAction(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchPayload {
    pub query: String,
}

/// Deserialize an action payload, naming the action in the error.
pub fn parse_payload<T: DeserializeOwned>(action: Action, payload: Value) -> Result<T, DispatchError> {
    serde_json::from_value(payload)
        .map_err(|e| DispatchError::Validation(format!("invalid {action} payload: {e}")))
}

/// `payload.planId`, which must be a JSON integer.
pub fn plan_id(payload: &Value) -> Result<i64, DispatchError> {
    payload
        .get("planId")
        .and_then(Value::as_i64)
        .ok_or_else(|| DispatchError::Validation("planId must be an integer".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_actions() {
        for name in ["getPlans", "savePlan", "deletePlan", "generatePlan", "searchInfo"] {
            let action: Action = name.parse().unwrap();
            assert_eq!(action.to_string(), name);
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(matches!("dropTables".parse::<Action>(), Err(DispatchError::UnknownAction(_))));
        assert!("GETPLANS".parse::<Action>().is_err());
    }

    #[test]
    fn only_generation_and_search_need_model() {
        assert!(Action::GeneratePlan.needs_model());
        assert!(Action::SearchInfo.needs_model());
        assert!(!Action::GetPlans.needs_model());
        assert!(!Action::DeletePlan.needs_model());
    }

    #[test]
    fn plan_id_requires_integer() {
        assert_eq!(plan_id(&json!({"planId": 17})).unwrap(), 17);
        assert!(plan_id(&json!({"planId": "abc"})).is_err());
        assert!(plan_id(&json!({"planId": 1.5})).is_err());
        assert!(plan_id(&json!({})).is_err());
        assert!(plan_id(&Value::Null).is_err());
    }

    #[test]
    fn payload_errors_name_the_field() {
        let err = parse_payload::<SearchPayload>(Action::SearchInfo, json!({})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("searchInfo"), "{msg}");
        assert!(msg.contains("query"), "{msg}");
    }
}
