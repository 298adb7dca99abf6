use serde::{Deserialize, Serialize};
use sonic_rs::{JsonContainerTrait, JsonValueTrait, Value};

/// Keys under which the AI service has been seen to place the day plans.
const DAY_PLAN_KEYS: [&str; 3] = ["itinerary", "days", "dailyPlan"];

/// The structured trip plan produced by the AI service.
///
/// Its contents are opaque to the workflow: the only guarantee is that the raw
/// text decoded as well-formed JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedItinerary(Value);

impl GeneratedItinerary {
    /// Wraps an already decoded document.
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// The decoded document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Best-effort count of day plans, for display only.
    pub fn day_count(&self) -> Option<usize> {
        if let Some(days) = self.0.as_array() {
            return Some(days.len());
        }

        DAY_PLAN_KEYS
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|plans| plans.as_array().map(|a| a.len()).or_else(|| plans.as_object().map(|o| o.len())))
    }
}
