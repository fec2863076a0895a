use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A floor plan owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub walls: Vec<Value>,
    #[serde(default)]
    pub elements: Vec<Value>,
    #[serde(default)]
    pub objects: Vec<Value>,
}

impl Plan {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            id: self.id.to_string(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewPlan {
    pub user_id: Uuid,
    pub name: String,
    pub walls: Vec<Value>,
    pub elements: Vec<Value>,
    pub objects: Vec<Value>,
}

/// List entry: id and name only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: String,
    pub name: String,
}
