// handlers/protected/plans.rs - Plan documents owned by the authenticated caller
//
// Every lookup and mutation filters on both the plan id and the caller's user id. A plan
// owned by someone else is reported exactly like a plan that does not exist.

use axum::extract::{rejection::JsonRejection, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{NewPlan, Plan, PlanSummary};
use crate::database::{filter, Document, Filter, ID_FIELD};
use crate::error::ApiError;
use crate::handlers::{require_fields, MessageResponse};
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub id: Option<String>,
}

/// GET body: one full plan when an id was given, otherwise the caller's plan list
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PlanListing {
    One(Plan),
    Many(Vec<PlanSummary>),
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub name: Option<String>,
    pub walls: Option<Vec<Value>>,
    pub elements: Option<Vec<Value>>,
    pub objects: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPlan {
    pub id: String,
    pub name: String,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub walls: Option<Vec<Value>>,
    pub elements: Option<Vec<Value>>,
    pub objects: Option<Vec<Value>>,
}

impl UpdatePlanRequest {
    /// The supplied fields as a partial document. Absent fields are left untouched.
    fn changes(&self) -> Result<Document, ApiError> {
        let mut changes = Document::new();

        if let Some(name) = &self.name {
            if name.is_empty() {
                return Err(ApiError::validation_error(
                    "Name cannot be empty",
                    Some(HashMap::from([("name".to_string(), "Must not be empty".to_string())])),
                ));
            }
            changes.insert("name".to_string(), json!(name));
        }
        for (field, value) in [
            ("walls", &self.walls),
            ("elements", &self.elements),
            ("objects", &self.objects),
        ] {
            if let Some(value) = value {
                changes.insert(field.to_string(), json!(value));
            }
        }

        if changes.is_empty() {
            return Err(ApiError::validation_error("No fields to update", None));
        }
        Ok(changes)
    }
}

#[derive(Debug, Deserialize)]
pub struct DeletePlanRequest {
    pub id: Option<String>,
}

fn parse_plan_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiError::validation_error(
            "Invalid plan ID format",
            Some(HashMap::from([("id".to_string(), "Must be a valid UUID".to_string())])),
        )
    })
}

fn owned_by(plan_id: Uuid, user_id: Uuid) -> Filter {
    filter([(ID_FIELD, json!(plan_id)), ("user_id", json!(user_id))])
}

/// GET /api/plans[?id=<uuid>] - List the caller's plans, or fetch one in full
///
/// The list holds `{id, name}` pairs in store order.
pub async fn get(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<PlanQuery>,
) -> ApiResult<PlanListing> {
    let user_id = principal.user_id()?;
    let plans = state.plans();

    match query.id.as_deref().filter(|id| !id.is_empty()) {
        Some(raw_id) => {
            let plan_id = parse_plan_id(raw_id)?;
            let plan = plans
                .select_one(&owned_by(plan_id, user_id))
                .await?
                .ok_or_else(|| ApiError::not_found("Plan not found"))?;
            Ok(ApiResponse::success(PlanListing::One(plan)))
        }
        None => {
            let owned = plans.select_any(&filter([("user_id", json!(user_id))])).await?;
            Ok(ApiResponse::success(PlanListing::Many(
                owned.iter().map(Plan::summary).collect(),
            )))
        }
    }
}

/// POST /api/plans - Create a plan owned by the caller
///
/// Expected Input:
/// ```json
/// { "name": "Home", "walls": [], "elements": [], "objects": [] }
/// ```
/// Only `name` is required; the sequences default to empty.
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CreatePlanRequest>, JsonRejection>,
) -> ApiResult<CreatedPlan> {
    let user_id = principal.user_id()?;
    let Json(payload) = payload?;
    let [name] = require_fields("Name is required!", [("name", &payload.name)])?;

    let new_plan = NewPlan {
        user_id,
        name: name.to_string(),
        walls: payload.walls.unwrap_or_default(),
        elements: payload.elements.unwrap_or_default(),
        objects: payload.objects.unwrap_or_default(),
    };
    let id = state.plans().insert(&new_plan).await?;

    tracing::debug!("User {} created plan {}", user_id, id);

    Ok(ApiResponse::created(CreatedPlan {
        id: id.to_string(),
        name: new_plan.name,
        message: "Plan successfully created!",
    }))
}

/// PATCH /api/plans - Partially update one of the caller's plans
///
/// Expected Input:
/// ```json
/// { "id": "uuid", "name": "Renamed" }
/// ```
/// At least one of `name`, `walls`, `elements`, `objects` must be present. Each
/// sequence is replaced as a whole.
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<UpdatePlanRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let user_id = principal.user_id()?;
    let Json(payload) = payload?;
    let [raw_id] = require_fields("Plan ID is required", [("id", &payload.id)])?;
    let plan_id = parse_plan_id(raw_id)?;
    let changes = payload.changes()?;

    let result = state.plans().update(&owned_by(plan_id, user_id), changes).await?;
    if result.matched_count == 0 {
        return Err(ApiError::not_found("Plan not found"));
    }

    Ok(ApiResponse::success(MessageResponse {
        message: "Plan updated successfully",
    }))
}

/// DELETE /api/plans - Delete one of the caller's plans
///
/// Acknowledges even when nothing matched, so repeating a delete is harmless.
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<DeletePlanRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let user_id = principal.user_id()?;
    let Json(payload) = payload?;
    let [raw_id] = require_fields("Plan ID is required", [("id", &payload.id)])?;
    let plan_id = parse_plan_id(raw_id)?;

    let result = state.plans().delete(&owned_by(plan_id, user_id)).await?;
    tracing::debug!("User {} deleted plan {} ({} removed)", user_id, plan_id, result.deleted_count);

    Ok(ApiResponse::success(MessageResponse {
        message: "Plan deleted",
    }))
}
