//! Tier catalogue.

use axum::Json;
use serde_json::{json, Value};

use crate::content::AgeGroup;

/// GET /api/age-groups
pub async fn list_age_groups() -> Json<Value> {
    let tiers: Vec<Value> = AgeGroup::ALL
        .iter()
        .map(|tier| {
            json!({
                "label": tier.label(),
                "description": tier.description(),
                "folder": tier.image_folder(),
            })
        })
        .collect();
    Json(json!({ "ageGroups": tiers, "default": AgeGroup::default().label() }))
}
