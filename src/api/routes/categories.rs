//! Category listing handler.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::categorize::{CATEGORIES, DEFAULT_CATEGORY, DEFAULT_CATEGORY_DESCRIPTION};

/// One entry of GET /categories
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CategoryInfo {
    /// Directory name used when category subdirectories are enabled
    pub name: String,
    /// Human-readable label
    pub description: String,
    /// Extensions mapped to this category; empty for the fallback
    pub extensions: Vec<String>,
}

/// GET /categories - List file categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "system",
    responses(
        (status = 200, description = "Categories in match order, fallback last", body = Vec<CategoryInfo>)
    )
)]
pub async fn list_categories() -> Json<Vec<CategoryInfo>> {
    let mut categories: Vec<CategoryInfo> = CATEGORIES
        .iter()
        .map(|c| CategoryInfo {
            name: c.name.to_string(),
            description: c.description.to_string(),
            extensions: c.extensions.iter().map(|e| e.to_string()).collect(),
        })
        .collect();
    categories.push(CategoryInfo {
        name: DEFAULT_CATEGORY.to_string(),
        description: DEFAULT_CATEGORY_DESCRIPTION.to_string(),
        extensions: Vec::new(),
    });
    Json(categories)
}
