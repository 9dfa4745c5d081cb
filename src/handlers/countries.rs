use axum::{extract::State, routing::get, Json, Router};
use sea_orm::{EntityTrait, QueryOrder};

use crate::entities::country;
use crate::errors::ServiceError;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_countries))
}

/// All known countries, ordered by code
pub async fn list_countries(
    State(state): State<AppState>,
) -> Result<Json<Vec<country::Model>>, ServiceError> {
    let countries = country::Entity::find()
        .order_by_asc(country::Column::Code)
        .all(&state.db)
        .await?;
    Ok(Json(countries))
}
