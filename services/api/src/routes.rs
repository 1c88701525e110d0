//! API service routes

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use common::pagination::{Page, PageParams};
use common::permissions::{EmailVerified, Permission};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{AuthUser, MaybeAuthUser},
    models::{
        AgentConfirmRequest, AgentRequest, CreatePropertyRequest, Image, ImageRequest, Location,
        LocationRequest, PropertyFilters, PropertyResponse, RentDetails, RentDetailsRequest,
        TokenQuery, UpdatePropertyRequest,
    },
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/v1/properties/",
            get(list_properties).post(create_property),
        )
        .route("/api/v1/properties/mine/", get(my_properties))
        .route("/api/v1/properties/favorites/", get(favorites))
        .route(
            "/api/v1/properties/:id/",
            get(get_property)
                .patch(update_property)
                .delete(delete_property),
        )
        .route(
            "/api/v1/properties/:id/location/",
            put(put_location).delete(delete_location),
        )
        .route(
            "/api/v1/properties/:id/rent_details/",
            put(put_rent_details).delete(delete_rent_details),
        )
        .route("/api/v1/properties/:id/images/", post(add_image))
        .route(
            "/api/v1/properties/:id/images/:image_id/",
            delete(delete_image),
        )
        .route(
            "/api/v1/properties/:id/favorite/",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/api/v1/properties/:id/agent/",
            post(assign_agent).delete(remove_agent),
        )
        .route("/api/v1/properties/:id/agent_confirm/", post(confirm_agent))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Public listing
pub async fn list_properties(
    State(state): State<AppState>,
    Query(filters): Query<PropertyFilters>,
) -> ApiResult<Json<Page<PropertyResponse>>> {
    Ok(Json(state.properties.list(&filters).await?))
}

/// Create a listing; the caller's email must be verified
pub async fn create_property(
    State(state): State<AppState>,
    method: Method,
    AuthUser(current): AuthUser,
    Json(payload): Json<CreatePropertyRequest>,
) -> ApiResult<impl IntoResponse> {
    if !EmailVerified.has_permission(method.as_str(), Some(&current)) {
        return Err(ApiError::Forbidden);
    }

    let property = state.properties.create(&current, payload).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn my_properties(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<PropertyResponse>>> {
    Ok(Json(state.properties.mine(&current, &params).await?))
}

pub async fn get_property(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PropertyResponse>> {
    Ok(Json(state.properties.get(id, viewer.as_ref()).await?))
}

pub async fn update_property(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePropertyRequest>,
) -> ApiResult<Json<PropertyResponse>> {
    Ok(Json(state.properties.update(id, &current, payload).await?))
}

pub async fn delete_property(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.properties.delete(id, &current).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_location(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationRequest>,
) -> ApiResult<Json<Location>> {
    Ok(Json(state.properties.put_location(id, &current, payload).await?))
}

pub async fn delete_location(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.properties.delete_location(id, &current).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_rent_details(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RentDetailsRequest>,
) -> ApiResult<Json<RentDetails>> {
    Ok(Json(
        state
            .properties
            .put_rent_details(id, &current, payload)
            .await?,
    ))
}

pub async fn delete_rent_details(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.properties.delete_rent_details(id, &current).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_image(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ImageRequest>,
) -> ApiResult<(StatusCode, Json<Image>)> {
    let image = state.properties.add_image(id, &current, payload).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn delete_image(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state.properties.delete_image(id, image_id, &current).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn favorites(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<PropertyResponse>>> {
    Ok(Json(state.properties.favorites(&current, &params).await?))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    state.properties.add_favorite(id, &current).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Property added to favorites" })),
    ))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.properties.remove_favorite(id, &current).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_agent(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AgentRequest>,
) -> ApiResult<Json<Value>> {
    state.properties.assign_agent(id, &current, payload).await?;
    Ok(Json(json!({ "message": "Assignment request sent to the agent" })))
}

pub async fn confirm_agent(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
    Json(payload): Json<AgentConfirmRequest>,
) -> ApiResult<Json<Value>> {
    let accepted = state
        .properties
        .confirm_agent(id, &current, query.token.as_deref(), payload)
        .await?;

    let message = if accepted {
        "Assignment accepted"
    } else {
        "Assignment declined"
    };
    Ok(Json(json!({ "message": message })))
}

pub async fn remove_agent(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.properties.remove_agent(id, &current).await?;
    Ok(StatusCode::NO_CONTENT)
}
