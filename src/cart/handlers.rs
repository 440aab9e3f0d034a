use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CartItemRequest, CartResponse};
use super::repo_types::Cart;
use super::services::add_to_cart;
use crate::{error::AppError, state::AppState, users::services::normalize_email};

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/add", post(add_item))
        .route("/cart/remove", delete(remove_item))
        .route("/cart/clear/:user_id", delete(clear_cart))
        .route("/cart/:user_id", get(get_cart))
}

fn parse_item_request(payload: &CartItemRequest) -> Result<(String, Uuid), AppError> {
    if payload.user_id.is_none() || payload.donation_id.is_none() {
        return Err(AppError::Validation(
            "User ID and donation ID are required".into(),
        ));
    }
    let user_id = normalize_email(payload.user_id.as_deref(), "userId")?;
    let donation_id = payload
        .donation_id
        .as_deref()
        .map(str::trim)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::Validation("donationId is not a valid id".into()))?;
    Ok((user_id, donation_id))
}

#[instrument(skip(state))]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Cart>, AppError> {
    let user_id = normalize_email(Some(&user_id), "userId")?;
    let cart = state.carts.get_or_create(&user_id).await?;
    Ok(Json(cart))
}

#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    payload: Result<Json<CartItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, AppError> {
    let Json(payload) = payload?;
    let (user_id, donation_id) = parse_item_request(&payload)?;
    let cart = add_to_cart(&state, &user_id, donation_id, OffsetDateTime::now_utc()).await?;
    Ok(Json(CartResponse {
        message: "Item added to cart successfully".into(),
        cart,
    }))
}

#[instrument(skip(state, payload))]
pub async fn remove_item(
    State(state): State<AppState>,
    payload: Result<Json<CartItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, AppError> {
    let Json(payload) = payload?;
    let (user_id, donation_id) = parse_item_request(&payload)?;
    let cart = state
        .carts
        .remove_item(&user_id, donation_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".into()))?;
    info!(%donation_id, "item removed from cart");
    Ok(Json(CartResponse {
        message: "Item removed from cart successfully".into(),
        cart,
    }))
}

#[instrument(skip(state))]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CartResponse>, AppError> {
    let user_id = normalize_email(Some(&user_id), "userId")?;
    let cart = state
        .carts
        .clear(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".into()))?;
    Ok(Json(CartResponse {
        message: "Cart cleared successfully".into(),
        cart,
    }))
}
