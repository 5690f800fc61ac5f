//! Subscription API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::extractors::{SubscriptionPath, ValidatedJson};
use crate::api::types::ApiError;
use crate::broker::Broker;

use types::{
    AckRequest, CreateSubscriptionRequest, ModifyAckRequest, ModifyPushRequest, PullRequest,
    PullResponse, PushConfigDto, ReceivedMessageDto, SubscriptionDto,
};

/// Shared state for subscription API endpoints
#[derive(Clone)]
pub struct SubscriptionsApiState {
    pub broker: Arc<Broker>,
}

/// Build subscription API routes
pub fn routes(broker: Arc<Broker>) -> Router<()> {
    let state = SubscriptionsApiState { broker };

    Router::new()
        .route("/", get(list_subscriptions).post(create_subscription))
        .route(
            "/{subscription}",
            get(get_subscription).delete(delete_subscription),
        )
        .route("/{subscription}/pull", post(pull))
        .route("/{subscription}/ack", post(ack))
        .route("/{subscription}/modify-ack", post(modify_ack))
        .route("/{subscription}/push-config", post(modify_push))
        .with_state(state)
}

/// Create a subscription under an existing topic
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions",
    tag = "subscriptions",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionDto),
        (status = 400, description = "Invalid push endpoint"),
        (status = 404, description = "Topic not found"),
        (status = 409, description = "Subscription name already taken")
    )
)]
pub async fn create_subscription(
    State(state): State<SubscriptionsApiState>,
    ValidatedJson(body): ValidatedJson<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionDto>), ApiError> {
    let push = body.push_config.unwrap_or_default();
    let sub = state
        .broker
        .create_subscription(
            &body.name,
            &body.topic,
            body.ack_deadline_seconds,
            &push.endpoint,
            push.attributes,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SubscriptionDto::from(sub))))
}

/// List all subscriptions
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions",
    tag = "subscriptions",
    responses(
        (status = 200, description = "Subscriptions sorted by name")
    )
)]
pub async fn list_subscriptions(
    State(state): State<SubscriptionsApiState>,
) -> Result<Json<Vec<SubscriptionDto>>, ApiError> {
    let subs = state.broker.list_subscriptions().await?;
    Ok(Json(subs.into_iter().map(SubscriptionDto::from).collect()))
}

/// Get a single subscription by name
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/{subscription}",
    tag = "subscriptions",
    params(("subscription" = String, Path, description = "Subscription name")),
    responses(
        (status = 200, description = "Subscription", body = SubscriptionDto),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn get_subscription(
    State(state): State<SubscriptionsApiState>,
    path: SubscriptionPath,
) -> Result<Json<SubscriptionDto>, ApiError> {
    let sub = state.broker.get_subscription(&path.subscription).await?;
    Ok(Json(SubscriptionDto::from(sub)))
}

/// Delete a subscription
#[utoipa::path(
    delete,
    path = "/api/v1/subscriptions/{subscription}",
    tag = "subscriptions",
    params(("subscription" = String, Path, description = "Subscription name")),
    responses(
        (status = 204, description = "Subscription deleted"),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn delete_subscription(
    State(state): State<SubscriptionsApiState>,
    path: SubscriptionPath,
) -> Result<StatusCode, ApiError> {
    state.broker.delete_subscription(&path.subscription).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pull deliverable messages
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{subscription}/pull",
    tag = "subscriptions",
    params(("subscription" = String, Path, description = "Subscription name")),
    request_body = PullRequest,
    responses(
        (status = 200, description = "Claimed messages", body = PullResponse),
        (status = 404, description = "Subscription not found, or nothing deliverable")
    )
)]
pub async fn pull(
    State(state): State<SubscriptionsApiState>,
    path: SubscriptionPath,
    ValidatedJson(body): ValidatedJson<PullRequest>,
) -> Result<Json<PullResponse>, ApiError> {
    let pulled = state
        .broker
        .pull(&path.subscription, body.max_messages)
        .await?;
    Ok(Json(PullResponse {
        received_messages: pulled.into_iter().map(ReceivedMessageDto::from).collect(),
    }))
}

/// Ack delivered messages
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{subscription}/ack",
    tag = "subscriptions",
    params(("subscription" = String, Path, description = "Subscription name")),
    request_body = AckRequest,
    responses(
        (status = 200, description = "All acks applied"),
        (status = 404, description = "Unknown ack id"),
        (status = 409, description = "Entry not in a deliverable state")
    )
)]
pub async fn ack(
    State(state): State<SubscriptionsApiState>,
    path: SubscriptionPath,
    ValidatedJson(body): ValidatedJson<AckRequest>,
) -> Result<StatusCode, ApiError> {
    state.broker.ack(&path.subscription, &body.ack_ids).await?;
    Ok(StatusCode::OK)
}

/// Move the ack deadline of delivered messages
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{subscription}/modify-ack",
    tag = "subscriptions",
    params(("subscription" = String, Path, description = "Subscription name")),
    request_body = ModifyAckRequest,
    responses(
        (status = 200, description = "Deadlines updated"),
        (status = 404, description = "Unknown ack id")
    )
)]
pub async fn modify_ack(
    State(state): State<SubscriptionsApiState>,
    path: SubscriptionPath,
    ValidatedJson(body): ValidatedJson<ModifyAckRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .broker
        .modify_ack_deadline(&path.subscription, &body.ack_ids, body.ack_deadline_seconds)
        .await?;
    Ok(StatusCode::OK)
}

/// Replace the push configuration
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{subscription}/push-config",
    tag = "subscriptions",
    params(("subscription" = String, Path, description = "Subscription name")),
    request_body = ModifyPushRequest,
    responses(
        (status = 200, description = "Push config replaced", body = SubscriptionDto),
        (status = 400, description = "Invalid push endpoint"),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn modify_push(
    State(state): State<SubscriptionsApiState>,
    path: SubscriptionPath,
    ValidatedJson(body): ValidatedJson<ModifyPushRequest>,
) -> Result<Json<SubscriptionDto>, ApiError> {
    let push: PushConfigDto = body.push_config.unwrap_or_default();
    let sub = state
        .broker
        .set_push_config(&path.subscription, &push.endpoint, push.attributes)
        .await?;
    Ok(Json(SubscriptionDto::from(sub)))
}
