//! Topic API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::api::extractors::{TopicPath, ValidatedJson};
use crate::api::types::ApiError;
use crate::broker::Broker;

use types::{CreateTopicRequest, PublishRequest, PublishResponse, TopicDto};

/// Shared state for topic API endpoints
#[derive(Clone)]
pub struct TopicsApiState {
    pub broker: Arc<Broker>,
}

/// Build topic API routes
pub fn routes(broker: Arc<Broker>) -> Router<()> {
    let state = TopicsApiState { broker };

    Router::new()
        .route("/", get(list_topics).post(create_topic))
        .route("/{topic}", get(get_topic).delete(delete_topic))
        .route("/{topic}/publish", axum::routing::post(publish))
        .with_state(state)
}

/// Create a topic
#[utoipa::path(
    post,
    path = "/api/v1/topics",
    tag = "topics",
    request_body = CreateTopicRequest,
    responses(
        (status = 201, description = "Topic created", body = TopicDto),
        (status = 409, description = "Topic name already taken")
    )
)]
pub async fn create_topic(
    State(state): State<TopicsApiState>,
    ValidatedJson(body): ValidatedJson<CreateTopicRequest>,
) -> Result<(StatusCode, Json<TopicDto>), ApiError> {
    let topic = state.broker.create_topic(&body.name).await?;
    Ok((StatusCode::CREATED, Json(TopicDto::from(topic))))
}

/// List all topics
#[utoipa::path(
    get,
    path = "/api/v1/topics",
    tag = "topics",
    responses(
        (status = 200, description = "Topics sorted by name")
    )
)]
pub async fn list_topics(
    State(state): State<TopicsApiState>,
) -> Result<Json<Vec<TopicDto>>, ApiError> {
    let topics = state.broker.list_topics().await?;
    Ok(Json(topics.into_iter().map(TopicDto::from).collect()))
}

/// Get a single topic by name
#[utoipa::path(
    get,
    path = "/api/v1/topics/{topic}",
    tag = "topics",
    params(("topic" = String, Path, description = "Topic name")),
    responses(
        (status = 200, description = "Topic", body = TopicDto),
        (status = 404, description = "Topic not found")
    )
)]
pub async fn get_topic(
    State(state): State<TopicsApiState>,
    path: TopicPath,
) -> Result<Json<TopicDto>, ApiError> {
    let topic = state.broker.get_topic(&path.topic).await?;
    Ok(Json(TopicDto::from(topic)))
}

/// Delete a topic. Subscriptions are not cascaded.
#[utoipa::path(
    delete,
    path = "/api/v1/topics/{topic}",
    tag = "topics",
    params(("topic" = String, Path, description = "Topic name")),
    responses(
        (status = 204, description = "Topic deleted"),
        (status = 404, description = "Topic not found")
    )
)]
pub async fn delete_topic(
    State(state): State<TopicsApiState>,
    path: TopicPath,
) -> Result<StatusCode, ApiError> {
    state.broker.delete_topic(&path.topic).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Publish a message to a topic
#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic}/publish",
    tag = "topics",
    params(("topic" = String, Path, description = "Topic name")),
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Message published", body = PublishResponse),
        (status = 404, description = "Topic not found")
    )
)]
pub async fn publish(
    State(state): State<TopicsApiState>,
    path: TopicPath,
    ValidatedJson(body): ValidatedJson<PublishRequest>,
) -> Result<Json<PublishResponse>, ApiError> {
    let data = BASE64
        .decode(&body.data)
        .map_err(|_| ApiError::bad_request("INVALID_DATA", "data must be base64"))?;

    let message_id = state
        .broker
        .publish(&path.topic, data, body.attributes)
        .await?;
    Ok(Json(PublishResponse { message_id }))
}
