//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{health, stats, subscriptions, topics};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Courier API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Pub/Sub message broker"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "stats", description = "Broker counters"),
        (name = "topics", description = "Topic management and publishing"),
        (name = "subscriptions", description = "Subscription management, pull and ack")
    ),
    paths(
        // Health
        health::health,
        // Stats
        stats::stats,
        // Topics
        topics::create_topic,
        topics::list_topics,
        topics::get_topic,
        topics::delete_topic,
        topics::publish,
        // Subscriptions
        subscriptions::create_subscription,
        subscriptions::list_subscriptions,
        subscriptions::get_subscription,
        subscriptions::delete_subscription,
        subscriptions::pull,
        subscriptions::ack,
        subscriptions::modify_ack,
        subscriptions::modify_push,
    ),
    components(schemas(
        health::HealthResponse,
        crate::broker::StatsSnapshot,
        topics::types::TopicDto,
        topics::types::CreateTopicRequest,
        topics::types::PublishRequest,
        topics::types::PublishResponse,
        subscriptions::types::SubscriptionDto,
        subscriptions::types::CreateSubscriptionRequest,
        subscriptions::types::PushConfigDto,
        subscriptions::types::PullRequest,
        subscriptions::types::PullResponse,
        subscriptions::types::ReceivedMessageDto,
        subscriptions::types::MessageDto,
        subscriptions::types::AckRequest,
        subscriptions::types::ModifyAckRequest,
        subscriptions::types::ModifyPushRequest,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Courier API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true
            });
        };
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/topics"));
        assert!(
            doc.paths
                .paths
                .contains_key("/api/v1/subscriptions/{subscription}/pull")
        );
    }
}
