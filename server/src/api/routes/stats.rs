//! Broker counters endpoint

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::broker::{Broker, StatsSnapshot};

/// Current broker counters
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Broker counters", body = StatsSnapshot)
    )
)]
pub async fn stats(State(broker): State<Arc<Broker>>) -> Json<StatsSnapshot> {
    Json(broker.stats_snapshot())
}

/// Build the stats route
pub fn routes(broker: Arc<Broker>) -> axum::Router<()> {
    axum::Router::new()
        .route("/", axum::routing::get(stats))
        .with_state(broker)
}
