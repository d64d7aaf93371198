use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload along with the number of live rooms.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.rooms().len();
    debug!(rooms, connections = state.connections().len(), "health check");
    HealthResponse::ok(rooms)
}
