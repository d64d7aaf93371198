use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Spyglass Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ClientCommand,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::ErrorKind,
            crate::dto::view::PlayerView,
            crate::dto::phase::VisiblePhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "WebSocket protocol for room participants"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_protocol_schemas() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/healthcheck"));
        assert!(doc.paths.paths.contains_key("/ws"));

        let schemas = doc.components.unwrap().schemas;
        assert!(schemas.contains_key("ClientCommand"));
        assert!(schemas.contains_key("ServerMessage"));
    }
}
