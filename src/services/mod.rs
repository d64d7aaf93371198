/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Per-participant views of a room.
pub mod projection_service;
/// Outbound message delivery to room members.
pub mod room_events;
/// Room lifecycle, rounds and votes.
pub mod session_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
