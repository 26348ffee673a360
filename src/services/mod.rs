/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Lobby state machine operations.
pub mod lobby_service;
/// Score aggregation and result resolution.
pub mod score_service;
/// Maintenance sweeps for stale match records.
pub mod sweep_service;
/// Storage reconnection supervisor.
pub mod storage_supervisor;
