//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::TransferStatusData;
use crate::transfer::{TransferEnvelope, TransferObject, TransferReply};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Routed Transfer API",
        version = "0.1.0",
        description = "Moves funds between bank accounts registered on a ledger under phone numbers, recording every phase on the ledger."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::transfer::post_transfer,
        crate::gateway::handlers::transfer::get_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            TransferStatusData,
            TransferEnvelope,
            TransferObject,
            TransferReply,
        )
    ),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Transfer", description = "Routed transfers and their ledger phase"),
    )
)]
pub struct ApiDoc;
