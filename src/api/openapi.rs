//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use crate::api::dto::{ManualCheckResponse, PaymentRequestBody, PaymentRequestResponse};
use crate::api::handlers::{payment, system, transfer};
use crate::domain::{TransferEvent, TransferPosition};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI specification, served as JSON at
/// `/api-docs/openapi.json` when the `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "oic-gateway",
        description = "Payment links, transfer inspection and WebSocket transfer subscriptions."
    ),
    paths(
        system::health_handler,
        payment::request_payment,
        transfer::manual_check,
    ),
    components(schemas(
        PaymentRequestBody,
        PaymentRequestResponse,
        ManualCheckResponse,
        TransferEvent,
        TransferPosition,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Payments", description = "Payment link generation"),
        (name = "Transfers", description = "Transfer store inspection"),
    )
)]
pub struct ApiDoc;
