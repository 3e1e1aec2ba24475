//! Payment request handler: builds the data field and wallet link for a
//! payment that subscribers can then watch for.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{PaymentRequestBody, PaymentRequestResponse};
use crate::app_state::AppState;
use crate::domain::PaymentRequest;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /payments/request`: Build a payment link.
///
/// # Errors
///
/// Returns [`GatewayError`] on a zero amount, blank app id, or malformed
/// recipient address.
#[utoipa::path(
    post,
    path = "/api/v1/payments/request",
    tag = "Payments",
    summary = "Build a payment request",
    description = "Encodes the transfer data field for an app payment and returns the packed transfer data together with a wallet link. A transfer made through the link matches `app_payment(app_id, amount, recipient)` criteria.",
    request_body = PaymentRequestBody,
    responses(
        (status = 200, description = "Payment request built", body = PaymentRequestResponse),
        (status = 400, description = "Invalid amount, app id or recipient", body = ErrorResponse),
    )
)]
pub async fn request_payment(
    State(state): State<AppState>,
    Json(body): Json<PaymentRequestBody>,
) -> Result<impl IntoResponse, GatewayError> {
    let links = &state.payment_links;
    let recipient = body
        .recipient
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or(&links.default_recipient);

    let request = PaymentRequest::new(
        body.amount,
        &body.app_id,
        body.custom_data.as_deref(),
        recipient,
    )?;
    let url = request.transfer_url(&links.wallet_base_url, &links.transfer_group);

    tracing::info!(
        app_id = request.app_id(),
        amount = request.amount(),
        recipient = %request.recipient(),
        "payment request built"
    );

    let response = PaymentRequestResponse {
        amount: request.amount(),
        value: request.fixed_point_amount(),
        app_id: request.app_id().to_string(),
        custom_data: request.custom_payload().map(str::to_string),
        data: request.data_field(),
        recipient: request.recipient_hex(),
        packed_data: request.packed_data(),
        url,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Payment routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/payments/request", post(request_payment))
}
