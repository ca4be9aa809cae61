//! Estimate submission handler.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::datetime::now_iso;
use crate::estimate::{auto_reply, dispatch, lead_notice, EstimateRequest};
use crate::mail::MailError;
use crate::web::dto::{EstimateResponse, FormJson};
use crate::web::error::{ApiError, ErrorCode};
use crate::web::handlers::AppState;

/// POST /api/send-estimate - Validate a submission and mail it.
///
/// Validation happens before any network I/O. When email is disabled the
/// submission is acknowledged without sending. Otherwise the lead notice and
/// the auto-reply are sent concurrently under the configured send timeout.
pub async fn send_estimate(
    State(state): State<Arc<AppState>>,
    FormJson(request): FormJson<EstimateRequest>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let lead = request.into_lead().map_err(|rejection| {
        tracing::info!(reason = %rejection, "Estimate request rejected");
        ApiError::from(rejection)
    })?;

    let submitted_at = now_iso();

    let Some(mailer) = state.active_mailer() else {
        tracing::info!("Email disabled; acknowledging estimate request without sending");
        return Ok(Json(EstimateResponse::skipped(submitted_at)));
    };

    tracing::debug!(name = %lead.name, city = %lead.city, "Sending estimate emails");

    let notice = lead_notice(&lead, &mailer.sender, &submitted_at).map_err(composition_error)?;
    let reply = auto_reply(&lead, &mailer.sender).map_err(composition_error)?;

    let sent = dispatch(
        mailer.transport.clone(),
        notice,
        reply,
        mailer.send_timeout,
    )
    .await?;

    tracing::info!(
        lead_id = %sent.lead_id,
        auto_id = %sent.auto_id,
        "Estimate emails sent"
    );

    Ok(Json(EstimateResponse::sent(sent.lead_id, sent.auto_id)))
}

/// The submitter address passed the pattern check but is not a deliverable
/// mailbox; report it as an invalid email rather than a relay failure.
fn composition_error(err: MailError) -> ApiError {
    match err {
        MailError::InvalidAddress(_) => {
            tracing::info!(error = %err, "Estimate request rejected");
            ApiError::new(ErrorCode::InvalidEmail)
        }
        other => ApiError::from(other),
    }
}
