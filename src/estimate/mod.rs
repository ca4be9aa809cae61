//! Estimate requests: validation, message composition and delivery.

mod compose;
mod lead;

pub use compose::{auto_reply, lead_notice, strip_markup, Sender, AUTO_REPLY_SUBJECT};
pub use lead::{
    is_simple_email, sanitize_string, simple_email, EstimateRequest, Lead, LeadRejection,
};

use std::future::Future;
use std::time::Duration;

use futures::future::try_join;

use crate::mail::{DynMailTransport, MailError, MailMessage};

/// Message identifiers of a delivered lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// Identifier of the internal notice.
    pub lead_id: String,
    /// Identifier of the auto-reply.
    pub auto_id: String,
}

/// Send the lead notice and the auto-reply concurrently.
///
/// Both sends share one deadline. Each send runs in its own task, so an
/// expired deadline or a failed sibling only stops the wait: the SMTP
/// transaction in flight still runs to completion or to the transport's own
/// timeout, and its pooled connection is never returned mid-conversation.
/// Nothing is retried.
pub async fn dispatch(
    transport: DynMailTransport,
    notice: MailMessage,
    reply: MailMessage,
    deadline: Duration,
) -> Result<Dispatched, MailError> {
    let lead = spawn_send(transport.clone(), notice);
    let auto = spawn_send(transport, reply);

    match tokio::time::timeout(deadline, try_join(lead, auto)).await {
        Ok(Ok((lead_id, auto_id))) => Ok(Dispatched { lead_id, auto_id }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(MailError::Timeout(deadline)),
    }
}

/// Start one send on its own task right away. Dropping the returned future
/// detaches the task instead of cancelling it.
fn spawn_send(
    transport: DynMailTransport,
    message: MailMessage,
) -> impl Future<Output = Result<String, MailError>> {
    let handle = tokio::spawn(async move { transport.send(&message).await });

    async move {
        handle
            .await
            .map_err(|e| MailError::Smtp(format!("send task failed: {e}")))?
    }
}
