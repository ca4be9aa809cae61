//! Builds the two messages sent for every lead.

use lettre::message::Mailbox;
use lettre::Address;

use super::Lead;
use crate::config::Config;
use crate::mail::{MailBody, MailError, MailMessage};

/// Subject of the acknowledgment sent to the submitter.
pub const AUTO_REPLY_SUBJECT: &str = "We received your estimate request";

/// Addresses used on both messages.
#[derive(Debug, Clone)]
pub struct Sender {
    /// From header: configured display name and sender address.
    pub identity: Mailbox,
    /// Internal inbox that receives lead notices.
    pub leads_to: Mailbox,
}

impl Sender {
    /// Resolve sender addresses from configuration.
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let sender = config
            .sender_address()
            .ok_or_else(|| MailError::InvalidAddress("<no sender address>".to_string()))?;

        Ok(Self {
            identity: Mailbox::new(Some(config.mail.from_name.clone()), parse_address(sender)?),
            leads_to: Mailbox::new(None, parse_address(&config.mail.leads_to)?),
        })
    }
}

fn parse_address(value: &str) -> Result<Address, MailError> {
    value
        .parse()
        .map_err(|_| MailError::InvalidAddress(value.to_string()))
}

/// Mailbox of the person who submitted the form.
fn submitter(lead: &Lead) -> Result<Mailbox, MailError> {
    Ok(Mailbox::new(Some(lead.name.clone()), parse_address(&lead.email)?))
}

/// Internal notice: plain-text dump of every field, replies go to the
/// submitter.
pub fn lead_notice(
    lead: &Lead,
    sender: &Sender,
    submitted_at: &str,
) -> Result<MailMessage, MailError> {
    let body = format!(
        "New estimate request\n\
         \n\
         Name: {name}\n\
         Email: {email}\n\
         Phone: {phone}\n\
         City: {city}\n\
         Service type: {service}\n\
         \n\
         Message:\n\
         {message}\n\
         \n\
         Submitted at: {submitted_at}\n",
        name = lead.name,
        email = lead.email,
        phone = lead.phone,
        city = lead.city,
        service = lead.service_type.as_deref().unwrap_or("-"),
        message = lead.message.as_deref().unwrap_or("-"),
    );

    Ok(MailMessage {
        from: sender.identity.clone(),
        to: sender.leads_to.clone(),
        reply_to: submitter(lead)?,
        subject: format!("New estimate request: {} ({})", lead.name, lead.city),
        body: MailBody::Text(body),
    })
}

/// Acknowledgment to the submitter with an HTML summary of the request.
/// Replies go to the internal inbox.
pub fn auto_reply(lead: &Lead, sender: &Sender) -> Result<MailMessage, MailError> {
    let mut html = format!(
        "<p>Hi {name},</p>\
         <p>Thanks for contacting us. We received your estimate request and will \
         get back to you shortly.</p>\
         <ul>\
         <li><strong>Name:</strong> {name}</li>\
         <li><strong>Phone:</strong> {phone}</li>\
         <li><strong>City:</strong> {city}</li>",
        name = strip_markup(&lead.name),
        phone = strip_markup(&lead.phone),
        city = strip_markup(&lead.city),
    );
    if let Some(service) = &lead.service_type {
        html.push_str(&format!(
            "<li><strong>Service:</strong> {}</li>",
            strip_markup(service)
        ));
    }
    html.push_str("</ul>");
    if let Some(message) = &lead.message {
        html.push_str(&format!(
            "<p><strong>Your message:</strong><br>{}</p>",
            strip_markup(message).replace('\n', "<br>")
        ));
    }

    Ok(MailMessage {
        from: sender.identity.clone(),
        to: submitter(lead)?,
        reply_to: sender.leads_to.clone(),
        subject: AUTO_REPLY_SUBJECT.to_string(),
        body: MailBody::Html(html),
    })
}

/// Drop `<` and `>` so submitted text cannot inject markup.
pub fn strip_markup(value: &str) -> String {
    value.chars().filter(|c| *c != '<' && *c != '>').collect()
}
