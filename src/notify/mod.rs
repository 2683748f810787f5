use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, Message, SmtpTransport,
    Transport,
};

use crate::config::MailConfig;
use crate::models::TicketStatus;
use crate::services::tickets::TicketView;

/// Outbound mail seam. Production uses SMTP via lettre; tests inject a
/// recording implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .body(body.to_string())?;

        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email)).await??;
        Ok(())
    }
}

/// Stand-in when SMTP is not configured: the notification is logged and
/// dropped, matching the fire-and-forget contract.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        tracing::info!("email notification (mail not configured): '{}' to {}", subject, to);
        Ok(())
    }
}

pub fn mailer_from_config(mail: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    if mail.username.is_empty() {
        return Ok(Arc::new(LogMailer));
    }

    let transport = SmtpTransport::relay(&mail.smtp_host)?
        .port(mail.smtp_port)
        .credentials(Credentials::new(mail.username.clone(), mail.password.clone()))
        .build();

    Ok(Arc::new(SmtpMailer {
        transport,
        from: mail.from_address.parse()?,
    }))
}

/// Delivery failures must never fail the request that triggered them.
async fn dispatch(mailer: &dyn Mailer, to: &str, subject: &str, body: &str) {
    if let Err(e) = mailer.send(to, subject, body).await {
        tracing::warn!("failed to send email '{}' to {}: {}", subject, to, e);
    }
}

pub async fn ticket_created(mailer: &dyn Mailer, ticket: &TicketView) {
    let subject = format!("New Ticket Created: {}", ticket.subject);
    let body = format!(
        "Hello {},\n\n\
         Your support ticket has been created successfully.\n\n\
         Ticket Details:\n\
         - Subject: {}\n\
         - Category: {}\n\
         - Priority: {}\n\
         - Status: {}\n\n\
         Description:\n{}\n\n\
         You can track your ticket progress by logging into QuickDesk.\n\n\
         Best regards,\nQuickDesk Support Team\n",
        ticket.creator_username,
        ticket.subject,
        ticket.category_name,
        ticket.priority,
        ticket.status,
        ticket.description,
    );
    dispatch(mailer, &ticket.creator_email, &subject, &body).await;
}

pub async fn status_changed(
    mailer: &dyn Mailer,
    ticket: &TicketView,
    old_status: TicketStatus,
    new_status: TicketStatus,
) {
    let subject = format!("Ticket Status Updated: {}", ticket.subject);
    let assignee_line = ticket
        .assignee_username
        .as_deref()
        .map(|name| format!("Assigned to: {}\n", name))
        .unwrap_or_default();
    let body = format!(
        "Hello {},\n\n\
         Your support ticket status has been updated.\n\n\
         Ticket: {}\n\
         Status: {} -> {}\n\n\
         {}\n\
         You can view your ticket details by logging into QuickDesk.\n\n\
         Best regards,\nQuickDesk Support Team\n",
        ticket.creator_username, ticket.subject, old_status, new_status, assignee_line,
    );
    dispatch(mailer, &ticket.creator_email, &subject, &body).await;
}

/// Only notifies the creator about other people's public comments; their own
/// comments and internal notes are skipped.
pub async fn comment_added(
    mailer: &dyn Mailer,
    ticket: &TicketView,
    author_id: i64,
    author_username: &str,
    content: &str,
    is_internal: bool,
) {
    if author_id == ticket.user_id || is_internal {
        return;
    }

    let subject = format!("New Comment on Ticket: {}", ticket.subject);
    let body = format!(
        "Hello {},\n\n\
         A new comment has been added to your support ticket.\n\n\
         Ticket: {}\n\
         Comment by: {}\n\n\
         Comment:\n{}\n\n\
         You can view the full conversation by logging into QuickDesk.\n\n\
         Best regards,\nQuickDesk Support Team\n",
        ticket.creator_username, ticket.subject, author_username, content,
    );
    dispatch(mailer, &ticket.creator_email, &subject, &body).await;
}
