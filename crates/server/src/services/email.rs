//! Transactional email dispatch.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates. The
//! [`Mailer`] trait is the seam the customer service depends on; tests
//! substitute a recording double.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use kram_core::Email;

use crate::config::EmailConfig;

/// HTML template for the email-confirmation email.
#[derive(Template)]
#[template(path = "email/confirm_email.html")]
struct ConfirmEmailHtml<'a> {
    link: &'a str,
}

/// Plain text template for the email-confirmation email.
#[derive(Template)]
#[template(path = "email/confirm_email.txt")]
struct ConfirmEmailText<'a> {
    link: &'a str,
}

/// HTML template for the password-reset email.
#[derive(Template)]
#[template(path = "email/reset_password.html")]
struct ResetPasswordHtml<'a> {
    link: &'a str,
}

/// Plain text template for the password-reset email.
#[derive(Template)]
#[template(path = "email/reset_password.txt")]
struct ResetPasswordText<'a> {
    link: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Outbound mail seam.
///
/// Every send is a best-effort side effect from the caller's point of
/// view; the customer service logs failures and never propagates them
/// into the primary operation.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the email-confirmation email containing `link`.
    async fn send_confirm_email(&self, to: &Email, link: &str) -> Result<(), EmailError>;

    /// Send the password-reset email containing `link`.
    async fn send_password_reset(&self, to: &Email, link: &str) -> Result<(), EmailError>;
}

/// SMTP-backed mailer for transactional emails.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay parameters are invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirm_email(&self, to: &Email, link: &str) -> Result<(), EmailError> {
        let html = ConfirmEmailHtml { link }.render()?;
        let text = ConfirmEmailText { link }.render()?;

        self.send_multipart_email(to.as_str(), "Confirm your email address", &text, &html)
            .await
    }

    async fn send_password_reset(&self, to: &Email, link: &str) -> Result<(), EmailError> {
        let html = ResetPasswordHtml { link }.render()?;
        let text = ResetPasswordText { link }.render()?;

        self.send_multipart_email(to.as_str(), "Reset your password", &text, &html)
            .await
    }
}
