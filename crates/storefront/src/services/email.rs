//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use crate::config::EmailConfig;
use crate::models::{Order, OrderItem};

/// HTML order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    items: &'a [OrderItem],
    subtotal: Decimal,
    discount: Decimal,
    shipping_fee: Decimal,
    wallet_used: Decimal,
    total: Decimal,
    payment_label: &'a str,
    invoice_url: Option<&'a str>,
}

/// Plain text order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    items: &'a [OrderItem],
    total: Decimal,
    payment_label: &'a str,
    invoice_url: Option<&'a str>,
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

/// Email service for sending order notifications.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    site_url: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, site_url: &str) -> Result<Self, SmtpError> {
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
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send the order confirmation with a link to the invoice.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, to, order), fields(order_number = %order.order_number))]
    pub async fn send_order_confirmation(&self, to: &str, order: &Order) -> Result<(), EmailError> {
        let invoice_url = order
            .invoice_number
            .as_ref()
            .map(|_| format!("{}/api/invoices/{}", self.site_url, order.id));
        let payment_label = payment_label(order);

        let html = OrderConfirmationHtml {
            customer_name: &order.shipping_address.name,
            order_number: &order.order_number,
            items: &order.items,
            subtotal: order.subtotal,
            discount: order.discount,
            shipping_fee: order.shipping_fee,
            wallet_used: order.wallet_used,
            total: order.total,
            payment_label,
            invoice_url: invoice_url.as_deref(),
        }
        .render()?;
        let text = OrderConfirmationText {
            customer_name: &order.shipping_address.name,
            order_number: &order.order_number,
            items: &order.items,
            total: order.total,
            payment_label,
            invoice_url: invoice_url.as_deref(),
        }
        .render()?;

        let subject = format!("Order {} confirmed", order.order_number);
        self.send_multipart_email(to, &subject, &text, &html).await
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

        tracing::info!(subject = %subject, "Email sent");
        Ok(())
    }
}

fn payment_label(order: &Order) -> &'static str {
    match (order.payment_method, order.total.is_zero()) {
        (_, true) => "Paid from wallet",
        (wholesale_core::PaymentMethod::Cod, false) => "Cash on delivery",
        (wholesale_core::PaymentMethod::Razorpay, false) => "Paid online",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;

    #[test]
    fn test_text_template_lists_items() {
        let order = sample_order();
        let text = OrderConfirmationText {
            customer_name: &order.shipping_address.name,
            order_number: &order.order_number,
            items: &order.items,
            total: order.total,
            payment_label: payment_label(&order),
            invoice_url: Some("https://shop.example/api/invoices/1"),
        }
        .render()
        .unwrap();
        assert!(text.contains("WH2603010001AB"));
        assert!(text.contains("Steel Tumbler x 10"));
        assert!(text.contains("https://shop.example/api/invoices/1"));
    }

    #[test]
    fn test_html_template_escapes_names() {
        let mut order = sample_order();
        order.shipping_address.name = "<b>Asha</b>".to_string();
        let html = OrderConfirmationHtml {
            customer_name: &order.shipping_address.name,
            order_number: &order.order_number,
            items: &order.items,
            subtotal: order.subtotal,
            discount: order.discount,
            shipping_fee: order.shipping_fee,
            wallet_used: order.wallet_used,
            total: order.total,
            payment_label: payment_label(&order),
            invoice_url: None,
        }
        .render()
        .unwrap();
        assert!(!html.contains("<b>Asha</b>"));
        assert!(html.contains("1300"));
    }

    #[test]
    fn test_payment_label() {
        let mut order = sample_order();
        assert_eq!(payment_label(&order), "Paid online");
        order.payment_method = wholesale_core::PaymentMethod::Cod;
        assert_eq!(payment_label(&order), "Cash on delivery");
        order.total = Decimal::ZERO;
        assert_eq!(payment_label(&order), "Paid from wallet");
    }
}
