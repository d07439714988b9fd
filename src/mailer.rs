use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

const FROM_ADDRESS: &str = "noreply@enrolld.local";

/// Outbound delivery is bounded; a hung relay counts as a failed send.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_activation_code(&self, to_email: &str, code: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Plaintext SMTP to a local relay (MailHog and friends).
    pub fn new(host: &str, port: u16) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .timeout(Some(SEND_TIMEOUT))
            .build();
        Self { transport }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_activation_code(&self, to_email: &str, code: &str) -> anyhow::Result<()> {
        let to: Mailbox = to_email.parse().context("parse recipient address")?;
        let message = Message::builder()
            .from(FROM_ADDRESS.parse::<Mailbox>().context("parse sender address")?)
            .to(to)
            .subject("Your activation code")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Your activation code is: {code}\nThis code expires in 1 minute.\n"
            ))
            .context("build activation message")?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!(to = %to_email, "activation code sent");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, to = %to_email, "failed to send activation email");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_address_parses() {
        FROM_ADDRESS.parse::<Mailbox>().expect("valid mailbox");
    }
}
