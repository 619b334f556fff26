//! Outbound email. SMTP when credentials are configured, otherwise the
//! code is logged so development logins still work.

use crate::config::AppConfig;
use crate::error::AppError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    Log,
}

impl Mailer {
    pub fn from_config(config: &AppConfig) -> Self {
        let Some(smtp) = &config.smtp else {
            return Mailer::Log;
        };
        let from: Mailbox = match format!("Nyraa <{}>", smtp.from).parse() {
            Ok(mb) => mb,
            Err(e) => {
                tracing::warn!(error = %e, "invalid EMAIL_FROM, falling back to log mailer");
                return Mailer::Log;
            }
        };
        match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host) {
            Ok(builder) => Mailer::Smtp {
                transport: builder
                    .port(smtp.port)
                    .credentials(Credentials::new(
                        smtp.username.clone(),
                        smtp.password.clone(),
                    ))
                    .build(),
                from,
            },
            Err(e) => {
                tracing::warn!(error = %e, "smtp relay setup failed, falling back to log mailer");
                Mailer::Log
            }
        }
    }

    /// Send the login OTP. Callers treat failure as non-fatal: the code is
    /// already stored, and the original never failed the request on a mail
    /// error.
    pub async fn send_otp(&self, to: &str, otp: &str) -> Result<(), AppError> {
        match self {
            Mailer::Log => {
                tracing::info!(email = %to, otp = %otp, "email not configured, OTP logged");
                Ok(())
            }
            Mailer::Smtp { transport, from } => {
                let to_mailbox: Mailbox = to
                    .parse()
                    .map_err(|e| AppError::BadRequest(format!("invalid recipient: {e}")))?;
                let message = Message::builder()
                    .from(from.clone())
                    .to(to_mailbox)
                    .subject("Your OTP for Login")
                    .header(ContentType::TEXT_HTML)
                    .body(otp_email_html(otp))
                    .map_err(|e| AppError::Internal(format!("build email: {e}")))?;
                transport
                    .send(message)
                    .await
                    .map_err(|e| AppError::Internal(format!("send email: {e}")))?;
                tracing::info!(email = %to, "OTP email sent");
                Ok(())
            }
        }
    }
}

fn otp_email_html(otp: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">Your Login OTP</h2>
  <p>Hello,</p>
  <p>Your OTP for login is:</p>
  <div style="background-color: #f0f0f0; padding: 20px; text-align: center; font-size: 24px; font-weight: bold; letter-spacing: 3px; margin: 20px 0;">
    {otp}
  </div>
  <p>This OTP is valid for 10 minutes.</p>
  <p>If you didn't request this OTP, please ignore this email.</p>
</div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_appears_in_email_body() {
        let html = otp_email_html("123456");
        assert!(html.contains("123456"));
        assert!(html.contains("valid for 10 minutes"));
    }
}
