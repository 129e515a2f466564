//! Change notification over plain SMTP.

use crate::config::MailSettings;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Delivers a rendered change report
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

/// Minimal SMTP client: HELO, MAIL FROM, RCPT TO per recipient, DATA, QUIT
pub struct SmtpNotifier {
    settings: MailSettings,
}

impl SmtpNotifier {
    pub fn new(settings: MailSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MailSettings {
        &self.settings
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let address = format!("{}:{}", self.settings.host, self.settings.port);
        let stream = TcpStream::connect(&address)
            .await
            .with_context(|| format!("Failed to connect to {}", address))?;

        send_message(stream, &self.settings, subject, body).await?;
        info!(
            "Change report mailed to {} recipient(s)",
            self.settings.recipients.len()
        );
        Ok(())
    }
}

/// Read one (possibly multi-line) reply and check its code
async fn expect_reply<R>(reader: &mut R, code: u16) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.context("SMTP read failed")?;
        if n == 0 {
            return Err(anyhow!("SMTP server closed the connection"));
        }
        let line = line.trim_end();
        debug!("SMTP <- {}", line);

        let got: u16 = line
            .get(..3)
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| anyhow!("Malformed SMTP reply: {}", line))?;
        if got != code {
            return Err(anyhow!("SMTP expected {}, got: {}", code, line));
        }
        // "250-..." continues, "250 ..." ends the reply
        if line.as_bytes().get(3) != Some(&b'-') {
            return Ok(());
        }
    }
}

async fn send_line<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    debug!("SMTP -> {}", line);
    writer
        .write_all(format!("{}\r\n", line).as_bytes())
        .await
        .context("SMTP write failed")
}

/// Message text with headers, CRLF line endings and dot-stuffing
pub fn compose_message(settings: &MailSettings, subject: &str, body: &str) -> String {
    let mut message = String::new();
    message.push_str(&format!("From: {}\r\n", settings.from));
    message.push_str(&format!("To: {}\r\n", settings.recipients.join(", ")));
    message.push_str(&format!("Subject: {}\r\n", subject));
    message.push_str("\r\n");
    for line in body.lines() {
        if line.starts_with('.') {
            message.push('.');
        }
        message.push_str(line);
        message.push_str("\r\n");
    }
    message
}

/// Run the SMTP dialogue over an established stream
pub async fn send_message<S>(stream: S, settings: &MailSettings, subject: &str, body: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    expect_reply(&mut reader, 220).await?;
    send_line(&mut writer, "HELO localhost").await?;
    expect_reply(&mut reader, 250).await?;
    send_line(&mut writer, &format!("MAIL FROM:<{}>", settings.from)).await?;
    expect_reply(&mut reader, 250).await?;
    for recipient in &settings.recipients {
        send_line(&mut writer, &format!("RCPT TO:<{}>", recipient)).await?;
        expect_reply(&mut reader, 250).await?;
    }
    send_line(&mut writer, "DATA").await?;
    expect_reply(&mut reader, 354).await?;

    let message = compose_message(settings, subject, body);
    writer
        .write_all(message.as_bytes())
        .await
        .context("SMTP write failed")?;
    send_line(&mut writer, ".").await?;
    expect_reply(&mut reader, 250).await?;

    send_line(&mut writer, "QUIT").await?;
    expect_reply(&mut reader, 221).await?;
    writer.flush().await.context("SMTP flush failed")?;
    Ok(())
}
