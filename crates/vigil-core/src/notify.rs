//! Alert delivery over Twilio SMS with optional imgur image hosting.
//!
//! Delivery is two legs. When the alert carries a captured image and an
//! imgur client ID is configured, the image is uploaded first and its public
//! link is appended to the message body. An upload failure degrades the
//! alert to text-only; only the SMS leg decides overall success.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

use crate::config::AlertConfig;
use crate::error::{Error, NotifyFault};
use crate::traits::{AlertMessage, AlertSink, ImageHandle};

const IMGUR_UPLOAD_URL: &str = "https://api.imgur.com/3/image";
const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Per-request timeout for both the upload and SMS legs.
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Twilio-backed alert sink.
pub struct TwilioSink {
    client: reqwest::Client,
    config: AlertConfig,
    imgur_url: String,
    twilio_base: String,
}

impl TwilioSink {
    /// Builds a sink against the production endpoints.
    pub fn new(config: AlertConfig) -> Result<Self, Error> {
        Self::with_endpoints(config, IMGUR_UPLOAD_URL, TWILIO_API_BASE)
    }

    /// Builds a sink against custom endpoints, for tests and staging.
    pub fn with_endpoints(
        config: AlertConfig,
        imgur_url: impl Into<String>,
        twilio_base: impl Into<String>,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::setup(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            imgur_url: imgur_url.into(),
            twilio_base: twilio_base.into(),
        })
    }

    async fn upload_image(&self, image: &ImageHandle) -> Result<String, NotifyFault> {
        let bytes = tokio::fs::read(&image.path).await?;
        let file_name = image
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.jpg".to_string());
        let part = multipart::Part::bytes(bytes).file_name(file_name);
        let form = multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&self.imgur_url)
            .header(
                "Authorization",
                format!("Client-ID {}", self.config.imgur_client_id),
            )
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyFault::UploadRejected {
                status: response.status().as_u16(),
            });
        }
        let parsed: ImgurResponse = response.json().await?;
        Ok(parsed.data.link)
    }

    /// Renders the message body sent over SMS.
    fn message_body(&self, alert: &AlertMessage, image_url: Option<&str>) -> String {
        let smoke = match alert.smoke_level {
            Some(level) => level.to_string(),
            None => "unknown".to_string(),
        };
        let motion = if alert.motion_detected { "yes" } else { "no" };
        let mut body = format!(
            "Emergency Alert!\nType: {}\nAddress: {}\nTemperature: {:.2}°C\nSmoke Level: {}\nMotion Detected: {}",
            alert.kind, self.config.site_address, alert.effective_temp_c, smoke, motion,
        );
        if let Ok(timestamp) = alert.raised_at.format(&Rfc3339) {
            body.push_str(&format!("\nTime: {timestamp}"));
        }
        if let Some(url) = image_url {
            body.push_str(&format!("\nImage URL: {url}"));
        }
        body
    }

    async fn send_message(&self, body: &str) -> Result<(), NotifyFault> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.twilio_base, self.config.twilio.account_sid
        );
        let params = [
            ("To", self.config.twilio.to_number.as_str()),
            ("From", self.config.twilio.from_number.as_str()),
            ("Body", body),
        ];
        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.twilio.account_sid,
                Some(&self.config.twilio.auth_token),
            )
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyFault::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for TwilioSink {
    async fn notify(&self, alert: &AlertMessage) -> Result<(), NotifyFault> {
        let image_url = match &alert.image {
            Some(image) if !self.config.imgur_client_id.is_empty() => {
                match self.upload_image(image).await {
                    Ok(url) => Some(url),
                    Err(error) => {
                        warn!(%error, "image upload failed, sending text-only alert");
                        None
                    }
                }
            }
            Some(_) => {
                debug!("no image host configured, sending text-only alert");
                None
            }
            None => None,
        };

        let body = self.message_body(alert, image_url.as_deref());
        self.send_message(&body).await?;
        info!(kind = %alert.kind, with_image = image_url.is_some(), "alert message sent");
        Ok(())
    }
}

/// Sink used while alert delivery is disabled; alerts only reach the log.
pub struct LogOnlySink;

#[async_trait]
impl AlertSink for LogOnlySink {
    async fn notify(&self, alert: &AlertMessage) -> Result<(), NotifyFault> {
        warn!(
            kind = %alert.kind,
            temp_c = alert.effective_temp_c,
            smoke = ?alert.smoke_level,
            motion = alert.motion_detected,
            "hazard alert raised (delivery disabled)"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    data: ImgurImage,
}

#[derive(Debug, Deserialize)]
struct ImgurImage {
    link: String,
}
