use crate::config::CaptureSettings;
use crate::results::ScreenshotSet;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Device profiles requested from the capture service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Tablet,
    Desktop,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Mobile, Device::Tablet, Device::Desktop];

    pub fn name(self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Tablet => "tablet",
            Device::Desktop => "desktop",
        }
    }

    /// Viewport width in CSS pixels
    pub fn width(self) -> u32 {
        match self {
            Device::Mobile => 375,
            Device::Tablet => 768,
            Device::Desktop => 1440,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{device} capture request failed: {source}")]
    Request {
        device: Device,
        #[source]
        source: reqwest::Error,
    },

    #[error("{device} capture returned status {status}")]
    Status { device: Device, status: u16 },

    #[error("{device} capture failed: {reason}")]
    Service { device: Device, reason: String },
}

/// External service rendering a page for one device
#[async_trait]
pub trait ScreenshotService: Send + Sync {
    /// Capture a full-page screenshot and return it as a data URI
    async fn capture_device(&self, url: &str, device: Device) -> Result<String, CaptureError>;
}

/// HTTP client for the screenshot microservice
pub struct CaptureServiceClient {
    client: reqwest::Client,
    service_url: String,
}

impl CaptureServiceClient {
    pub fn new(settings: &CaptureSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            service_url: settings.service_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/screenshots/capture", self.service_url)
    }
}

#[async_trait]
impl ScreenshotService for CaptureServiceClient {
    async fn capture_device(&self, url: &str, device: Device) -> Result<String, CaptureError> {
        let width = device.width().to_string();
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("url", url),
                ("fullPage", "true"),
                ("device", device.name()),
                ("width", width.as_str()),
            ])
            .send()
            .await
            .map_err(|source| CaptureError::Request { device, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::Status {
                device,
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| CaptureError::Request { device, source })?;
        Ok(jpeg_data_uri(&bytes))
    }
}

/// Encode image bytes as a displayable data URI
pub fn jpeg_data_uri(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes))
}

/// Requests screenshots for every device and tolerates partial failure
#[derive(Clone)]
pub struct VisualCaptureAdapter {
    service: Arc<dyn ScreenshotService>,
}

impl VisualCaptureAdapter {
    pub fn new(service: Arc<dyn ScreenshotService>) -> Self {
        Self { service }
    }

    /// Capture all devices concurrently; a failed device leaves its slot empty
    pub async fn capture(&self, url: &str) -> ScreenshotSet {
        let (mobile, tablet, desktop) = futures::join!(
            self.capture_slot(url, Device::Mobile),
            self.capture_slot(url, Device::Tablet),
            self.capture_slot(url, Device::Desktop),
        );

        let set = ScreenshotSet {
            mobile,
            tablet,
            desktop,
        };
        ::log::debug!("Captured {}/3 screenshots for {}", set.captured(), url);
        set
    }

    async fn capture_slot(&self, url: &str, device: Device) -> Option<String> {
        match self.service.capture_device(url, device).await {
            Ok(image) => Some(image),
            Err(e) => {
                ::log::warn!("Screenshot failed for {}: {}", url, e);
                None
            }
        }
    }
}
