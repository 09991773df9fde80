use crate::TabId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("tab capture is not supported on this platform")]
    Unsupported,
    #[error("capture of tab {tab} failed: {message}")]
    Failed { tab: TabId, message: String },
}

/// Source of visible-tab screenshots, encoded as data URIs.
#[async_trait::async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn capture_visible_tab(&self, tab: TabId) -> Result<String, CaptureError>;
}

/// Source for platforms that cannot capture tabs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

#[async_trait::async_trait]
impl ScreenshotSource for NoCapture {
    async fn capture_visible_tab(&self, _tab: TabId) -> Result<String, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}
