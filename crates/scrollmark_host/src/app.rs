use std::io::{Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use scrollmark_core::{BadgeView, Capabilities};
use scrollmark_engine::{
    ensure_data_dir, seed_defaults, BadgeSurface, Coordinator, DirectoryStore, JsonFileStore,
    KeyValueStore, NoCapture, TabId,
};
use scrollmark_logging::{scrollmark_debug, scrollmark_info, scrollmark_warn};

use crate::config::HostConfig;
use crate::envelope::{HostEvent, HostFrame, HostRequest};
use crate::frame::{read_frame, write_frame, FrameError};

/// Badge updates waiting to be written out after the current request.
#[derive(Default)]
struct Outbox {
    frames: Mutex<Vec<HostFrame>>,
}

impl Outbox {
    fn drain(&self) -> Vec<HostFrame> {
        std::mem::take(&mut *self.frames.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl BadgeSurface for Outbox {
    fn render(&self, tab: TabId, view: &BadgeView) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(HostFrame::Badge {
                tab,
                badge: view.clone(),
            });
    }
}

pub struct Host {
    coordinator: Coordinator,
    outbox: Arc<Outbox>,
}

impl Host {
    /// Opens the stores under the configured data directory and seeds any
    /// missing settings.
    pub async fn open(config: &HostConfig) -> anyhow::Result<Self> {
        ensure_data_dir(&config.data_dir)
            .with_context(|| format!("data directory {:?}", config.data_dir))?;
        let settings = Arc::new(JsonFileStore::open(config.settings_path())?);
        let images = Arc::new(DirectoryStore::open(config.images_dir())?);

        seed_defaults(settings.as_ref())
            .await
            .context("seeding default settings")?;

        // The host cannot see the browser's tabs, so it never captures.
        let capabilities = Capabilities {
            capture: false,
            ..Capabilities::for_browser(config.browser())
        };
        scrollmark_info!(
            "Host ready for {:?} with data in {:?}",
            config.browser(),
            config.data_dir
        );
        Ok(Self::with_stores(settings, images, capabilities))
    }

    pub fn with_stores(
        settings: Arc<dyn KeyValueStore>,
        images: Arc<dyn KeyValueStore>,
        capabilities: Capabilities,
    ) -> Self {
        let outbox = Arc::new(Outbox::default());
        let coordinator = Coordinator::new(
            settings,
            images,
            Arc::new(NoCapture),
            outbox.clone(),
            capabilities,
        );
        Self {
            coordinator,
            outbox,
        }
    }

    /// Handles one raw frame payload and returns the frames to send back.
    pub async fn handle_payload(&self, payload: &[u8]) -> Vec<HostFrame> {
        match serde_json::from_slice::<HostRequest>(payload) {
            Ok(request) => self.handle(request).await,
            Err(err) => {
                scrollmark_warn!("Dropping unreadable frame: {}", err);
                vec![HostFrame::Error {
                    tab: None,
                    error: err.to_string(),
                }]
            }
        }
    }

    pub async fn handle(&self, request: HostRequest) -> Vec<HostFrame> {
        let HostRequest { tab, event } = request;
        let outcome = match event {
            HostEvent::TabActivated { .. } => {
                self.coordinator.tab_activated(tab).await.map(|()| None)
            }
            HostEvent::NavigationCompleted {
                navigation_completed,
            } => self
                .coordinator
                .navigation_completed(tab, &navigation_completed)
                .await
                .map(|()| None),
            HostEvent::TabRemoved { .. } => {
                self.coordinator.tab_removed(tab);
                Ok(None)
            }
            HostEvent::Message(message) => {
                scrollmark_debug!("Tab {} sent {:?}", tab, message);
                self.coordinator
                    .handle(tab, message)
                    .await
                    .map(|reply| Some(HostFrame::Reply { tab, reply }))
            }
        };

        let mut frames = self.outbox.drain();
        match outcome {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => {}
            Err(err) => {
                scrollmark_warn!("Request from tab {} failed: {}", tab, err);
                frames.push(HostFrame::Error {
                    tab: Some(tab),
                    error: err.to_string(),
                });
            }
        }
        frames
    }
}

/// Serves frames from `input` until it ends, writing responses to `output`.
pub fn serve(config: &HostConfig, mut input: impl Read, mut output: impl Write) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("building runtime")?;
    let host = runtime.block_on(Host::open(config))?;

    let mut served = 0usize;
    while let Some(payload) = read_frame(&mut input)? {
        for frame in runtime.block_on(host.handle_payload(&payload)) {
            write_or_report(&mut output, &frame)?;
        }
        served += 1;
    }
    scrollmark_info!("Input closed after {} frames", served);
    Ok(())
}

/// Writes `frame`; one the browser would reject for its size is replaced by
/// an error frame for the same tab.
fn write_or_report(output: &mut impl Write, frame: &HostFrame) -> Result<(), FrameError> {
    match write_frame(&mut *output, frame) {
        Err(FrameError::TooLarge { len, max }) => {
            scrollmark_warn!("Dropping {} byte frame over the {} byte limit", len, max);
            write_frame(
                &mut *output,
                &HostFrame::Error {
                    tab: frame.tab(),
                    error: format!("response of {len} bytes exceeds the {max} byte limit"),
                },
            )
        }
        result => result,
    }
}
