//! Content-script side runner: feeds page events through the core state
//! machine and carries out the effects it returns.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use scrollmark_core::{update, Effect, KeyEvent, Message, Msg, PageState, Position, Reply, Settings};
use scrollmark_logging::{scrollmark_debug, scrollmark_warn};

use crate::coordinator::Coordinator;
use crate::TabId;

/// The page viewport.
pub trait Viewport: Send + Sync {
    fn scroll_position(&self) -> Position;
    fn scroll_to(&self, position: Position);
}

/// Channel from a page to the background context.
#[async_trait::async_trait]
pub trait BackgroundPort: Send + Sync {
    /// Sends `message` on behalf of `tab`. Delivery failures are logged by
    /// the port and surface as a missing reply.
    async fn send(&self, tab: TabId, message: Message) -> Option<Reply>;
}

#[async_trait::async_trait]
impl BackgroundPort for Coordinator {
    async fn send(&self, tab: TabId, message: Message) -> Option<Reply> {
        match self.handle(tab, message).await {
            Ok(reply) => reply,
            Err(err) => {
                scrollmark_warn!("Coordinator failed for tab {}: {}", tab, err);
                None
            }
        }
    }
}

pub struct PageSession {
    tab: TabId,
    state: PageState,
    viewport: Arc<dyn Viewport>,
    port: Arc<dyn BackgroundPort>,
}

impl PageSession {
    pub fn new(
        tab: TabId,
        url: impl Into<String>,
        settings: Settings,
        viewport: Arc<dyn Viewport>,
        port: Arc<dyn BackgroundPort>,
    ) -> Self {
        Self {
            tab,
            state: PageState::new(url, settings),
            viewport,
            port,
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Content script start; restores persisted marks when enabled.
    pub async fn load(&mut self) {
        self.dispatch(Msg::PageLoaded).await;
    }

    pub async fn key_down(&mut self, event: KeyEvent, at: Instant) {
        let scroll = self.viewport.scroll_position();
        self.dispatch(Msg::KeyPressed { event, at, scroll }).await;
    }

    pub async fn tick(&mut self, now: Instant) {
        self.dispatch(Msg::Tick { now }).await;
    }

    pub async fn clear(&mut self) {
        self.dispatch(Msg::ClearRequested).await;
    }

    pub async fn settings_changed(&mut self, settings: Settings) {
        self.dispatch(Msg::SettingsChanged(settings)).await;
    }

    /// Answers a message the popup sent to this page.
    pub async fn handle_message(&mut self, message: Message) -> Option<Reply> {
        match message {
            Message::GetMarks { .. } => Some(Reply::Marks {
                marks: Some(self.state.marks().clone()),
            }),
            Message::Mark { mark } => {
                let scroll = self.viewport.scroll_position();
                self.dispatch(Msg::MarkRequested { slot: mark, scroll })
                    .await;
                None
            }
            Message::Scroll { scroll } => {
                self.dispatch(Msg::ScrollRequested { slot: scroll }).await;
                None
            }
            other => {
                scrollmark_warn!("Page in tab {} ignored background message {:?}", self.tab, other);
                None
            }
        }
    }

    /// Runs `msg` and every message produced by its effects, in order.
    pub async fn dispatch(&mut self, msg: Msg) {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect).await {
                    inbox.push_back(follow_up);
                }
            }
        }
    }

    async fn run_effect(&self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::ScrollTo(position) => {
                self.viewport.scroll_to(position);
                None
            }
            Effect::CaptureScreenshot { slot, url, marks } => {
                let reply = self
                    .port
                    .send(self.tab, Message::push_marks(marks, url, Some(slot)))
                    .await;
                let image = match reply {
                    Some(Reply::Image { image }) => Some(image),
                    _ => None,
                };
                Some(Msg::ImageCaptured { slot, image })
            }
            Effect::ClearPersisted { url } => {
                self.port.send(self.tab, Message::clear_marks(url)).await;
                None
            }
            Effect::LoadPersisted { url } => {
                match self.port.send(self.tab, Message::get_first_marks(url)).await {
                    Some(Reply::Marks { marks }) => Some(Msg::MarksRestored(marks)),
                    _ => None,
                }
            }
            Effect::MarkCountChanged { count } => {
                scrollmark_debug!("Tab {} now has {} marks", self.tab, count);
                None
            }
        }
    }
}
