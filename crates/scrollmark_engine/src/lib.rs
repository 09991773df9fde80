//! Scrollmark engine: storage tiers, the background coordinator and the page
//! session runner.
mod badge;
mod bootstrap;
mod capture;
mod coordinator;
mod file_store;
mod images;
mod page;
mod persist;
mod storage;

/// Browser tab identifier.
pub type TabId = u64;

pub use badge::BadgeSurface;
pub use bootstrap::{
    default_entries, load_settings, load_url_index, save_bindings, save_settings, seed_defaults,
    SaveSettingsError,
};
pub use capture::{CaptureError, NoCapture, ScreenshotSource};
pub use coordinator::{Coordinator, CoordinatorError, TabPhase};
pub use file_store::{DirectoryStore, JsonFileStore};
pub use images::ImageCache;
pub use page::{BackgroundPort, PageSession, Viewport};
pub use persist::{ensure_data_dir, AtomicFileWriter, PersistError};
pub use storage::{get_typed, KeyValueStore, MemoryStore, StorageError, Updater};
