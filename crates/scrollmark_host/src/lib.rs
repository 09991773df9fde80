//! Native-messaging host: runs the scrollmark coordinator outside the
//! browser, with file-backed storage.
mod app;
mod config;
mod envelope;
mod frame;

pub use app::{serve, Host};
pub use config::{ConfigError, HostConfig, LogTarget, CONFIG_ENV, CONFIG_FILENAME};
pub use envelope::{HostEvent, HostFrame, HostRequest};
pub use frame::{
    encode_frame, read_frame, write_frame, FrameError, MAX_INCOMING_FRAME, MAX_OUTGOING_FRAME,
};
