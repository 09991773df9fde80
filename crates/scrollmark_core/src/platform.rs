/// Browser family the extension runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
    FirefoxAndroid,
}

impl Browser {
    /// Resolves the browser from the name reported by `getBrowserInfo`.
    ///
    /// Chromium has no such call, so a missing name means Chrome. Firefox for
    /// Android reports itself as "Fennec".
    pub fn detect(reported_name: Option<&str>) -> Self {
        match reported_name {
            None => Browser::Chrome,
            Some(name) if name.to_ascii_lowercase().contains("fennec") => Browser::FirefoxAndroid,
            Some(_) => Browser::Firefox,
        }
    }
}

/// Platform features, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Toolbar icon can show badge text.
    pub badge_text: bool,
    /// Visible tab can be captured as an image.
    pub capture: bool,
}

impl Capabilities {
    pub fn for_browser(browser: Browser) -> Self {
        match browser {
            Browser::Chrome | Browser::Firefox => Self {
                badge_text: true,
                capture: true,
            },
            Browser::FirefoxAndroid => Self {
                badge_text: false,
                capture: false,
            },
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::for_browser(Browser::default())
    }
}
