pub mod chrome;
pub mod selector;

pub use chrome::{ChromeDriver, ConnectionMode};
pub use selector::{LocatorStrategy, Selector};

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// The single browser page the harvester drives.
///
/// Every operation acts on the one active page; implementations are not
/// expected to tolerate concurrent callers. Element handles are only valid
/// while the document that produced them is loaded.
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Clone + Send + Sync;

    /// Navigate to `url` and wait for the load event.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Go one entry back in the session history.
    async fn go_back(&self) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// All elements matching `selector`, in document order. No match is an
    /// empty vector, not an error.
    async fn find_all(&self, selector: &Selector) -> Result<Vec<Self::Element>>;

    /// All descendants of `parent` matching the CSS selector `css`.
    async fn find_in(&self, parent: &Self::Element, css: &str) -> Result<Vec<Self::Element>>;

    /// Rendered (inner) text of the element.
    async fn text(&self, element: &Self::Element) -> Result<String>;

    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    /// Present, visible and enabled.
    async fn is_actionable(&self, element: &Self::Element) -> Result<bool>;

    /// Native (input-event) click.
    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// `element.click()` from page script; not subject to interception.
    async fn script_click(&self, element: &Self::Element) -> Result<()>;

    /// Center the element in the viewport, then scroll by `offset_y` pixels.
    async fn scroll_into_view(&self, element: &Self::Element, offset_y: i32) -> Result<()>;

    /// Clear the field and type `value` into it.
    async fn fill(&self, element: &Self::Element, value: &str) -> Result<()>;

    /// Press Tab from `from` and type `value` into whatever receives focus.
    async fn tab_and_type(&self, from: &Self::Element, value: &str) -> Result<()>;

    /// Accept a JavaScript dialog if one is open or opens within `wait`.
    /// Returns the dialog message when one was accepted.
    async fn accept_dialog(&self, wait: Duration) -> Result<Option<String>>;

    /// Remove every element matching the CSS selector group. Returns how
    /// many were removed.
    async fn remove_elements(&self, css: &str) -> Result<usize>;

    /// Mute the first media element and ask it to play. A rejected play
    /// promise is not an error.
    async fn start_muted_playback(&self) -> Result<()>;

    /// Duration reported by the first media element, when it is a positive
    /// finite number.
    async fn media_duration(&self) -> Result<Option<f64>>;
}
