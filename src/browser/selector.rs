//! Selector model
//!
//! A `Selector` names one way of finding an element; a `LocatorStrategy` is
//! the ordered list of selectors tried for a single logical UI target.

use std::fmt;

/// One way of addressing an element on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Matches the `name` attribute.
    Name(String),
    /// Any CSS selector (may be a comma-separated group).
    Css(String),
    /// An XPath expression evaluated against the document.
    XPath(String),
    /// Matches the `id` attribute.
    Id(String),
}

impl Selector {
    pub fn name(value: impl Into<String>) -> Self {
        Selector::Name(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        Selector::Id(value.into())
    }

    /// CSS form of this selector, or `None` for XPath.
    ///
    /// Attribute selectors are used for `Name` and `Id` so values that are
    /// not valid CSS identifiers still work.
    pub fn to_css(&self) -> Option<String> {
        match self {
            Selector::Name(v) => Some(format!("[name=\"{}\"]", escape_attr(v))),
            Selector::Css(v) => Some(v.clone()),
            Selector::Id(v) => Some(format!("[id=\"{}\"]", escape_attr(v))),
            Selector::XPath(_) => None,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Name(v) => write!(f, "name={}", v),
            Selector::Css(v) => write!(f, "css={}", v),
            Selector::XPath(v) => write!(f, "xpath={}", v),
            Selector::Id(v) => write!(f, "id={}", v),
        }
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Ordered selector alternatives for one logical target. First match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorStrategy {
    target: &'static str,
    selectors: Vec<Selector>,
}

impl LocatorStrategy {
    pub fn new(target: &'static str, selectors: Vec<Selector>) -> Self {
        Self { target, selectors }
    }

    /// Logical name of the target (used in log lines).
    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}
