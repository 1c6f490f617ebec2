pub mod auth;
pub mod browser;
pub mod config;
pub mod download;
pub mod duration;
pub mod error;
pub mod lessons;
pub mod locator;
pub mod pipeline;
pub mod report;

//  Re-export commonly used items
pub use auth::{Authenticator, CaptchaResolution, HumanSignal, LoginState, OperatorPrompt, StdinPrompt};
pub use browser::{ChromeDriver, ConnectionMode, LocatorStrategy, PageDriver, Selector};
pub use config::{Config, Credentials};
pub use download::{DownloadAction, DownloadOutcome, Fetcher};
pub use duration::{format_duration, DurationOutcome, DurationProber, DurationRecord};
pub use error::{Error, Result};
pub use lessons::{walk_lessons, LessonInfo, VideoEntry, VideoVisitor, WalkSummary};
pub use pipeline::{Mode, RunReport};
