//! Run configuration
//!
//! Everything the components need to know about the target site (URLs,
//! selectors), where results go, and how long each wait may take. Built once
//! at startup and passed around by reference.

use crate::browser::{LocatorStrategy, Selector};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOGIN_URL: &str = "https://perfil.estrategia.com/login?source=legado-polvo&target=https%3A%2F%2Fwww.estrategiaconcursos.com.br%2Faccounts%2Flogin%2F%3F";
pub const DEFAULT_SITE_ROOT: &str = "https://www.estrategiaconcursos.com.br";
pub const DEFAULT_LESSONS_URL: &str =
    "https://www.estrategiaconcursos.com.br/app/dashboard/cursos/226005/aulas";

pub const USERNAME_ENV: &str = "USUARIO";
pub const PASSWORD_ENV: &str = "SENHA";

#[derive(Debug, Clone)]
pub struct Config {
    pub login_url: String,
    /// Origin the lesson listing must live under.
    pub site_root: String,
    pub lessons_url: String,
    /// Path fragment that identifies the listing page.
    pub listing_marker: String,
    /// Duration report destination.
    pub output_file: PathBuf,
    /// Directory downloaded videos are written to.
    pub download_dir: PathBuf,
    /// Resolution labels in preference order.
    pub resolution_priority: Vec<String>,
    /// Vertical shift applied after centering an element, to clear the
    /// fixed header.
    pub scroll_offset: i32,
    pub selectors: Selectors,
    pub timings: Timings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            site_root: DEFAULT_SITE_ROOT.to_string(),
            lessons_url: DEFAULT_LESSONS_URL.to_string(),
            listing_marker: "aulas".to_string(),
            output_file: PathBuf::from("Direito Administrativo.csv"),
            download_dir: PathBuf::from("videos_baixados"),
            resolution_priority: vec!["720p".into(), "480p".into(), "360p".into()],
            scroll_offset: -100,
            selectors: Selectors::default(),
            timings: Timings::default(),
        }
    }
}

/// Selectors for every UI target the harvester touches.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub identifier: LocatorStrategy,
    pub secret: LocatorStrategy,
    pub submit: LocatorStrategy,
    pub captcha_frame: String,
    pub lesson_header: String,
    pub lesson_title: String,
    pub lesson_subtitle: String,
    /// Alternatives for video items; queried as one CSS group.
    pub video_items: Vec<String>,
    pub video_title: String,
    pub video_player: String,
    pub interstitial_modal: String,
    pub interstitial_close: String,
    pub overlays: Vec<String>,
    pub download_toggle: Selector,
    pub download_container: String,
    pub download_links: String,
}

impl Selectors {
    pub fn video_items_group(&self) -> String {
        self.video_items.join(",")
    }

    pub fn overlays_group(&self) -> String {
        self.overlays.join(", ")
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            identifier: LocatorStrategy::new(
                "identifier",
                vec![
                    Selector::name("loginField"),
                    Selector::name("login"),
                    Selector::name("email"),
                    Selector::css("input[type='email']"),
                    Selector::id("email"),
                ],
            ),
            secret: LocatorStrategy::new(
                "secret",
                vec![
                    Selector::name("passwordField"),
                    Selector::name("password"),
                    Selector::css("input[type='password']"),
                    Selector::id("password"),
                ],
            ),
            submit: LocatorStrategy::new(
                "submit",
                vec![
                    Selector::css("button[type='submit']"),
                    Selector::xpath("//button[contains(., 'Continuar')]"),
                    Selector::xpath("//button[contains(., 'Entrar')]"),
                ],
            ),
            captcha_frame: "iframe[src*='recaptcha']".to_string(),
            lesson_header: "a.Collapse-header".to_string(),
            lesson_title: "h2.SectionTitle".to_string(),
            lesson_subtitle: "p.sc-gZMcBi".to_string(),
            video_items: vec![
                ".StyledScrollbars.ListVideos-items a.VideoItem".to_string(),
                ".ListVideos-items a.VideoItem".to_string(),
                ".VideoItem".to_string(),
            ],
            video_title: ".VideoItem-info-title".to_string(),
            video_player: ".video-react, video".to_string(),
            interstitial_modal: "#beamerPushModalContent".to_string(),
            interstitial_close: "button".to_string(),
            overlays: vec![
                "getsitecontrol-widget".to_string(),
                "iframe[src*=\"getsitecontrol\"]".to_string(),
                ".gsc-popup".to_string(),
                ".modal".to_string(),
                ".overlay".to_string(),
                ".popup".to_string(),
                "[id*=\"newsletter\"]".to_string(),
                "[class*=\"modal\"]".to_string(),
            ],
            download_toggle: Selector::xpath("//strong[contains(text(), 'Opções de download')]"),
            download_container: "div.sc-Rmtcm.cKiCd".to_string(),
            download_links: "div.sc-Rmtcm.cKiCd a.Button.-small".to_string(),
        }
    }
}

/// Every bounded wait in the run.
#[derive(Debug, Clone)]
pub struct Timings {
    /// Poll interval used by the element locator.
    pub locate_poll: Duration,
    /// Lower bound of each strategy's share of a locate budget.
    pub min_strategy_budget: Duration,
    pub identifier_budget: Duration,
    pub secret_budget: Duration,
    pub submit_budget: Duration,
    /// Pause after opening the login page.
    pub login_settle: Duration,
    /// Pause after submitting, before probing for a CAPTCHA.
    pub captcha_render: Duration,
    pub captcha_poll: Duration,
    /// Upper bound on the whole manual CAPTCHA wait.
    pub captcha_ceiling: Duration,
    /// Dialog wait at checkpoints (login start, after login, listing).
    pub dialog_wait: Duration,
    /// Pause after navigating to the listing page.
    pub listing_settle: Duration,
    /// Pause before the walk starts.
    pub walk_settle: Duration,
    pub modal_appear: Duration,
    pub modal_dismiss: Duration,
    /// Pause between scrolling and clicking.
    pub scroll_settle: Duration,
    pub actionable_wait: Duration,
    pub expand_settle: Duration,
    pub collapse_settle: Duration,
    pub video_list_wait: Duration,
    pub player_wait: Duration,
    pub duration_poll: Duration,
    pub duration_budget: Duration,
    pub overlay_settle: Duration,
    pub download_toggle_wait: Duration,
    pub download_expand_settle: Duration,
    pub download_links_wait: Duration,
    pub http_connect_timeout: Duration,
    /// Longest silence tolerated while a download body is streaming.
    pub http_read_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            locate_poll: Duration::from_millis(250),
            min_strategy_budget: Duration::from_secs(2),
            identifier_budget: Duration::from_secs(15),
            secret_budget: Duration::from_secs(10),
            submit_budget: Duration::from_secs(5),
            login_settle: Duration::from_millis(500),
            captcha_render: Duration::from_secs(3),
            captcha_poll: Duration::from_secs(1),
            captcha_ceiling: Duration::from_secs(15 * 60),
            dialog_wait: Duration::from_secs(3),
            listing_settle: Duration::from_secs(2),
            walk_settle: Duration::from_secs(3),
            modal_appear: Duration::from_secs(2),
            modal_dismiss: Duration::from_secs(5),
            scroll_settle: Duration::from_millis(500),
            actionable_wait: Duration::from_secs(5),
            expand_settle: Duration::from_secs(1),
            collapse_settle: Duration::from_millis(500),
            video_list_wait: Duration::from_secs(20),
            player_wait: Duration::from_secs(15),
            duration_poll: Duration::from_millis(200),
            duration_budget: Duration::from_secs(30),
            overlay_settle: Duration::from_millis(300),
            download_toggle_wait: Duration::from_secs(10),
            download_expand_settle: Duration::from_secs(1),
            download_links_wait: Duration::from_secs(10),
            http_connect_timeout: Duration::from_secs(60),
            http_read_timeout: Duration::from_secs(60),
        }
    }
}

/// Account identifier and secret.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Build from optional values, naming the environment variable that is
    /// missing when one is absent or blank.
    pub fn new(username: Option<String>, password: Option<String>) -> Result<Self> {
        let username = username
            .filter(|v| !v.trim().is_empty())
            .ok_or(Error::MissingCredential(USERNAME_ENV))?;
        let password = password
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingCredential(PASSWORD_ENV))?;
        Ok(Self { username, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
