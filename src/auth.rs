//! Login flow
//!
//! Drives the login form and, when a reCAPTCHA shows up, hands control to
//! the operator. The wait for the operator is a race between three signals:
//! the challenge frame disappearing, the URL changing, and the operator
//! confirming on the terminal. Whichever comes first ends the wait.

use crate::browser::{PageDriver, Selector};
use crate::config::{Config, Credentials};
use crate::error::{Error, Result};
use crate::locator::{accept_dialog, locate};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

const CAPTCHA_PROMPT: &str = "⚠️  CAPTCHA detected! Solve it manually in the browser.\n\
     When done, click the button in the browser or press Enter here to continue...";

/// Where the login flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    NotStarted,
    CredentialsEntered,
    SubmittedOnce,
    CaptchaPending,
    CaptchaResolved,
    LoggedIn,
}

/// What ended the manual CAPTCHA wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaResolution {
    FrameGone,
    UrlChanged,
    OperatorConfirmed,
    /// The wait ceiling elapsed with no signal; the run proceeds anyway.
    TimedOut,
}

/// Result of a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginReport {
    pub submitted_automatically: bool,
    pub captcha: Option<CaptchaResolution>,
}

/// One-shot flag the operator task raises once; never reset.
#[derive(Debug, Clone, Default)]
pub struct HumanSignal(Arc<AtomicBool>);

impl HumanSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Asks the operator to confirm they solved the challenge.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Resolves once the operator confirms.
    async fn confirm(&self, message: &str) -> io::Result<()>;
}

/// Blocks on a line from stdin.
///
/// The read runs on a detached OS thread so an unanswered prompt never keeps
/// the process alive after the run is over.
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait]
impl OperatorPrompt for StdinPrompt {
    async fn confirm(&self, message: &str) -> io::Result<()> {
        let (tx, rx) = oneshot::channel();
        let message = message.to_string();

        std::thread::spawn(move || {
            println!("{}", message);
            let mut line = String::new();
            let result = match io::stdin().read_line(&mut line) {
                Ok(0) => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stdin closed before confirmation",
                )),
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
            let _ = tx.send(result);
        });

        rx.await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "operator prompt dropped"))?
    }
}

pub struct Authenticator<'a, D: PageDriver> {
    driver: &'a D,
    config: &'a Config,
    prompt: Arc<dyn OperatorPrompt>,
    state: LoginState,
}

impl<'a, D: PageDriver> Authenticator<'a, D> {
    pub fn new(driver: &'a D, config: &'a Config, prompt: Arc<dyn OperatorPrompt>) -> Self {
        Self {
            driver,
            config,
            prompt,
            state: LoginState::NotStarted,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    fn advance(&mut self, next: LoginState) {
        log::debug!("Login state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run the whole login. Only a missing identifier or secret field (or a
    /// browser failure) is an error; everything else degrades to operator
    /// intervention.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<LoginReport> {
        let driver = self.driver;
        let config = self.config;
        let timings = &config.timings;
        let selectors = &config.selectors;

        println!("🔐 Starting login...");
        driver.goto(&config.login_url).await?;
        tokio::time::sleep(timings.login_settle).await;
        accept_dialog(driver, timings.dialog_wait).await;

        let Some(identifier) =
            locate(driver, &selectors.identifier, timings.identifier_budget, config).await
        else {
            println!("❌ Could not find the identifier field. Fill it in manually and rerun.");
            return Err(Error::FieldNotFound("identifier"));
        };
        driver.fill(&identifier, &credentials.username).await?;
        println!("✅ Identifier filled.");

        self.fill_secret(&identifier, &credentials.password).await?;
        self.advance(LoginState::CredentialsEntered);

        // One deterministic attempt; if it is missing the operator clicks.
        let submitted_automatically =
            match locate(driver, &selectors.submit, timings.submit_budget, config).await {
                Some(button) => {
                    if let Err(e) = driver.click(&button).await {
                        log::debug!("Native submit click failed ({}), using script click", e);
                        driver.script_click(&button).await?;
                    }
                    println!("▶️  Submit button clicked automatically.");
                    true
                }
                None => {
                    println!("⚠️  Submit button not found. Click it manually in the browser.");
                    false
                }
            };
        self.advance(LoginState::SubmittedOnce);

        tokio::time::sleep(timings.captcha_render).await;

        let frame = Selector::css(selectors.captcha_frame.clone());
        let captcha = if driver.find_all(&frame).await?.is_empty() {
            println!("✅ No CAPTCHA detected, continuing...");
            None
        } else {
            self.advance(LoginState::CaptchaPending);
            let resolution = self.await_captcha(&frame).await;
            self.advance(LoginState::CaptchaResolved);
            Some(resolution)
        };

        accept_dialog(driver, timings.dialog_wait).await;
        self.advance(LoginState::LoggedIn);

        Ok(LoginReport {
            submitted_automatically,
            captcha,
        })
    }

    async fn fill_secret(&self, identifier: &D::Element, password: &str) -> Result<()> {
        let driver = self.driver;
        let config = self.config;

        if let Some(field) = locate(
            driver,
            &config.selectors.secret,
            config.timings.secret_budget,
            config,
        )
        .await
        {
            match driver.fill(&field, password).await {
                Ok(()) => {
                    println!("🔑 Secret filled.");
                    return Ok(());
                }
                Err(e) => log::debug!("Direct secret fill failed: {}", e),
            }
        } else {
            log::debug!("Secret field not located, trying TAB from identifier");
        }

        match driver.tab_and_type(identifier, password).await {
            Ok(()) => {
                println!("🔑 Secret filled via TAB.");
                Ok(())
            }
            Err(e) => {
                log::debug!("TAB fallback failed: {}", e);
                println!("⚠️  Could not fill the secret field automatically.");
                Err(Error::FieldNotFound("secret"))
            }
        }
    }

    async fn await_captcha(&self, frame: &Selector) -> CaptchaResolution {
        let driver = self.driver;
        let timings = &self.config.timings;

        let signal = HumanSignal::new();
        let url_before = driver.current_url().await.unwrap_or_default();

        let prompt = Arc::clone(&self.prompt);
        let raised = signal.clone();
        let operator = tokio::spawn(async move {
            match prompt.confirm(CAPTCHA_PROMPT).await {
                Ok(()) => raised.set(),
                Err(e) => log::warn!("Operator prompt unavailable: {}", e),
            }
        });

        let start = Instant::now();
        let mut announced = false;

        let resolution = loop {
            accept_dialog(driver, Duration::ZERO).await;

            if matches!(driver.find_all(frame).await, Ok(found) if found.is_empty()) {
                println!("▶️  CAPTCHA frame gone, continuing.");
                break CaptchaResolution::FrameGone;
            }

            if let Ok(url) = driver.current_url().await {
                if url != url_before {
                    println!("▶️  URL changed after CAPTCHA, assuming it was solved.");
                    break CaptchaResolution::UrlChanged;
                }
            }

            if signal.is_set() {
                println!("▶️  Enter pressed in the terminal. Continuing.");
                break CaptchaResolution::OperatorConfirmed;
            }

            if start.elapsed() >= timings.captcha_ceiling {
                println!("⚠️  Gave up waiting for the CAPTCHA; continuing anyway.");
                break CaptchaResolution::TimedOut;
            }

            if !announced {
                println!("⏳ Waiting for CAPTCHA resolution...");
                announced = true;
            }
            tokio::time::sleep(timings.captcha_poll).await;
        };

        operator.abort();
        resolution
    }
}
