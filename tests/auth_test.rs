//! Login flow against the in-memory page
//!
//! All tests run on a paused clock, so the real waits (15 s locator budgets,
//! the 15 minute CAPTCHA ceiling) finish instantly.

mod fake_page;

use async_trait::async_trait;
use course_harvest::auth::{Authenticator, CaptchaResolution, LoginState, OperatorPrompt};
use course_harvest::browser::Selector;
use course_harvest::config::{Config, Credentials};
use course_harvest::Error;
use fake_page::{FakePage, Node, NodeId, OnClick, Typed};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Operator who never answers.
struct SilentOperator;

#[async_trait]
impl OperatorPrompt for SilentOperator {
    async fn confirm(&self, _message: &str) -> io::Result<()> {
        futures::future::pending::<()>().await;
        Ok(())
    }
}

/// Operator who presses Enter after a while.
struct SlowOperator(Duration);

#[async_trait]
impl OperatorPrompt for SlowOperator {
    async fn confirm(&self, _message: &str) -> io::Result<()> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

/// Terminal closed before anyone could answer.
struct ClosedTerminal;

#[async_trait]
impl OperatorPrompt for ClosedTerminal {
    async fn confirm(&self, _message: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"))
    }
}

struct LoginForm {
    page: FakePage,
    identifier: Option<NodeId>,
    secret: Option<NodeId>,
    submit: Option<NodeId>,
}

struct FormOptions {
    identifier: bool,
    secret: bool,
    submit: bool,
    /// Add a reCAPTCHA frame after submission that lasts this many queries
    /// (`Some(None)` never goes away).
    captcha: Option<Option<usize>>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            identifier: true,
            secret: true,
            submit: true,
            captcha: None,
        }
    }
}

fn login_form(config: &Config, options: FormOptions) -> LoginForm {
    let page = FakePage::new("blank", "about:blank");
    page.route(&config.login_url, "login");

    let identifier = options.identifier.then(|| {
        page.add(
            Node::new()
                .matching(Selector::name("loginField"))
                .on("login"),
        )
    });
    let secret = options.secret.then(|| {
        page.add(
            Node::new()
                .css("input[type='password']")
                .on("login"),
        )
    });
    let submit = options.submit.then(|| {
        page.add(
            Node::new()
                .css("button[type='submit']")
                .text("Continuar")
                .on("login")
                .click(OnClick::Set("submitted".into())),
        )
    });

    if let Some(lifetime) = options.captcha {
        let mut frame = Node::new()
            .css(config.selectors.captcha_frame.clone())
            .on("login")
            .when("submitted");
        if let Some(hits) = lifetime {
            frame = frame.vanish_after(hits);
        }
        page.add(frame);
    }

    LoginForm {
        page,
        identifier,
        secret,
        submit,
    }
}

fn credentials() -> Credentials {
    Credentials::new(Some("aluno@example.com".into()), Some("s3cret".into())).unwrap()
}

#[tokio::test(start_paused = true)]
async fn login_without_captcha_fills_and_submits() {
    let config = Config::default();
    let form = login_form(&config, FormOptions::default());
    form.page.push_dialog("Sessão expirada");

    let mut auth = Authenticator::new(&form.page, &config, Arc::new(SilentOperator));
    let report = auth.login(&credentials()).await.unwrap();

    assert_eq!(auth.state(), LoginState::LoggedIn);
    assert!(report.submitted_automatically);
    assert_eq!(report.captcha, None);
    assert_eq!(form.page.clicks_on(form.submit.unwrap()), 1);
    assert_eq!(form.page.pending_dialogs(), 0);
    assert_eq!(
        form.page.typed(),
        vec![
            Typed::Into(form.identifier.unwrap(), "aluno@example.com".into()),
            Typed::Into(form.secret.unwrap(), "s3cret".into()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_identifier_field_is_fatal() {
    let config = Config::default();
    let form = login_form(
        &config,
        FormOptions {
            identifier: false,
            ..FormOptions::default()
        },
    );

    let mut auth = Authenticator::new(&form.page, &config, Arc::new(SilentOperator));
    let err = auth.login(&credentials()).await.unwrap_err();

    assert!(matches!(err, Error::FieldNotFound("identifier")));
    assert!(err.is_fatal());
    assert_eq!(auth.state(), LoginState::NotStarted);
    assert_eq!(form.page.clicks_on(form.submit.unwrap()), 0);
    assert!(form.page.typed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn secret_falls_back_to_tab_from_identifier() {
    let config = Config::default();
    let form = login_form(
        &config,
        FormOptions {
            secret: false,
            ..FormOptions::default()
        },
    );

    let mut auth = Authenticator::new(&form.page, &config, Arc::new(SilentOperator));
    auth.login(&credentials()).await.unwrap();

    assert_eq!(
        form.page.typed().last(),
        Some(&Typed::AfterTab("s3cret".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn unreachable_secret_field_is_fatal() {
    let config = Config::default();
    let form = login_form(
        &config,
        FormOptions {
            secret: false,
            ..FormOptions::default()
        },
    );
    form.page.fail_tab();

    let mut auth = Authenticator::new(&form.page, &config, Arc::new(SilentOperator));
    let err = auth.login(&credentials()).await.unwrap_err();

    assert!(matches!(err, Error::FieldNotFound("secret")));
    assert_eq!(form.page.clicks_on(form.submit.unwrap()), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_submit_leaves_it_to_the_operator() {
    let config = Config::default();
    let form = login_form(
        &config,
        FormOptions {
            submit: false,
            ..FormOptions::default()
        },
    );

    let mut auth = Authenticator::new(&form.page, &config, Arc::new(SilentOperator));
    let report = auth.login(&credentials()).await.unwrap();

    assert!(!report.submitted_automatically);
    assert_eq!(auth.state(), LoginState::LoggedIn);
}

#[tokio::test(start_paused = true)]
async fn captcha_ends_when_frame_disappears() {
    let config = Config::default();
    let form = login_form(
        &config,
        FormOptions {
            captcha: Some(Some(3)),
            ..FormOptions::default()
        },
    );

    let mut auth = Authenticator::new(&form.page, &config, Arc::new(SilentOperator));
    let report = auth.login(&credentials()).await.unwrap();

    assert_eq!(report.captcha, Some(CaptchaResolution::FrameGone));
    assert_eq!(auth.state(), LoginState::LoggedIn);
}

#[tokio::test(start_paused = true)]
async fn captcha_ends_when_url_changes() {
    let config = Config::default();
    let form = login_form(
        &config,
        FormOptions {
            captcha: Some(None),
            ..FormOptions::default()
        },
    );
    form.page
        .change_url_after_reads(2, "https://www.estrategiaconcursos.com.br/app/dashboard");

    let mut auth = Authenticator::new(&form.page, &config, Arc::new(SilentOperator));
    let report = auth.login(&credentials()).await.unwrap();

    assert_eq!(report.captcha, Some(CaptchaResolution::UrlChanged));
}

#[tokio::test(start_paused = true)]
async fn captcha_ends_when_operator_confirms() {
    let config = Config::default();
    let form = login_form(
        &config,
        FormOptions {
            captcha: Some(None),
            ..FormOptions::default()
        },
    );

    let mut auth = Authenticator::new(
        &form.page,
        &config,
        Arc::new(SlowOperator(Duration::from_secs(5))),
    );
    let report = auth.login(&credentials()).await.unwrap();

    assert_eq!(report.captcha, Some(CaptchaResolution::OperatorConfirmed));
}

#[tokio::test(start_paused = true)]
async fn captcha_wait_gives_up_at_the_ceiling() {
    let config = Config::default();
    let form = login_form(
        &config,
        FormOptions {
            captcha: Some(None),
            ..FormOptions::default()
        },
    );

    let started = tokio::time::Instant::now();
    let mut auth = Authenticator::new(&form.page, &config, Arc::new(ClosedTerminal));
    let report = auth.login(&credentials()).await.unwrap();

    assert_eq!(report.captcha, Some(CaptchaResolution::TimedOut));
    assert!(started.elapsed() >= config.timings.captcha_ceiling);
    assert_eq!(auth.state(), LoginState::LoggedIn);
}
