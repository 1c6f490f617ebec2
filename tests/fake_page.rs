//! In-memory page for tests
//!
//! Models the handful of screens the harvester moves through (login, lesson
//! listing, video pages) as a flat list of nodes. A node is visible when it
//! belongs to the current screen and its flag conditions hold. Clicks open
//! screens or flip flags, which is all the real site does from the point of
//! view of the harvester.

#![allow(dead_code)]

use async_trait::async_trait;
use course_harvest::browser::{PageDriver, Selector};
use course_harvest::config::{Config, Timings};
use course_harvest::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum OnClick {
    Nothing,
    /// Navigate to another screen, keeping the current one in history.
    Open { screen: String, url: String },
    /// Flip a page flag.
    Toggle(String),
    /// Raise a page flag.
    Set(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    matches: Vec<Selector>,
    text: String,
    attrs: HashMap<String, String>,
    actionable: bool,
    screen: Option<String>,
    requires_flag: Option<String>,
    on_click: OnClick,
    native_click_fails: bool,
    /// Number of `find_all` results left before the node disappears.
    remaining_hits: Option<usize>,
    child: bool,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new() -> Self {
        Self {
            matches: Vec::new(),
            text: String::new(),
            attrs: HashMap::new(),
            actionable: true,
            screen: None,
            requires_flag: None,
            on_click: OnClick::Nothing,
            native_click_fails: false,
            remaining_hits: None,
            child: false,
            children: Vec::new(),
        }
    }

    pub fn matching(mut self, selector: Selector) -> Self {
        self.matches.push(selector);
        self
    }

    pub fn css(self, css: impl Into<String>) -> Self {
        self.matching(Selector::css(css))
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn on(mut self, screen: &str) -> Self {
        self.screen = Some(screen.to_string());
        self
    }

    pub fn when(mut self, flag: impl Into<String>) -> Self {
        self.requires_flag = Some(flag.into());
        self
    }

    pub fn click(mut self, action: OnClick) -> Self {
        self.on_click = action;
        self
    }

    pub fn not_actionable(mut self) -> Self {
        self.actionable = false;
        self
    }

    pub fn intercepted(mut self) -> Self {
        self.native_click_fails = true;
        self
    }

    pub fn vanish_after(mut self, hits: usize) -> Self {
        self.remaining_hits = Some(hits);
        self
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

/// What was typed, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Typed {
    Into(NodeId, String),
    AfterTab(String),
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    removed: HashSet<NodeId>,
    screen: String,
    url: String,
    history: Vec<(String, String)>,
    routes: HashMap<String, String>,
    flags: HashSet<String>,
    durations: HashMap<String, f64>,
    failing_playback: HashSet<String>,
    dialogs: VecDeque<String>,
    url_change: Option<(usize, String)>,
    url_reads: usize,
    tab_fails: bool,
    typed: Vec<Typed>,
    clicks: Vec<NodeId>,
    visits: Vec<String>,
}

impl State {
    fn visible(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        !node.child
            && !self.removed.contains(&id)
            && node.screen.as_ref().map_or(true, |s| *s == self.screen)
            && node
                .requires_flag
                .as_ref()
                .map_or(true, |f| self.flags.contains(f))
            && node.remaining_hits != Some(0)
    }

    fn activate(&mut self, id: NodeId) {
        self.clicks.push(id);
        match self.nodes[id.0].on_click.clone() {
            OnClick::Nothing => {}
            OnClick::Open { screen, url } => {
                let previous = (
                    std::mem::replace(&mut self.screen, screen),
                    std::mem::replace(&mut self.url, url),
                );
                self.history.push(previous);
            }
            OnClick::Toggle(flag) => {
                if !self.flags.remove(&flag) {
                    self.flags.insert(flag);
                }
            }
            OnClick::Set(flag) => {
                self.flags.insert(flag);
            }
        }
    }
}

pub struct FakePage {
    state: Mutex<State>,
}

impl FakePage {
    pub fn new(screen: &str, url: &str) -> Self {
        let state = State {
            screen: screen.to_string(),
            url: url.to_string(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add(&self, node: Node) -> NodeId {
        self.with(|s| {
            s.nodes.push(node);
            NodeId(s.nodes.len() - 1)
        })
    }

    /// Add a node only reachable through `find_in(parent, ..)`.
    pub fn add_child(&self, parent: NodeId, mut node: Node) -> NodeId {
        node.child = true;
        self.with(|s| {
            s.nodes.push(node);
            let id = NodeId(s.nodes.len() - 1);
            s.nodes[parent.0].children.push(id);
            id
        })
    }

    /// `goto(url)` lands on `screen`.
    pub fn route(&self, url: &str, screen: &str) {
        self.with(|s| s.routes.insert(url.to_string(), screen.to_string()));
    }

    pub fn set_duration(&self, screen: &str, seconds: f64) {
        self.with(|s| s.durations.insert(screen.to_string(), seconds));
    }

    pub fn fail_playback(&self, screen: &str) {
        self.with(|s| s.failing_playback.insert(screen.to_string()));
    }

    /// After `reads` calls to `current_url`, the URL becomes `url`.
    pub fn change_url_after_reads(&self, reads: usize, url: &str) {
        self.with(|s| s.url_change = Some((reads, url.to_string())));
    }

    pub fn fail_tab(&self) {
        self.with(|s| s.tab_fails = true);
    }

    pub fn raise(&self, flag: &str) {
        self.with(|s| s.flags.insert(flag.to_string()));
    }

    pub fn push_dialog(&self, message: &str) {
        self.with(|s| s.dialogs.push_back(message.to_string()));
    }

    pub fn typed(&self) -> Vec<Typed> {
        self.with(|s| s.typed.clone())
    }

    pub fn clicks_on(&self, id: NodeId) -> usize {
        self.with(|s| s.clicks.iter().filter(|c| **c == id).count())
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        self.with(|s| s.removed.contains(&id))
    }

    pub fn screen(&self) -> String {
        self.with(|s| s.screen.clone())
    }

    pub fn flag(&self, flag: &str) -> bool {
        self.with(|s| s.flags.contains(flag))
    }

    pub fn visits(&self) -> Vec<String> {
        self.with(|s| s.visits.clone())
    }

    pub fn pending_dialogs(&self) -> usize {
        self.with(|s| s.dialogs.len())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    type Element = NodeId;

    async fn goto(&self, url: &str) -> Result<()> {
        self.with(|s| {
            s.visits.push(url.to_string());
            let screen = s
                .routes
                .get(url)
                .cloned()
                .ok_or_else(|| Error::NavigationFailed(format!("no route for {}", url)))?;
            let previous = (
                std::mem::replace(&mut s.screen, screen),
                std::mem::replace(&mut s.url, url.to_string()),
            );
            s.history.push(previous);
            Ok(())
        })
    }

    async fn go_back(&self) -> Result<()> {
        self.with(|s| {
            let (screen, url) = s
                .history
                .pop()
                .ok_or_else(|| Error::NavigationFailed("No previous history entry".into()))?;
            s.screen = screen;
            s.url = url;
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String> {
        self.with(|s| {
            s.url_reads += 1;
            if let Some((reads, url)) = &s.url_change {
                if s.url_reads > *reads {
                    s.url = url.clone();
                }
            }
            Ok(s.url.clone())
        })
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<NodeId>> {
        self.with(|s| {
            let found: Vec<NodeId> = (0..s.nodes.len())
                .map(NodeId)
                .filter(|id| s.visible(*id) && s.nodes[id.0].matches.contains(selector))
                .collect();
            for id in &found {
                if let Some(hits) = s.nodes[id.0].remaining_hits.as_mut() {
                    *hits -= 1;
                }
            }
            Ok(found)
        })
    }

    async fn find_in(&self, parent: &NodeId, css: &str) -> Result<Vec<NodeId>> {
        let wanted = Selector::css(css);
        self.with(|s| {
            Ok(s.nodes[parent.0]
                .children
                .iter()
                .copied()
                .filter(|id| s.nodes[id.0].matches.contains(&wanted))
                .collect())
        })
    }

    async fn text(&self, element: &NodeId) -> Result<String> {
        self.with(|s| Ok(s.nodes[element.0].text.clone()))
    }

    async fn attribute(&self, element: &NodeId, name: &str) -> Result<Option<String>> {
        self.with(|s| Ok(s.nodes[element.0].attrs.get(name).cloned()))
    }

    async fn is_actionable(&self, element: &NodeId) -> Result<bool> {
        self.with(|s| {
            let node = &s.nodes[element.0];
            Ok(node.actionable && (node.child || s.visible(*element)))
        })
    }

    async fn click(&self, element: &NodeId) -> Result<()> {
        self.with(|s| {
            if s.nodes[element.0].native_click_fails {
                return Err(Error::Other("element click intercepted".into()));
            }
            s.activate(*element);
            Ok(())
        })
    }

    async fn script_click(&self, element: &NodeId) -> Result<()> {
        self.with(|s| {
            s.activate(*element);
            Ok(())
        })
    }

    async fn scroll_into_view(&self, _element: &NodeId, _offset_y: i32) -> Result<()> {
        Ok(())
    }

    async fn fill(&self, element: &NodeId, value: &str) -> Result<()> {
        self.with(|s| {
            s.typed.push(Typed::Into(*element, value.to_string()));
            Ok(())
        })
    }

    async fn tab_and_type(&self, _from: &NodeId, value: &str) -> Result<()> {
        self.with(|s| {
            if s.tab_fails {
                return Err(Error::Other("nothing focused after TAB".into()));
            }
            s.typed.push(Typed::AfterTab(value.to_string()));
            Ok(())
        })
    }

    async fn accept_dialog(&self, _wait: Duration) -> Result<Option<String>> {
        self.with(|s| Ok(s.dialogs.pop_front()))
    }

    async fn remove_elements(&self, css: &str) -> Result<usize> {
        let wanted = Selector::css(css);
        self.with(|s| {
            let doomed: Vec<NodeId> = (0..s.nodes.len())
                .map(NodeId)
                .filter(|id| s.visible(*id) && s.nodes[id.0].matches.contains(&wanted))
                .collect();
            s.removed.extend(doomed.iter().copied());
            Ok(doomed.len())
        })
    }

    async fn start_muted_playback(&self) -> Result<()> {
        self.with(|s| {
            if s.failing_playback.contains(&s.screen) {
                return Err(Error::Script("player crashed".into()));
            }
            Ok(())
        })
    }

    async fn media_duration(&self) -> Result<Option<f64>> {
        self.with(|s| Ok(s.durations.get(&s.screen).copied()))
    }
}

/// One lesson of a fake course listing.
pub struct FakeLesson<'a> {
    pub title: Option<&'a str>,
    pub subtitle: Option<&'a str>,
    pub videos: Vec<FakeVideo<'a>>,
}

pub struct FakeVideo<'a> {
    pub title: &'a str,
    /// Duration the player reports, if any.
    pub duration: Option<f64>,
    pub player: bool,
}

impl<'a> FakeVideo<'a> {
    pub fn new(title: &'a str, duration: Option<f64>) -> Self {
        Self {
            title,
            duration,
            player: true,
        }
    }
}

/// Screen name of video `video` (1-based) of lesson `lesson` (1-based).
pub fn video_screen(lesson: usize, video: usize) -> String {
    format!("video-{}-{}", lesson, video)
}

/// Lay out a course listing on `screen`. Returns the header node of every
/// lesson and the item node of every video.
pub fn build_listing(
    page: &FakePage,
    config: &Config,
    screen: &str,
    lessons: &[FakeLesson<'_>],
) -> (Vec<NodeId>, Vec<Vec<NodeId>>) {
    let selectors = &config.selectors;
    let mut headers = Vec::new();
    let mut items = Vec::new();

    for (l, lesson) in lessons.iter().enumerate() {
        let expanded = format!("lesson-{}-open", l + 1);
        let header = page.add(
            Node::new()
                .css(selectors.lesson_header.clone())
                .on(screen)
                .click(OnClick::Toggle(expanded.clone())),
        );
        if let Some(title) = lesson.title {
            page.add_child(header, Node::new().css(selectors.lesson_title.clone()).text(title));
        }
        if let Some(subtitle) = lesson.subtitle {
            page.add_child(
                header,
                Node::new().css(selectors.lesson_subtitle.clone()).text(subtitle),
            );
        }

        let mut lesson_items = Vec::new();
        for (v, video) in lesson.videos.iter().enumerate() {
            let target = video_screen(l + 1, v + 1);
            let item = page.add(
                Node::new()
                    .css(selectors.video_items_group())
                    .text(format!("{}\n12 min", video.title))
                    .on(screen)
                    .when(expanded.clone())
                    .click(OnClick::Open {
                        screen: target.clone(),
                        url: format!("https://fake.test/video/{}/{}", l + 1, v + 1),
                    }),
            );
            page.add_child(item, Node::new().css(selectors.video_title.clone()).text(video.title));

            if video.player {
                page.add(Node::new().css(selectors.video_player.clone()).on(&target));
            }
            if let Some(seconds) = video.duration {
                page.set_duration(&target, seconds);
            }
            lesson_items.push(item);
        }

        headers.push(header);
        items.push(lesson_items);
    }

    (headers, items)
}

/// Default configuration with every wait shrunk to a few milliseconds, for
/// tests that run on the real clock.
pub fn fast_config() -> Config {
    let ms = Duration::from_millis;
    Config {
        timings: Timings {
            locate_poll: ms(2),
            min_strategy_budget: ms(20),
            identifier_budget: ms(50),
            secret_budget: ms(50),
            submit_budget: ms(50),
            login_settle: ms(1),
            captcha_render: ms(1),
            captcha_poll: ms(5),
            captcha_ceiling: ms(500),
            dialog_wait: ms(1),
            listing_settle: ms(1),
            walk_settle: ms(1),
            modal_appear: ms(5),
            modal_dismiss: ms(5),
            scroll_settle: ms(1),
            actionable_wait: ms(20),
            expand_settle: ms(1),
            collapse_settle: ms(1),
            video_list_wait: ms(50),
            player_wait: ms(50),
            duration_poll: ms(2),
            duration_budget: ms(30),
            overlay_settle: ms(1),
            download_toggle_wait: ms(50),
            download_expand_settle: ms(1),
            download_links_wait: ms(50),
            http_connect_timeout: Duration::from_secs(5),
            http_read_timeout: Duration::from_secs(5),
        },
        ..Config::default()
    }
}
