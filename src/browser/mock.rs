//! Scripted in-process browser for demos and tests.
//!
//! `MockBrowser` simulates the login application the scenario targets: a
//! login form at `/login.html` that navigates to a dashboard when submitted
//! with the right credentials. Screenshots are rendered with
//! [`MockFramebuffer`], so frames and PNG files look like real captures.
//! Failures are injected with [`MockFault`].

use async_trait::async_trait;
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::types::{Browser, BrowserError, BrowserLauncher, BrowserResult, Page};
use crate::harness::login::{
    DASHBOARD_SELECTOR, PASSWORD_SELECTOR, SUBMIT_SELECTOR, USERNAME_SELECTOR, VALID_PASSWORD, VALID_USERNAME,
    WELCOME_SELECTOR,
};

/// Width of rendered mock screenshots
pub const MOCK_PAGE_WIDTH: u32 = 640;

/// Height of rendered mock screenshots
pub const MOCK_PAGE_HEIGHT: u32 = 400;

/// Implicit bound the mock reports for operations without an explicit timeout
const MOCK_DEFAULT_TIMEOUT_MS: u64 = 30_000;

const WHITE: [u8; 3] = [255, 255, 255];
const INK: [u8; 3] = [33, 37, 41];
const MUTED: [u8; 3] = [108, 117, 125];
const BAR: [u8; 3] = [52, 58, 64];
const ACCENT: [u8; 3] = [13, 110, 253];
const FIELD: [u8; 3] = [233, 236, 239];
const SUCCESS: [u8; 3] = [25, 135, 84];

/// A virtual framebuffer for rendering mock pages
///
/// Provides the drawing primitives the mock pages need:
/// - `fill()` - Fill entire buffer with a color
/// - `draw_rect()` - Draw a filled rectangle
/// - `draw_text()` - Draw text using font8x8 glyphs
/// - `get_pixel()` / `set_pixel()` - Direct pixel access
#[derive(Debug, Clone)]
pub struct MockFramebuffer {
    width: u32,
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl MockFramebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: vec![0u8; (width * height * 3) as usize],
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire framebuffer with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle, clipped to the buffer
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw text using 8x8 glyphs. Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width {
                break;
            }
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            for bit in 0..8 {
                // font8x8 stores LSB as leftmost pixel
                let color = if (row >> bit) & 1 == 1 { fg } else { bg };
                self.set_pixel(x + bit, py, color);
            }
        }
    }

    /// Get the color of a pixel (black outside the buffer)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = ((y * self.width + x) * 3) as usize;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel; writes outside the buffer are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> BrowserResult<Vec<u8>> {
        let img: RgbImage = ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .ok_or_else(|| BrowserError::Driver("framebuffer size mismatch".to_string()))?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| BrowserError::Driver(format!("Failed to encode PNG: {}", e)))?;
        Ok(bytes)
    }
}

/// Failures the mock browser can be told to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFault {
    /// `launch()` fails with this message
    LaunchFailure(String),
    /// The application is unreachable; every navigation fails
    Unreachable,
    /// The element matching this selector is missing from every page
    MissingElement(String),
    /// Submitting the login form never navigates
    NoNavigation,
    /// Screenshots fail
    ScreenshotFailure,
}

impl MockFault {
    /// Fault that makes step `step` (1-based) of the login scenario fail
    pub fn for_login_step(step: usize) -> Option<MockFault> {
        match step {
            1 => Some(MockFault::Unreachable),
            2 => Some(MockFault::MissingElement(USERNAME_SELECTOR.to_string())),
            3 => Some(MockFault::MissingElement(PASSWORD_SELECTOR.to_string())),
            4 => Some(MockFault::NoNavigation),
            5 => Some(MockFault::MissingElement(DASHBOARD_SELECTOR.to_string())),
            _ => None,
        }
    }
}

/// Which page the simulated application is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Blank,
    Login,
    Dashboard,
    NotFound,
}

/// Launches scripted mock browsers
#[derive(Debug, Clone, Default)]
pub struct MockLauncher {
    faults: Vec<MockFault>,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an injected fault
    pub fn fault(mut self, fault: MockFault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Number of successful launches so far
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Number of browsers closed so far
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    type Browser = MockBrowser;

    async fn launch(&self) -> BrowserResult<MockBrowser> {
        for fault in &self.faults {
            if let MockFault::LaunchFailure(message) = fault {
                return Err(BrowserError::Launch(message.clone()));
            }
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(MockBrowser {
            faults: self.faults.clone(),
            closes: Arc::clone(&self.closes),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn engine(&self) -> &str {
        "Mock browser (scripted)"
    }
}

/// A scripted browser instance
#[derive(Debug)]
pub struct MockBrowser {
    faults: Vec<MockFault>,
    closes: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Browser for MockBrowser {
    type Page = MockPage;

    async fn new_page(&mut self) -> BrowserResult<MockPage> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }
        Ok(MockPage {
            faults: self.faults.clone(),
            closed: Arc::clone(&self.closed),
            url: "about:blank".to_string(),
            view: View::Blank,
            fields: HashMap::new(),
            navigated: false,
            error_banner: None,
        })
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A page of the simulated login application
#[derive(Debug)]
pub struct MockPage {
    faults: Vec<MockFault>,
    closed: Arc<AtomicBool>,
    url: String,
    view: View,
    fields: HashMap<String, String>,
    /// Set when the last action caused a navigation not yet waited for
    navigated: bool,
    error_banner: Option<String>,
}

impl MockPage {
    fn has_fault(&self, fault: &MockFault) -> bool {
        self.faults.contains(fault)
    }

    fn ensure_open(&self) -> BrowserResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }
        Ok(())
    }

    /// Whether an element matching `selector` exists on the current view
    fn has_element(&self, selector: &str) -> bool {
        if self.has_fault(&MockFault::MissingElement(selector.to_string())) {
            return false;
        }
        match self.view {
            View::Login => [USERNAME_SELECTOR, PASSWORD_SELECTOR, SUBMIT_SELECTOR].contains(&selector),
            View::Dashboard => [DASHBOARD_SELECTOR, WELCOME_SELECTOR].contains(&selector),
            View::Blank | View::NotFound => false,
        }
    }

    fn require_element(&self, selector: &str) -> BrowserResult<()> {
        if self.has_element(selector) {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(selector.to_string()))
        }
    }

    fn username(&self) -> &str {
        self.fields.get(USERNAME_SELECTOR).map(String::as_str).unwrap_or("")
    }

    /// Submit the login form; returns whether a navigation happened
    fn submit(&mut self) -> bool {
        if self.has_fault(&MockFault::NoNavigation) {
            return false;
        }
        let password = self.fields.get(PASSWORD_SELECTOR).map(String::as_str).unwrap_or("");
        if self.username() == VALID_USERNAME && password == VALID_PASSWORD {
            self.url = self.url.replace("login.html", "dashboard.html");
            self.view = View::Dashboard;
            self.error_banner = None;
            self.navigated = true;
            true
        } else {
            self.error_banner = Some("Invalid username or password".to_string());
            false
        }
    }

    fn render(&self) -> MockFramebuffer {
        let mut fb = MockFramebuffer::with_color(MOCK_PAGE_WIDTH, MOCK_PAGE_HEIGHT, WHITE);
        fb.draw_rect(0, 0, MOCK_PAGE_WIDTH, 24, BAR);
        fb.draw_text(8, 8, &self.url, WHITE, BAR);

        match self.view {
            View::Blank => {}
            View::NotFound => {
                fb.draw_text(240, 180, "404 Not Found", INK, WHITE);
            }
            View::Login => {
                fb.draw_text(260, 70, "Sign in", INK, WHITE);
                fb.draw_text(180, 120, "Username", MUTED, WHITE);
                fb.draw_rect(180, 132, 280, 24, FIELD);
                fb.draw_text(188, 140, self.username(), INK, FIELD);

                let masked = "*".repeat(self.fields.get(PASSWORD_SELECTOR).map_or(0, |p| p.chars().count()));
                fb.draw_text(180, 176, "Password", MUTED, WHITE);
                fb.draw_rect(180, 188, 280, 24, FIELD);
                fb.draw_text(188, 196, &masked, INK, FIELD);

                fb.draw_rect(180, 236, 280, 28, ACCENT);
                fb.draw_text(300, 246, "Login", WHITE, ACCENT);

                if let Some(banner) = &self.error_banner {
                    fb.draw_text(180, 284, banner, [220, 53, 69], WHITE);
                }
            }
            View::Dashboard => {
                fb.draw_rect(0, 24, 160, MOCK_PAGE_HEIGHT - 24, FIELD);
                fb.draw_text(16, 48, "Dashboard", INK, FIELD);
                fb.draw_rect(184, 48, 432, 40, SUCCESS);
                fb.draw_text(200, 64, &self.welcome_text(), WHITE, SUCCESS);
            }
        }
        fb
    }

    fn welcome_text(&self) -> String {
        format!("Welcome back, {}!", self.username())
    }

    fn timeout(action: String, timeout_ms: u64) -> BrowserError {
        BrowserError::Timeout { action, timeout_ms }
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        if self.has_fault(&MockFault::Unreachable) {
            return Err(BrowserError::Navigation(format!(
                "net::ERR_CONNECTION_REFUSED at {}",
                url
            )));
        }
        self.url = url.to_string();
        self.view = if url.ends_with("/login.html") {
            View::Login
        } else {
            View::NotFound
        };
        self.fields.clear();
        self.error_banner = None;
        self.navigated = false;
        Ok(())
    }

    async fn wait_for_network_idle(&mut self) -> BrowserResult<()> {
        self.ensure_open()
    }

    async fn fill(&mut self, selector: &str, text: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        self.require_element(selector)?;
        self.fields.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> BrowserResult<()> {
        self.ensure_open()?;
        self.require_element(selector)?;
        if selector == SUBMIT_SELECTOR {
            self.submit();
        }
        Ok(())
    }

    async fn click_and_wait_for_navigation(&mut self, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.click(selector).await?;
        self.wait_for_navigation(timeout_ms).await
    }

    async fn wait_for_navigation(&mut self, timeout_ms: u64) -> BrowserResult<()> {
        self.ensure_open()?;
        if std::mem::take(&mut self.navigated) {
            Ok(())
        } else {
            Err(Self::timeout("waiting for navigation".to_string(), timeout_ms))
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.ensure_open()?;
        if self.has_element(selector) {
            Ok(())
        } else {
            Err(Self::timeout(format!("waiting for selector '{}'", selector), timeout_ms))
        }
    }

    async fn text_content(&mut self, selector: &str) -> BrowserResult<Option<String>> {
        self.ensure_open()?;
        if !self.has_element(selector) {
            return Err(Self::timeout(
                format!("waiting for selector '{}'", selector),
                MOCK_DEFAULT_TIMEOUT_MS,
            ));
        }
        if selector == WELCOME_SELECTOR {
            return Ok(Some(self.welcome_text()));
        }
        Ok(Some(self.fields.get(selector).cloned().unwrap_or_default()))
    }

    async fn screenshot(&mut self) -> BrowserResult<Vec<u8>> {
        self.ensure_open()?;
        if self.has_fault(&MockFault::ScreenshotFailure) {
            return Err(BrowserError::Driver("screenshot capture failed".to_string()));
        }
        self.render().to_png()
    }
}
