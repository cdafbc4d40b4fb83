pub mod mock;
pub mod playwright;
pub mod types;

pub use mock::{MockBrowser, MockFault, MockFramebuffer, MockLauncher, MockPage};
pub use playwright::{PlaywrightBrowser, PlaywrightConfig, PlaywrightLauncher, PlaywrightPage};
pub use types::{Browser, BrowserError, BrowserLauncher, BrowserResult, Page};
