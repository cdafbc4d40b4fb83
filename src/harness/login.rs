//! The fixed five-step login scenario.

use crate::config::RunConfig;
use crate::harness::types::{Step, StepAction};

/// Login page path on the application under test
pub const LOGIN_PATH: &str = "/login.html";

pub const USERNAME_SELECTOR: &str = "input[name='username']";
pub const PASSWORD_SELECTOR: &str = "input[name='password']";
pub const SUBMIT_SELECTOR: &str = "button[type='submit']";

/// Present only after a successful login
pub const DASHBOARD_SELECTOR: &str = ".user-dashboard";
pub const WELCOME_SELECTOR: &str = ".welcome-message";

/// Test account credentials
pub const VALID_USERNAME: &str = "admin";
pub const VALID_PASSWORD: &str = "password123";

/// Name of the synthetic step recorded when the run itself fails
pub const RUN_STEP_NAME: &str = "Test execution";

/// Build the login scenario for a run
pub fn login_steps(config: &RunConfig) -> Vec<Step> {
    vec![
        Step::new(
            "Open login page",
            "login_page",
            StepAction::Navigate {
                url: config.url(LOGIN_PATH),
                wait_for_network_idle: true,
            },
        ),
        Step::new(
            "Enter username",
            "username_filled",
            StepAction::Fill {
                selector: USERNAME_SELECTOR.to_string(),
                value: VALID_USERNAME.to_string(),
                masked: false,
            },
        ),
        Step::new(
            "Enter password",
            "password_filled",
            StepAction::Fill {
                selector: PASSWORD_SELECTOR.to_string(),
                value: VALID_PASSWORD.to_string(),
                masked: true,
            },
        ),
        Step::new(
            "Click login button",
            "login_clicked",
            StepAction::ClickAndAwaitNavigation {
                selector: SUBMIT_SELECTOR.to_string(),
                timeout_ms: config.action_timeout_ms,
            },
        ),
        Step::new(
            "Verify login success",
            "login_success",
            StepAction::WaitForSelector {
                selector: DASHBOARD_SELECTOR.to_string(),
                timeout_ms: config.action_timeout_ms,
            },
        )
        .read_text(WELCOME_SELECTOR),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::FrameSize;

    #[test]
    fn test_login_steps_order_and_slugs() {
        let config = RunConfig::new("http://localhost:3000", "out", FrameSize::default());
        let steps = login_steps(&config);
        let slugs: Vec<&str> = steps.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["login_page", "username_filled", "password_filled", "login_clicked", "login_success"]
        );
        assert_eq!(steps[0].name, "Open login page");
        assert_eq!(steps[4].read_text.as_deref(), Some(WELCOME_SELECTOR));
    }

    #[test]
    fn test_login_steps_use_run_config() {
        let config = RunConfig::new("http://127.0.0.1:8080/", "out", FrameSize::default()).action_timeout_ms(750);
        let steps = login_steps(&config);
        assert_eq!(
            steps[0].action,
            StepAction::Navigate {
                url: "http://127.0.0.1:8080/login.html".to_string(),
                wait_for_network_idle: true,
            }
        );
        assert_eq!(
            steps[3].action,
            StepAction::ClickAndAwaitNavigation {
                selector: SUBMIT_SELECTOR.to_string(),
                timeout_ms: 750,
            }
        );
    }

    #[test]
    fn test_password_step_is_masked() {
        let config = RunConfig::new("http://localhost:3000", "out", FrameSize::default());
        let steps = login_steps(&config);
        assert!(matches!(steps[2].action, StepAction::Fill { masked: true, .. }));
        assert!(!steps[2].action.to_string().contains(VALID_PASSWORD));
    }
}
