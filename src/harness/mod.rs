pub mod login;
pub mod pipeline;
pub mod session;
pub mod steps;
pub mod types;

pub use login::login_steps;
pub use pipeline::{RunOutcome, run_login_check, run_scenario};
pub use session::run_session;
pub use steps::{StepContext, run_step, run_steps};
pub use types::{HarnessError, HarnessResult, Step, StepAction};
