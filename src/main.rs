use clap::{Args as ClapArgs, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use web_vision::browser::{BrowserLauncher, MockFault, MockLauncher, PlaywrightConfig, PlaywrightLauncher};
use web_vision::config::{
    self, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_BASE_URL, DEFAULT_FRAME_SIZE, DEFAULT_NODE_BINARY, DEFAULT_OUTPUT_DIR,
    RunConfig, parse_frame_size,
};
use web_vision::frames::{self, AnimationOutcome};
use web_vision::harness::{RunOutcome, run_login_check};

/// Web Vision - headless browser login testing with animated reports
#[derive(Parser, Debug)]
#[command(
    name = "web-vision",
    about = "Run a login scenario in a headless browser and produce screenshots, a GIF and a Markdown report",
    args_conflicts_with_subcommands = true,
    after_help = "ENVIRONMENT VARIABLES:\n\
        WEB_VISION_BASE_URL            Base URL of the application under test\n\
        WEB_VISION_OUTPUT_DIR          Root directory for all artifacts\n\
        WEB_VISION_FRAME_SIZE          Animation frame size\n\
        WEB_VISION_FRAMES              Set to 0/false/off to disable frame capture\n\
        WEB_VISION_NODE                Node.js binary for the Playwright bridge\n\
        WEB_VISION_ACTION_TIMEOUT_MS   Bound for navigation and selector waits\n\
        RUST_LOG                       Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the login scenario against a real browser (default)
    Run(RunArgs),

    /// Run the login scenario against the built-in scripted browser
    Demo {
        #[command(flatten)]
        common: CommonArgs,

        /// Make this step (1-5) fail
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        fail_step: Option<u8>,

        /// Simulate a browser that cannot be launched
        #[arg(long)]
        launch_failure: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Node.js binary with the `playwright` package available
    #[arg(long, env = "WEB_VISION_NODE", default_value = DEFAULT_NODE_BINARY)]
    node: String,

    /// Show the browser window
    #[arg(long)]
    headed: bool,
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Base URL of the application under test
    #[arg(long, env = "WEB_VISION_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Output directory for screenshots, animation and report
    #[arg(short, long, env = "WEB_VISION_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Frame size: thumb (64x64), slack (128x128), large (256x256), N, or WxH
    #[arg(long, short = 's', env = "WEB_VISION_FRAME_SIZE", default_value = DEFAULT_FRAME_SIZE)]
    frame_size: String,

    /// Skip frame capture and animation generation
    #[arg(long)]
    no_frames: bool,

    /// Bound for navigation and selector waits (ms)
    #[arg(long, env = "WEB_VISION_ACTION_TIMEOUT_MS", default_value_t = DEFAULT_ACTION_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

impl CommonArgs {
    fn run_config(&self) -> Result<RunConfig, Box<dyn Error>> {
        let frame_size = parse_frame_size(&self.frame_size).ok_or_else(|| {
            format!(
                "Invalid frame size '{}'. Use: thumb, slack, large, N, or WxH",
                self.frame_size
            )
        })?;
        Ok(RunConfig::new(&self.base_url, &self.output, frame_size).action_timeout_ms(self.timeout_ms))
    }

    fn frames_enabled(&self) -> bool {
        !self.no_frames && config::get().artifacts.frames_enabled
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Run(run)) => run_playwright(run).await,
        None => run_playwright(args.run).await,
        Some(Commands::Demo {
            common,
            fail_step,
            launch_failure,
        }) => {
            let mut launcher = MockLauncher::new();
            if launch_failure {
                launcher = launcher.fault(MockFault::LaunchFailure(
                    "demo: browser executable not found".to_string(),
                ));
            }
            if let Some(fault) = fail_step.and_then(|step| MockFault::for_login_step(step as usize)) {
                launcher = launcher.fault(fault);
            }
            execute(&launcher, &common).await
        }
    }
}

async fn run_playwright(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let playwright = PlaywrightConfig::new(&args.node).headless(!args.headed);
    let launcher = PlaywrightLauncher::new(playwright);
    execute(&launcher, &args.common).await
}

async fn execute<L: BrowserLauncher>(launcher: &L, args: &CommonArgs) -> Result<(), Box<dyn Error>> {
    let config = args.run_config()?;
    let imaging = frames::detect(args.frames_enabled());

    info!(base_url = %config.base_url, frame_size = %config.frame_size, "Starting login check");
    let outcome = run_login_check(launcher, &config, imaging.as_ref()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome)?;
    }
    Ok(())
}

fn print_summary(outcome: &RunOutcome) -> Result<(), Box<dyn Error>> {
    let run = &outcome.run;
    let layout = &outcome.layout;

    println!(
        "Run completed: {}/{} steps passed ({}%)",
        run.passed(),
        run.total(),
        run.pass_rate_percent()
    );
    for (i, step) in run.steps.iter().enumerate() {
        match step.error() {
            Some(error) => println!("  {} Step {}: {} - {}", step.status().marker(), i + 1, step.name, error),
            None => println!("  {} Step {}: {}", step.status().marker(), i + 1, step.name),
        }
    }

    println!();
    match &outcome.animation {
        AnimationOutcome::Written { path, frames, bytes } => {
            println!("Animation: {} ({} frames, {} bytes)", path.display(), frames, bytes);
        }
        AnimationOutcome::NoFrames => println!("Animation: not generated (no frames captured)"),
        AnimationOutcome::Unavailable => println!("Animation: skipped (frame capture unavailable)"),
        AnimationOutcome::Failed { error } => println!("Animation: failed ({})", error),
    }
    println!("Report: {}", layout.report_path.display());
    println!("Manifest: {}", layout.manifest_path.display());

    let screenshots = layout.list_screenshots()?;
    println!(
        "Screenshots: {} PNG files in {}",
        screenshots.len(),
        layout.screenshot_dir.display()
    );
    Ok(())
}
