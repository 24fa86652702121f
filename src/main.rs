// ABOUTME: Entry point for the swapdock CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use async_trait::async_trait;
use clap::Parser;
use cli::{Cli, Commands, DeployArgs};
use parking_lot::Mutex;
use std::env;
use std::path::Path;
use std::sync::Arc;
use swapdock::auth::{ADMIN_ROLE, Identity};
use swapdock::config::Settings;
use swapdock::deploy::{
    BuildContext, Coordinator, DeployError, DeployRequest, DeploymentOutcome,
    build_container_config,
};
use swapdock::error::{Error, Result};
use swapdock::manifest::Manifest;
use swapdock::notify::{HookNotifier, LogNotifier, Notifier, NotifyError};
use swapdock::output::{Output, OutputMode};
use swapdock::runtime::BollardRuntime;
use swapdock::types::AppName;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Deploy(args) => deploy(args).await,
        Commands::Check { file, app } => check(&file, &app),
    }
}

fn load_settings() -> Result<Settings> {
    let cwd = env::current_dir()?;
    Settings::discover(&cwd)?.with_env_overrides()
}

fn read_manifest(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

fn app_name(app: &str) -> Result<AppName> {
    AppName::new(app).map_err(|e| Error::InvalidConfig(format!("application name: {}", e)))
}

/// Parse a manifest and build every container configuration.
fn check(file: &Path, app: &str) -> Result<()> {
    let settings = load_settings()?;
    let app = app_name(app)?;
    let manifest = Manifest::parse(&read_manifest(file)?)?;

    let ctx = BuildContext {
        app: &app,
        owner: "check",
        settings: &settings,
    };
    for (name, def) in manifest.services() {
        let config = build_container_config(ctx, name, def)?;
        println!("{}: {} -> {}", name, def.image, config.name);
    }
    println!("{} service(s) OK", manifest.len());
    Ok(())
}

/// Remembers whether the background phase succeeded.
#[derive(Default)]
struct LastOutcome {
    success: Mutex<Option<bool>>,
}

#[async_trait]
impl Notifier for LastOutcome {
    async fn notify(&self, outcome: &DeploymentOutcome) -> std::result::Result<(), NotifyError> {
        *self.success.lock() = Some(outcome.success);
        LogNotifier.notify(outcome).await
    }
}

async fn deploy(args: DeployArgs) -> Result<()> {
    let mut output = Output::new(OutputMode::from_flags(args.json, args.quiet));
    output.start_timer();

    let settings = load_settings()?;
    let app = app_name(&args.app)?;
    let manifest = read_manifest(&args.file)?;

    let identity = args
        .user
        .or_else(|| env::var("USER").ok())
        .filter(|u| !u.is_empty())
        .map(|user| {
            let identity = Identity::new(user);
            if args.admin {
                identity.with_role(ADMIN_ROLE)
            } else {
                identity
            }
        });

    output.progress("Connecting to engine...");
    let engine = BollardRuntime::connect(settings.docker_socket.as_deref())?;
    engine.ping().await?;

    let last = Arc::new(LastOutcome::default());
    let coordinator = Coordinator::new(Arc::new(engine), settings.clone())
        .with_mailer(Arc::new(HookNotifier::new(&settings.hooks_dir)))
        .with_alerting(Arc::clone(&last) as Arc<dyn Notifier>);

    output.progress(&format!("Deploying {}...", app));
    let request = DeployRequest {
        app: app.clone(),
        identity,
        manifest,
        params: args.params.into_iter().collect(),
    };
    let result = coordinator.deploy(request).await;

    if let Ok(ref services) = result {
        output.services(services);
        output.progress("Waiting for health checks...");
    }

    // The background phase may run even after a failed start.
    coordinator.registry().wait_idle().await;
    result?;

    match *last.success.lock() {
        Some(true) => {
            output.success(&format!("Deployed {}", app));
            Ok(())
        }
        _ => Err(DeployError::Health {
            app,
            reason: "new containers were rolled back".to_string(),
        }
        .into()),
    }
}
