// ABOUTME: Runs one deployment: validate, pull, create and start under temporary names.
// ABOUTME: A spawned continuation verifies health, commits or rolls back, notifies, then unlocks.

use snafu::{OptionExt, ResultExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::Instrument;

use crate::auth::{Authorizer, Identity, LabelAuthorizer};
use crate::config::Settings;
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::manifest::Manifest;
use crate::notify::{LogNotifier, Notifier};
use crate::runtime::{ContainerConfig, ContainerEngine, ContainerSummary, ImageError};
use crate::types::{AppName, ImageRef, ServiceName};

use super::container::{BuildContext, build_container_config};
use super::error::{
    AuthorizeSnafu, BusySnafu, CreateSnafu, DeployError, ManifestSnafu, MissingIdentitySnafu,
    PullSnafu, StartSnafu,
};
use super::finalize::{promote, retire_previous};
use super::health::HealthMonitor;
use super::orphans::{cleanup_orphans, split_orphans};
use super::outcome::{DeploymentOutcome, hostname};
use super::registry::{TaskGuard, TaskRegistry};
use super::rollback::rollback;
use super::service::{DeployedService, ServiceSummary, VerificationState};
use super::state::Phase;

/// Lines of container output kept per service.
pub const LOG_TAIL: usize = 100;

/// An inbound deployment.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub app: AppName,
    pub identity: Option<Identity>,
    /// Raw compose document.
    pub manifest: Vec<u8>,
    /// Extra request parameters, forwarded to notifiers.
    pub params: BTreeMap<String, String>,
}

impl DeployRequest {
    pub fn new(app: AppName, identity: Identity, manifest: impl Into<Vec<u8>>) -> Self {
        Self {
            app,
            identity: Some(identity),
            manifest: manifest.into(),
            params: BTreeMap::new(),
        }
    }
}

pub struct Coordinator<E: ContainerEngine + 'static> {
    engine: Arc<E>,
    authorizer: Arc<dyn Authorizer>,
    mailer: Arc<dyn Notifier>,
    alerting: Arc<dyn Notifier>,
    registry: Arc<TaskRegistry>,
    settings: Arc<Settings>,
}

impl<E: ContainerEngine + 'static> Coordinator<E> {
    /// Coordinator with label-based authorization and log-only notifications.
    pub fn new(engine: Arc<E>, settings: Settings) -> Self {
        let authorizer: Arc<dyn Authorizer> = Arc::new(LabelAuthorizer::new(Arc::clone(&engine)));
        Self {
            engine,
            authorizer,
            mailer: Arc::new(LogNotifier),
            alerting: Arc::new(LogNotifier),
            registry: TaskRegistry::new(),
            settings: Arc::new(settings),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Notifier gated by the notification policy.
    pub fn with_mailer(mut self, mailer: Arc<dyn Notifier>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Notifier called for every outcome.
    pub fn with_alerting(mut self, alerting: Arc<dyn Notifier>) -> Self {
        self.alerting = alerting;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TaskRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the synchronous part of a deployment and spawn the rest.
    ///
    /// Returns the created services once their containers have been started.
    /// Health verification, commit or rollback, and notification continue in
    /// the background; the application stays locked until they finish.
    pub async fn deploy(&self, request: DeployRequest) -> Result<Vec<ServiceSummary>, DeployError> {
        let DeployRequest {
            app,
            identity,
            manifest,
            params,
        } = request;

        tracing::debug!(app = %app, phase = %Phase::Validating, "deployment requested");
        let identity = identity.context(MissingIdentitySnafu { app: app.clone() })?;

        let guard = self
            .registry
            .try_acquire(&app)
            .context(BusySnafu { app: app.clone() })?;

        // Listed under the guard: a deployment that finished meanwhile has
        // already promoted its containers.
        let existing = self
            .authorizer
            .authorize(&identity, &app)
            .await
            .context(AuthorizeSnafu { app: app.clone() })?;

        tracing::debug!(app = %app, user = %identity.username, phase = %Phase::ParsingManifest, "lock acquired");
        let manifest = Manifest::parse(&manifest).context(ManifestSnafu { app: app.clone() })?;
        let ctx = BuildContext {
            app: &app,
            owner: &identity.username,
            settings: &self.settings,
        };
        let configs = manifest
            .services()
            .map(|(name, def)| build_container_config(ctx, name, def).map(|c| (name.clone(), c)))
            .collect::<Result<Vec<_>, _>>()
            .context(ManifestSnafu { app: app.clone() })?;

        let mut diagnostics = Diagnostics::default();
        let (previous, orphans) = split_orphans(existing);
        if !orphans.is_empty() {
            cleanup_orphans(self.engine.as_ref(), &orphans, &mut diagnostics).await;
        }

        let services = self.create_services(&app, &identity, configs).await?;

        tracing::debug!(app = %app, user = %identity.username, phase = %Phase::Starting, "starting containers");
        let started = self.start_services(&app, &services).await;
        let summaries: Vec<ServiceSummary> = services.iter().map(ServiceSummary::from).collect();

        let span = tracing::info_span!("deploy", app = %app, services = services.len());
        let continuation = Continuation {
            engine: Arc::clone(&self.engine),
            mailer: Arc::clone(&self.mailer),
            alerting: Arc::clone(&self.alerting),
            settings: Arc::clone(&self.settings),
            app,
            identity,
            services,
            previous,
            params,
            diagnostics,
            fully_started: started.is_ok(),
            guard,
        };
        tokio::spawn(continuation.run().instrument(span));

        started?;
        Ok(summaries)
    }

    /// Pull and create every service in manifest order.
    ///
    /// On any failure the containers already created by this call are
    /// removed before the error is returned.
    async fn create_services(
        &self,
        app: &AppName,
        identity: &Identity,
        configs: Vec<(ServiceName, ContainerConfig)>,
    ) -> Result<Vec<DeployedService>, DeployError> {
        let mut created: Vec<DeployedService> = Vec::with_capacity(configs.len());

        for (name, config) in configs {
            match self.create_service(app, &name, config).await {
                Ok(service) => {
                    tracing::info!(
                        app = %app,
                        user = %identity.username,
                        service = %service.name,
                        container = %service.container_id.short(),
                        "container created"
                    );
                    created.push(service);
                }
                Err(e) => {
                    for service in &created {
                        if let Err(rm) = self
                            .engine
                            .remove_container_and_image(&service.container_id)
                            .await
                        {
                            tracing::error!(
                                app = %app,
                                user = %identity.username,
                                service = %service.name,
                                "cannot remove container after failed create: {}",
                                rm
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(created)
    }

    async fn create_service(
        &self,
        app: &AppName,
        name: &ServiceName,
        mut config: ContainerConfig,
    ) -> Result<DeployedService, DeployError> {
        tracing::debug!(app = %app, service = %name, phase = %Phase::PullingImages, "pulling image");
        let image = self.pull(&config.image).await.context(PullSnafu {
            app: app.clone(),
            service: name.clone(),
            image: config.image.to_string(),
        })?;
        config.image = image.clone();

        tracing::debug!(app = %app, service = %name, phase = %Phase::CreatingContainers, "creating container");
        let id = self
            .engine
            .create_container(&config)
            .await
            .context(CreateSnafu {
                app: app.clone(),
                service: name.clone(),
            })?;

        Ok(DeployedService::new(app, name.clone(), id, image))
    }

    /// Pull the configured tag first, then the declared reference.
    async fn pull(&self, declared: &ImageRef) -> Result<ImageRef, ImageError> {
        let pullable = declared.pullable();

        if let Some(tag) = self.settings.fallback_tag()
            && !declared.is_pinned()
        {
            let tagged = declared.with_tag(tag);
            match self.engine.pull_image(&tagged).await {
                Ok(()) => return Ok(tagged),
                Err(e) if tagged.to_string() == pullable.to_string() => return Err(e),
                Err(e) => tracing::debug!(image = %tagged, "falling back to declared image: {}", e),
            }
        }

        self.engine.pull_image(&pullable).await?;
        Ok(pullable)
    }

    /// Start containers in order, stopping at the first failure.
    async fn start_services(
        &self,
        app: &AppName,
        services: &[DeployedService],
    ) -> Result<(), DeployError> {
        for service in services {
            self.engine
                .start_container(&service.container_id)
                .await
                .context(StartSnafu {
                    app: app.clone(),
                    service: service.name.clone(),
                })?;
        }
        Ok(())
    }
}

/// Everything the background phase needs, owned.
struct Continuation<E: ContainerEngine + 'static> {
    engine: Arc<E>,
    mailer: Arc<dyn Notifier>,
    alerting: Arc<dyn Notifier>,
    settings: Arc<Settings>,
    app: AppName,
    identity: Identity,
    services: Vec<DeployedService>,
    previous: Vec<ContainerSummary>,
    params: BTreeMap<String, String>,
    diagnostics: Diagnostics,
    fully_started: bool,
    guard: TaskGuard,
}

impl<E: ContainerEngine + 'static> Continuation<E> {
    async fn run(mut self) {
        let success = if self.fully_started {
            self.verify().await
        } else {
            tracing::warn!(user = %self.identity.username, "not every container started");
            for service in &mut self.services {
                service.state = VerificationState::Unhealthy;
            }
            false
        };

        self.capture_logs().await;

        if success {
            tracing::info!(user = %self.identity.username, phase = %Phase::Finalizing, "deployment healthy");
            self.finalize().await;
        } else {
            tracing::warn!(user = %self.identity.username, phase = %Phase::RollingBack, "deployment unhealthy, rolling back");
            self.capture_health_logs().await;
            rollback(
                self.engine.as_ref(),
                &self.services,
                self.settings.stop_timeout,
                &mut self.diagnostics,
            )
            .await;
            for service in &self.services {
                tracing::info!(
                    user = %self.identity.username,
                    service = %service.name,
                    "logs:\n{}",
                    service.logs.join("\n")
                );
                tracing::info!(
                    user = %self.identity.username,
                    service = %service.name,
                    "health logs:\n{}",
                    service.health_logs.join("\n")
                );
            }
        }

        let Continuation {
            mailer,
            alerting,
            settings,
            app,
            identity,
            services,
            params,
            diagnostics,
            guard,
            ..
        } = self;

        tracing::debug!(user = %identity.username, phase = %Phase::Notifying, "dispatching outcome");
        let outcome = DeploymentOutcome {
            app,
            user: identity.username,
            success,
            services,
            params,
            warnings: diagnostics.into_warnings(),
            app_url: settings.app_url.clone(),
            host: hostname(),
            finished_at: chrono::Utc::now(),
        };

        if settings.notification.should_send(success)
            && let Err(e) = mailer.notify(&outcome).await
        {
            tracing::error!(user = %outcome.user, "notification failed: {}", e);
        }
        if let Err(e) = alerting.notify(&outcome).await {
            tracing::error!(user = %outcome.user, "alerting failed: {}", e);
        }

        tracing::debug!(user = %outcome.user, phase = %Phase::Done, "releasing lock");
        drop(guard);
    }

    /// Wait for every container with a health check to report healthy.
    async fn verify(&mut self) -> bool {
        let mut candidates = Vec::new();
        let mut inspected = true;

        for service in &mut self.services {
            match self.engine.inspect_container(&service.container_id).await {
                Ok(info) if info.has_healthcheck => candidates.push(service.container_id.clone()),
                Ok(_) => service.state = VerificationState::Healthy,
                Err(e) => {
                    self.diagnostics.warn(Warning::inspect_failed(
                        service.name.as_str(),
                        format!("cannot inspect {}: {}", service.full_name, e),
                    ));
                    service.state = VerificationState::Unhealthy;
                    inspected = false;
                }
            }
        }
        if !inspected {
            return false;
        }

        tracing::debug!(
            phase = %Phase::AwaitingHealth,
            candidates = candidates.len(),
            "waiting for health checks"
        );
        let deadline = Instant::now() + self.settings.health_timeout;
        let outcome = HealthMonitor::new(self.engine.as_ref())
            .await_healthy(&mut self.services, &candidates, deadline)
            .await;

        if !outcome.is_healthy() {
            tracing::warn!(user = %self.identity.username, "health verification failed: {}", outcome.describe());
        }
        outcome.is_healthy()
    }

    async fn capture_logs(&mut self) {
        for service in &mut self.services {
            match self
                .engine
                .container_logs(&service.container_id, LOG_TAIL)
                .await
            {
                Ok(lines) => service.logs = lines,
                Err(e) => self.diagnostics.warn(Warning::logs_unavailable(
                    service.name.as_str(),
                    format!("cannot read logs of {}: {}", service.full_name, e),
                )),
            }
        }
    }

    async fn capture_health_logs(&mut self) {
        for service in &mut self.services {
            match self.engine.inspect_container(&service.container_id).await {
                Ok(info) => service.health_logs = info.health_log,
                Err(e) => self.diagnostics.warn(Warning::logs_unavailable(
                    service.name.as_str(),
                    format!("cannot read health logs of {}: {}", service.full_name, e),
                )),
            }
        }
    }

    async fn finalize(&mut self) {
        if let Err(e) = retire_previous(
            self.engine.as_ref(),
            &self.app,
            &self.previous,
            self.settings.stop_timeout,
            &mut self.diagnostics,
        )
        .await
        {
            self.diagnostics
                .warn(Warning::new(WarningKind::RemoveFailed, None, e.to_string()));
        }

        let renamed = promote(self.engine.as_ref(), &self.services, &mut self.diagnostics).await;
        tracing::info!(
            user = %self.identity.username,
            renamed,
            total = self.services.len(),
            "new containers promoted"
        );
    }
}
