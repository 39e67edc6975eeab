//! Bring-up and launch.
//!
//! [`Bootstrap::bring_up`] assembles the bot-wide pipeline in a fixed order:
//!
//! 1. session middleware (the configured backend is connected first)
//! 2. context augmenter
//! 3. scene navigator, so any handler may enter a scene
//! 4. user middleware added with [`Bootstrap::use_middleware`]
//! 5. update components
//! 6. scene components, then the stage
//!
//! Only when every step (including each awaited scene hook) has succeeded is
//! a [`ReadyBot`] returned. Nothing consumes updates until
//! [`ReadyBot::launch`] is called.
//!
//! ```rust,ignore
//! let bot = Bootstrap::new(load_config()?, api)
//!     .on_scene_registered(|id| async move {
//!         tracing::info!(scene = %id, "scene ready");
//!         Ok(())
//!     })
//!     .bring_up()
//!     .await?;
//!
//! bot.launch(source).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use stagehand_core::{
    BoxError, BoxedApi, BoxedMiddleware, Composer, Context, Dispatcher, HandlerResult,
    LaunchOptions, Update, UpdateSource,
};
use stagehand_framework::session::connect;
use stagehand_framework::{
    BoxedSessionStore, ComponentRegistry, ContextAugmenter, ReplyHelper, SceneHook,
    SceneRegistrar, SessionMiddleware, UpdateRegistrar,
};
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{StagehandConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

type CatchFn = Arc<dyn Fn(BoxError, Arc<Context>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Collects everything a bot needs before it can come up.
pub struct Bootstrap {
    config: StagehandConfig,
    api: BoxedApi,
    registry: Option<ComponentRegistry>,
    scene_hook: Option<SceneHook>,
    session_store: Option<BoxedSessionStore>,
    middlewares: Vec<BoxedMiddleware>,
    catch: Option<CatchFn>,
    init_logging: bool,
}

impl Bootstrap {
    /// Creates a bootstrap for `config`, talking to the platform through `api`.
    pub fn new(config: StagehandConfig, api: BoxedApi) -> Self {
        Self {
            config,
            api,
            registry: None,
            scene_hook: None,
            session_store: None,
            middlewares: Vec::new(),
            catch: None,
            init_logging: true,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StagehandConfig {
        &self.config
    }

    /// Uses `registry` instead of the link-time component registries.
    pub fn components(mut self, registry: ComponentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Awaits `hook` with each scene id as its scene is created.
    ///
    /// A hook error aborts bring-up.
    pub fn on_scene_registered<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.scene_hook = Some(Arc::new(move |id| hook(id).boxed()));
        self
    }

    /// Uses `store` for sessions instead of connecting the configured backend.
    pub fn session_store(mut self, store: BoxedSessionStore) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Adds a bot-wide middleware, run after the augmenter and before any
    /// component.
    pub fn use_middleware(mut self, middleware: BoxedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Installs a hook receiving errors that escape the pipeline.
    pub fn catch<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(BoxError, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.catch = Some(Arc::new(move |err, ctx| hook(err, ctx).boxed()));
        self
    }

    /// Leaves the global subscriber alone during bring-up.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Connects the session backend and registers every component.
    pub async fn bring_up(self) -> RuntimeResult<ReadyBot> {
        if self.init_logging {
            logging::init_from_config(&self.config.logging);
        }
        validate_config(&self.config)?;

        let policy = self.config.dispatch.guard_policy;
        let store = match self.session_store {
            Some(store) => store,
            None => {
                let session = self.config.session_or_default();
                info!(backend = ?session.backend, address = %session.address(), "Connecting session store");
                connect(&session).await?
            }
        };

        let registry = self.registry.unwrap_or_else(ComponentRegistry::collect);
        debug!(components = registry.len(), "Registering components");

        let scenes = SceneRegistrar::new(policy).with_hook(self.scene_hook);

        let mut router = Composer::new();
        router
            .use_middleware(Arc::new(SessionMiddleware::new(store)))
            .use_middleware(Arc::new(ContextAugmenter::new(ReplyHelper::shared())))
            .use_middleware(Arc::new(scenes.navigator()));
        for middleware in self.middlewares {
            router.use_middleware(middleware);
        }

        let routes = UpdateRegistrar::new(policy).register(&mut router, registry.updates())?;
        let scene_ids = scenes.register(&mut router, registry.scenes()).await?;

        let mut dispatcher = Dispatcher::from_router(&router, self.api);
        if let Some(catch) = self.catch {
            dispatcher = dispatcher.catch(move |err, ctx| catch(err, ctx));
        }

        info!(
            routes,
            scenes = scene_ids.len(),
            policy = ?policy,
            "Bot is ready"
        );

        Ok(ReadyBot {
            dispatcher,
            options: LaunchOptions {
                drop_pending_updates: self.config.bot.drop_pending_updates,
            },
            scenes: scene_ids,
        })
    }
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("policy", &self.config.dispatch.guard_policy)
            .field("middlewares", &self.middlewares.len())
            .field("has_scene_hook", &self.scene_hook.is_some())
            .finish_non_exhaustive()
    }
}

/// Counts from one launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchSummary {
    /// Updates taken from the source.
    pub received: usize,
    /// Updates whose processing ended in an error.
    pub failed: usize,
}

/// A fully registered bot that has not started consuming updates.
#[derive(Debug)]
pub struct ReadyBot {
    dispatcher: Dispatcher,
    options: LaunchOptions,
    scenes: Vec<String>,
}

impl ReadyBot {
    /// Returns the dispatcher, for feeding updates by hand.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the registered scene ids in registration order.
    pub fn scenes(&self) -> &[String] {
        &self.scenes
    }

    /// Returns the options the source is started with.
    pub fn launch_options(&self) -> LaunchOptions {
        self.options
    }

    /// Consumes `source` until it ends or Ctrl+C / SIGTERM arrives.
    pub async fn launch<S: UpdateSource>(self, source: S) -> RuntimeResult<LaunchSummary> {
        self.launch_until(source, wait_for_shutdown()).await
    }

    /// Consumes `source` until it ends or `shutdown` resolves.
    ///
    /// Each update is processed on its own task; in-flight updates are
    /// awaited before returning.
    pub async fn launch_until<S, F>(self, mut source: S, shutdown: F) -> RuntimeResult<LaunchSummary>
    where
        S: UpdateSource,
        F: Future<Output = ()>,
    {
        source.start(self.options).await?;
        info!(
            drop_pending_updates = self.options.drop_pending_updates,
            "Consuming updates"
        );

        let mut summary = LaunchSummary::default();
        let mut tasks: JoinSet<bool> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                next = source.next_update() => {
                    let Some(update) = next else {
                        debug!("Update source exhausted");
                        break;
                    };
                    summary.received += 1;
                    tasks.spawn(process(self.dispatcher.clone(), update));
                }
            }

            while let Some(done) = tasks.try_join_next() {
                summary.failed += usize::from(!finished(done));
            }
        }

        while let Some(done) = tasks.join_next().await {
            summary.failed += usize::from(!finished(done));
        }

        info!(
            received = summary.received,
            failed = summary.failed,
            "Stopped consuming updates"
        );
        Ok(summary)
    }
}

async fn process(dispatcher: Dispatcher, update: Update) -> bool {
    let update_id = update.update_id;
    match dispatcher.dispatch(update).await {
        Ok(()) => true,
        Err(e) => {
            error!(update_id, error = %e, "Update failed");
            false
        }
    }
}

fn finished(result: Result<bool, tokio::task::JoinError>) -> bool {
    result.unwrap_or_else(|e| {
        error!(error = %e, "Update task panicked");
        false
    })
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Cannot listen for SIGTERM"),
        }
    }

    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl+C, running until the source ends");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
