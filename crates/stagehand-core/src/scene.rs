//! Scenes and the stage.
//!
//! A [`Scene`] is an isolated router fragment representing one step of a
//! multi-step conversation. The [`Stage`] holds every registered scene and is
//! installed on the bot-wide router as a single middleware.
//!
//! # Lifecycle
//!
//! ```text
//!  not entered ──enter_scene(id)──▶ entered ──▶ handler loop ──leave_scene()──▶ not entered
//!                   │ runs enter handlers          │ action / hears / on
//!                   └ (leaves the previous scene)  └ enter_scene(other) switches
//! ```
//!
//! The current scene is kept in the session under [`SCENE_SESSION_KEY`], so
//! the session middleware must run before the stage.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::composer::Composer;
use crate::context::{Context, SessionData};
use crate::error::{BoxError, ContextError, HandlerResult, SceneError};
use crate::middleware::{BoxedMiddleware, Middleware, Next, compose};
use crate::trigger::Triggers;
use crate::update::MessageField;

/// Session key holding the scene bookkeeping.
pub const SCENE_SESSION_KEY: &str = "__scenes";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SceneSession {
    current: Option<String>,
    #[serde(default)]
    state: SessionData,
}

// ============================================================================
// Scene
// ============================================================================

/// A named, isolated router fragment.
pub struct Scene {
    id: String,
    enter: Composer,
    leave: Composer,
    body: Composer,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enter: Composer::new(),
            leave: Composer::new(),
            body: Composer::new(),
        }
    }

    /// Returns the scene identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Installs a chain that runs when the scene is entered.
    pub fn enter(&mut self, chain: impl IntoIterator<Item = BoxedMiddleware>) -> &mut Self {
        self.enter.use_middleware(compose(chain));
        self
    }

    /// Installs a chain that runs when the scene is left.
    pub fn leave(&mut self, chain: impl IntoIterator<Item = BoxedMiddleware>) -> &mut Self {
        self.leave.use_middleware(compose(chain));
        self
    }

    /// Installs a chain for callback data matching `triggers` while entered.
    pub fn action(
        &mut self,
        triggers: impl Into<Triggers>,
        chain: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.body.action(triggers, chain);
        self
    }

    /// Installs a chain for message text matching `triggers` while entered.
    pub fn hears(
        &mut self,
        triggers: impl Into<Triggers>,
        chain: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.body.hears(triggers, chain);
        self
    }

    /// Installs a chain for messages carrying every field in `filters` while entered.
    pub fn on(
        &mut self,
        filters: impl IntoIterator<Item = MessageField>,
        chain: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.body.on(filters, chain);
        self
    }

    /// Installs middleware that sees every update while entered.
    pub fn use_middleware(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.body.use_middleware(middleware);
        self
    }

    fn compile(self) -> CompiledScene {
        CompiledScene {
            enter: self.enter.middleware(),
            leave: self.leave.middleware(),
            body: self.body.middleware(),
        }
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("enter", &self.enter.len())
            .field("leave", &self.leave.len())
            .field("body", &self.body.len())
            .finish()
    }
}

struct CompiledScene {
    enter: BoxedMiddleware,
    leave: BoxedMiddleware,
    body: BoxedMiddleware,
}

// ============================================================================
// Stage
// ============================================================================

type SceneMap = HashMap<String, Arc<CompiledScene>>;

/// The collection of registered scenes.
///
/// Scenes are committed with [`register`](Self::register); the stage is then
/// frozen into the router with [`middleware`](Self::middleware). Handlers
/// installed ahead of the stage reach the scenes through the
/// [`navigator`](Self::navigator), which resolves once the stage is frozen.
#[derive(Default)]
pub struct Stage {
    scenes: SceneMap,
    frozen: Arc<OnceLock<SceneMap>>,
}

impl Stage {
    /// Creates an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits a scene. Its identifier must be unique.
    pub fn register(&mut self, scene: Scene) -> Result<(), SceneError> {
        if self.scenes.contains_key(scene.id()) {
            return Err(SceneError::Duplicate(scene.id.clone()));
        }
        debug!(scene = %scene.id, "Scene committed to stage");
        let id = scene.id.clone();
        self.scenes.insert(id, Arc::new(scene.compile()));
        Ok(())
    }

    /// Returns `true` if a scene with `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.scenes.contains_key(id)
    }

    /// Returns the number of registered scenes.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Returns `true` if no scene is registered.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Returns the navigator bound to this stage.
    pub fn navigator(&self) -> SceneNavigator {
        SceneNavigator {
            scenes: Arc::clone(&self.frozen),
        }
    }

    /// Freezes the stage into the middleware that routes updates into scenes.
    pub fn middleware(self) -> BoxedMiddleware {
        let navigator = self.navigator();
        if self.frozen.set(self.scenes).is_err() {
            warn!("Stage was already frozen");
        }
        Arc::new(StageMiddleware { navigator })
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("scenes", &self.scenes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The scene lookup that `enter_scene` and `leave_scene` rely on.
///
/// As a middleware it attaches itself to the context and continues, so
/// handlers installed before the stage can switch scenes too.
#[derive(Clone)]
pub struct SceneNavigator {
    scenes: Arc<OnceLock<SceneMap>>,
}

impl SceneNavigator {
    /// Returns `true` if a scene with `id` is registered and the stage is frozen.
    pub fn contains(&self, id: &str) -> bool {
        self.scenes.get().is_some_and(|s| s.contains_key(id))
    }

    fn get(&self, id: &str) -> Option<Arc<CompiledScene>> {
        self.scenes.get().and_then(|s| s.get(id)).cloned()
    }
}

impl Middleware for SceneNavigator {
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult> {
        ctx.insert(self.clone());
        next.run(ctx)
    }
}

struct StageMiddleware {
    navigator: SceneNavigator,
}

impl Middleware for StageMiddleware {
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult> {
        ctx.insert(self.navigator.clone());

        let current = match ctx.current_scene() {
            Ok(Some(current)) => current,
            Ok(None) => return next.run(ctx),
            Err(e) => {
                warn!(error = %e, "Scene bookkeeping is unreadable, resetting");
                ctx.session_remove(SCENE_SESSION_KEY);
                return next.run(ctx);
            }
        };

        match self.navigator.get(&current) {
            Some(scene) => scene.body.call(ctx, next),
            None => {
                warn!(scene = %current, "Session names an unregistered scene, resetting");
                ctx.session_remove(SCENE_SESSION_KEY);
                next.run(ctx)
            }
        }
    }
}

// ============================================================================
// Context integration
// ============================================================================

impl Context {
    fn scene_session(&self) -> Result<SceneSession, ContextError> {
        Ok(self
            .session_get::<SceneSession>(SCENE_SESSION_KEY)?
            .unwrap_or_default())
    }

    fn navigator(&self) -> Result<SceneNavigator, ContextError> {
        self.get::<SceneNavigator>()
            .ok_or(ContextError::MissingCapability("scene"))
    }

    /// Returns the identifier of the scene this conversation is in.
    ///
    /// Fails if the scene bookkeeping in the session is malformed.
    pub fn current_scene(&self) -> Result<Option<String>, ContextError> {
        Ok(self.scene_session()?.current)
    }

    /// Enters scene `id`, leaving the current one first, and runs its enter handlers.
    ///
    /// If a leave handler of the current scene enters a scene itself, that
    /// scene is kept and `id` is not entered.
    pub fn enter_scene(&self, id: &str) -> BoxFuture<'static, HandlerResult> {
        let prepared: Result<_, BoxError> = self.navigator().map_err(Into::into).and_then(|nav| {
            let target = nav
                .get(id)
                .ok_or_else(|| SceneError::UnknownScene(id.to_string()))?;
            Ok((nav, target, self.arc()?))
        });
        let id = id.to_string();

        async move {
            let (nav, target, ctx) = prepared?;
            leave_current(&ctx, &nav).await?;
            if let Some(switched) = ctx.current_scene()? {
                debug!(scene = %switched, skipped = %id, "Leave handler switched scenes");
                return Ok(());
            }

            let session = SceneSession {
                current: Some(id.clone()),
                state: SessionData::new(),
            };
            ctx.session_set(SCENE_SESSION_KEY, session)?;
            debug!(scene = %id, "Entered scene");

            target.enter.call(ctx, Next::noop()).await
        }
        .boxed()
    }

    /// Leaves the current scene, running its leave handlers.
    pub fn leave_scene(&self) -> BoxFuture<'static, HandlerResult> {
        let prepared = self
            .navigator()
            .and_then(|nav| Ok((nav, self.arc()?)));

        async move {
            let (nav, ctx) = prepared?;
            leave_current(&ctx, &nav).await
        }
        .boxed()
    }

    /// Reads one value from the current scene's state.
    pub fn scene_state<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        let session = self.scene_session()?;
        let Some(value) = session.state.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ContextError::SessionValue {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Writes one value into the current scene's state.
    ///
    /// Fails with [`SceneError::NotEntered`] outside a scene.
    pub fn set_scene_state<T: Serialize>(&self, key: &str, value: T) -> Result<(), SceneError> {
        let mut session = self.scene_session()?;
        if session.current.is_none() {
            return Err(SceneError::NotEntered);
        }
        let value = serde_json::to_value(value).map_err(|e| ContextError::SessionValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        session.state.insert(key.to_string(), value);
        Ok(self.session_set(SCENE_SESSION_KEY, session)?)
    }
}

async fn leave_current(ctx: &Arc<Context>, nav: &SceneNavigator) -> HandlerResult {
    let Some(current) = ctx.current_scene()? else {
        return Ok(());
    };
    ctx.session_remove(SCENE_SESSION_KEY);
    debug!(scene = %current, "Left scene");

    match nav.get(&current) {
        Some(scene) => scene.leave.call(Arc::clone(ctx), Next::noop()).await,
        None => Ok(()),
    }
}
