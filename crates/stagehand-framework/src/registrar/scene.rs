use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use stagehand_core::{BoxError, Composer, GuardPolicy, Scene, SceneNavigator, Stage};
use tracing::{debug, info};

use super::{check_orphan_guards, guarded};
use crate::component::SceneComponent;
use crate::error::{RegistrationError, RegistrationResult};
use crate::instance::{HandlerDescriptor, HandlerKind};

/// Called with each scene id after the scene is created and before its
/// handlers are bound. Registration waits for it.
pub type SceneHook = Arc<dyn Fn(String) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Builds scenes from scene components and installs the stage.
///
/// The registrar owns the stage it fills. Its [`navigator`](Self::navigator)
/// can be installed on the router ahead of other components so their
/// handlers may enter scenes; it resolves once [`register`](Self::register)
/// has frozen the stage.
#[derive(Default)]
pub struct SceneRegistrar {
    policy: GuardPolicy,
    hook: Option<SceneHook>,
    stage: Stage,
}

impl SceneRegistrar {
    /// Creates a registrar whose guard chains run under `policy`.
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            policy,
            hook: None,
            stage: Stage::new(),
        }
    }

    /// Returns the navigator bound to this registrar's stage.
    pub fn navigator(&self) -> SceneNavigator {
        self.stage.navigator()
    }

    /// Installs the scene-registered hook.
    pub fn on_scene_registered<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.hook = Some(Arc::new(move |id| hook(id).boxed()));
        self
    }

    /// Installs an already boxed hook, or clears it.
    pub fn with_hook(mut self, hook: Option<SceneHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Registers every scene component, then installs the stage on `router`.
    ///
    /// Returns the registered scene ids in order. Any error aborts the pass;
    /// scenes committed so far are discarded with the stage.
    pub async fn register<'a>(
        mut self,
        router: &mut Composer,
        components: impl IntoIterator<Item = &'a SceneComponent>,
    ) -> RegistrationResult<Vec<String>> {
        let mut stage = std::mem::take(&mut self.stage);
        let mut registered: Vec<String> = Vec::new();

        for component in components {
            let scene_id = component.scene_id.to_string();
            if registered.contains(&scene_id) {
                return Err(RegistrationError::DuplicateScene(scene_id));
            }

            let scene = self.build(component).await?;
            stage.register(scene)?;
            debug!(scene = %scene_id, "Scene registered");
            registered.push(scene_id);
        }

        router.use_middleware(stage.middleware());
        info!(count = registered.len(), "Stage installed");
        Ok(registered)
    }

    async fn build(&self, component: &SceneComponent) -> RegistrationResult<Scene> {
        let scene_id = component.scene_id.as_ref();
        let instance = component.constructor.instantiate();
        check_orphan_guards(&instance)?;

        if let Some(mw) = instance.middlewares().first() {
            return Err(RegistrationError::UnsupportedHandler {
                component: scene_id.to_string(),
                kind: "middleware",
                method: mw.name.clone(),
            });
        }

        let mut scene = Scene::new(scene_id);

        if let Some(hook) = &self.hook {
            hook(scene_id.to_string())
                .await
                .map_err(|source| RegistrationError::Hook {
                    scene: scene_id.to_string(),
                    source,
                })?;
        }

        let (handlers, _, guards) = instance.into_parts();
        if let Some(h) = handlers
            .iter()
            .find(|h| matches!(h.kind, HandlerKind::Command(_)))
        {
            return Err(RegistrationError::UnsupportedHandler {
                component: scene_id.to_string(),
                kind: h.kind.name(),
                method: h.method.clone(),
            });
        }

        let of_kind = |name: &'static str| {
            handlers
                .iter()
                .filter(move |h: &&HandlerDescriptor| h.kind.name() == name)
        };
        let chain = |h: &HandlerDescriptor| {
            guarded(&guards, &h.method, self.policy, Arc::clone(&h.handler))
        };

        for h in of_kind("enter") {
            scene.enter(chain(h));
        }
        for h in of_kind("leave") {
            scene.leave(chain(h));
        }
        for h in of_kind("action") {
            if let HandlerKind::Action(triggers) = &h.kind {
                scene.action(triggers.clone(), chain(h));
            }
        }
        for h in of_kind("hears") {
            if let HandlerKind::Hears(triggers) = &h.kind {
                scene.hears(triggers.clone(), chain(h));
            }
        }
        for h in of_kind("event") {
            if let HandlerKind::Event(filters) = &h.kind {
                scene.on(filters.iter().copied(), chain(h));
            }
        }

        debug!(scene = %scene_id, handlers = handlers.len(), "Scene handlers bound");
        Ok(scene)
    }
}

impl std::fmt::Debug for SceneRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRegistrar")
            .field("policy", &self.policy)
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::HandlerInstance;
    use crate::testing::{Log, record, text_context};
    use stagehand_core::{Next, guard_fn};

    fn home(log: &Log) -> SceneComponent {
        let log = log.clone();
        SceneComponent::new("home", move || {
            HandlerInstance::new("home").on_enter("welcome", record(&log, "welcome"))
        })
    }

    async fn enter(router: &Composer, scene: &str) -> Arc<stagehand_core::Context> {
        let ctx = text_context(1, 2, "hi");
        router
            .middleware()
            .call(Arc::clone(&ctx), Next::noop())
            .await
            .unwrap();
        ctx.enter_scene(scene).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_enter_handler_runs_once() {
        let log = Log::default();
        let mut router = Composer::new();
        let ids = SceneRegistrar::default()
            .register(&mut router, &[home(&log)])
            .await
            .unwrap();

        assert_eq!(ids, vec!["home"]);
        assert_eq!(router.len(), 1);

        enter(&router, "home").await;
        assert_eq!(log.entries(), vec!["welcome"]);
    }

    #[tokio::test]
    async fn test_duplicate_scene_aborts() {
        let log = Log::default();
        let mut router = Composer::new();
        let err = SceneRegistrar::default()
            .register(&mut router, &[home(&log), home(&log)])
            .await
            .unwrap_err();

        assert!(matches!(err, RegistrationError::DuplicateScene(ref id) if id == "home"));
        assert!(router.is_empty());
    }

    #[tokio::test]
    async fn test_hook_is_awaited_per_scene() {
        let seen = Log::default();
        let hook_log = seen.clone();
        let registrar = SceneRegistrar::default().on_scene_registered(move |id| {
            let log = hook_log.clone();
            async move {
                tokio::task::yield_now().await;
                log.push(&id);
                Ok(())
            }
        });
        let components = [
            SceneComponent::new("a", || HandlerInstance::new("a")),
            SceneComponent::new("b", || HandlerInstance::new("b")),
        ];

        registrar
            .register(&mut Composer::new(), &components)
            .await
            .unwrap();

        assert_eq!(seen.entries(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_hook_failure_aborts() {
        let registrar =
            SceneRegistrar::default().on_scene_registered(|_id| async { Err("no db".into()) });
        let err = registrar
            .register(&mut Composer::new(), &[SceneComponent::new("a", || HandlerInstance::new("a"))])
            .await
            .unwrap_err();

        assert!(matches!(err, RegistrationError::Hook { ref scene, .. } if scene == "a"));
    }

    #[tokio::test]
    async fn test_command_in_scene_is_rejected() {
        let component = SceneComponent::new("a", || {
            HandlerInstance::new("a").on_command("start", "start", record(&Log::default(), "x"))
        });
        let err = SceneRegistrar::default()
            .register(&mut Composer::new(), &[component])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RegistrationError::UnsupportedHandler { kind: "command", .. }
        ));
    }

    #[tokio::test]
    async fn test_scene_handlers_are_guarded() {
        let log = Log::default();
        let handler_log = log.clone();
        let guard_log = log.clone();
        let component = SceneComponent::new("quiz", move || {
            let guard_log = guard_log.clone();
            HandlerInstance::new("quiz")
                .on_hears("answer", "42", record(&handler_log, "answer"))
                .guard(
                    "answer",
                    guard_fn(move |_ctx, cursor: stagehand_core::GuardCursor| {
                        guard_log.push("guard");
                        cursor.advance()
                    }),
                )
        });

        let mut router = Composer::new();
        SceneRegistrar::new(GuardPolicy::Cursor)
            .register(&mut router, &[component])
            .await
            .unwrap();

        let first = enter(&router, "quiz").await;
        let second = text_context(1, 2, "42");
        second.replace_session(first.session());
        router.middleware().call(second, Next::noop()).await.unwrap();

        assert_eq!(log.entries(), vec!["guard", "answer"]);
    }
}
