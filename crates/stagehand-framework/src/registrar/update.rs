use std::sync::Arc;

use stagehand_core::{Composer, GuardPolicy, compose, guard_chain};
use tracing::debug;

use super::{check_orphan_guards, guarded};
use crate::component::UpdateComponent;
use crate::error::{RegistrationError, RegistrationResult};
use crate::instance::{HandlerDescriptor, HandlerKind};

/// Wires update components onto the bot-wide router.
///
/// Per component, in order: global middlewares, text listeners, event
/// listeners, command listeners, action listeners. There is no uniqueness
/// check across components; the router's first-match rule decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateRegistrar {
    policy: GuardPolicy,
}

impl UpdateRegistrar {
    /// Creates a registrar whose guard chains run under `policy`.
    pub fn new(policy: GuardPolicy) -> Self {
        Self { policy }
    }

    /// Registers every update component on `router`.
    ///
    /// Returns the number of routes installed.
    pub fn register<'a>(
        &self,
        router: &mut Composer,
        components: impl IntoIterator<Item = &'a UpdateComponent>,
    ) -> RegistrationResult<usize> {
        let mut installed = 0;

        for component in components {
            let instance = component.constructor.instantiate();
            let name = instance.name().to_string();
            check_orphan_guards(&instance)?;

            if let Some(h) = instance
                .handlers()
                .iter()
                .find(|h| matches!(h.kind, HandlerKind::Enter | HandlerKind::Leave))
            {
                return Err(RegistrationError::UnsupportedHandler {
                    component: name,
                    kind: h.kind.name(),
                    method: h.method.clone(),
                });
            }

            let (handlers, middlewares, guards) = instance.into_parts();

            for mw in &middlewares {
                let middleware = if guards.contains(&mw.name) {
                    compose([
                        guard_chain(guards.get(&mw.name), self.policy),
                        Arc::clone(&mw.middleware),
                    ])
                } else {
                    Arc::clone(&mw.middleware)
                };
                router.use_middleware(middleware);
                installed += 1;
            }

            let chain = |h: &HandlerDescriptor| {
                guarded(&guards, &h.method, self.policy, Arc::clone(&h.handler))
            };

            for h in &handlers {
                if let HandlerKind::Hears(triggers) = &h.kind {
                    router.hears(triggers.clone(), chain(h));
                    installed += 1;
                }
            }
            for h in &handlers {
                if let HandlerKind::Event(filters) = &h.kind {
                    router.on(filters.iter().copied(), chain(h));
                    installed += 1;
                }
            }
            for h in &handlers {
                if let HandlerKind::Command(commands) = &h.kind {
                    router.command(commands.clone(), chain(h));
                    installed += 1;
                }
            }
            for h in &handlers {
                if let HandlerKind::Action(triggers) = &h.kind {
                    router.action(triggers.clone(), chain(h));
                    installed += 1;
                }
            }

            debug!(
                component = %name,
                middlewares = middlewares.len(),
                handlers = handlers.len(),
                "Update component registered"
            );
        }

        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::HandlerInstance;
    use crate::testing::{Log, record, text_context};
    use stagehand_core::{GuardCursor, Next, guard_fn, middleware_fn};

    fn forwarding(log: &Log, name: &'static str) -> stagehand_core::BoxedGuard {
        let log = log.clone();
        guard_fn(move |_ctx, cursor: GuardCursor| {
            log.push(name);
            cursor.advance()
        })
    }

    async fn run(router: &Composer, text: &str) {
        router
            .middleware()
            .call(text_context(1, 2, text), Next::noop())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_command_guards_run_once_each_under_both_policies() {
        for policy in [GuardPolicy::Cursor, GuardPolicy::RunAll] {
            let log = Log::default();
            let component_log = log.clone();
            let component = UpdateComponent::new(move || {
                HandlerInstance::new("start")
                    .on_command("start", "/start", record(&component_log, "start"))
                    .guards(
                        "start",
                        [
                            forwarding(&component_log, "g1"),
                            forwarding(&component_log, "g2"),
                        ],
                    )
            });

            let mut router = Composer::new();
            UpdateRegistrar::new(policy)
                .register(&mut router, &[component])
                .unwrap();
            run(&router, "/start").await;

            assert_eq!(log.entries(), vec!["g1", "g2", "start"], "{policy:?}");
        }
    }

    #[tokio::test]
    async fn test_middlewares_precede_listeners() {
        let log = Log::default();
        let component_log = log.clone();
        let component = UpdateComponent::new(move || {
            let mw_log = component_log.clone();
            HandlerInstance::new("greeter")
                .on_hears("hello", "hello", record(&component_log, "hears"))
                .middleware(
                    "audit",
                    middleware_fn(move |ctx, next: Next| {
                        mw_log.push("audit");
                        next.run(ctx)
                    }),
                )
        });

        let mut router = Composer::new();
        let installed = UpdateRegistrar::default()
            .register(&mut router, &[component])
            .unwrap();
        run(&router, "hello").await;

        assert_eq!(installed, 2);
        assert_eq!(log.entries(), vec!["audit", "hears"]);
    }

    #[tokio::test]
    async fn test_guarded_middleware_can_stop_dispatch() {
        let log = Log::default();
        let component_log = log.clone();
        let component = UpdateComponent::new(move || {
            HandlerInstance::new("gate")
                .middleware("gate", middleware_fn(|ctx, next: Next| next.run(ctx)))
                .on_hears("hello", "hello", record(&component_log, "hears"))
                .guard("gate", guard_fn(|_ctx, _cursor| async { Ok(()) }))
        });

        let mut router = Composer::new();
        UpdateRegistrar::default()
            .register(&mut router, &[component])
            .unwrap();
        run(&router, "hello").await;

        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_enter_on_update_component_is_rejected() {
        let component = UpdateComponent::new(|| {
            HandlerInstance::new("bad").on_enter("welcome", record(&Log::default(), "x"))
        });
        let err = UpdateRegistrar::default()
            .register(&mut Composer::new(), &[component])
            .unwrap_err();

        assert!(matches!(
            err,
            RegistrationError::UnsupportedHandler { kind: "enter", .. }
        ));
    }

    #[test]
    fn test_orphan_guard_is_rejected() {
        let component = UpdateComponent::new(|| {
            HandlerInstance::new("bad").guard("nothing", guard_fn(|_ctx, c: GuardCursor| c.advance()))
        });
        let err = UpdateRegistrar::default()
            .register(&mut Composer::new(), &[component])
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "bad has guards for undeclared methods: nothing"
        );
    }
}
