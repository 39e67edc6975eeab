mod common;

use std::sync::Arc;

use common::{Log, RecordingApi, press, record, text};
use regex::Regex;
use stagehand_core::{
    BoxedGuard, Composer, Context, Dispatcher, GuardCursor, GuardPolicy, HandlerResult,
    TriggerMatch, guard_fn, handler_fn,
};
use stagehand_framework::{
    ComponentRegistry, ContextAugmenter, HandlerInstance, MemorySessionStore, RegistrationError,
    ReplyExt, ReplyHelper, SceneComponent, SceneRegistrar, SessionMiddleware, SessionStore,
    UpdateComponent, UpdateRegistrar, bind,
};

async fn pipeline(
    registry: &ComponentRegistry,
    policy: GuardPolicy,
) -> (Dispatcher, Arc<RecordingApi>, Arc<MemorySessionStore>) {
    let api = Arc::new(RecordingApi::default());
    let store = Arc::new(MemorySessionStore::new());

    let scenes = SceneRegistrar::new(policy);
    let mut router = Composer::new();
    router
        .use_middleware(Arc::new(SessionMiddleware::new(store.clone())))
        .use_middleware(Arc::new(ContextAugmenter::new(ReplyHelper::shared())))
        .use_middleware(Arc::new(scenes.navigator()));
    UpdateRegistrar::new(policy)
        .register(&mut router, registry.updates())
        .unwrap();
    scenes
        .register(&mut router, registry.scenes())
        .await
        .unwrap();

    (Dispatcher::from_router(&router, api.clone()), api, store)
}

fn forwarding(log: &Log, name: &'static str) -> BoxedGuard {
    let log = log.clone();
    guard_fn(move |_ctx, cursor: GuardCursor| {
        log.push(name);
        cursor.advance()
    })
}

#[tokio::test]
async fn scene_enter_handler_runs_exactly_once() {
    let log = Log::default();
    let scene_log = log.clone();
    let registry = ComponentRegistry::new()
        .with_scene(SceneComponent::new("home", move || {
            HandlerInstance::new("home").on_enter("welcome", record(&scene_log, "welcome"))
        }))
        .with_update(UpdateComponent::new(|| {
            HandlerInstance::new("nav").on_command(
                "start",
                "/start",
                handler_fn(|ctx| async move { ctx.enter_scene("home").await }),
            )
        }));

    let (dispatcher, _, _) = pipeline(&registry, GuardPolicy::Cursor).await;
    dispatcher.dispatch(text(1, "/start")).await.unwrap();

    assert_eq!(log.entries(), vec!["welcome"]);
}

#[tokio::test]
async fn duplicate_scene_id_fails_registration() {
    let registry = ComponentRegistry::new()
        .with_scene(SceneComponent::new("home", || HandlerInstance::new("first")))
        .with_scene(SceneComponent::new("home", || HandlerInstance::new("second")));

    let err = SceneRegistrar::default()
        .register(&mut Composer::new(), registry.scenes())
        .await
        .unwrap_err();

    assert!(matches!(err, RegistrationError::DuplicateScene(ref id) if id == "home"));
    assert_eq!(err.to_string(), "scene 'home' is declared more than once");
}

#[tokio::test]
async fn command_guards_each_run_once() {
    for policy in [GuardPolicy::Cursor, GuardPolicy::RunAll] {
        let log = Log::default();
        let component_log = log.clone();
        let registry = ComponentRegistry::new().with_update(UpdateComponent::new(move || {
            HandlerInstance::new("start")
                .on_command("start", "/start", record(&component_log, "handler"))
                .guards(
                    "start",
                    [
                        forwarding(&component_log, "g1"),
                        forwarding(&component_log, "g2"),
                    ],
                )
        }));

        let (dispatcher, _, _) = pipeline(&registry, policy).await;
        dispatcher.dispatch(text(1, "/start")).await.unwrap();

        assert_eq!(log.entries(), vec!["g1", "g2", "handler"], "{policy:?}");
    }
}

struct Quiz {
    answer: &'static str,
}

impl Quiz {
    async fn ask(self: Arc<Self>, ctx: Arc<Context>) -> HandlerResult {
        ctx.set_scene_state("tries", 0u32)?;
        ctx.reply("What is 6 x 7?", None).await?;
        Ok(())
    }

    async fn check(self: Arc<Self>, ctx: Arc<Context>) -> HandlerResult {
        let tries: u32 = ctx.scene_state("tries")?.unwrap_or(0) + 1;
        if ctx.text() == Some(self.answer) {
            ctx.reply(&format!("Correct after {tries} tries"), None).await?;
            ctx.leave_scene().await
        } else {
            ctx.set_scene_state("tries", tries)?;
            ctx.edit_reply("Try again", None).await?;
            Ok(())
        }
    }
}

#[tokio::test]
async fn scene_conversation_persists_through_session() {
    let registry = ComponentRegistry::new()
        .with_update(UpdateComponent::new(|| {
            HandlerInstance::new("nav").on_command(
                "quiz",
                "quiz",
                handler_fn(|ctx| async move { ctx.enter_scene("quiz").await }),
            )
        }))
        .with_scene(SceneComponent::new("quiz", || {
            let this = Arc::new(Quiz { answer: "42" });
            HandlerInstance::new("quiz")
                .on_enter("ask", bind(&this, Quiz::ask))
                .on_event("check", [stagehand_core::MessageField::Text], bind(&this, Quiz::check))
        }));

    let (dispatcher, api, store) = pipeline(&registry, GuardPolicy::Cursor).await;
    dispatcher.dispatch(text(1, "/quiz")).await.unwrap();
    dispatcher.dispatch(text(2, "41")).await.unwrap();
    dispatcher.dispatch(text(3, "42")).await.unwrap();

    let sent: Vec<String> = api.sent.lock().iter().map(|(_, t)| t.clone()).collect();
    assert_eq!(sent, vec!["What is 6 x 7?", "Correct after 2 tries"]);
    assert_eq!(*api.edited.lock(), vec![(7, 1, "Try again".to_string())]);

    let session = store.get("7:42").await.unwrap().unwrap();
    assert!(session.get("__scenes").is_none());
}

#[tokio::test]
async fn unmatched_scene_update_falls_through() {
    let log = Log::default();
    let update_log = log.clone();
    let scene_log = log.clone();
    let registry = ComponentRegistry::new()
        .with_update(UpdateComponent::new(move || {
            HandlerInstance::new("nav")
                .on_command(
                    "shop",
                    "shop",
                    handler_fn(|ctx| async move { ctx.enter_scene("shop").await }),
                )
                .on_action("help", "help", record(&update_log, "global-help"))
        }))
        .with_scene(SceneComponent::new("shop", move || {
            HandlerInstance::new("shop").on_action("buy", "buy", record(&scene_log, "buy"))
        }));

    let (dispatcher, _, _) = pipeline(&registry, GuardPolicy::Cursor).await;
    dispatcher.dispatch(text(1, "/shop")).await.unwrap();
    dispatcher.dispatch(press(2, "buy")).await.unwrap();
    dispatcher.dispatch(press(3, "help")).await.unwrap();

    assert_eq!(log.entries(), vec!["buy", "global-help"]);
}

#[tokio::test]
async fn handler_error_reaches_dispatcher_only() {
    let registry = ComponentRegistry::new().with_update(UpdateComponent::new(|| {
        HandlerInstance::new("flaky")
            .on_hears("boom", "boom", handler_fn(|_ctx| async { Err("exploded".into()) }))
    }));

    let (dispatcher, api, _) = pipeline(&registry, GuardPolicy::Cursor).await;
    let err = dispatcher.dispatch(text(1, "boom")).await.unwrap_err();
    assert_eq!(err.to_string(), "exploded");

    dispatcher.dispatch(text(2, "fine")).await.unwrap();
    assert!(api.sent.lock().is_empty());
}

#[tokio::test]
async fn pattern_captures_reach_the_handler() {
    let registry = ComponentRegistry::new().with_update(UpdateComponent::new(|| {
        HandlerInstance::new("orders").on_hears(
            "order",
            Regex::new(r"^order (\d+)$").unwrap(),
            handler_fn(|ctx| async move {
                let m = ctx.get::<TriggerMatch>().ok_or("no match")?;
                let id = m.captures[0].clone().unwrap_or_default();
                ctx.reply(&format!("Order #{id} noted"), None).await?;
                Ok(())
            }),
        )
    }));

    let (dispatcher, api, _) = pipeline(&registry, GuardPolicy::Cursor).await;
    dispatcher.dispatch(text(1, "order 17")).await.unwrap();
    dispatcher.dispatch(text(2, "order soon")).await.unwrap();

    assert_eq!(*api.sent.lock(), vec![(7, "Order #17 noted".to_string())]);
}
