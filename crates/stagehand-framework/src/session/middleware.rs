//! The session middleware.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use stagehand_core::{Context, HandlerResult, Middleware, Next};
use tracing::trace;

use super::BoxedSessionStore;

/// Returns the session key of an update: `"{chat_id}:{user_id}"`.
pub fn session_key(ctx: &Context) -> Option<String> {
    let chat = ctx.chat_id()?;
    let user = ctx.from()?.id;
    Some(format!("{chat}:{user}"))
}

/// Loads the session before the rest of the pipeline and saves it afterwards.
///
/// Updates without both a chat and a sender run with an empty slot that is
/// never saved. Concurrent updates for one key are not serialized; the last
/// write wins.
#[derive(Clone)]
pub struct SessionMiddleware {
    store: BoxedSessionStore,
}

impl SessionMiddleware {
    /// Creates the middleware over `store`.
    pub fn new(store: BoxedSessionStore) -> Self {
        Self { store }
    }
}

impl Middleware for SessionMiddleware {
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult> {
        let store = Arc::clone(&self.store);

        async move {
            let Some(key) = session_key(&ctx) else {
                trace!("Update has no session key");
                return next.run(ctx).await;
            };

            let loaded = store.get(&key).await?;
            let existed = loaded.is_some();
            ctx.replace_session(loaded);

            next.run(Arc::clone(&ctx)).await?;

            match ctx.session() {
                Some(session) => store.set(&key, &session).await?,
                None if existed => store.delete(&key).await?,
                None => {}
            }
            Ok(())
        }
        .boxed()
    }
}

impl std::fmt::Debug for SessionMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMiddleware").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, SessionStore};
    use crate::testing::text_context;
    use stagehand_core::{Chain, middleware_fn};

    fn counting() -> stagehand_core::BoxedMiddleware {
        middleware_fn(|ctx, _next| async move {
            let count: u32 = ctx.session_get("count")?.unwrap_or(0);
            ctx.session_set("count", count + 1)?;
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_session_persists_between_updates() {
        let store = Arc::new(MemorySessionStore::new());
        let chain = Chain::new([
            Arc::new(SessionMiddleware::new(store.clone())) as stagehand_core::BoxedMiddleware,
            counting(),
        ]);

        for _ in 0..3 {
            chain
                .call(text_context(5, 6, "hi"), Next::noop())
                .await
                .unwrap();
        }

        let session = store.get("5:6").await.unwrap().unwrap();
        assert_eq!(session.get("count"), Some(&serde_json::json!(3)));
    }

    #[tokio::test]
    async fn test_cleared_session_is_deleted() {
        let store = Arc::new(MemorySessionStore::new());
        let mut existing = stagehand_core::SessionData::new();
        existing.insert("x".into(), serde_json::json!(1));
        store.set("5:6", &existing).await.unwrap();

        let chain = Chain::new([
            Arc::new(SessionMiddleware::new(store.clone())) as stagehand_core::BoxedMiddleware,
            middleware_fn(|ctx, _next| async move {
                ctx.clear_session();
                Ok(())
            }),
        ]);
        chain
            .call(text_context(5, 6, "bye"), Next::noop())
            .await
            .unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_skips_save() {
        let store = Arc::new(MemorySessionStore::new());
        let chain = Chain::new([
            Arc::new(SessionMiddleware::new(store.clone())) as stagehand_core::BoxedMiddleware,
            middleware_fn(|ctx, _next| async move {
                ctx.session_set("half", true)?;
                Err("failed".into())
            }),
        ]);

        assert!(chain.call(text_context(5, 6, "x"), Next::noop()).await.is_err());
        assert!(store.is_empty());
    }
}
