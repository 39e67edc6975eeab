//! Update dispatcher.
//!
//! The [`Dispatcher`] owns the frozen bot-wide pipeline. For every incoming
//! [`Update`] it creates a fresh [`Context`], runs the pipeline with a no-op
//! continuation and reports the outcome. Errors raised anywhere in the
//! pipeline stop at this boundary: they are handed to the catch hook if one is
//! installed and never affect the processing of other updates.
//!
//! ```rust,ignore
//! let mut router = Composer::new();
//! router.use_middleware(session).command("start", [start]);
//!
//! let dispatcher = Dispatcher::from_router(&router, api)
//!     .catch(|err, ctx| async move {
//!         tracing::warn!(chat = ?ctx.chat_id(), "handler failed: {err}");
//!         Ok(())
//!     });
//! dispatcher.dispatch(update).await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::Service;
use tracing::{Instrument, Level, debug, span};

use crate::api::BoxedApi;
use crate::composer::Composer;
use crate::context::Context;
use crate::error::{BoxError, HandlerResult};
use crate::middleware::{BoxedMiddleware, Next};
use crate::update::Update;

type CatchHook =
    Arc<dyn Fn(BoxError, Arc<Context>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Runs updates through the bot-wide pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    pipeline: BoxedMiddleware,
    api: BoxedApi,
    catch: Option<CatchHook>,
}

impl Dispatcher {
    /// Creates a dispatcher around an already composed pipeline.
    pub fn new(pipeline: BoxedMiddleware, api: BoxedApi) -> Self {
        Self {
            pipeline,
            api,
            catch: None,
        }
    }

    /// Creates a dispatcher from the router's current contents.
    pub fn from_router(router: &Composer, api: BoxedApi) -> Self {
        Self::new(router.middleware(), api)
    }

    /// Installs a hook that receives errors escaping the pipeline.
    ///
    /// The hook's own result becomes the result of [`dispatch`](Self::dispatch).
    pub fn catch<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(BoxError, Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.catch = Some(Arc::new(move |err, ctx| hook(err, ctx).boxed()));
        self
    }

    /// Returns the API handle given to every context.
    pub fn api(&self) -> &BoxedApi {
        &self.api
    }

    /// Processes one update to completion.
    pub async fn dispatch(&self, update: Update) -> HandlerResult {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            update_id = update.update_id,
            kind = update.kind_name()
        );
        let ctx = Context::new(update, Arc::clone(&self.api));

        async {
            let result = self.pipeline.call(Arc::clone(&ctx), Next::noop()).await;
            match (result, &self.catch) {
                (Ok(()), _) => {
                    debug!("Update processed");
                    Ok(())
                }
                (Err(err), Some(catch)) => {
                    debug!(error = %err, "Handing error to catch hook");
                    catch(err, ctx).await
                }
                (Err(err), None) => Err(err),
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("has_catch", &self.catch.is_some())
            .finish_non_exhaustive()
    }
}

/// Tower integration, so rate limits or timeouts can wrap the dispatcher.
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
/// use tower::timeout::TimeoutLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(TimeoutLayer::new(Duration::from_secs(10)))
///     .service(dispatcher);
/// ```
impl Service<Update> for Dispatcher {
    type Response = ();
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, update: Update) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { dispatcher.dispatch(update).await })
    }
}
