//! Registrars: turning components into routes.
//!
//! Both registrars put every handler behind its own guard chain, built from
//! the component's [`GuardMap`] entry for the handler's method:
//!
//! ```text
//! listener(filter) ──▶ guard_chain(guards[method], policy) ──▶ handler
//! ```
//!
//! [`UpdateRegistrar`] wires update components onto the bot-wide router;
//! [`SceneRegistrar`] builds one scene per scene component and installs the
//! stage. Update components are registered first, so their middlewares run
//! ahead of the stage.

mod scene;
mod update;

pub use scene::{SceneHook, SceneRegistrar};
pub use update::UpdateRegistrar;

use stagehand_core::{BoxedMiddleware, GuardPolicy, guard_chain};

use crate::error::RegistrationError;
use crate::instance::{GuardMap, HandlerInstance};

/// The `[guard_chain, handler]` pair for one declared method.
fn guarded(
    guards: &GuardMap,
    method: &str,
    policy: GuardPolicy,
    handler: BoxedMiddleware,
) -> [BoxedMiddleware; 2] {
    [guard_chain(guards.get(method), policy), handler]
}

fn check_orphan_guards(instance: &HandlerInstance) -> Result<(), RegistrationError> {
    let orphans = instance.orphan_guards();
    if orphans.is_empty() {
        Ok(())
    } else {
        Err(RegistrationError::OrphanGuards {
            component: instance.name().to_string(),
            methods: orphans,
        })
    }
}
