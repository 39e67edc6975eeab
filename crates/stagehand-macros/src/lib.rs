//! Procedural macros for the Stagehand bot routing framework.
//!
//! This crate provides:
//!
//! - `#[scene("id")]` - registers a constructor as a scene component
//! - `#[update_component]` - registers a constructor as an update component
//!
//! Both attributes leave the function untouched and add it to a link-time
//! registry in `stagehand-framework`, which
//! `ComponentRegistry::collect()` reads at startup.
//!
//! ```rust,ignore
//! use stagehand::prelude::*;
//!
//! #[scene("checkout")]
//! fn checkout() -> HandlerInstance {
//!     HandlerInstance::new("checkout")
//!         .on_enter("welcome", handler_fn(welcome))
//! }
//!
//! #[update_component]
//! fn commands() -> HandlerInstance {
//!     HandlerInstance::new("commands")
//!         .on_command("start", "/start", handler_fn(start))
//! }
//! ```

mod component;

use proc_macro::TokenStream;

/// Registers a `fn() -> HandlerInstance` as the scene with the given id.
#[proc_macro_attribute]
pub fn scene(attr: TokenStream, item: TokenStream) -> TokenStream {
    component::scene(attr, item)
}

/// Registers a `fn() -> HandlerInstance` as a bot-wide update component.
#[proc_macro_attribute]
pub fn update_component(attr: TokenStream, item: TokenStream) -> TokenStream {
    component::update_component(attr, item)
}
