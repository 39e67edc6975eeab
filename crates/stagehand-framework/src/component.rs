//! Components and the component registry.
//!
//! A component is a constructor of a [`HandlerInstance`] tagged with its role:
//! a [`SceneComponent`] becomes one isolated scene, an [`UpdateComponent`]
//! contributes bot-wide listeners and middlewares.
//!
//! Components are collected before startup, either explicitly through
//! [`ComponentRegistry::with_scene`] / [`ComponentRegistry::with_update`] or
//! from the link-time registries filled by the `#[scene("id")]` and
//! `#[update_component]` attributes:
//!
//! ```rust,ignore
//! use stagehand::prelude::*;
//!
//! #[scene("checkout")]
//! fn checkout() -> HandlerInstance {
//!     HandlerInstance::new("checkout").on_enter("welcome", handler_fn(welcome))
//! }
//!
//! let registry = ComponentRegistry::collect();
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use linkme::distributed_slice;

use crate::instance::HandlerInstance;

// ============================================================================
// Constructors
// ============================================================================

/// Builds a fresh [`HandlerInstance`].
#[derive(Clone)]
pub enum Constructor {
    /// A plain function pointer; usable in `static` items.
    Static(fn() -> HandlerInstance),
    /// A shared closure capturing application state.
    Shared(Arc<dyn Fn() -> HandlerInstance + Send + Sync>),
}

impl Constructor {
    /// Wraps a closure.
    pub fn shared<F>(f: F) -> Self
    where
        F: Fn() -> HandlerInstance + Send + Sync + 'static,
    {
        Self::Shared(Arc::new(f))
    }

    /// Creates the instance.
    pub fn instantiate(&self) -> HandlerInstance {
        match self {
            Self::Static(f) => f(),
            Self::Shared(f) => f(),
        }
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Constructor::Static"),
            Self::Shared(_) => f.write_str("Constructor::Shared"),
        }
    }
}

// ============================================================================
// Components
// ============================================================================

/// A component that becomes one scene.
#[derive(Debug, Clone)]
pub struct SceneComponent {
    /// Unique scene identifier.
    pub scene_id: Cow<'static, str>,
    /// Builds the scene's handlers.
    pub constructor: Constructor,
}

impl SceneComponent {
    /// Creates a scene component from a function pointer.
    pub const fn from_fn(scene_id: &'static str, constructor: fn() -> HandlerInstance) -> Self {
        Self {
            scene_id: Cow::Borrowed(scene_id),
            constructor: Constructor::Static(constructor),
        }
    }

    /// Creates a scene component from a closure.
    pub fn new<F>(scene_id: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> HandlerInstance + Send + Sync + 'static,
    {
        Self {
            scene_id: Cow::Owned(scene_id.into()),
            constructor: Constructor::shared(constructor),
        }
    }
}

/// A component that contributes bot-wide listeners.
#[derive(Debug, Clone)]
pub struct UpdateComponent {
    /// Builds the component's handlers.
    pub constructor: Constructor,
}

impl UpdateComponent {
    /// Creates an update component from a function pointer.
    pub const fn from_fn(constructor: fn() -> HandlerInstance) -> Self {
        Self {
            constructor: Constructor::Static(constructor),
        }
    }

    /// Creates an update component from a closure.
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn() -> HandlerInstance + Send + Sync + 'static,
    {
        Self {
            constructor: Constructor::shared(constructor),
        }
    }
}

/// Either kind of component.
#[derive(Debug, Clone)]
pub enum Component {
    /// A scene component.
    Scene(SceneComponent),
    /// An update component.
    Update(UpdateComponent),
}

impl From<SceneComponent> for Component {
    fn from(c: SceneComponent) -> Self {
        Self::Scene(c)
    }
}

impl From<UpdateComponent> for Component {
    fn from(c: UpdateComponent) -> Self {
        Self::Update(c)
    }
}

// ============================================================================
// Link-time registries (linkme distributed slices)
// ============================================================================

/// Scene components registered with `#[scene("id")]`.
#[distributed_slice]
pub static SCENE_COMPONENTS: [SceneComponent];

/// Update components registered with `#[update_component]`.
#[distributed_slice]
pub static UPDATE_COMPONENTS: [UpdateComponent];

// ============================================================================
// ComponentRegistry
// ============================================================================

/// The ordered set of components handed to the registrars.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: Vec<Component>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every link-time registered component.
    ///
    /// Link order across crates is unspecified, so scenes are sorted by id
    /// to keep registration deterministic.
    pub fn collect() -> Self {
        let mut scenes: Vec<SceneComponent> = SCENE_COMPONENTS.iter().cloned().collect();
        scenes.sort_by(|a, b| a.scene_id.cmp(&b.scene_id));

        let mut registry = Self::new();
        registry
            .components
            .extend(UPDATE_COMPONENTS.iter().cloned().map(Component::Update));
        registry
            .components
            .extend(scenes.into_iter().map(Component::Scene));
        registry
    }

    /// Appends a component.
    pub fn add(&mut self, component: impl Into<Component>) {
        self.components.push(component.into());
    }

    /// Appends a scene component (builder pattern).
    pub fn with_scene(mut self, component: SceneComponent) -> Self {
        self.add(component);
        self
    }

    /// Appends an update component (builder pattern).
    pub fn with_update(mut self, component: UpdateComponent) -> Self {
        self.add(component);
        self
    }

    /// Returns the scene components in registration order.
    pub fn scenes(&self) -> impl Iterator<Item = &SceneComponent> {
        self.components.iter().filter_map(|c| match c {
            Component::Scene(s) => Some(s),
            Component::Update(_) => None,
        })
    }

    /// Returns the update components in registration order.
    pub fn updates(&self) -> impl Iterator<Item = &UpdateComponent> {
        self.components.iter().filter_map(|c| match c {
            Component::Update(u) => Some(u),
            Component::Scene(_) => None,
        })
    }

    /// Returns the total number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if there are no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> HandlerInstance {
        HandlerInstance::new("empty")
    }

    #[test]
    fn test_registry_splits_by_role_in_order() {
        let registry = ComponentRegistry::new()
            .with_scene(SceneComponent::from_fn("b", empty))
            .with_update(UpdateComponent::from_fn(empty))
            .with_scene(SceneComponent::new("a", || HandlerInstance::new("a")));

        let ids: Vec<_> = registry.scenes().map(|s| s.scene_id.as_ref()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(registry.updates().count(), 1);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_shared_constructor_captures_state() {
        let greeting = String::from("hi");
        let component = SceneComponent::new("greet", move || HandlerInstance::new(greeting.clone()));
        assert_eq!(component.constructor.instantiate().name(), "hi");
    }
}
