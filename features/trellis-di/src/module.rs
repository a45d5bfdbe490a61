use std::{collections::HashSet, fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;

use crate::{component::Component, types::DynError};

/// An async lifecycle callback registered on a module.
pub type ModuleHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>;

/// Lifecycle callbacks grouped by stage. Run by the application runner
/// ([`App`](crate::app::App)), never by the container itself.
#[derive(Clone, Default)]
pub struct Hooks {
    pub(crate) on_init: Vec<ModuleHook>,
    pub(crate) on_destroy: Vec<ModuleHook>,
    pub(crate) on_bootstrap: Vec<ModuleHook>,
    pub(crate) on_shutdown: Vec<ModuleHook>,
}

impl Hooks {
    pub fn on_init(&self) -> &[ModuleHook] {
        &self.on_init
    }

    pub fn on_destroy(&self) -> &[ModuleHook] {
        &self.on_destroy
    }

    pub fn on_bootstrap(&self) -> &[ModuleHook] {
        &self.on_bootstrap
    }

    pub fn on_shutdown(&self) -> &[ModuleHook] {
        &self.on_shutdown
    }

    /// Appends `other`'s hooks, skipping ones already present; a module
    /// reached through two import paths runs its hooks once.
    fn extend_dedup(&mut self, other: &Hooks) {
        fn extend(target: &mut Vec<ModuleHook>, source: &[ModuleHook]) {
            for hook in source {
                if !target.iter().any(|existing| Arc::ptr_eq(existing, hook)) {
                    target.push(hook.clone());
                }
            }
        }
        extend(&mut self.on_init, &other.on_init);
        extend(&mut self.on_destroy, &other.on_destroy);
        extend(&mut self.on_bootstrap, &other.on_bootstrap);
        extend(&mut self.on_shutdown, &other.on_shutdown);
    }
}

/// A named, immutable grouping of components plus lifecycle hooks.
///
/// Imports are flattened once at construction: [`Module::components`]
/// returns the full transitive set (imports before own declarations,
/// deduplicated by identity) without re-walking the import graph.
#[derive(Clone)]
pub struct Module(Arc<ModuleInner>);

struct ModuleInner {
    name: String,
    components: Vec<Component>,
    hooks: Hooks,
}

impl Module {
    pub fn builder(name: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder {
            name: name.into(),
            imports: Vec::new(),
            components: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The full transitive component set, in declaration order.
    pub fn components(&self) -> &[Component] {
        &self.0.components
    }

    pub fn hooks(&self) -> &Hooks {
        &self.0.hooks
    }

    /// Structural merge: identity-union of the component sets, hook
    /// lists concatenated in order. Neither input is touched, and the
    /// operation is associative.
    pub fn merge(&self, other: &Module) -> Module {
        let mut components = self.0.components.clone();
        let mut seen: HashSet<usize> = components.iter().map(Component::addr).collect();
        for component in &other.0.components {
            if seen.insert(component.addr()) {
                components.push(component.clone());
            }
        }

        let mut hooks = self.0.hooks.clone();
        hooks.extend_dedup(&other.0.hooks);

        Module(Arc::new(ModuleInner {
            name: format!("{}+{}", self.0.name, other.0.name),
            components,
            hooks,
        }))
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.0.name)
            .field("components", &self.0.components.len())
            .finish()
    }
}

/// Accumulates a module declaration; finish with [`ModuleBuilder::build`].
pub struct ModuleBuilder {
    name: String,
    imports: Vec<Module>,
    components: Vec<Component>,
    hooks: Hooks,
}

impl ModuleBuilder {
    pub fn component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn import(mut self, module: Module) -> Self {
        self.imports.push(module);
        self
    }

    pub fn on_init<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.hooks.on_init.push(wrap_hook(hook));
        self
    }

    pub fn on_destroy<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.hooks.on_destroy.push(wrap_hook(hook));
        self
    }

    pub fn on_bootstrap<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.hooks.on_bootstrap.push(wrap_hook(hook));
        self
    }

    pub fn on_shutdown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.hooks.on_shutdown.push(wrap_hook(hook));
        self
    }

    /// Flattens imports depth-first (imports' components before own),
    /// dedups by component identity, and concatenates hooks in the same
    /// order.
    pub fn build(self) -> Module {
        let mut components = Vec::new();
        let mut seen = HashSet::new();
        let mut hooks = Hooks::default();

        for import in &self.imports {
            for component in import.components() {
                if seen.insert(component.addr()) {
                    components.push(component.clone());
                }
            }
            hooks.extend_dedup(import.hooks());
        }

        for component in self.components {
            if seen.insert(component.addr()) {
                components.push(component);
            }
        }
        hooks.extend_dedup(&self.hooks);

        Module(Arc::new(ModuleInner {
            name: self.name,
            components,
            hooks,
        }))
    }
}

fn wrap_hook<F, Fut>(hook: F) -> ModuleHook
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), DynError>> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, Result<(), DynError>> { Box::pin(hook()) })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component::Component;

    fn component(name: &str) -> Component {
        Component::factory(name, |_| async { Ok(()) }).build()
    }

    fn component_names(module: &Module) -> Vec<&str> {
        module
            .components()
            .iter()
            .map(|component| component.name().as_str())
            .collect()
    }

    #[test]
    fn flattens_imports_before_own_components() {
        let storage = Module::builder("storage").component(component("db")).build();
        let api = Module::builder("api")
            .import(storage)
            .component(component("routes"))
            .build();
        assert_eq!(component_names(&api), ["db", "routes"]);
    }

    #[test]
    fn diamond_imports_bind_shared_components_once() {
        let shared = component("shared");
        let core = Module::builder("core").component(shared).build();
        let left = Module::builder("left")
            .import(core.clone())
            .component(component("left"))
            .build();
        let right = Module::builder("right")
            .import(core)
            .component(component("right"))
            .build();
        let app = Module::builder("app").import(left).import(right).build();

        assert_eq!(component_names(&app), ["shared", "left", "right"]);
    }

    #[test]
    fn diamond_imports_run_hooks_once() {
        let core = Module::builder("core")
            .on_init(|| async { Ok(()) })
            .build();
        let left = Module::builder("left").import(core.clone()).build();
        let right = Module::builder("right").import(core).build();
        let app = Module::builder("app").import(left).import(right).build();

        assert_eq!(app.hooks().on_init().len(), 1);
    }

    #[test]
    fn merge_unions_by_identity_and_preserves_order() {
        let shared = component("shared");
        let a = Module::builder("a")
            .component(shared.clone())
            .component(component("a1"))
            .build();
        let b = Module::builder("b")
            .component(component("b1"))
            .component(shared)
            .build();

        let merged = a.merge(&b);
        assert_eq!(merged.name(), "a+b");
        assert_eq!(component_names(&merged), ["shared", "a1", "b1"]);

        // inputs untouched
        assert_eq!(component_names(&a), ["shared", "a1"]);
        assert_eq!(component_names(&b), ["b1", "shared"]);
    }

    #[test]
    fn merge_is_associative() {
        let a = Module::builder("a").component(component("a1")).build();
        let b = Module::builder("b").component(component("b1")).build();
        let c = Module::builder("c").component(component("c1")).build();

        let left = a.merge(&b).merge(&c);
        let right = a.merge(&b.merge(&c));
        assert_eq!(component_names(&left), component_names(&right));
    }

    #[test]
    fn merge_concatenates_hooks() {
        let a = Module::builder("a")
            .on_init(|| async { Ok(()) })
            .on_shutdown(|| async { Ok(()) })
            .build();
        let b = Module::builder("b").on_init(|| async { Ok(()) }).build();

        let merged = a.merge(&b);
        assert_eq!(merged.hooks().on_init().len(), 2);
        assert_eq!(merged.hooks().on_shutdown().len(), 1);
        assert_eq!(merged.hooks().on_destroy().len(), 0);
    }
}
