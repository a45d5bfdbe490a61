use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{
    key::Key,
    types::{DynError, Injectable, Instance},
};

/// Classification consumed by hosting layers to pick out externally
/// invocable components; the container only groups by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Provider,
    Consumer,
}

/// Lifetime policy of a component's instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// One instance for the container's lifetime.
    #[default]
    Singleton,
    /// One instance per active scope, disposed when the scope ends.
    Scoped,
    /// A fresh instance on every resolution.
    Transient,
}

impl Lifetime {
    /// Parses a declared lifetime name. Unknown names fall back to
    /// [`Lifetime::Transient`]: construct every time, cache nowhere.
    pub fn from_name(name: &str) -> Lifetime {
        match name {
            "singleton" => Lifetime::Singleton,
            "scoped" => Lifetime::Scoped,
            "transient" => Lifetime::Transient,
            _ => Lifetime::Transient,
        }
    }
}

pub(crate) type FactoryFn =
    dyn Fn(Deps) -> BoxFuture<'static, Result<Instance, DynError>> + Send + Sync;
pub(crate) type InstanceHookFn =
    dyn Fn(Instance) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync;

/// Resolved dependencies handed to a factory, keyed by the declared
/// dependency keys. Factories must not look anything up beyond this map.
#[derive(Clone, Default)]
pub struct Deps {
    values: HashMap<Key, Instance>,
}

impl Deps {
    pub(crate) fn new(values: HashMap<Key, Instance>) -> Self {
        Deps { values }
    }

    /// Optional access; an absent or differently-typed entry is `None`.
    pub fn get<T: Injectable>(&self, key: impl Into<Key>) -> Option<Arc<T>> {
        let key = key.into();
        let instance = self.values.get(&key)?;
        match instance.downcast::<T>() {
            Ok(value) => Some(value),
            Err(actual) => {
                tracing::debug!("dependency '{key}' holds '{actual}', not the requested type");
                None
            }
        }
    }

    /// Hard access for factories; the error names the key and both types.
    pub fn require<T: Injectable>(&self, key: impl Into<Key>) -> Result<Arc<T>, DynError> {
        let key = key.into();
        let Some(instance) = self.values.get(&key) else {
            return Err(format!("required dependency '{key}' was not provided").into());
        };
        instance.downcast::<T>().map_err(|actual| {
            format!(
                "dependency '{key}' holds '{actual}', expected '{}'",
                std::any::type_name::<T>()
            )
            .into()
        })
    }

    pub fn raw(&self, key: &str) -> Option<&Instance> {
        self.values.get(key)
    }
}

/// Types that build themselves from their resolved dependencies.
///
/// [`Component::provide`] turns an implementation into a declaration
/// bound under [`Key::of_type`].
pub trait Provide: Injectable + Sized {
    /// Keys resolved before construction and handed to [`Provide::build`].
    fn dependencies() -> Vec<Key> {
        Vec::new()
    }

    fn build(deps: Deps) -> impl Future<Output = Result<Self, DynError>> + Send;
}

/// An immutable declaration of how to construct and name one injectable
/// unit. Cheap to clone; clones share identity, which is what module
/// merging deduplicates on.
#[derive(Clone)]
pub struct Component(Arc<ComponentInner>);

struct ComponentInner {
    name: Key,
    bindings: Vec<Key>,
    dependencies: Vec<Key>,
    component_type: ComponentType,
    lifetime: Lifetime,
    eager: bool,
    metadata: HashMap<String, Value>,
    factory: Box<FactoryFn>,
    post_construct: Option<Box<InstanceHookFn>>,
    dispose: Option<Box<InstanceHookFn>>,
}

impl Component {
    /// Declares a component built by an async factory.
    pub fn factory<F, Fut, T>(name: impl Into<Key>, factory: F) -> ComponentBuilder
    where
        F: Fn(Deps) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, DynError>> + Send + 'static,
        T: Injectable,
    {
        ComponentBuilder::new(
            name.into(),
            Box::new(
                move |deps: Deps| -> BoxFuture<'static, Result<Instance, DynError>> {
                    let built = factory(deps);
                    Box::pin(async move { built.await.map(Instance::new) })
                },
            ),
        )
    }

    /// Declares a component from an already constructed value.
    pub fn instance<T: Injectable>(name: impl Into<Key>, value: T) -> ComponentBuilder {
        let premade = Instance::new(value);
        ComponentBuilder::new(
            name.into(),
            Box::new(
                move |_: Deps| -> BoxFuture<'static, Result<Instance, DynError>> {
                    let premade = premade.clone();
                    Box::pin(async move { Ok(premade) })
                },
            ),
        )
    }

    /// Declares a component from a [`Provide`] implementation, bound
    /// under the type's derived key.
    pub fn provide<P: Provide>() -> ComponentBuilder {
        ComponentBuilder::new(
            Key::of_type::<P>(),
            Box::new(
                |deps: Deps| -> BoxFuture<'static, Result<Instance, DynError>> {
                    Box::pin(async move { P::build(deps).await.map(Instance::new) })
                },
            ),
        )
        .depends_on(P::dependencies())
    }

    pub fn name(&self) -> &Key {
        &self.0.name
    }

    /// All keys resolving to this component; the name comes first.
    pub fn bindings(&self) -> &[Key] {
        &self.0.bindings
    }

    pub fn dependencies(&self) -> &[Key] {
        &self.0.dependencies
    }

    pub fn component_type(&self) -> ComponentType {
        self.0.component_type
    }

    pub fn lifetime(&self) -> Lifetime {
        self.0.lifetime
    }

    pub fn eager(&self) -> bool {
        self.0.eager
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.0.metadata
    }

    /// Pointer identity, the unit of deduplication across modules.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub(crate) async fn run_factory(&self, deps: Deps) -> Result<Instance, DynError> {
        (self.0.factory)(deps).await
    }

    pub(crate) async fn run_post_construct(&self, instance: &Instance) -> Result<(), DynError> {
        match &self.0.post_construct {
            Some(hook) => hook(instance.clone()).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn run_dispose(&self, instance: &Instance) -> Result<(), DynError> {
        match &self.0.dispose {
            Some(hook) => hook(instance.clone()).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.0.name)
            .field("lifetime", &self.0.lifetime)
            .field("type", &self.0.component_type)
            .field("dependencies", &self.0.dependencies)
            .field("eager", &self.0.eager)
            .finish()
    }
}

/// Accumulates a component declaration; finish with
/// [`ComponentBuilder::build`].
pub struct ComponentBuilder {
    name: Key,
    aliases: Vec<Key>,
    dependencies: Vec<Key>,
    component_type: ComponentType,
    lifetime: Lifetime,
    eager: bool,
    metadata: HashMap<String, Value>,
    factory: Box<FactoryFn>,
    post_construct: Option<Box<InstanceHookFn>>,
    dispose: Option<Box<InstanceHookFn>>,
}

impl ComponentBuilder {
    fn new(name: Key, factory: Box<FactoryFn>) -> Self {
        ComponentBuilder {
            name,
            aliases: Vec::new(),
            dependencies: Vec::new(),
            component_type: ComponentType::Provider,
            lifetime: Lifetime::Singleton,
            eager: false,
            metadata: HashMap::new(),
            factory,
            post_construct: None,
            dispose: None,
        }
    }

    /// Adds an alias key resolving to this component.
    pub fn bind(mut self, key: impl Into<Key>) -> Self {
        self.aliases.push(key.into());
        self
    }

    pub fn depends_on<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Key>,
    {
        self.dependencies.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn component_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = component_type;
        self
    }

    /// Marks the component as an externally invocable entry point.
    pub fn consumer(self) -> Self {
        self.component_type(ComponentType::Consumer)
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn scoped(self) -> Self {
        self.lifetime(Lifetime::Scoped)
    }

    pub fn transient(self) -> Self {
        self.lifetime(Lifetime::Transient)
    }

    /// Constructs the singleton during container build instead of on
    /// first use. Only meaningful together with [`Lifetime::Singleton`].
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Attaches an opaque annotation carried through to
    /// [`components_by_type`](crate::container::Container::components_by_type)
    /// results.
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Hook awaited right after the factory, before the instance is
    /// handed out. A hook whose type does not match the built instance
    /// is skipped.
    pub fn post_construct<T, F, Fut>(mut self, hook: F) -> Self
    where
        T: Injectable,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.post_construct = Some(wrap_hook(hook));
        self
    }

    /// Hook awaited when the scope that created the instance ends.
    pub fn on_dispose<T, F, Fut>(mut self, hook: F) -> Self
    where
        T: Injectable,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.dispose = Some(wrap_hook(hook));
        self
    }

    pub fn build(self) -> Component {
        let mut bindings = vec![self.name.clone()];
        for alias in self.aliases {
            if !bindings.contains(&alias) {
                bindings.push(alias);
            }
        }
        Component(Arc::new(ComponentInner {
            name: self.name,
            bindings,
            dependencies: self.dependencies,
            component_type: self.component_type,
            lifetime: self.lifetime,
            eager: self.eager,
            metadata: self.metadata,
            factory: self.factory,
            post_construct: self.post_construct,
            dispose: self.dispose,
        }))
    }
}

fn wrap_hook<T, F, Fut>(hook: F) -> Box<InstanceHookFn>
where
    T: Injectable,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), DynError>> + Send + 'static,
{
    Box::new(
        move |instance: Instance| -> BoxFuture<'static, Result<(), DynError>> {
            match instance.downcast::<T>() {
                Ok(value) => Box::pin(hook(value)),
                Err(actual) => {
                    tracing::debug!(
                        "hook expecting '{}' skipped, instance holds '{actual}'",
                        std::any::type_name::<T>()
                    );
                    Box::pin(async { Ok(()) })
                }
            }
        },
    )
}
