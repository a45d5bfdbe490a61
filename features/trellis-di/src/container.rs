use std::{
    collections::{HashMap, HashSet},
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    component::{Component, ComponentType, Deps, Lifetime},
    errors::ContainerError,
    graph::{ComponentId, DependencyGraph},
    key::Key,
    scope,
    types::{Injectable, Instance},
};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(0);

/// The assembled application graph: validated bindings plus the
/// lifetime machinery serving resolutions.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Container(pub(crate) Arc<ContainerInner>);

pub(crate) struct ContainerInner {
    pub(crate) id: u64,
    pub(crate) components: Box<[Component]>,
    graph: DependencyGraph,
    singletons: Box<[OnceCell<Instance>]>,
}

/// One entry of a [`Container::components_by_type`] listing.
#[derive(Debug, Clone)]
pub struct ResolvedComponent {
    pub name: Key,
    pub instance: Instance,
    pub metadata: HashMap<String, Value>,
}

impl Container {
    /// Builds a container from a flat component list.
    ///
    /// The list is deduplicated by component identity, then validated as
    /// a whole: duplicate bindings, missing dependencies and dependency
    /// cycles are all rejected before anything is constructed. Eager
    /// singletons are warmed once validation passes.
    pub async fn create(components: Vec<Component>) -> Result<Container, ContainerError> {
        let mut seen = HashSet::new();
        let components: Vec<Component> = components
            .into_iter()
            .filter(|component| seen.insert(component.addr()))
            .collect();

        let graph = DependencyGraph::new(&components)?;
        graph.check(&components)?;

        tracing::debug!("creating container with {} components", components.len());

        let singletons = components.iter().map(|_| OnceCell::new()).collect();
        let container = Container(Arc::new(ContainerInner {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            components: components.into_boxed_slice(),
            graph,
            singletons,
        }));

        container.warm_eager().await?;
        Ok(container)
    }

    /// Resolves the component bound under `key` as `T`.
    ///
    /// An unbound key is a valid miss, `Ok(None)` - distinct from a
    /// failing factory or a type mismatch, which are errors.
    pub async fn get<T: Injectable>(
        &self,
        key: impl Into<Key>,
    ) -> Result<Option<Arc<T>>, ContainerError> {
        let key = key.into();
        let Some(instance) = self.get_raw(&key).await? else {
            return Ok(None);
        };
        let value = instance
            .downcast::<T>()
            .map_err(|actual| ContainerError::TypeMismatch {
                key,
                requested: std::any::type_name::<T>(),
                actual,
            })?;
        Ok(Some(value))
    }

    /// Type-erased resolution.
    pub async fn get_raw(&self, key: &Key) -> Result<Option<Instance>, ContainerError> {
        let Some(id) = self.0.graph.bindings.get(key) else {
            return Ok(None);
        };
        Ok(Some(self.resolve_id(*id).await?))
    }

    /// Resolves every component declared with the given type, in
    /// declaration order, together with its metadata. Hosting layers use
    /// this to enumerate entry points.
    pub async fn components_by_type(
        &self,
        component_type: ComponentType,
    ) -> Result<Vec<ResolvedComponent>, ContainerError> {
        let mut resolved = Vec::new();
        for (id, component) in self.0.components.iter().enumerate() {
            if component.component_type() != component_type {
                continue;
            }
            resolved.push(ResolvedComponent {
                name: component.name().clone(),
                instance: self.resolve_id(id).await?,
                metadata: component.metadata().clone(),
            });
        }
        Ok(resolved)
    }

    /// Runs `operation` inside a fresh scope. Scoped components resolved
    /// during it live until it finishes, then their dispose hooks run in
    /// reverse creation order - on the error path too.
    pub async fn run_scope<F: Future>(&self, operation: F) -> F::Output {
        scope::run_scope(self, operation).await
    }

    fn resolve_id(&self, id: ComponentId) -> BoxFuture<'_, Result<Instance, ContainerError>> {
        // dependency resolution recurses through here; boxing breaks the
        // future type cycle
        Box::pin(async move {
            let component = &self.0.components[id];
            match component.lifetime() {
                Lifetime::Singleton => {
                    // single-flight: concurrent first access runs one
                    // factory; a failure leaves the cell empty and
                    // retryable
                    let instance = self.0.singletons[id]
                        .get_or_try_init(|| self.construct(id))
                        .await?;
                    Ok(instance.clone())
                }
                Lifetime::Scoped => scope::resolve_scoped(self, id).await,
                Lifetime::Transient => self.construct(id).await,
            }
        })
    }

    /// Builds one instance: resolves the declared dependencies, runs the
    /// factory, then the post-construct hook.
    pub(crate) async fn construct(&self, id: ComponentId) -> Result<Instance, ContainerError> {
        let component = &self.0.components[id];
        tracing::debug!("constructing '{}'", component.name());

        let mut values = HashMap::new();
        for dependency in component.dependencies() {
            // an unbound key stays absent from the deps map; declared
            // dependencies were already checked at create time
            if let Some(instance) = self.get_raw(dependency).await? {
                values.insert(dependency.clone(), instance);
            }
        }

        let instance = component
            .run_factory(Deps::new(values))
            .await
            .map_err(|source| ContainerError::Construction {
                key: component.name().clone(),
                source,
            })?;

        component
            .run_post_construct(&instance)
            .await
            .map_err(|source| ContainerError::Construction {
                key: component.name().clone(),
                source,
            })?;

        Ok(instance)
    }

    async fn warm_eager(&self) -> Result<(), ContainerError> {
        for (id, component) in self.0.components.iter().enumerate() {
            if component.eager() && component.lifetime() == Lifetime::Singleton {
                tracing::debug!("warming eager singleton '{}'", component.name());
                self.resolve_id(id).await?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_struct("Container");
        for (id, component) in self.0.components.iter().enumerate() {
            let state = match component.lifetime() {
                Lifetime::Singleton if self.0.singletons[id].initialized() => "singleton (ready)",
                Lifetime::Singleton => "singleton (lazy)",
                Lifetime::Scoped => "scoped",
                Lifetime::Transient => "transient",
            };
            map.field(component.name().as_str(), &state);
        }
        map.finish()
    }
}
