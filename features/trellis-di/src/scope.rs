use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
};

use tokio::sync::OnceCell;

use crate::{container::Container, errors::ContainerError, graph::ComponentId, types::Instance};

tokio::task_local! {
    /// Scope frames visible to the current logical call chain, keyed by
    /// container id. Not propagated across `tokio::spawn` boundaries: a
    /// spawned task is a new call chain.
    static ACTIVE_SCOPES: ScopeStack;
}

/// Snapshot of the frames active on this call chain. Entering a scope
/// clones the map and swaps a single entry, so sibling and nested
/// scopes never share a frame.
#[derive(Clone, Default)]
struct ScopeStack {
    frames: HashMap<u64, Arc<ScopeFrame>>,
}

/// Instance cache for one `run_scope` invocation.
struct ScopeFrame {
    slots: Box<[OnceCell<Instance>]>,
    /// Creation order, for reverse-order disposal.
    created: Mutex<Vec<ComponentId>>,
}

impl ScopeFrame {
    fn new(len: usize) -> Self {
        ScopeFrame {
            slots: (0..len).map(|_| OnceCell::new()).collect(),
            created: Mutex::new(Vec::new()),
        }
    }
}

/// Runs `operation` with a fresh frame for `container`, then disposes
/// every instance the scope created, newest first. Disposal also runs
/// when the operation's output is an error; dropping the returned
/// future mid-flight skips it.
pub(crate) async fn run_scope<F: Future>(container: &Container, operation: F) -> F::Output {
    let frame = Arc::new(ScopeFrame::new(container.0.components.len()));

    let mut stack = ACTIVE_SCOPES
        .try_with(ScopeStack::clone)
        .unwrap_or_default();
    stack.frames.insert(container.0.id, frame.clone());

    tracing::debug!("entering scope on container {}", container.0.id);
    let output = ACTIVE_SCOPES.scope(stack, operation).await;

    dispose_frame(container, &frame).await;
    output
}

/// Resolves a scoped component in the current frame, constructing it on
/// first access within the scope.
pub(crate) async fn resolve_scoped(
    container: &Container,
    id: ComponentId,
) -> Result<Instance, ContainerError> {
    let Some(frame) = current_frame(container) else {
        return Err(ContainerError::ScopeRequired {
            key: container.0.components[id].name().clone(),
        });
    };

    let instance = frame.slots[id]
        .get_or_try_init(|| async {
            let instance = container.construct(id).await?;
            frame.created.lock().unwrap().push(id);
            Ok::<_, ContainerError>(instance)
        })
        .await?;
    Ok(instance.clone())
}

fn current_frame(container: &Container) -> Option<Arc<ScopeFrame>> {
    ACTIVE_SCOPES
        .try_with(|stack| stack.frames.get(&container.0.id).cloned())
        .ok()
        .flatten()
}

async fn dispose_frame(container: &Container, frame: &ScopeFrame) {
    let created = std::mem::take(&mut *frame.created.lock().unwrap());
    for id in created.into_iter().rev() {
        let Some(instance) = frame.slots[id].get() else {
            continue;
        };
        let component = &container.0.components[id];
        tracing::debug!("disposing scoped '{}'", component.name());
        if let Err(error) = component.run_dispose(instance).await {
            tracing::warn!("dispose of '{}' failed: {error}", component.name());
        }
    }
}
