use crate::{
    container::Container,
    errors::AppError,
    module::{Module, ModuleHook},
};

/// A started application: the container built from a module's component
/// list, plus the module itself so shutdown can run its hooks.
#[derive(Debug)]
pub struct App {
    module: Module,
    container: Container,
}

impl App {
    /// Runs the module's init hooks, builds the container, then runs the
    /// bootstrap hooks. Hooks run in registration order and the first
    /// failure aborts the start.
    pub async fn start(module: Module) -> Result<App, AppError> {
        tracing::debug!("starting '{}'", module.name());

        run_stage("on_init", module.hooks().on_init()).await?;
        let container = Container::create(module.components().to_vec()).await?;
        run_stage("on_bootstrap", module.hooks().on_bootstrap()).await?;

        Ok(App { module, container })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Runs the shutdown hooks, then the destroy hooks.
    pub async fn shutdown(self) -> Result<(), AppError> {
        tracing::debug!("shutting down '{}'", self.module.name());

        run_stage("on_shutdown", self.module.hooks().on_shutdown()).await?;
        run_stage("on_destroy", self.module.hooks().on_destroy()).await?;
        Ok(())
    }
}

async fn run_stage(stage: &'static str, hooks: &[ModuleHook]) -> Result<(), AppError> {
    for hook in hooks {
        hook()
            .await
            .map_err(|source| AppError::Hook { stage, source })?;
    }
    Ok(())
}
