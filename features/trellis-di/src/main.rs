use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde_json::json;
use trellis_di::{App, Component, ComponentType, Deps, DynError, Module};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let storage = Module::builder("storage")
        .component(
            Component::instance(
                "config",
                Config {
                    dsn: "sqlite::memory:".to_string(),
                },
            )
            .build(),
        )
        .component(
            Component::factory("userRepo", |deps: Deps| async move {
                let config = deps.require::<Config>("config")?;
                Ok(UserRepo {
                    dsn: config.dsn.clone(),
                })
            })
            .depends_on(["config"])
            .eager()
            .build(),
        )
        .build();

    let api = Module::builder("api")
        .import(storage)
        .component(
            Component::factory("userHandler", |deps: Deps| async move {
                let repo = deps.require::<UserRepo>("userRepo")?;
                Ok(UserHandler { repo })
            })
            .depends_on(["userRepo"])
            .consumer()
            .metadata("route", json!("/users"))
            .build(),
        )
        .component(
            Component::factory("requestId", |_| async {
                Ok(RequestId(NEXT_REQUEST.fetch_add(1, Ordering::Relaxed)))
            })
            .scoped()
            .build(),
        )
        .on_init(|| async {
            tracing::info!("api module initializing");
            Ok(())
        })
        .build();

    let app = App::start(api).await?;
    let container = app.container();
    println!("{:?}", container);

    let handler = container.get::<UserHandler>("userHandler").await?.unwrap();
    println!("userHandler ready against {}", handler.repo.dsn);

    for entry in container.components_by_type(ComponentType::Consumer).await? {
        println!("consumer '{}' metadata {:?}", entry.name, entry.metadata);
    }

    let (first, second) = container
        .run_scope(async {
            let first = container.get::<RequestId>("requestId").await?.unwrap();
            let second = container.get::<RequestId>("requestId").await?.unwrap();
            Ok::<_, DynError>((first, second))
        })
        .await?;
    println!("one scope, one request id: {} and {}", first.0, second.0);

    app.shutdown().await?;
    Ok(())
}

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct Config {
    dsn: String,
}

#[derive(Debug)]
struct UserRepo {
    dsn: String,
}

#[derive(Debug)]
struct UserHandler {
    repo: Arc<UserRepo>,
}

#[derive(Debug)]
struct RequestId(u64);
