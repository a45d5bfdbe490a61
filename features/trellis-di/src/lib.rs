//! Async dependency injection for composable applications.
//!
//! Components declare a name, a factory, the keys they depend on and a
//! lifetime. Modules group components and lifecycle hooks, and imports
//! compose modules into bigger ones. [`Container::create`] validates the
//! whole graph up front - duplicate bindings, missing dependencies and
//! cycles are all reported before any factory runs.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), trellis_di::ContainerError> {
//! use trellis_di::{Component, Container};
//!
//! let greeter = Component::factory("greeter", |_| async {
//!     Ok("hello".to_string())
//! })
//! .build();
//!
//! let container = Container::create(vec![greeter]).await?;
//! let greeting = container.get::<String>("greeter").await?.unwrap();
//! assert_eq!(greeting.as_str(), "hello");
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod component;
pub mod container;
pub mod errors;
pub mod graph;
pub mod key;
pub mod module;
pub mod types;

mod scope;

pub use app::App;
pub use component::{Component, ComponentBuilder, ComponentType, Deps, Lifetime, Provide};
pub use container::{Container, ResolvedComponent};
pub use errors::{AppError, ContainerError};
pub use graph::{GraphError, GraphErrors};
pub use key::Key;
pub use module::{Module, ModuleBuilder, ModuleHook};
pub use types::{DynError, Injectable, Instance, TypeInfo};
