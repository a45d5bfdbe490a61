use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

/// Error type factories and hooks are allowed to fail with.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Instances cross task boundaries on a multithreaded runtime, so
/// anything resolvable through the container is Send + Sync + 'static.
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A constructed component instance, type-erased for storage.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub value: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub fn new<T: Injectable>(value: T) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// On mismatch returns the name of the actually stored type.
    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.value.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
