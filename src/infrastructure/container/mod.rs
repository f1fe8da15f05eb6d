//! 依赖注入容器
//!
//! 绑定、单例缓存、标签以及递归解析引擎。无类型的核心位于
//! [`ServiceContainer`]，以 [`ServiceKey`] 为单位工作；[`ContainerExt`]
//! 在其上提供带类型的接口。

pub mod binding;
pub(crate) mod coercion;
pub mod descriptor;
pub mod ext;
pub mod key;
pub mod recipe;
pub mod resolver;
pub mod service_container;
pub mod stats;

pub use binding::{Binding, Factory, Projection, Source};
pub use descriptor::{Describe, Dispose, DisposeHook, TypeDescriptor, TypeKind};
pub use ext::ContainerExt;
pub use key::ServiceKey;
pub use recipe::{Arguments, Contract, Dependency, Instance, Param, Parameter, Property, Recipe, RecipeBuilder};
pub use resolver::Resolver;
pub use service_container::ServiceContainer;
pub use stats::ContainerStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// 缓存唯一实例，直到被释放或重置
    Singleton,
    /// 每次 make 创建新实例
    Transient,
}

impl ServiceLifetime {
    pub fn is_static(self) -> bool {
        matches!(self, ServiceLifetime::Singleton)
    }
}
