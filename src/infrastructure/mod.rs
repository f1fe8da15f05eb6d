//! 基础设施层
//!
//! 提供：
//! - 依赖注入容器
//! - 应用生命周期与服务提供者
//! - 全局应用入口

pub mod application;
pub mod container;
pub mod facade;
pub mod provider;

// 重新导出API
pub use application::{Application, Lifecycle};
pub use container::{ContainerExt, ServiceContainer, ServiceKey, ServiceLifetime};
pub use facade::App;
pub use provider::{BootstrapAgent, Provider, ProviderList};
