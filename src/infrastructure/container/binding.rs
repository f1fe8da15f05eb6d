//! 服务绑定
//!
//! 一个 [`Binding`] 描述某个服务从哪里构建以及是否为单例。绑定创建后不可变，
//! 容器只会整体替换或移除它。

use super::key::ServiceKey;
use super::recipe::{Instance, Param};
use super::resolver::Resolver;
use super::ServiceLifetime;
use crate::errors::ContainerError;
use std::fmt;
use std::sync::Arc;

/// 工厂函数：拿到解析器和用户参数，返回构建好的值
pub type Factory =
    Arc<dyn Fn(&Resolver<'_>, Vec<Param>) -> Result<Param, ContainerError> + Send + Sync>;

/// 把具体类型的实例投影成契约实例（`Arc<C>` -> `Arc<dyn Trait>`）
pub type Projection = Arc<dyn Fn(Instance) -> Result<Instance, ContainerError> + Send + Sync>;

/// 服务的构建来源
#[derive(Clone)]
pub enum Source {
    /// 使用服务自身类型的构建配方
    SelfType,
    /// 使用另一个具体类型的构建配方，可选地投影到契约
    Type {
        concrete: ServiceKey,
        projection: Option<Projection>,
    },
    /// 使用工厂函数，不经过构建配方
    Factory {
        factory: Factory,
        /// 工厂产出的具体类型，决定属性注入和释放钩子；缺省为服务自身
        output: Option<ServiceKey>,
        projection: Option<Projection>,
    },
}

impl Source {
    /// 绑定到具体类型 `C`，不做投影
    pub fn to(concrete: ServiceKey) -> Self {
        Source::Type {
            concrete,
            projection: None,
        }
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Resolver<'_>, Vec<Param>) -> Result<Param, ContainerError> + Send + Sync + 'static,
    {
        Source::Factory {
            factory: Arc::new(factory),
            output: None,
            projection: None,
        }
    }

    /// 工厂产出具体类型 `output` 的值，再投影到契约
    pub fn projected_factory<F>(output: ServiceKey, projection: Projection, factory: F) -> Self
    where
        F: Fn(&Resolver<'_>, Vec<Param>) -> Result<Param, ContainerError> + Send + Sync + 'static,
    {
        Source::Factory {
            factory: Arc::new(factory),
            output: Some(output),
            projection: Some(projection),
        }
    }

    /// 配方构建时实际使用的具体类型
    pub fn concrete(&self, service: ServiceKey) -> Option<ServiceKey> {
        match self {
            Source::SelfType => Some(service),
            Source::Type { concrete, .. } => Some(*concrete),
            Source::Factory { .. } => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Source::SelfType => "self",
            Source::Type { .. } => "type",
            Source::Factory { .. } => "factory",
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::SelfType => f.write_str("SelfType"),
            Source::Type {
                concrete,
                projection,
            } => f
                .debug_struct("Type")
                .field("concrete", concrete)
                .field("projected", &projection.is_some())
                .finish(),
            Source::Factory { .. } => f.write_str("Factory(..)"),
        }
    }
}

/// 不可变的服务绑定
#[derive(Clone, Debug)]
pub struct Binding {
    service: ServiceKey,
    source: Source,
    lifetime: ServiceLifetime,
}

impl Binding {
    pub fn new(service: ServiceKey, source: Source, lifetime: ServiceLifetime) -> Self {
        Self {
            service,
            source,
            lifetime,
        }
    }

    /// 未显式绑定时 `make` 使用的临时绑定
    pub(crate) fn ephemeral(service: ServiceKey) -> Self {
        Self::new(service, Source::SelfType, ServiceLifetime::Transient)
    }

    pub fn service(&self) -> ServiceKey {
        self.service
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    pub fn is_static(&self) -> bool {
        self.lifetime.is_static()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_binding_is_transient_self() {
        let binding = Binding::ephemeral(ServiceKey::of::<String>());
        assert!(!binding.is_static());
        assert!(matches!(binding.source(), Source::SelfType));
        assert_eq!(
            binding.source().concrete(binding.service()),
            Some(ServiceKey::of::<String>())
        );
    }

    #[test]
    fn test_factory_has_no_concrete() {
        let source = Source::factory(|_, _| Ok(Box::new(1u8) as Param));
        assert_eq!(source.concrete(ServiceKey::of::<u8>()), None);
        assert_eq!(source.kind_name(), "factory");
        assert_eq!(format!("{:?}", source), "Factory(..)");
    }
}
