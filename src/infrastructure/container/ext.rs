//! 带类型的容器接口
//!
//! 持有 [`ServiceContainer`] 的类型实现 [`ContainerExt`]，
//! 所有方法都转发到无类型的 `*_by_key` 操作。
//!
//! ```
//! use bindery::{ContainerExt, Describe, Recipe, ServiceContainer, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! impl Describe for Clock {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::concrete::<Self>(Recipe::from_default::<Self>())
//!     }
//! }
//!
//! let container = ServiceContainer::new();
//! container.singleton::<Clock>().unwrap();
//! let a = container.make::<Clock>(vec![]).unwrap();
//! let b = container.make::<Clock>(vec![]).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! ```

use super::binding::{Binding, Projection, Source};
use super::descriptor::Describe;
use super::key::ServiceKey;
use super::recipe::{Contract, Instance, Param};
use super::resolver::{downcast, Resolver};
use super::service_container::{Disposal, ServiceContainer};
use super::ServiceLifetime;
use crate::errors::ContainerError;
use std::sync::Arc;

/// 带类型工厂返回的错误
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

fn factory_failure(service: ServiceKey, error: FactoryError) -> ContainerError {
    match error.downcast::<ContainerError>() {
        Ok(error) => *error,
        Err(error) => ContainerError::CreationFailed {
            service,
            reason: error.to_string(),
        },
    }
}

fn projection<S, C, F>(upcast: F) -> Projection
where
    S: Describe + Send + Sync + ?Sized,
    C: Describe + Send + Sync,
    F: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
{
    let concrete = ServiceKey::of::<C>();
    Arc::new(move |instance: Instance| {
        let value = downcast::<C>(concrete, instance)?;
        Ok(Arc::new(upcast(value)) as Instance)
    })
}

fn contract_source<S, C, F>(upcast: F) -> Source
where
    S: Describe + Send + Sync + ?Sized,
    C: Describe + Send + Sync,
    F: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
{
    Source::Type {
        concrete: ServiceKey::of::<C>(),
        projection: Some(projection::<S, C, F>(upcast)),
    }
}

fn fn_source<T, F>(factory: F) -> Source
where
    T: Describe + Send + Sync,
    F: Fn() -> T + Send + Sync + 'static,
{
    Source::factory(move |_, _| Ok(Box::new(factory()) as Param))
}

fn factory_source<T, F>(factory: F) -> Source
where
    T: Describe + Send + Sync,
    F: Fn(&Resolver<'_>, Vec<Param>) -> Result<T, FactoryError> + Send + Sync + 'static,
{
    Source::factory(move |resolver: &Resolver<'_>, params: Vec<Param>| {
        factory(resolver, params)
            .map(|value| Box::new(value) as Param)
            .map_err(|error| factory_failure(ServiceKey::of::<T>(), error))
    })
}

fn contract_factory_source<S, C, F, U>(factory: F, upcast: U) -> Source
where
    S: Describe + Send + Sync + ?Sized,
    C: Describe + Send + Sync,
    F: Fn(&Resolver<'_>, Vec<Param>) -> Result<C, FactoryError> + Send + Sync + 'static,
    U: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
{
    Source::projected_factory(
        ServiceKey::of::<C>(),
        projection::<S, C, U>(upcast),
        move |resolver: &Resolver<'_>, params: Vec<Param>| {
            factory(resolver, params)
                .map(|value| Box::new(value) as Param)
                .map_err(|error| factory_failure(ServiceKey::of::<S>(), error))
        },
    )
}

pub trait ContainerExt {
    fn container(&self) -> &ServiceContainer;

    /// 按 `T` 自身配方构建的瞬态绑定
    fn bind<T: Describe + Send + Sync>(&self) -> Result<Binding, ContainerError> {
        self.container()
            .bind_by_key(ServiceKey::of::<T>(), Source::SelfType, ServiceLifetime::Transient)
    }

    /// 把契约 `S` 瞬态绑定到具体类型 `C`
    fn bind_contract<S, C, F>(&self, upcast: F) -> Result<Binding, ContainerError>
    where
        S: Describe + Send + Sync + ?Sized,
        C: Describe + Send + Sync,
        F: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    {
        self.container().bind_by_key(
            ServiceKey::of::<S>(),
            contract_source::<S, C, F>(upcast),
            ServiceLifetime::Transient,
        )
    }

    fn bind_fn<T, F>(&self, factory: F) -> Result<Binding, ContainerError>
    where
        T: Describe + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.container()
            .bind_by_key(ServiceKey::of::<T>(), fn_source(factory), ServiceLifetime::Transient)
    }

    fn bind_factory<T, F>(&self, factory: F) -> Result<Binding, ContainerError>
    where
        T: Describe + Send + Sync,
        F: Fn(&Resolver<'_>, Vec<Param>) -> Result<T, FactoryError> + Send + Sync + 'static,
    {
        self.container()
            .bind_by_key(ServiceKey::of::<T>(), factory_source(factory), ServiceLifetime::Transient)
    }

    /// 把契约 `S` 瞬态绑定到 `factory` 产出的 `C`
    fn bind_contract_factory<S, C, F, U>(&self, factory: F, upcast: U) -> Result<Binding, ContainerError>
    where
        S: Describe + Send + Sync + ?Sized,
        C: Describe + Send + Sync,
        F: Fn(&Resolver<'_>, Vec<Param>) -> Result<C, FactoryError> + Send + Sync + 'static,
        U: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    {
        self.container().bind_by_key(
            ServiceKey::of::<S>(),
            contract_factory_source::<S, C, F, U>(factory, upcast),
            ServiceLifetime::Transient,
        )
    }

    fn singleton<T: Describe + Send + Sync>(&self) -> Result<Binding, ContainerError> {
        self.container()
            .bind_by_key(ServiceKey::of::<T>(), Source::SelfType, ServiceLifetime::Singleton)
    }

    fn singleton_contract<S, C, F>(&self, upcast: F) -> Result<Binding, ContainerError>
    where
        S: Describe + Send + Sync + ?Sized,
        C: Describe + Send + Sync,
        F: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    {
        self.container().bind_by_key(
            ServiceKey::of::<S>(),
            contract_source::<S, C, F>(upcast),
            ServiceLifetime::Singleton,
        )
    }

    fn singleton_fn<T, F>(&self, factory: F) -> Result<Binding, ContainerError>
    where
        T: Describe + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.container()
            .bind_by_key(ServiceKey::of::<T>(), fn_source(factory), ServiceLifetime::Singleton)
    }

    fn singleton_factory<T, F>(&self, factory: F) -> Result<Binding, ContainerError>
    where
        T: Describe + Send + Sync,
        F: Fn(&Resolver<'_>, Vec<Param>) -> Result<T, FactoryError> + Send + Sync + 'static,
    {
        self.container()
            .bind_by_key(ServiceKey::of::<T>(), factory_source(factory), ServiceLifetime::Singleton)
    }

    fn singleton_contract_factory<S, C, F, U>(&self, factory: F, upcast: U) -> Result<Binding, ContainerError>
    where
        S: Describe + Send + Sync + ?Sized,
        C: Describe + Send + Sync,
        F: Fn(&Resolver<'_>, Vec<Param>) -> Result<C, FactoryError> + Send + Sync + 'static,
        U: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    {
        self.container().bind_by_key(
            ServiceKey::of::<S>(),
            contract_factory_source::<S, C, F, U>(factory, upcast),
            ServiceLifetime::Singleton,
        )
    }

    fn unbind<T: Describe + ?Sized>(&self) -> Result<(), ContainerError> {
        self.container().unbind_by_key(ServiceKey::of::<T>())
    }

    fn tag<T: Describe + ?Sized>(&self, tag: &str) -> Result<(), ContainerError> {
        self.container().tag_by_key(tag, &[ServiceKey::of::<T>()])
    }

    fn tagged(&self, tag: &str) -> Result<Vec<Instance>, ContainerError> {
        self.container().tagged(tag)
    }

    /// 把 `value` 登记为 `T` 的缓存单例
    fn instance<T: Describe + Send + Sync>(&self, value: T) -> Result<Arc<T>, ContainerError> {
        let service = ServiceKey::of::<T>();
        let instance = self.container().instance_by_key(service, Arc::new(value))?;
        downcast::<T>(service, instance)
    }

    /// 把 `value` 登记为契约 `S` 的缓存单例
    ///
    /// 释放遵循 `C` 的描述。
    fn instance_contract<S, C, F>(&self, value: C, upcast: F) -> Result<Arc<S>, ContainerError>
    where
        S: Describe + Send + Sync + ?Sized,
        C: Describe + Send + Sync,
        F: FnOnce(Arc<C>) -> Arc<S>,
    {
        let service = ServiceKey::of::<S>();
        let container = self.container();
        let target = Arc::new(value);
        let erased: Instance = Arc::clone(&target) as Instance;
        let disposal = Disposal::for_instance(&container.descriptor(ServiceKey::of::<C>()), &erased);
        let instance = container.store(service, Arc::new(upcast(target)) as Instance, disposal)?;
        downcast::<Contract<S>>(service, instance)
    }

    fn release<T: Describe + ?Sized>(&self) -> bool {
        self.container().release_by_key(ServiceKey::of::<T>())
    }

    fn make<T: Describe + Send + Sync>(&self, params: Vec<Param>) -> Result<Arc<T>, ContainerError> {
        let service = ServiceKey::of::<T>();
        let instance = self.container().make_by_key(service, params)?;
        downcast::<T>(service, instance)
    }

    fn make_contract<S: Describe + Send + Sync + ?Sized>(&self, params: Vec<Param>) -> Result<Arc<S>, ContainerError> {
        let service = ServiceKey::of::<S>();
        let instance = self.container().make_by_key(service, params)?;
        downcast::<Contract<S>>(service, instance)
    }

    fn has_bind<T: Describe + ?Sized>(&self) -> bool {
        self.container().has_bind_by_key(ServiceKey::of::<T>())
    }

    fn has_instance<T: Describe + ?Sized>(&self) -> bool {
        self.container().has_instance_by_key(ServiceKey::of::<T>())
    }

    fn is_resolved<T: Describe + ?Sized>(&self) -> bool {
        self.container().is_resolved_by_key(ServiceKey::of::<T>())
    }

    fn is_static<T: Describe + ?Sized>(&self) -> bool {
        self.container().is_static_by_key(ServiceKey::of::<T>())
    }

    fn can_make<T: Describe + ?Sized>(&self) -> bool {
        self.container().can_make_by_key(ServiceKey::of::<T>())
    }
}

impl ContainerExt for ServiceContainer {
    fn container(&self) -> &ServiceContainer {
        self
    }
}
