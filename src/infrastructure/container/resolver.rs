//! 递归解析
//!
//! 每次 `make` 在自己的调用栈上压入一个指向父帧的 `Frame`，帧链即经由
//! 解析器的构建路径。循环检测使用容器按线程记录的构建栈，因此直接重新进入
//! 容器（闭包工厂持有的容器句柄、构造函数里的 `App::make`）同样会被拦截。

use super::binding::{Binding, Projection, Source};
use super::coercion;
use super::descriptor::{Describe, TypeDescriptor};
use super::key::ServiceKey;
use super::recipe::{Arguments, Contract, Dependency, DependencySlot, Instance, Param, ParameterKind, Recipe, Slot};
use super::service_container::{Disposal, ServiceContainer};
use super::stats::InnerStats;
use crate::errors::ContainerError;
use std::any::{type_name, Any};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

type Erased = Box<dyn Any + Send + Sync>;

pub(crate) struct Frame<'a> {
    key: ServiceKey,
    parent: Option<&'a Frame<'a>>,
}

impl<'a> Frame<'a> {
    fn iter(&self) -> impl Iterator<Item = &Frame<'a>> {
        std::iter::successors(Some(self), |frame| frame.parent)
    }

    /// 从最外层 `make` 到当前帧的服务
    fn path(&self) -> Vec<ServiceKey> {
        let mut path: Vec<ServiceKey> = self.iter().map(|frame| frame.key).collect();
        path.reverse();
        path
    }
}

/// 交给工厂的容器句柄
///
/// 经由解析器的请求会延长当前构建路径。请求正在构建中的服务时返回
/// `CircularDependency`。
pub struct Resolver<'a> {
    container: &'a ServiceContainer,
    frame: Option<&'a Frame<'a>>,
}

struct Built {
    instance: Instance,
    disposal: Option<Disposal>,
}

impl<'a> Resolver<'a> {
    pub fn container(&self) -> &ServiceContainer {
        self.container
    }

    /// 经由解析器正在构建的服务，最外层在前
    pub fn path(&self) -> Vec<ServiceKey> {
        self.frame.map(Frame::path).unwrap_or_default()
    }

    pub fn make_by_key(&self, service: ServiceKey, params: Vec<Param>) -> Result<Instance, ContainerError> {
        self.container.make_within(service, params, self.frame)
    }

    pub fn make<T: Dependency>(&self, params: Vec<Param>) -> Result<T::Handle, ContainerError> {
        let instance = self.make_by_key(T::key(), params)?;
        downcast::<T>(T::key(), instance)
    }

    /// 解析 `dyn Trait` 契约
    pub fn make_contract<S: Describe + Send + Sync + ?Sized>(&self, params: Vec<Param>) -> Result<Arc<S>, ContainerError> {
        self.make::<Contract<S>>(params)
    }

    fn build(&self, binding: &Binding, params: Vec<Param>) -> Result<Built, ContainerError> {
        let service = binding.service();
        match binding.source() {
            Source::Factory {
                factory,
                output,
                projection,
            } => {
                let mut value = factory(self, params)?;
                let descriptor = self.container.descriptor(output.unwrap_or(service));
                if let Some(recipe) = descriptor.recipe() {
                    if concrete_type(&*value) == recipe.owner() {
                        self.inject_properties(service, recipe, &mut *value)?;
                    }
                }
                let target: Instance = Arc::from(value);
                finish(target, &descriptor, projection.as_ref())
            }
            Source::SelfType => self.build_concrete(service, service, None, params),
            Source::Type {
                concrete,
                projection,
            } => self.build_concrete(service, *concrete, projection.as_ref(), params),
        }
    }

    fn build_concrete(
        &self,
        service: ServiceKey,
        concrete: ServiceKey,
        projection: Option<&Projection>,
        mut pool: Vec<Param>,
    ) -> Result<Built, ContainerError> {
        let descriptor = self.container.descriptor(concrete);
        let recipe = recipe_of(concrete, &descriptor)?;

        let mut slots = VecDeque::with_capacity(recipe.parameters().len());
        for parameter in recipe.parameters() {
            let slot = match parameter.kind() {
                ParameterKind::CatchAll => Slot::Pool(std::mem::take(&mut pool)),
                ParameterKind::Dependency(slot) => {
                    Slot::Handle(self.resolve_parameter(service, parameter.name(), slot, &mut pool)?)
                }
            };
            slots.push_back(slot);
        }

        let mut arguments = Arguments::new(concrete, slots);
        let mut value = recipe.construct(&mut arguments)?;
        self.inject_properties(service, recipe, &mut *value)?;

        let target: Instance = Arc::from(value);
        finish(target, &descriptor, projection)
    }

    fn resolve_parameter(
        &self,
        service: ServiceKey,
        name: &'static str,
        slot: &DependencySlot,
        pool: &mut Vec<Param>,
    ) -> Result<Erased, ContainerError> {
        if let Some(index) = pool.iter().position(|param| (slot.matches)(&**param)) {
            let param = pool.remove(index);
            return (slot.convert)(param).ok_or_else(|| ContainerError::TypeCastFailed {
                service,
                expected: slot.expected,
                actual: format!("user parameter for '{}'", name),
            });
        }

        if slot.coercible {
            let target = slot.key.type_id();
            let converted = pool
                .iter()
                .enumerate()
                .find_map(|(index, param)| coercion::coerce(&**param, target).map(|value| (index, value)));
            if let Some((index, value)) = converted {
                pool.remove(index);
                if let Some(handle) = (slot.convert)(value) {
                    return Ok(handle);
                }
            }
        }

        if self.container.can_make_by_key(slot.key) {
            let instance = self.make_by_key(slot.key, Vec::new())?;
            return (slot.adopt)(instance).map_err(|_| self.incompatible(service, name, slot.expected, slot.key));
        }

        match &slot.default {
            Some(default) => Ok(default()),
            None => Err(ContainerError::UnresolvedDependency {
                service,
                dependency: slot.key,
            }),
        }
    }

    fn inject_properties(
        &self,
        service: ServiceKey,
        recipe: &Recipe,
        target: &mut (dyn Any + Send + Sync),
    ) -> Result<(), ContainerError> {
        for property in recipe.properties() {
            let dependency = property.key();
            if !self.container.can_make_by_key(dependency) {
                return Err(ContainerError::UnresolvedDependency { service, dependency });
            }
            let instance = self.make_by_key(dependency, Vec::new())?;
            property
                .assign(target, instance)
                .map_err(|_| self.incompatible(service, property.name(), property.expected(), dependency))?;
        }
        Ok(())
    }

    fn incompatible(
        &self,
        service: ServiceKey,
        target: &str,
        expected: &str,
        dependency: ServiceKey,
    ) -> ContainerError {
        let actual = match self.container.get_bind(dependency).as_ref().map(Binding::source) {
            Some(Source::Type { concrete, .. }) => concrete.name().to_string(),
            Some(Source::Factory { .. }) => format!("factory output for '{}'", dependency),
            _ => dependency.name().to_string(),
        };
        ContainerError::IncompatibleInjectionType {
            service,
            target: target.to_string(),
            expected: expected.to_string(),
            actual,
        }
    }
}

/// 释放钩子作用于投影前的具体值
fn finish(target: Instance, descriptor: &TypeDescriptor, projection: Option<&Projection>) -> Result<Built, ContainerError> {
    let disposal = Disposal::for_instance(descriptor, &target);
    let instance = match projection {
        Some(project) => project(target)?,
        None => target,
    };
    Ok(Built { instance, disposal })
}

fn concrete_type(value: &(dyn Any + Send + Sync)) -> std::any::TypeId {
    value.type_id()
}

fn recipe_of(concrete: ServiceKey, descriptor: &TypeDescriptor) -> Result<&Arc<Recipe>, ContainerError> {
    let kind = descriptor.kind();
    match descriptor.recipe() {
        Some(recipe) if !kind.is_unconstructible() => Ok(recipe),
        _ => Err(ContainerError::UnconstructibleType {
            concrete,
            kind: kind.as_str(),
        }),
    }
}

/// 把解析结果转换为 `D` 需要的句柄
pub(crate) fn downcast<D: Dependency>(service: ServiceKey, instance: Instance) -> Result<D::Handle, ContainerError> {
    D::from_instance(instance).map_err(|_| ContainerError::TypeCastFailed {
        service,
        expected: type_name::<D::Handle>(),
        actual: format!("instance bound to '{}'", service),
    })
}

impl ServiceContainer {
    pub(crate) fn make_within(
        &self,
        service: ServiceKey,
        params: Vec<Param>,
        parent: Option<&Frame<'_>>,
    ) -> Result<Instance, ContainerError> {
        let counters = self.stats_counters();
        InnerStats::bump(&counters.total_resolutions);

        if let Some(instance) = self.cached(service) {
            InnerStats::bump(&counters.cache_hits);
            return Ok(instance);
        }

        let _building = match self.begin_build(service) {
            Ok(guard) => guard,
            Err(path) => {
                InnerStats::bump(&counters.circular_dependencies);
                let chain = path.iter().map(|key| key.name().to_string()).collect();
                return Err(ContainerError::CircularDependency { service, chain });
            }
        };

        let limit = self.config().max_user_params;
        if params.len() > limit {
            return Err(ContainerError::TooManyParameters {
                service,
                count: params.len(),
                limit,
            });
        }

        let binding = match self.get_bind(service) {
            Some(binding) => binding,
            None => {
                let kind = self.descriptor(service).kind();
                if kind.is_basic() || kind.is_unconstructible() {
                    return Err(ContainerError::UnconstructibleType {
                        concrete: service,
                        kind: kind.as_str(),
                    });
                }
                Binding::ephemeral(service)
            }
        };

        let frame = Frame { key: service, parent };
        let resolver = Resolver {
            container: self,
            frame: Some(&frame),
        };
        let built = resolver.build(&binding, params)?;
        InnerStats::bump(&counters.builds);

        let instance = if binding.is_static() {
            self.store(service, built.instance, built.disposal)?
        } else {
            built.instance
        };
        self.mark_resolved(service);

        debug!(
            service = %service,
            source = binding.source().kind_name(),
            singleton = binding.is_static(),
            depth = frame.path().len(),
            "Built service"
        );
        Ok(instance)
    }
}
