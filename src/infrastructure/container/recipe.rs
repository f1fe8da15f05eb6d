//! 构造配方
//!
//! [`Recipe`] 代替运行时的构造函数反射：按声明顺序列出构造参数，
//! 持有构造函数本身，并记录构造完成后需要注入的属性。
//!
//! ```
//! use bindery::{Describe, Recipe, TypeDescriptor};
//! use std::sync::Arc;
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
//! struct Scheduler {
//!     clock: Arc<Clock>,
//!     workers: u32,
//! }
//!
//! impl Describe for Scheduler {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::concrete::<Self>(
//!             Recipe::builder::<Self>()
//!                 .param::<Clock>("clock")
//!                 .param_or::<u32>("workers", 4)
//!                 .construct(|args| {
//!                     Ok(Scheduler {
//!                         clock: args.next::<Clock>()?,
//!                         workers: args.value::<u32>()?,
//!                     })
//!                 }),
//!         )
//!     }
//! }
//! ```

use super::coercion;
use super::descriptor::Describe;
use super::key::ServiceKey;
use crate::errors::ContainerError;
use std::any::{type_name, Any, TypeId};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

/// 用户传入的构造参数
pub type Param = Box<dyn Any + Send + Sync>;

/// 解析结果。具体服务内部是 `T`，契约内部是 `Arc<dyn Trait>`
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 由一组值构造 `Vec<Param>`
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Param>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$(::std::boxed::Box::new($value) as $crate::Param),+]
    };
}

/// 配方可以依赖的对象
///
/// 所有定长的 [`Describe`] 类型以 `Arc<T>` 交付；契约通过 [`Contract`]
/// 声明，以 `Arc<dyn Trait>` 交付。
pub trait Dependency: 'static {
    type Handle: Send + Sync + 'static;

    fn key() -> ServiceKey;

    /// 用户参数能否原样用于该依赖
    fn matches(param: &(dyn Any + Send + Sync)) -> bool;

    fn from_param(param: Param) -> Result<Self::Handle, Param>;

    fn from_instance(instance: Instance) -> Result<Self::Handle, Instance>;
}

impl<T: Describe + Send + Sync> Dependency for T {
    type Handle = Arc<T>;

    fn key() -> ServiceKey {
        ServiceKey::of::<T>()
    }

    fn matches(param: &(dyn Any + Send + Sync)) -> bool {
        param.is::<T>() || param.is::<Arc<T>>()
    }

    fn from_param(param: Param) -> Result<Arc<T>, Param> {
        match param.downcast::<T>() {
            Ok(value) => Ok(Arc::from(value)),
            Err(param) => param.downcast::<Arc<T>>().map(|shared| *shared),
        }
    }

    fn from_instance(instance: Instance) -> Result<Arc<T>, Instance> {
        instance.downcast::<T>()
    }
}

/// `dyn Trait` 依赖的标记：`param::<Contract<dyn Greeter>>()`
pub struct Contract<S: ?Sized>(PhantomData<S>);

impl<S: Describe + Send + Sync + ?Sized> Dependency for Contract<S> {
    type Handle = Arc<S>;

    fn key() -> ServiceKey {
        ServiceKey::of::<S>()
    }

    fn matches(param: &(dyn Any + Send + Sync)) -> bool {
        param.is::<Arc<S>>()
    }

    fn from_param(param: Param) -> Result<Arc<S>, Param> {
        param.downcast::<Arc<S>>().map(|shared| *shared)
    }

    fn from_instance(instance: Instance) -> Result<Arc<S>, Instance> {
        instance
            .downcast::<Arc<S>>()
            .map(|shared| Arc::clone(&*shared))
    }
}

type Erased = Box<dyn Any + Send + Sync>;
type Constructor = Arc<dyn Fn(&mut Arguments) -> Result<Erased, ContainerError> + Send + Sync>;
type Assign = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Instance) -> Result<(), Instance> + Send + Sync>;
type DefaultValue = Arc<dyn Fn() -> Erased + Send + Sync>;

/// 带类型的构造参数
#[derive(Clone)]
pub(crate) struct DependencySlot {
    pub(crate) key: ServiceKey,
    pub(crate) expected: &'static str,
    pub(crate) coercible: bool,
    pub(crate) matches: fn(&(dyn Any + Send + Sync)) -> bool,
    pub(crate) convert: fn(Param) -> Option<Erased>,
    pub(crate) adopt: fn(Instance) -> Result<Erased, Instance>,
    pub(crate) default: Option<DefaultValue>,
}

#[derive(Clone)]
pub(crate) enum ParameterKind {
    Dependency(DependencySlot),
    /// 接收剩余的全部用户参数
    CatchAll,
}

#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    kind: ParameterKind,
}

impl Parameter {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self.kind, ParameterKind::CatchAll)
    }

    pub fn has_default(&self) -> bool {
        matches!(&self.kind, ParameterKind::Dependency(slot) if slot.default.is_some())
    }

    pub(crate) fn kind(&self) -> &ParameterKind {
        &self.kind
    }
}

/// 构造完成后需要注入的属性
#[derive(Clone)]
pub struct Property {
    name: &'static str,
    key: ServiceKey,
    expected: &'static str,
    assign: Assign,
}

impl Property {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub(crate) fn expected(&self) -> &'static str {
        self.expected
    }

    /// 实例类型与声明不符时原样交回
    pub(crate) fn assign(&self, target: &mut (dyn Any + Send + Sync), instance: Instance) -> Result<(), Instance> {
        (self.assign)(target, instance)
    }
}

pub struct Recipe {
    owner: TypeId,
    owner_name: &'static str,
    parameters: Vec<Parameter>,
    properties: Vec<Property>,
    constructor: Constructor,
}

impl Recipe {
    pub fn builder<T: Any + Send + Sync>() -> RecipeBuilder<T> {
        RecipeBuilder {
            parameters: Vec::new(),
            properties: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// 通过 `Default` 无参构造
    pub fn from_default<T: Default + Any + Send + Sync>() -> Recipe {
        Self::builder::<T>().construct(|_| Ok(T::default()))
    }

    pub fn owner(&self) -> TypeId {
        self.owner
    }

    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub(crate) fn construct(&self, arguments: &mut Arguments) -> Result<Erased, ContainerError> {
        (self.constructor)(arguments)
    }
}

pub struct RecipeBuilder<T> {
    parameters: Vec<Parameter>,
    properties: Vec<Property>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> RecipeBuilder<T> {
    /// 声明下一个构造参数
    pub fn param<D: Dependency>(mut self, name: &'static str) -> Self {
        self.parameters.push(Parameter {
            name,
            kind: ParameterKind::Dependency(slot_for::<D>(None)),
        });
        self
    }

    /// 声明带默认值的参数；用户参数和容器都无法提供时使用 `default`
    pub fn param_or<P: Describe + Send + Sync + Clone>(mut self, name: &'static str, default: P) -> Self {
        let default: DefaultValue = Arc::new(move || Box::new(Arc::new(default.clone())) as Erased);
        self.parameters.push(Parameter {
            name,
            kind: ParameterKind::Dependency(slot_for::<P>(Some(default))),
        });
        self
    }

    /// 声明吞下剩余全部用户参数的参数
    pub fn catch_all(mut self, name: &'static str) -> Self {
        self.parameters.push(Parameter {
            name,
            kind: ParameterKind::CatchAll,
        });
        self
    }

    /// 标记构造完成后注入的属性
    pub fn inject<D, F>(mut self, name: &'static str, setter: F) -> Self
    where
        D: Dependency,
        F: Fn(&mut T, D::Handle) + Send + Sync + 'static,
    {
        let assign: Assign = Arc::new(move |target: &mut (dyn Any + Send + Sync), instance: Instance| {
            let handle = D::from_instance(instance)?;
            if let Some(owner) = target.downcast_mut::<T>() {
                setter(owner, handle);
            }
            Ok(())
        });
        self.properties.push(Property {
            name,
            key: D::key(),
            expected: type_name::<D::Handle>(),
            assign,
        });
        self
    }

    pub fn construct<F>(self, constructor: F) -> Recipe
    where
        F: Fn(&mut Arguments) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        Recipe {
            owner: TypeId::of::<T>(),
            owner_name: type_name::<T>(),
            parameters: self.parameters,
            properties: self.properties,
            constructor: Arc::new(move |arguments: &mut Arguments| {
                constructor(arguments).map(|value| Box::new(value) as Erased)
            }),
        }
    }
}

fn slot_for<D: Dependency>(default: Option<DefaultValue>) -> DependencySlot {
    let key = D::key();
    DependencySlot {
        key,
        expected: type_name::<D::Handle>(),
        coercible: coercion::is_scalar(key.type_id()),
        matches: D::matches,
        convert: convert_param::<D>,
        adopt: adopt_instance::<D>,
        default,
    }
}

fn convert_param<D: Dependency>(param: Param) -> Option<Erased> {
    D::from_param(param).ok().map(|handle| Box::new(handle) as Erased)
}

fn adopt_instance<D: Dependency>(instance: Instance) -> Result<Erased, Instance> {
    D::from_instance(instance).map(|handle| Box::new(handle) as Erased)
}

pub(crate) enum Slot {
    Handle(Erased),
    Pool(Vec<Param>),
}

/// 按声明顺序交给构造函数的实参
pub struct Arguments {
    service: ServiceKey,
    slots: VecDeque<Slot>,
    taken: usize,
}

impl Arguments {
    pub(crate) fn new(service: ServiceKey, slots: VecDeque<Slot>) -> Self {
        Self {
            service,
            slots,
            taken: 0,
        }
    }

    /// 取出下一个带类型的实参
    pub fn next<D: Dependency>(&mut self) -> Result<D::Handle, ContainerError> {
        let index = self.taken;
        match self.slots.pop_front() {
            Some(Slot::Handle(handle)) => {
                self.taken += 1;
                handle
                    .downcast::<D::Handle>()
                    .map(|handle| *handle)
                    .map_err(|_| ContainerError::TypeCastFailed {
                        service: self.service,
                        expected: type_name::<D::Handle>(),
                        actual: format!("constructor argument #{}", index),
                    })
            }
            Some(other) => {
                self.slots.push_front(other);
                Err(self.missing(index, type_name::<D::Handle>()))
            }
            None => Err(self.missing(index, type_name::<D::Handle>())),
        }
    }

    /// 按值取出下一个实参，共享时克隆
    pub fn value<T: Describe + Send + Sync + Clone>(&mut self) -> Result<T, ContainerError> {
        let shared = self.next::<T>()?;
        Ok(Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// 取出兜底参数
    pub fn rest(&mut self) -> Result<Vec<Param>, ContainerError> {
        let index = self.taken;
        match self.slots.pop_front() {
            Some(Slot::Pool(pool)) => {
                self.taken += 1;
                Ok(pool)
            }
            Some(other) => {
                self.slots.push_front(other);
                Err(self.missing(index, "Vec<Param>"))
            }
            None => Err(self.missing(index, "Vec<Param>")),
        }
    }

    pub fn remaining(&self) -> usize {
        self.slots.len()
    }

    fn missing(&self, index: usize, expected: &'static str) -> ContainerError {
        ContainerError::MissingArgument {
            service: self.service,
            index,
            expected,
        }
    }
}
