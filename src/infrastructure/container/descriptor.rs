//! 类型描述
//!
//! 容器无法在运行时检查构造函数，所有参与解析的类型都实现 [`Describe`]，
//! 返回一个 [`TypeDescriptor`]：类型种类、构造配方以及释放钩子。
//!
//! 基本类型、字符串、序列和 `Option` 在本模块描述，应用类型自行描述：
//!
//! ```
//! use bindery::{Describe, Recipe, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! impl Describe for Clock {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::concrete::<Self>(Recipe::from_default::<Self>())
//!     }
//! }
//! ```

use super::key::ServiceKey;
use super::recipe::Recipe;
use std::any::Any;
use std::sync::Arc;

/// 可以作为服务键的类型
pub trait Describe: 'static {
    fn descriptor() -> TypeDescriptor;
}

/// 缓存单例的释放约定
///
/// 容器通过 `release`、`unbind` 或 `flush` 丢弃实例时调用。
pub trait Dispose {
    fn dispose(&self);
}

pub type DisposeHook = fn(&(dyn Any + Send + Sync));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// 带配方的结构体
    Concrete,
    /// `dyn Trait` 契约，只能通过绑定解析
    Contract,
    Primitive,
    Text,
    Sequence,
    Enumeration,
    Optional,
}

impl TypeKind {
    /// 基本类型和文本类型不会被自动构建
    pub fn is_basic(self) -> bool {
        matches!(self, TypeKind::Primitive | TypeKind::Text)
    }

    /// 无法由配方产生的种类
    pub fn is_unconstructible(self) -> bool {
        matches!(
            self,
            TypeKind::Contract | TypeKind::Sequence | TypeKind::Enumeration | TypeKind::Optional
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Concrete => "concrete",
            TypeKind::Contract => "contract",
            TypeKind::Primitive => "primitive",
            TypeKind::Text => "text",
            TypeKind::Sequence => "sequence",
            TypeKind::Enumeration => "enumeration",
            TypeKind::Optional => "optional",
        }
    }
}

#[derive(Clone)]
pub struct TypeDescriptor {
    key: ServiceKey,
    kind: TypeKind,
    recipe: Option<Arc<Recipe>>,
    dispose: Option<DisposeHook>,
}

impl TypeDescriptor {
    fn new(key: ServiceKey, kind: TypeKind, recipe: Option<Recipe>) -> Self {
        Self {
            key,
            kind,
            recipe: recipe.map(Arc::new),
            dispose: None,
        }
    }

    pub fn concrete<T: Describe + Send + Sync>(recipe: Recipe) -> Self {
        Self::new(ServiceKey::of::<T>(), TypeKind::Concrete, Some(recipe))
    }

    pub fn contract<S: Describe + ?Sized>() -> Self {
        Self::new(ServiceKey::of::<S>(), TypeKind::Contract, None)
    }

    pub fn enumeration<T: Describe>() -> Self {
        Self::new(ServiceKey::of::<T>(), TypeKind::Enumeration, None)
    }

    pub fn sequence<T: Describe + ?Sized>() -> Self {
        Self::new(ServiceKey::of::<T>(), TypeKind::Sequence, None)
    }

    pub fn optional<T: Describe>() -> Self {
        Self::new(ServiceKey::of::<T>(), TypeKind::Optional, None)
    }

    /// 基本类型仍可显式绑定，此时由 `Default` 构建
    pub fn primitive<T: Describe + Default + Send + Sync>() -> Self {
        Self::new(
            ServiceKey::of::<T>(),
            TypeKind::Primitive,
            Some(Recipe::from_default::<T>()),
        )
    }

    pub fn text<T: Describe + Default + Send + Sync>() -> Self {
        Self::new(
            ServiceKey::of::<T>(),
            TypeKind::Text,
            Some(Recipe::from_default::<T>()),
        )
    }

    /// 标记类型需要释放
    pub fn disposable<T: Dispose + Any>(mut self) -> Self {
        self.dispose = Some(dispose_as::<T>);
        self
    }

    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn recipe(&self) -> Option<&Arc<Recipe>> {
        self.recipe.as_ref()
    }

    pub fn dispose_hook(&self) -> Option<DisposeHook> {
        self.dispose
    }
}

fn dispose_as<T: Dispose + Any>(value: &(dyn Any + Send + Sync)) {
    if let Some(value) = value.downcast_ref::<T>() {
        value.dispose();
    }
}

macro_rules! describe_primitives {
    ($($t:ty),* $(,)?) => {
        $(
            impl Describe for $t {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::primitive::<$t>()
                }
            }
        )*
    };
}

describe_primitives!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl Describe for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::text::<String>()
    }
}

impl Describe for &'static str {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::text::<&'static str>()
    }
}

impl<T: 'static> Describe for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence::<Vec<T>>()
    }
}

impl<T: 'static> Describe for [T] {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence::<[T]>()
    }
}

impl<T: 'static, const N: usize> Describe for [T; N] {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence::<[T; N]>()
    }
}

impl<T: 'static> Describe for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional::<Option<T>>()
    }
}

/// 为一个或多个 `dyn Trait` 契约生成描述
///
/// ```
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// bindery::describe_contract!(dyn Greeter);
/// ```
#[macro_export]
macro_rules! describe_contract {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::Describe for $t {
                fn descriptor() -> $crate::TypeDescriptor {
                    $crate::TypeDescriptor::contract::<$t>()
                }
            }
        )+
    };
}

/// 为无字段枚举生成描述，容器从不构建它们
#[macro_export]
macro_rules! describe_enumeration {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::Describe for $t {
                fn descriptor() -> $crate::TypeDescriptor {
                    $crate::TypeDescriptor::enumeration::<$t>()
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_standard_kinds() {
        assert_eq!(u8::descriptor().kind(), TypeKind::Primitive);
        assert_eq!(f64::descriptor().kind(), TypeKind::Primitive);
        assert_eq!(String::descriptor().kind(), TypeKind::Text);
        assert_eq!(<Vec<u8>>::descriptor().kind(), TypeKind::Sequence);
        assert_eq!(<[u8; 4]>::descriptor().kind(), TypeKind::Sequence);
        assert_eq!(<Option<u8>>::descriptor().kind(), TypeKind::Optional);

        assert!(TypeKind::Primitive.is_basic());
        assert!(!TypeKind::Primitive.is_unconstructible());
        assert!(TypeKind::Optional.is_unconstructible());
        assert!(!TypeKind::Concrete.is_basic());
    }

    #[test]
    fn test_primitives_carry_default_recipe() {
        assert!(u32::descriptor().recipe().is_some());
        assert!(<Vec<u8>>::descriptor().recipe().is_none());
    }

    static DISPOSED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Handle;

    impl Dispose for Handle {
        fn dispose(&self) {
            DISPOSED.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Describe for Handle {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::concrete::<Self>(Recipe::from_default::<Self>()).disposable::<Self>()
        }
    }

    #[test]
    fn test_dispose_hook_ignores_other_types() {
        let hook = Handle::descriptor().dispose_hook().unwrap();
        hook(&42u32);
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 0);
        hook(&Handle);
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);
    }
}
