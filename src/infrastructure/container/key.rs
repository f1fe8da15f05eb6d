//! 服务键
//!
//! [`ServiceKey`] 在运行时标识一个服务契约。它由类型的 [`TypeId`] 构成，
//! 并携带指向类型描述函数的指针，容器无需额外的类型注册表即可检查任意键。

use super::descriptor::{Describe, TypeDescriptor};
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
    describe: fn() -> TypeDescriptor,
}

impl ServiceKey {
    /// `T` 的键，`dyn Trait` 等不定长契约同样适用
    pub fn of<T: Describe + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            describe: <T as Describe>::descriptor,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 新建描述。容器会缓存描述，热路径上应使用 `ServiceContainer::descriptor`
    pub fn descriptor(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.name)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
