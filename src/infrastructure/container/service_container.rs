//! 服务容器
//!
//! 提供绑定注册、单例缓存、标签分组和按需解析：
//! - 单例与瞬态生命周期
//! - 配方构建、工厂构建和契约投影
//! - 循环依赖检测
//! - 原子化的整体重置（flush）
//!
//! 容器内部状态由一把 `parking_lot::Mutex` 保护，但在运行用户代码
//! （工厂、构造函数、属性注入、释放钩子）时从不持有锁，因此这些代码可以
//! 重新进入容器。

use super::binding::{Binding, Source};
use super::descriptor::{DisposeHook, TypeDescriptor};
use super::key::ServiceKey;
use super::recipe::{Instance, Param};
use super::stats::{ContainerStats, InnerStats};
use super::ServiceLifetime;
use crate::config::ContainerConfig;
use crate::errors::ContainerError;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// 单例的释放动作
pub(crate) struct Disposal {
    hook: DisposeHook,
    target: Instance,
}

impl Disposal {
    /// 类型声明了释放钩子时才会生成
    pub(crate) fn for_instance(descriptor: &TypeDescriptor, target: &Instance) -> Option<Self> {
        descriptor.dispose_hook().map(|hook| Self {
            hook,
            target: Arc::clone(target),
        })
    }

    fn run(&self) {
        (self.hook)(&*self.target)
    }
}

struct Cached {
    instance: Instance,
    disposal: Option<Disposal>,
    sequence: u64,
}

impl Cached {
    fn dispose(self) {
        if let Some(disposal) = &self.disposal {
            disposal.run();
        }
    }
}

struct Registry {
    bindings: HashMap<ServiceKey, Binding>,
    instances: HashMap<ServiceKey, Cached>,
    tags: HashMap<String, Vec<ServiceKey>>,
    resolved: HashSet<ServiceKey>,
    sequence: u64,
}

impl Registry {
    fn with_config(config: &ContainerConfig) -> Self {
        let capacity = config.effective_capacity();
        Self {
            bindings: HashMap::with_capacity(capacity * 4),
            instances: HashMap::with_capacity(capacity * 4),
            tags: HashMap::with_capacity(capacity / 4),
            resolved: HashSet::with_capacity(capacity * 4),
            sequence: 0,
        }
    }
}

struct Inner {
    registry: Mutex<Registry>,
    flushing: AtomicBool,
    config: ContainerConfig,
    stats: InnerStats,
    descriptors: Mutex<HashMap<ServiceKey, Arc<TypeDescriptor>>>,
    /// 每个线程正在构建的服务，最外层在前
    building: Mutex<HashMap<ThreadId, Vec<ServiceKey>>>,
}

/// 构建结束时把服务弹出当前线程的构建栈
pub(crate) struct BuildGuard<'a> {
    building: &'a Mutex<HashMap<ThreadId, Vec<ServiceKey>>>,
    thread: ThreadId,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        let mut building = self.building.lock();
        if let Some(stack) = building.get_mut(&self.thread) {
            stack.pop();
            if stack.is_empty() {
                building.remove(&self.thread);
            }
        }
    }
}

/// 复位 flush 标记，任何退出路径都会执行
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 服务容器
///
/// 克隆得到的是同一个容器的另一个句柄。
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Arc<Inner>,
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceContainer {
    /// 使用默认配置创建容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        let registry = Registry::with_config(&config);
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(registry),
                flushing: AtomicBool::new(false),
                config,
                stats: InnerStats::default(),
                descriptors: Mutex::new(HashMap::new()),
                building: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// 获取类型描述（带缓存）
    pub fn descriptor(&self, key: ServiceKey) -> Arc<TypeDescriptor> {
        if let Some(descriptor) = self.inner.descriptors.lock().get(&key) {
            return Arc::clone(descriptor);
        }
        let descriptor = Arc::new(key.descriptor());
        Arc::clone(
            self.inner
                .descriptors
                .lock()
                .entry(key)
                .or_insert(descriptor),
        )
    }

    fn ensure_not_flushing(&self, operation: &'static str) -> Result<(), ContainerError> {
        if self.inner.flushing.load(Ordering::SeqCst) {
            return Err(ContainerError::FlushInProgress { operation });
        }
        Ok(())
    }

    /// 注册绑定
    ///
    /// 如果服务此前已被解析过且新绑定为单例，会立即构建并缓存。
    pub fn bind_by_key(
        &self,
        service: ServiceKey,
        source: Source,
        lifetime: ServiceLifetime,
    ) -> Result<Binding, ContainerError> {
        self.ensure_not_flushing("bind")?;

        if let Some(concrete) = source.concrete(service) {
            let descriptor = self.descriptor(concrete);
            if descriptor.kind().is_unconstructible() {
                return Err(ContainerError::UnconstructibleType {
                    concrete,
                    kind: descriptor.kind().as_str(),
                });
            }
        }

        let binding = Binding::new(service, source, lifetime);
        let late_static = {
            let mut registry = self.inner.registry.lock();
            if registry.bindings.contains_key(&service) || registry.instances.contains_key(&service) {
                return Err(ContainerError::DuplicateBinding { service });
            }
            registry.bindings.insert(service, binding.clone());
            lifetime.is_static() && registry.resolved.contains(&service)
        };

        debug!(
            service = %service,
            source = binding.source().kind_name(),
            singleton = lifetime.is_static(),
            "Bound service"
        );

        if late_static {
            debug!(service = %service, "Service was resolved before; building singleton now");
            self.make_by_key(service, Vec::new())?;
        }

        Ok(binding)
    }

    /// 移除绑定，并释放已缓存的实例
    pub fn unbind_by_key(&self, service: ServiceKey) -> Result<(), ContainerError> {
        self.ensure_not_flushing("unbind")?;
        self.release_by_key(service);
        if self.inner.registry.lock().bindings.remove(&service).is_some() {
            debug!(service = %service, "Unbound service");
        }
        Ok(())
    }

    /// 把服务追加到标签下，不去重
    pub fn tag_by_key(&self, tag: &str, services: &[ServiceKey]) -> Result<(), ContainerError> {
        self.ensure_not_flushing("tag")?;
        self.inner
            .registry
            .lock()
            .tags
            .entry(tag.to_string())
            .or_default()
            .extend_from_slice(services);
        debug!(tag, count = services.len(), "Tagged services");
        Ok(())
    }

    /// 按顺序解析标签下的所有服务
    pub fn tagged(&self, tag: &str) -> Result<Vec<Instance>, ContainerError> {
        let services = self
            .inner
            .registry
            .lock()
            .tags
            .get(tag)
            .cloned()
            .ok_or_else(|| ContainerError::UnknownTag(tag.to_string()))?;

        services
            .into_iter()
            .map(|service| self.make_by_key(service, Vec::new()))
            .collect()
    }

    /// 登记一个外部创建的单例实例
    pub fn instance_by_key(&self, service: ServiceKey, instance: Instance) -> Result<Instance, ContainerError> {
        let descriptor = self.descriptor(service);
        let disposal = Disposal::for_instance(&descriptor, &instance);
        self.store(service, instance, disposal)
    }

    pub(crate) fn store(
        &self,
        service: ServiceKey,
        instance: Instance,
        disposal: Option<Disposal>,
    ) -> Result<Instance, ContainerError> {
        self.ensure_not_flushing("instance")?;
        let mut registry = self.inner.registry.lock();
        if let Some(binding) = registry.bindings.get(&service) {
            if !binding.is_static() {
                return Err(ContainerError::NotStaticBinding { service });
            }
        }
        if registry.instances.contains_key(&service) {
            return Err(ContainerError::DuplicateInstance { service });
        }
        registry.sequence += 1;
        let sequence = registry.sequence;
        registry.instances.insert(
            service,
            Cached {
                instance: Arc::clone(&instance),
                disposal,
                sequence,
            },
        );
        Ok(instance)
    }

    /// 释放缓存的单例，返回是否存在
    pub fn release_by_key(&self, service: ServiceKey) -> bool {
        let cached = self.inner.registry.lock().instances.remove(&service);
        match cached {
            Some(cached) => {
                cached.dispose();
                debug!(service = %service, "Released instance");
                true
            }
            None => false,
        }
    }

    /// 重置容器
    ///
    /// 整个注册表在一次加锁内被换出，随后按创建的逆序释放单例。释放钩子
    /// 运行期间的修改操作会返回 `FlushInProgress`；重入的 flush 直接返回。
    pub fn flush(&self) {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            warn!("Flush requested while a flush is running; ignored");
            return;
        }
        let _guard = FlushGuard(&self.inner.flushing);

        let old = {
            let mut registry = self.inner.registry.lock();
            std::mem::replace(&mut *registry, Registry::with_config(&self.inner.config))
        };
        self.inner.building.lock().clear();

        let mut cached: Vec<Cached> = old.instances.into_values().collect();
        cached.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        let disposed = cached.len();
        for entry in cached {
            entry.dispose();
        }

        debug!(
            instances = disposed,
            bindings = old.bindings.len(),
            tags = old.tags.len(),
            "Flushed container"
        );
    }

    /// 解析服务
    pub fn make_by_key(&self, service: ServiceKey, params: Vec<Param>) -> Result<Instance, ContainerError> {
        self.make_within(service, params, None)
    }

    pub(crate) fn cached(&self, service: ServiceKey) -> Option<Instance> {
        self.inner
            .registry
            .lock()
            .instances
            .get(&service)
            .map(|cached| Arc::clone(&cached.instance))
    }

    /// 把服务压入当前线程的构建栈
    ///
    /// 服务已在栈中时返回从最外层到它自身的构建路径。不论重入来自解析器、
    /// 直接持有的容器句柄还是全局入口，同一线程上的自依赖都会在这里被发现。
    pub(crate) fn begin_build(&self, service: ServiceKey) -> Result<BuildGuard<'_>, Vec<ServiceKey>> {
        let thread = thread::current().id();
        let mut building = self.inner.building.lock();
        let stack = building.entry(thread).or_default();
        if stack.contains(&service) {
            let mut chain = stack.clone();
            chain.push(service);
            return Err(chain);
        }
        stack.push(service);
        Ok(BuildGuard {
            building: &self.inner.building,
            thread,
        })
    }

    pub(crate) fn mark_resolved(&self, service: ServiceKey) {
        self.inner.registry.lock().resolved.insert(service);
    }

    pub(crate) fn stats_counters(&self) -> &InnerStats {
        &self.inner.stats
    }

    pub fn get_bind(&self, service: ServiceKey) -> Option<Binding> {
        self.inner.registry.lock().bindings.get(&service).cloned()
    }

    pub fn has_bind_by_key(&self, service: ServiceKey) -> bool {
        self.inner.registry.lock().bindings.contains_key(&service)
    }

    pub fn has_instance_by_key(&self, service: ServiceKey) -> bool {
        self.inner.registry.lock().instances.contains_key(&service)
    }

    /// 自上次 flush 以来是否构建过，或持有缓存实例
    pub fn is_resolved_by_key(&self, service: ServiceKey) -> bool {
        let registry = self.inner.registry.lock();
        registry.resolved.contains(&service) || registry.instances.contains_key(&service)
    }

    pub fn is_static_by_key(&self, service: ServiceKey) -> bool {
        self.inner
            .registry
            .lock()
            .bindings
            .get(&service)
            .map(Binding::is_static)
            .unwrap_or(false)
    }

    /// 已绑定或已缓存时可构建；否则基础类型和不可构建的类型返回 false
    pub fn can_make_by_key(&self, service: ServiceKey) -> bool {
        {
            let registry = self.inner.registry.lock();
            if registry.bindings.contains_key(&service) || registry.instances.contains_key(&service) {
                return true;
            }
        }
        let kind = self.descriptor(service).kind();
        !kind.is_basic() && !kind.is_unconstructible()
    }

    /// 获取统计快照
    pub fn stats(&self) -> ContainerStats {
        let registry = self.inner.registry.lock();
        ContainerStats::collect(
            &self.inner.stats,
            registry.bindings.len(),
            registry.instances.len(),
            registry.tags.len(),
        )
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.load(Ordering::SeqCst)
    }
}
