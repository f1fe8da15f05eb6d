//! 全局应用入口
//!
//! 进程内至多一个活动应用。读取时只在克隆 `Arc` 的瞬间持有锁，
//! 因此工厂和提供者钩子可以重新进入 `App`。

use crate::errors::AppError;
use crate::infrastructure::application::Application;
use crate::infrastructure::container::{Binding, ContainerExt, Describe, Instance, Param};
use crate::infrastructure::provider::{BootstrapAgent, Provider};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

lazy_static! {
    static ref ACTIVE: RwLock<Option<Arc<Application>>> = RwLock::new(None);
}

/// 清理全局入口，只有当它持有 `id` 对应的应用时才生效
pub(crate) fn clear_if(id: Uuid) {
    let mut active = ACTIVE.write();
    if active.as_ref().map(|app| app.id()) == Some(id) {
        *active = None;
        tracing::debug!(application = %id, "Global application cleared");
    }
}

/// 全局应用入口
pub struct App;

impl App {
    /// 安装活动应用；已有其他应用时返回 `ApplicationAlreadyActive`
    pub fn set(app: Arc<Application>) -> Result<(), AppError> {
        let mut active = ACTIVE.write();
        if let Some(current) = active.as_ref() {
            if current.id() != app.id() {
                return Err(AppError::ApplicationAlreadyActive(current.id()));
            }
            return Ok(());
        }
        tracing::debug!(application = %app.id(), "Global application installed");
        *active = Some(app);
        Ok(())
    }

    /// 安装、引导并初始化应用
    ///
    /// 任一阶段失败时全局入口会被清理，应用本身保持失败时的状态。
    pub fn launch(app: Arc<Application>, agents: &[Arc<dyn BootstrapAgent>]) -> Result<Arc<Application>, AppError> {
        Self::set(Arc::clone(&app))?;
        let launched = app.bootstrap(agents).and_then(|_| app.init());
        if let Err(error) = launched {
            clear_if(app.id());
            return Err(error);
        }
        Ok(app)
    }

    /// 当前活动应用
    pub fn that() -> Result<Arc<Application>, AppError> {
        ACTIVE.read().clone().ok_or(AppError::NoActiveApplication)
    }

    pub fn is_active() -> bool {
        ACTIVE.read().is_some()
    }

    pub fn bind<T: Describe + Send + Sync>() -> Result<Binding, AppError> {
        Ok(Self::that()?.bind::<T>()?)
    }

    pub fn singleton<T: Describe + Send + Sync>() -> Result<Binding, AppError> {
        Ok(Self::that()?.singleton::<T>()?)
    }

    pub fn bind_contract<S, C, F>(upcast: F) -> Result<Binding, AppError>
    where
        S: Describe + Send + Sync + ?Sized,
        C: Describe + Send + Sync,
        F: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    {
        Ok(Self::that()?.bind_contract::<S, C, F>(upcast)?)
    }

    pub fn singleton_contract<S, C, F>(upcast: F) -> Result<Binding, AppError>
    where
        S: Describe + Send + Sync + ?Sized,
        C: Describe + Send + Sync,
        F: Fn(Arc<C>) -> Arc<S> + Send + Sync + 'static,
    {
        Ok(Self::that()?.singleton_contract::<S, C, F>(upcast)?)
    }

    pub fn unbind<T: Describe + ?Sized>() -> Result<(), AppError> {
        Ok(Self::that()?.unbind::<T>()?)
    }

    pub fn make<T: Describe + Send + Sync>(params: Vec<Param>) -> Result<Arc<T>, AppError> {
        Ok(Self::that()?.make::<T>(params)?)
    }

    pub fn make_contract<S: Describe + Send + Sync + ?Sized>(params: Vec<Param>) -> Result<Arc<S>, AppError> {
        Ok(Self::that()?.make_contract::<S>(params)?)
    }

    pub fn tag<T: Describe + ?Sized>(tag: &str) -> Result<(), AppError> {
        Ok(Self::that()?.tag::<T>(tag)?)
    }

    pub fn tagged(tag: &str) -> Result<Vec<Instance>, AppError> {
        Ok(Self::that()?.tagged(tag)?)
    }

    pub fn release<T: Describe + ?Sized>() -> Result<bool, AppError> {
        Ok(Self::that()?.release::<T>())
    }

    pub fn instance<T: Describe + Send + Sync>(value: T) -> Result<Arc<T>, AppError> {
        Ok(Self::that()?.instance::<T>(value)?)
    }

    pub fn has_bind<T: Describe + ?Sized>() -> Result<bool, AppError> {
        Ok(Self::that()?.has_bind::<T>())
    }

    pub fn can_make<T: Describe + ?Sized>() -> Result<bool, AppError> {
        Ok(Self::that()?.can_make::<T>())
    }

    pub fn register(provider: Arc<dyn Provider>, force: bool) -> Result<(), AppError> {
        Self::that()?.register(provider, force)
    }

    pub fn is_registered<P: Provider + ?Sized>(provider: &Arc<P>) -> Result<bool, AppError> {
        Ok(Self::that()?.is_registered(provider))
    }

    /// 终止活动应用并清理全局入口
    pub fn terminate() -> Result<(), AppError> {
        Self::that()?.terminate()
    }
}
