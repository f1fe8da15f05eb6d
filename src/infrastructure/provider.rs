//! 服务提供者与引导程序
//!
//! 提供者在引导阶段声明绑定（`register`），在初始化阶段装配运行时对象
//! （`init`）。引导程序负责发现并注册提供者。

use crate::errors::AppError;
use crate::infrastructure::application::Application;
use std::sync::Arc;

/// 服务提供者
pub trait Provider: Send + Sync {
    /// 注册绑定；只在 `Bootstrap` 阶段被调用
    fn register(&self, app: &Application) -> Result<(), AppError>;

    /// 所有提供者注册完成后按注册顺序调用
    fn init(&self, _app: &Application) -> Result<(), AppError> {
        Ok(())
    }

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// 引导程序
pub trait BootstrapAgent: Send + Sync {
    fn bootstrap(&self, app: &Application) -> Result<(), AppError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// 比较两个 `Arc` 是否指向同一个对象（忽略虚表）
pub(crate) fn same_object<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// 按固定顺序注册一组提供者的引导程序，已注册的会被跳过
#[derive(Default)]
pub struct ProviderList {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderList {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl BootstrapAgent for ProviderList {
    fn bootstrap(&self, app: &Application) -> Result<(), AppError> {
        for provider in &self.providers {
            if app.is_registered(provider) {
                tracing::debug!(provider = provider.name(), "Provider already registered; skipped");
                continue;
            }
            app.register(Arc::clone(provider), false)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ProviderList"
    }
}
