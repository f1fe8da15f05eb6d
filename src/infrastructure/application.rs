//! 应用生命周期
//!
//! `Application` 在一个服务容器之上实现严格的启动流程：
//! `Construct → Bootstrap → Init → Running → Terminate → Terminated`，
//! 状态只会向前推进。

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::infrastructure::container::{ContainerExt, ServiceContainer};
use crate::infrastructure::facade;
use crate::infrastructure::provider::{same_object, BootstrapAgent, Provider};
use crate::logging::OperationTimer;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// 应用生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Lifecycle {
    Construct,
    Bootstrap,
    Init,
    Running,
    Terminate,
    Terminated,
}

/// 应用
pub struct Application {
    id: Uuid,
    container: ServiceContainer,
    config: AppConfig,
    state: RwLock<Lifecycle>,
    providers: Mutex<Vec<Arc<dyn Provider>>>,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let id = Uuid::new_v4();
        let container = ServiceContainer::with_config(config.container.clone());
        info!(application = %id, "Application constructed");
        Self {
            id,
            container,
            config,
            state: RwLock::new(Lifecycle::Construct),
            providers: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> Lifecycle {
        *self.state.read()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 已注册的提供者数量
    pub fn providers(&self) -> usize {
        self.providers.lock().len()
    }

    fn expect_state(&self, operation: &'static str, expected: Lifecycle) -> Result<(), AppError> {
        let state = self.state();
        if state != expected {
            return Err(AppError::InvalidLifecycleState { operation, state });
        }
        Ok(())
    }

    fn transition(&self, next: Lifecycle) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        info!(application = %self.id, from = ?previous, to = ?next, "Lifecycle transition");
    }

    /// 运行引导程序
    ///
    /// 同一个引导程序（按 `Arc` 身份）在一次调用中出现两次时返回
    /// `DuplicateBootstrapAgent`，此前的引导程序已经执行。
    pub fn bootstrap(&self, agents: &[Arc<dyn BootstrapAgent>]) -> Result<(), AppError> {
        self.expect_state("bootstrap", Lifecycle::Construct)?;
        self.transition(Lifecycle::Bootstrap);

        let timer = OperationTimer::new("bootstrap").for_application(self.id);
        let mut seen: Vec<&Arc<dyn BootstrapAgent>> = Vec::with_capacity(agents.len());
        for agent in agents {
            if seen.iter().any(|other| same_object(*other, agent)) {
                return Err(AppError::DuplicateBootstrapAgent(agent.name().to_string()));
            }
            seen.push(agent);
            agent.bootstrap(self)?;
        }
        timer.finish();
        Ok(())
    }

    /// 注册服务提供者
    ///
    /// 已注册时默认忽略；`force` 为真时移除后重新执行 `register` 并追加到末尾。
    pub fn register(&self, provider: Arc<dyn Provider>, force: bool) -> Result<(), AppError> {
        self.expect_state("register", Lifecycle::Bootstrap)?;

        if self.is_registered(&provider) {
            if !force {
                warn!(provider = provider.name(), "Provider already registered; ignored");
                return Ok(());
            }
            self.providers.lock().retain(|other| !same_object(other, &provider));
        }

        provider.register(self)?;
        info!(application = %self.id, provider = provider.name(), force, "Provider registered");
        self.providers.lock().push(provider);
        Ok(())
    }

    /// 按注册顺序初始化所有提供者
    pub fn init(&self) -> Result<(), AppError> {
        self.expect_state("init", Lifecycle::Bootstrap)?;
        self.transition(Lifecycle::Init);

        let timer = OperationTimer::new("init").for_application(self.id);
        let providers: Vec<Arc<dyn Provider>> = self.providers.lock().clone();
        for provider in &providers {
            provider.init(self)?;
        }
        timer.finish();

        self.transition(Lifecycle::Running);
        Ok(())
    }

    /// 终止应用：重置容器并清理全局入口
    pub fn terminate(&self) -> Result<(), AppError> {
        let state = self.state();
        if state >= Lifecycle::Terminate {
            return Err(AppError::InvalidLifecycleState {
                operation: "terminate",
                state,
            });
        }
        self.transition(Lifecycle::Terminate);
        self.container.flush();
        facade::clear_if(self.id);
        self.transition(Lifecycle::Terminated);
        Ok(())
    }

    pub fn is_registered<P: Provider + ?Sized>(&self, provider: &Arc<P>) -> bool {
        self.providers
            .lock()
            .iter()
            .any(|other| same_object(other, provider))
    }
}

impl ContainerExt for Application {
    fn container(&self) -> &ServiceContainer {
        &self.container
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("providers", &self.providers())
            .finish()
    }
}
