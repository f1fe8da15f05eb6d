//! 示例应用
//!
//! 两个提供者：`CoreProvider` 注册时钟与问候契约，`ReportProvider` 注册依赖
//! 时钟的报告服务并在初始化阶段使用它。

use bindery::{
    describe_contract, App, AppError, Application, ContainerExt, Contract, Describe, Dispose,
    Provider, Recipe, TypeDescriptor,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 单调递增的逻辑时钟
#[derive(Default)]
pub struct Clock {
    ticks: AtomicU64,
}

impl Clock {
    pub fn tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Dispose for Clock {
    fn dispose(&self) {
        tracing::info!(ticks = self.ticks.load(Ordering::Relaxed), "Clock disposed");
    }
}

impl Describe for Clock {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(Recipe::from_default::<Self>()).disposable::<Self>()
    }
}

pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

describe_contract!(dyn Greeter);

pub struct ConsoleGreeter {
    prefix: String,
}

impl Greeter for ConsoleGreeter {
    fn greet(&self, name: &str) -> String {
        format!("{}, {}", self.prefix, name)
    }
}

impl Describe for ConsoleGreeter {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>()
                .param_or::<String>("prefix", "Hello".to_string())
                .construct(|args| {
                    Ok(ConsoleGreeter {
                        prefix: args.value::<String>()?,
                    })
                }),
        )
    }
}

/// 构造注入问候契约，属性注入时钟
pub struct Reporter {
    greeter: Arc<dyn Greeter>,
    clock: Option<Arc<Clock>>,
}

impl Reporter {
    pub fn report(&self, subject: &str) -> String {
        let tick = self.clock.as_ref().map(|clock| clock.tick()).unwrap_or_default();
        format!("[{}] {}", tick, self.greeter.greet(subject))
    }
}

impl Describe for Reporter {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>()
                .param::<Contract<dyn Greeter>>("greeter")
                .inject::<Clock, _>("clock", |reporter, clock| reporter.clock = Some(clock))
                .construct(|args| {
                    Ok(Reporter {
                        greeter: args.next::<Contract<dyn Greeter>>()?,
                        clock: None,
                    })
                }),
        )
    }
}

pub struct CoreProvider;

impl Provider for CoreProvider {
    fn register(&self, app: &Application) -> Result<(), AppError> {
        app.singleton::<Clock>()?;
        app.singleton_contract::<dyn Greeter, ConsoleGreeter, _>(|greeter| greeter)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "CoreProvider"
    }
}

pub struct ReportProvider;

impl Provider for ReportProvider {
    fn register(&self, app: &Application) -> Result<(), AppError> {
        app.singleton::<Reporter>()?;
        app.tag::<Reporter>("reporters")?;
        Ok(())
    }

    fn init(&self, _app: &Application) -> Result<(), AppError> {
        let line = App::make::<Reporter>(vec![])?.report("bindery");
        tracing::info!(%line, "Reporter ready");
        Ok(())
    }

    fn name(&self) -> &str {
        "ReportProvider"
    }
}

pub fn providers() -> Vec<Arc<dyn Provider>> {
    vec![Arc::new(CoreProvider), Arc::new(ReportProvider)]
}
