//! 服务容器集成测试

use bindery::{
    describe_contract, params, ContainerConfig, ContainerError, ContainerExt, Contract, Describe,
    Dispose, Recipe, Resolver, ServiceContainer, ServiceKey, TypeDescriptor,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

/// 无依赖的服务
#[derive(Default)]
struct Service1 {
    value: u32,
}

impl Describe for Service1 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(Recipe::from_default::<Self>())
    }
}

/// 属性注入 Service1
#[derive(Default)]
struct Service2 {
    service1: Option<Arc<Service1>>,
}

impl Describe for Service2 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>()
                .inject::<Service1, _>("service1", |this, value| this.service1 = Some(value))
                .construct(|_| Ok(Service2::default())),
        )
    }
}

/// 构造注入：一个依赖、一个带默认值的参数、一个用户参数
struct Worker {
    service1: Arc<Service1>,
    name: String,
    retries: u32,
}

impl Describe for Worker {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>()
                .param::<Service1>("service1")
                .param::<String>("name")
                .param_or::<u32>("retries", 3)
                .construct(|args| {
                    Ok(Worker {
                        service1: args.next::<Service1>()?,
                        name: args.value::<String>()?,
                        retries: args.value::<u32>()?,
                    })
                }),
        )
    }
}

/// 收集剩余参数
struct Collector {
    first: i64,
    rest: usize,
}

impl Describe for Collector {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>()
                .param::<i64>("first")
                .catch_all("rest")
                .construct(|args| {
                    Ok(Collector {
                        first: args.value::<i64>()?,
                        rest: args.rest()?.len(),
                    })
                }),
        )
    }
}

/// A <-> B 循环依赖
struct CycleA;
struct CycleB;

impl Describe for CycleA {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>()
                .param::<CycleB>("b")
                .construct(|args| {
                    args.next::<CycleB>()?;
                    Ok(CycleA)
                }),
        )
    }
}

impl Describe for CycleB {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>()
                .param::<CycleA>("a")
                .construct(|args| {
                    args.next::<CycleA>()?;
                    Ok(CycleB)
                }),
        )
    }
}

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

describe_contract!(dyn Greeter);

#[derive(Default)]
struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

impl Describe for English {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(Recipe::from_default::<Self>())
    }
}

/// 依赖一个未绑定的契约
struct NeedsGreeter;

impl Describe for NeedsGreeter {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>()
                .param::<Contract<dyn Greeter>>("greeter")
                .construct(|_| Ok(NeedsGreeter)),
        )
    }
}

static DISPOSE_LOG: Mutex<Vec<&'static str>> = parking_lot::const_mutex(Vec::new());

macro_rules! disposable {
    ($name:ident) => {
        #[derive(Default)]
        struct $name;

        impl Dispose for $name {
            fn dispose(&self) {
                DISPOSE_LOG.lock().push(stringify!($name));
            }
        }

        impl Describe for $name {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::concrete::<Self>(Recipe::from_default::<Self>()).disposable::<Self>()
            }
        }
    };
}

disposable!(First);
disposable!(Second);

#[test]
fn test_singleton_returns_same_instance() {
    let container = ServiceContainer::new();
    container.singleton::<Service1>().unwrap();

    let a = container.make::<Service1>(params![]).unwrap();
    let b = container.make::<Service1>(params![]).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(container.has_instance::<Service1>());
    assert!(container.is_static::<Service1>());
}

#[test]
fn test_transient_returns_distinct_instances() {
    let container = ServiceContainer::new();
    container.bind::<Service1>().unwrap();

    let a = container.make::<Service1>(params![]).unwrap();
    let b = container.make::<Service1>(params![]).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!container.has_instance::<Service1>());
    assert!(container.is_resolved::<Service1>());
}

#[test]
fn test_release_yields_new_singleton() {
    let container = ServiceContainer::new();
    container.singleton::<Service1>().unwrap();

    let a = container.make::<Service1>(params![]).unwrap();
    assert!(container.release::<Service1>());
    let b = container.make::<Service1>(params![]).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_circular_dependency_unwinds() {
    let container = ServiceContainer::new();

    match container.make::<CycleA>(params![]) {
        Err(ContainerError::CircularDependency { service, chain }) => {
            assert_eq!(service, ServiceKey::of::<CycleA>());
            assert_eq!(chain.len(), 3);
        }
        other => panic!("expected circular dependency, got {:?}", other.err()),
    }

    // 构建路径已完全回退
    assert!(container.make::<Service1>(params![]).is_ok());
    assert_eq!(container.stats().circular_dependencies, 1);
}

#[test]
fn test_duplicate_bind() {
    let container = ServiceContainer::new();
    container.bind::<Service1>().unwrap();
    assert!(matches!(
        container.singleton::<Service1>(),
        Err(ContainerError::DuplicateBinding { .. })
    ));

    container.unbind::<Service1>().unwrap();
    assert!(container.singleton::<Service1>().is_ok());
}

#[test]
fn test_bind_after_instance_is_duplicate() {
    let container = ServiceContainer::new();
    container.instance(Service1 { value: 1 }).unwrap();
    assert!(matches!(
        container.bind::<Service1>(),
        Err(ContainerError::DuplicateBinding { .. })
    ));
}

#[test]
fn test_tagged_preserves_order() {
    let container = ServiceContainer::new();
    container.instance(Service1 { value: 7 }).unwrap();
    container.singleton::<Service2>().unwrap();
    container.tag::<Service2>("group").unwrap();
    container.tag::<Service1>("group").unwrap();
    container.tag::<Service2>("group").unwrap();

    let instances = container.tagged("group").unwrap();
    assert_eq!(instances.len(), 3);
    assert!(instances[0].is::<Service2>());
    assert_eq!(instances[1].downcast_ref::<Service1>().map(|s| s.value), Some(7));
    assert!(Arc::ptr_eq(&instances[0], &instances[2]));

    assert!(matches!(
        container.tagged("missing"),
        Err(ContainerError::UnknownTag(tag)) if tag == "missing"
    ));
}

#[test]
fn test_flush_clears_bindings() {
    let container = ServiceContainer::new();
    container.bind_contract::<dyn Greeter, English, _>(|english| english).unwrap();
    assert_eq!(container.make_contract::<dyn Greeter>(params![]).unwrap().greet(), "hello");

    container.flush();

    assert!(!container.has_bind::<dyn Greeter>());
    assert!(!container.is_resolved::<dyn Greeter>());
    assert!(matches!(
        container.make_contract::<dyn Greeter>(params![]),
        Err(ContainerError::UnconstructibleType { kind: "contract", .. })
    ));

    container.bind_contract::<dyn Greeter, English, _>(|english| english).unwrap();
    assert!(container.make_contract::<dyn Greeter>(params![]).is_ok());
}

#[test]
fn test_property_injection() {
    let container = ServiceContainer::new();
    container.singleton::<Service1>().unwrap();
    container.bind::<Service2>().unwrap();

    let service2 = container.make::<Service2>(params![]).unwrap();
    let injected = service2.service1.as_ref().expect("property injected");
    let service1 = container.make::<Service1>(params![]).unwrap();
    assert!(Arc::ptr_eq(injected, &service1));
}

#[test]
fn test_property_injection_after_factory() {
    let container = ServiceContainer::new();
    container.singleton::<Service1>().unwrap();
    container.bind_fn(Service2::default).unwrap();

    let service2 = container.make::<Service2>(params![]).unwrap();
    assert!(service2.service1.is_some());
}

#[test]
fn test_constructor_parameters() {
    let container = ServiceContainer::new();
    container.singleton::<Service1>().unwrap();

    let worker = container
        .make::<Worker>(params![String::from("alpha")])
        .unwrap();
    assert_eq!(worker.name, "alpha");
    assert_eq!(worker.retries, 3);
    assert!(Arc::ptr_eq(
        &worker.service1,
        &container.make::<Service1>(params![]).unwrap()
    ));

    // 用户参数优先于默认值，且按类型匹配而不是位置
    let worker = container
        .make::<Worker>(params![9u32, String::from("beta")])
        .unwrap();
    assert_eq!(worker.name, "beta");
    assert_eq!(worker.retries, 9);
}

#[test]
fn test_user_parameter_overrides_container() {
    let container = ServiceContainer::new();
    let mine = Arc::new(Service1 { value: 42 });
    let worker = container
        .make::<Worker>(params![Arc::clone(&mine), String::from("gamma")])
        .unwrap();
    assert!(Arc::ptr_eq(&worker.service1, &mine));
}

#[test]
fn test_missing_primitive_parameter() {
    let container = ServiceContainer::new();
    assert!(matches!(
        container.make::<Worker>(params![]),
        Err(ContainerError::UnresolvedDependency { dependency, .. })
            if dependency == ServiceKey::of::<String>()
    ));
}

#[test]
fn test_coercion() {
    let container = ServiceContainer::new();

    let worker = container.make::<Worker>(params!["42", String::from("n")]).unwrap();
    assert_eq!(worker.name, "n");
    assert_eq!(worker.retries, 42);

    let collector = container.make::<Collector>(params![3.5f64]).unwrap();
    assert_eq!(collector.first, 4);
}

#[test]
fn test_catch_all() {
    let container = ServiceContainer::new();
    let collector = container
        .make::<Collector>(params![true, 5i64, "x", 'y'])
        .unwrap();
    assert_eq!(collector.first, 5);
    assert_eq!(collector.rest, 3);

    let collector = container.make::<Collector>(params![1i64]).unwrap();
    assert_eq!(collector.rest, 0);
}

#[test]
fn test_too_many_parameters() {
    let container = ServiceContainer::with_config(ContainerConfig {
        max_user_params: 2,
        ..Default::default()
    });
    assert!(matches!(
        container.make::<Collector>(params![1i64, 2i64, 3i64]),
        Err(ContainerError::TooManyParameters { count: 3, limit: 2, .. })
    ));
}

#[test]
fn test_unbound_contract_dependency() {
    let container = ServiceContainer::new();
    assert!(!container.can_make::<dyn Greeter>());
    assert!(matches!(
        container.make::<NeedsGreeter>(params![]),
        Err(ContainerError::UnresolvedDependency { .. })
    ));
}

#[test]
fn test_contract_singleton_shares_instance() {
    let container = ServiceContainer::new();
    container.singleton_contract::<dyn Greeter, English, _>(|english| english).unwrap();

    let a = container.make_contract::<dyn Greeter>(params![]).unwrap();
    let b = container.make_contract::<dyn Greeter>(params![]).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.greet(), "hello");
}

#[test]
fn test_contract_factory() {
    let container = ServiceContainer::new();
    container
        .bind_contract_factory::<dyn Greeter, English, _, _>(|_, _| Ok(English), |english| english)
        .unwrap();
    assert_eq!(container.make_contract::<dyn Greeter>(params![]).unwrap().greet(), "hello");
}

#[test]
fn test_factory_errors() {
    let container = ServiceContainer::new();
    container
        .bind_factory::<Service1, _>(|_, _| Err("disk on fire".into()))
        .unwrap();
    match container.make::<Service1>(params![]) {
        Err(ContainerError::CreationFailed { reason, .. }) => assert_eq!(reason, "disk on fire"),
        other => panic!("unexpected: {:?}", other.err()),
    }

    // 工厂内部的容器错误原样返回
    container
        .bind_factory::<Service2, _>(|resolver: &Resolver<'_>, _| {
            resolver.make::<CycleA>(params![])?;
            Ok(Service2::default())
        })
        .unwrap();
    assert!(matches!(
        container.make::<Service2>(params![]),
        Err(ContainerError::CircularDependency { .. })
    ));
}

#[test]
fn test_factory_cycle_detection() {
    let container = ServiceContainer::new();
    container
        .bind_factory::<Service1, _>(|resolver: &Resolver<'_>, _| {
            assert_eq!(resolver.path(), vec![ServiceKey::of::<Service1>()]);
            resolver.make::<Service1>(params![])?;
            Ok(Service1::default())
        })
        .unwrap();
    assert!(matches!(
        container.make::<Service1>(params![]),
        Err(ContainerError::CircularDependency { .. })
    ));
}

#[test]
fn test_factory_receives_params() {
    let container = ServiceContainer::new();
    container
        .bind_factory::<Service1, _>(|_, params| {
            let value = params
                .into_iter()
                .find_map(|p| p.downcast::<u32>().ok())
                .map(|v| *v)
                .unwrap_or_default();
            Ok(Service1 { value })
        })
        .unwrap();
    assert_eq!(container.make::<Service1>(params![11u32]).unwrap().value, 11);
}

#[test]
fn test_instance_rules() {
    let container = ServiceContainer::new();
    container.bind::<Service1>().unwrap();
    assert!(matches!(
        container.instance(Service1::default()),
        Err(ContainerError::NotStaticBinding { .. })
    ));

    let container = ServiceContainer::new();
    container.instance(Service1 { value: 1 }).unwrap();
    assert!(matches!(
        container.instance(Service1 { value: 2 }),
        Err(ContainerError::DuplicateInstance { .. })
    ));
    assert_eq!(container.make::<Service1>(params![]).unwrap().value, 1);
}

#[test]
fn test_late_static_bind_caches_immediately() {
    let container = ServiceContainer::new();
    let transient = container.make::<Service1>(params![]).unwrap();
    assert!(container.is_resolved::<Service1>());
    assert!(!container.has_instance::<Service1>());

    container.singleton::<Service1>().unwrap();
    assert!(container.has_instance::<Service1>());

    let cached = container.make::<Service1>(params![]).unwrap();
    assert!(!Arc::ptr_eq(&transient, &cached));
}

#[test]
fn test_primitives_need_binding() {
    let container = ServiceContainer::new();
    assert!(!container.can_make::<u32>());
    assert!(container.make::<u32>(params![]).is_err());

    container.singleton::<u32>().unwrap();
    assert_eq!(*container.make::<u32>(params![]).unwrap(), 0);
}

#[test]
fn test_unconstructible_bind_target() {
    let container = ServiceContainer::new();
    assert!(matches!(
        container.bind::<Option<u8>>(),
        Err(ContainerError::UnconstructibleType { kind: "optional", .. })
    ));
}

#[test]
fn test_flush_disposes_in_reverse_creation_order() {
    let container = ServiceContainer::new();
    container.singleton::<First>().unwrap();
    container.singleton::<Second>().unwrap();
    container.make::<First>(params![]).unwrap();
    container.make::<Second>(params![]).unwrap();

    DISPOSE_LOG.lock().clear();
    container.flush();
    assert_eq!(*DISPOSE_LOG.lock(), vec!["Second", "First"]);
    assert_eq!(container.stats().instances, 0);
}

/// 释放钩子中尝试修改容器
struct Meddler {
    container: ServiceContainer,
    outcome: Arc<Mutex<Option<bool>>>,
}

impl Dispose for Meddler {
    fn dispose(&self) {
        let rejected = matches!(
            self.container.bind::<Service1>(),
            Err(ContainerError::FlushInProgress { operation: "bind" })
        );
        *self.outcome.lock() = Some(rejected);
        // 重入的 flush 直接返回
        self.container.flush();
    }
}

impl Describe for Meddler {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(
            Recipe::builder::<Self>().construct(|args| {
                Err(ContainerError::MissingArgument {
                    service: ServiceKey::of::<Meddler>(),
                    index: args.remaining(),
                    expected: "never built by recipe",
                })
            }),
        )
        .disposable::<Self>()
    }
}

#[test]
fn test_flush_in_progress_from_dispose_hook() {
    let container = ServiceContainer::new();
    let outcome = Arc::new(Mutex::new(None));
    container
        .instance(Meddler {
            container: container.clone(),
            outcome: Arc::clone(&outcome),
        })
        .unwrap();

    container.flush();
    assert_eq!(*outcome.lock(), Some(true));
    assert!(!container.is_flushing());
    assert!(container.bind::<Service1>().is_ok());
}

#[test]
fn test_stats_counters() {
    let container = ServiceContainer::new();
    container.singleton::<Service1>().unwrap();
    container.make::<Service1>(params![]).unwrap();
    container.make::<Service1>(params![]).unwrap();

    let stats = container.stats();
    assert_eq!(stats.total_resolutions, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.builds, 1);
    assert_eq!(stats.bindings, 1);
    assert_eq!(stats.instances, 1);
}

#[test]
fn test_factory_reentrance_counts_builds() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let container = ServiceContainer::new();
    container
        .bind_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Service1::default()
        })
        .unwrap();

    container.make::<Service1>(params![]).unwrap();
    container.make::<Service1>(params![]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

trait Port: Send + Sync {
    fn port(&self) -> u16;
}

describe_contract!(dyn Port);

/// 释放时计数的连接
struct Socket {
    port: u16,
    closed: Arc<AtomicUsize>,
}

impl Port for Socket {
    fn port(&self) -> u16 {
        self.port
    }
}

impl Dispose for Socket {
    fn dispose(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Describe for Socket {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(Recipe::builder::<Self>().construct(|_| {
            Ok(Socket {
                port: 0,
                closed: Arc::new(AtomicUsize::new(0)),
            })
        }))
        .disposable::<Self>()
    }
}

#[test]
fn test_contract_factory_singleton_is_disposed() {
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closed);
    let container = ServiceContainer::new();
    container
        .singleton_contract_factory::<dyn Port, Socket, _, _>(
            move |_, _| {
                Ok(Socket {
                    port: 80,
                    closed: Arc::clone(&counter),
                })
            },
            |socket| socket,
        )
        .unwrap();

    assert_eq!(container.make_contract::<dyn Port>(params![]).unwrap().port(), 80);
    assert!(container.release::<dyn Port>());
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    container.make_contract::<dyn Port>(params![]).unwrap();
    container.flush();
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_contract_instance_is_disposed() {
    let closed = Arc::new(AtomicUsize::new(0));
    let container = ServiceContainer::new();
    let port = container
        .instance_contract::<dyn Port, Socket, _>(
            Socket {
                port: 443,
                closed: Arc::clone(&closed),
            },
            |socket| socket,
        )
        .unwrap();
    assert_eq!(port.port(), 443);
    assert_eq!(container.make_contract::<dyn Port>(params![]).unwrap().port(), 443);

    container.unbind::<dyn Port>().unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert!(!container.has_instance::<dyn Port>());
}

/// 工厂直接通过容器句柄请求自身
#[derive(Default)]
struct Looping {
    reentry_rejected: bool,
}

impl Describe for Looping {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::concrete::<Self>(Recipe::from_default::<Self>())
    }
}

#[test]
fn test_cycle_through_container_handle() {
    let container = ServiceContainer::new();
    let handle = container.clone();
    container
        .bind_fn(move || Looping {
            reentry_rejected: matches!(
                handle.make::<Looping>(params![]),
                Err(ContainerError::CircularDependency { ref chain, .. }) if chain.len() == 2
            ),
        })
        .unwrap();

    assert!(container.make::<Looping>(params![]).unwrap().reentry_rejected);
    assert_eq!(container.stats().circular_dependencies, 1);

    // 构建栈在每次 make 之后都被清空
    assert!(container.make::<Looping>(params![]).unwrap().reentry_rejected);
    assert!(container.make::<Service1>(params![]).is_ok());
    assert_eq!(container.stats().circular_dependencies, 2);
}

#[test]
fn test_parallel_builds_are_not_cycles() {
    let container = ServiceContainer::new();
    let barrier = Arc::new(Barrier::new(2));
    let gate = Arc::clone(&barrier);
    container
        .bind_fn(move || {
            gate.wait();
            Service1::default()
        })
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let container = container.clone();
            thread::spawn(move || container.make::<Service1>(params![]).is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(container.stats().circular_dependencies, 0);
}
