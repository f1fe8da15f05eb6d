use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 内部容器统计信息（原子计数器）
#[derive(Default)]
pub(crate) struct InnerStats {
    pub(crate) total_resolutions: AtomicUsize,
    pub(crate) cache_hits: AtomicUsize,
    pub(crate) builds: AtomicUsize,
    pub(crate) circular_dependencies: AtomicUsize,
}

impl InnerStats {
    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 容器统计快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub cache_hits: usize,
    pub builds: usize,
    pub circular_dependencies: usize,
    pub bindings: usize,
    pub instances: usize,
    pub tags: usize,
}

impl ContainerStats {
    pub(crate) fn collect(inner: &InnerStats, bindings: usize, instances: usize, tags: usize) -> Self {
        Self {
            total_resolutions: inner.total_resolutions.load(Ordering::Relaxed),
            cache_hits: inner.cache_hits.load(Ordering::Relaxed),
            builds: inner.builds.load(Ordering::Relaxed),
            circular_dependencies: inner.circular_dependencies.load(Ordering::Relaxed),
            bindings,
            instances,
            tags,
        }
    }

    /// 获取单例缓存命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_resolutions == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_resolutions as f64
        }
    }
}
