//! 运行租约 - 基础设施层
//!
//! 调度器在启动某个档案前先取得该档案的租约，会话结束（或任务被丢弃）时
//! 租约自动归还。所有会修改档案的操作（如更新代理）先查租约，
//! 持有租约期间的档案拒绝被修改。

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// 租约登记表，可在任务间克隆共享
#[derive(Debug, Clone, Default)]
pub struct LeaseRegistry {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得某个档案的运行租约；档案已在运行时返回 None
    pub fn acquire(&self, name: &str) -> Option<IdentityLease> {
        let mut running = self.inner.lock().expect("lease registry poisoned");
        if running.contains(name) {
            return None;
        }
        running.insert(name.to_string());
        Some(IdentityLease {
            name: name.to_string(),
            registry: Arc::clone(&self.inner),
        })
    }

    /// 档案当前是否持有运行租约
    pub fn is_running(&self, name: &str) -> bool {
        self.inner
            .lock()
            .expect("lease registry poisoned")
            .contains(name)
    }

    /// 当前持有租约的档案数
    pub fn running_count(&self) -> usize {
        self.inner.lock().expect("lease registry poisoned").len()
    }
}

/// 单个档案的运行租约，Drop 时归还
#[derive(Debug)]
pub struct IdentityLease {
    name: String,
    registry: Arc<Mutex<HashSet<String>>>,
}

impl IdentityLease {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for IdentityLease {
    fn drop(&mut self) {
        if let Ok(mut running) = self.registry.lock() {
            running.remove(&self.name);
        }
    }
}
