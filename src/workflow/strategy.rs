//! 会话策略接口 - 流程层
//!
//! 会话状态机消费的能力：导航到目标平台、执行一个工作单元、收尾。
//! 具体平台脚本在 services 层实现，状态机不依赖任何自动化库的具体类型。

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::workflow::session_ctx::SessionCtx;

/// 一个工作单元（一次上传、一轮脚本交互）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 单元序号（从1开始）
    pub index: usize,
    /// 关联的素材文件（没有素材的单元为 None）
    pub path: Option<PathBuf>,
}

impl WorkItem {
    /// 无素材的合成单元
    pub fn synthetic(index: usize) -> Self {
        Self { index, path: None }
    }

    /// 绑定素材文件的单元
    pub fn file(index: usize, path: PathBuf) -> Self {
        Self {
            index,
            path: Some(path),
        }
    }
}

/// 会话预算：跑多久或者干几件事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBudget {
    /// 时长预算，秒（0 = 不限时）
    Duration(u64),
    /// 工作单元条数预算
    Items(usize),
}

/// 会话参数
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub budget: SessionBudget,
    /// 工作单元之间随机停顿的上下限（秒）
    pub pacing_secs: (f64, f64),
    /// 单个工作单元的超时（秒）
    pub unit_timeout_secs: u64,
}

impl SessionParams {
    /// 按运行模式从配置推导参数：watch 用时长预算，其余用条数预算
    pub fn from_config(config: &Config) -> Self {
        let budget = if config.run_mode == "upload" {
            SessionBudget::Items(config.items_per_profile)
        } else {
            SessionBudget::Duration(config.session_duration_secs)
        };
        Self {
            budget,
            pacing_secs: (config.pacing_min_secs, config.pacing_max_secs),
            unit_timeout_secs: config.unit_timeout_secs,
        }
    }
}

/// 一次会话的结果统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// 完成的工作单元数
    pub units_done: usize,
    /// 失败（或超时）的工作单元数
    pub units_failed: usize,
    /// 是否因时长预算用完而收尾
    pub drained: bool,
}

/// 会话策略：状态机消费的导航与动作能力
#[async_trait]
pub trait SessionStrategy: Send + Sync {
    /// 导航产出的入口句柄类型
    type Entry: Send + Sync;

    /// 策略名（用于日志）
    fn name(&self) -> &'static str;

    /// 导航到目标平台；失败对本会话致命
    async fn navigate(&self, session: &BrowserSession, ctx: &SessionCtx) -> Result<Self::Entry>;

    /// 准备工作队列
    ///
    /// 返回 None 表示无限队列（由时长预算决定何时停）；
    /// 默认实现：条数预算给 N 个合成单元，时长预算给无限队列
    async fn build_queue(&self, budget: &SessionBudget) -> Result<Option<VecDeque<WorkItem>>> {
        Ok(match budget {
            SessionBudget::Items(n) => Some((1..=*n).map(WorkItem::synthetic).collect()),
            SessionBudget::Duration(_) => None,
        })
    }

    /// 执行一个工作单元
    ///
    /// 返回 Ok(false) 表示本单元没做成但会话继续；Err 同样不终止循环
    async fn perform_unit(
        &self,
        entry: &Self::Entry,
        item: &WorkItem,
        ctx: &SessionCtx,
    ) -> Result<bool>;

    /// 时长预算用完后的自然收尾动作，默认什么都不做
    async fn drain(&self, entry: &Self::Entry, ctx: &SessionCtx) -> Result<()> {
        let _ = (entry, ctx);
        Ok(())
    }
}
