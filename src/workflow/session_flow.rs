//! 会话状态机 - 流程层
//!
//! 核心职责：定义一个档案会话的完整流程
//!
//! 状态顺序：
//! 1. 导航（失败对本会话致命）
//! 2. 动作循环：执行工作单元 + 随机停顿，单元失败不终止循环
//! 3. 收尾：时长预算用完后做一个自然的退出动作
//!
//! 不持有任何资源（浏览器），只依赖策略能力

use anyhow::{Context, Result};
use rand::Rng;
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::workflow::session_ctx::SessionCtx;
use crate::workflow::strategy::{
    SessionBudget, SessionOutcome, SessionParams, SessionStrategy, WorkItem,
};

/// 会话状态机
pub struct SessionFlow {
    params: SessionParams,
    verbose_logging: bool,
}

impl SessionFlow {
    /// 从配置创建
    pub fn new(config: &Config) -> Self {
        Self {
            params: SessionParams::from_config(config),
            verbose_logging: config.verbose_logging,
        }
    }

    /// 用指定参数创建
    pub fn with_params(params: SessionParams) -> Self {
        Self {
            params,
            verbose_logging: false,
        }
    }

    /// 跑完整个会话：导航 → 动作循环 → 收尾
    pub async fn run<S: SessionStrategy>(
        &self,
        strategy: &S,
        session: &BrowserSession,
        ctx: &SessionCtx,
    ) -> Result<SessionOutcome> {
        info!("{} 🧭 开始导航 (策略: {})", ctx, strategy.name());
        let entry = strategy
            .navigate(session, ctx)
            .await
            .with_context(|| format!("档案 {} 导航失败", ctx.profile_name))?;
        info!("{} ✓ 导航完成", ctx);

        self.run_action_loop(strategy, &entry, ctx).await
    }

    /// 动作循环 + 收尾
    ///
    /// 终止条件：时长预算用完（转收尾），或有限队列清空。
    /// 单元失败、出错、超时都只记一笔，循环继续。
    pub async fn run_action_loop<S: SessionStrategy>(
        &self,
        strategy: &S,
        entry: &S::Entry,
        ctx: &SessionCtx,
    ) -> Result<SessionOutcome> {
        let started = Instant::now();
        let mut queue = strategy.build_queue(&self.params.budget).await?;
        let mut outcome = SessionOutcome::default();
        let mut unit_index = 0usize;
        let (pace_min, pace_max) = self.params.pacing_secs;

        if let Some(q) = &queue {
            info!("{} 📋 工作队列: {} 个单元", ctx, q.len());
        }
        info!("{} 🔄 进入动作循环 (预算: {:?})", ctx, self.params.budget);

        loop {
            // 每轮开头检查时长预算
            if let SessionBudget::Duration(secs) = self.params.budget {
                if secs > 0 && started.elapsed() >= Duration::from_secs(secs) {
                    info!("{} ⏱️ 时长预算用完，进入收尾", ctx);
                    outcome.drained = true;
                    if let Err(e) = strategy.drain(entry, ctx).await {
                        debug!("{} 收尾动作失败: {}", ctx, e);
                    }
                    break;
                }
            }

            let item = match queue.as_mut() {
                Some(q) => match q.pop_front() {
                    Some(item) => item,
                    None => {
                        info!("{} ✓ 工作队列已清空", ctx);
                        break;
                    }
                },
                None => WorkItem::synthetic(unit_index + 1),
            };
            unit_index += 1;

            let unit_result = timeout(
                Duration::from_secs(self.params.unit_timeout_secs),
                strategy.perform_unit(entry, &item, ctx),
            )
            .await;

            match unit_result {
                Ok(Ok(true)) => {
                    outcome.units_done += 1;
                    if self.verbose_logging {
                        info!("{} ✓ 完成第 {} 个单元", ctx, unit_index);
                    } else {
                        debug!("{} ✓ 完成第 {} 个单元", ctx, unit_index);
                    }
                }
                Ok(Ok(false)) => {
                    outcome.units_failed += 1;
                    warn!("{} ⚠️ 第 {} 个单元未做成，继续下一个", ctx, unit_index);
                }
                Ok(Err(e)) => {
                    outcome.units_failed += 1;
                    error!("{} ❌ 第 {} 个单元出错: {}，继续下一个", ctx, unit_index, e);
                }
                Err(_) => {
                    outcome.units_failed += 1;
                    warn!(
                        "{} ⚠️ 第 {} 个单元超时 ({}s)，继续下一个",
                        ctx, unit_index, self.params.unit_timeout_secs
                    );
                }
            }

            // 单元之间的随机停顿
            let pause = {
                let mut rng = rand::thread_rng();
                rng.gen_range(pace_min..=pace_max)
            };
            debug!("{} ⏸️ 停顿 {:.1}s", ctx, pause);
            sleep(Duration::from_secs_f64(pause)).await;
        }

        info!(
            "{} 单元统计: 完成 {}, 失败 {}",
            ctx, outcome.units_done, outcome.units_failed
        );
        Ok(outcome)
    }
}
