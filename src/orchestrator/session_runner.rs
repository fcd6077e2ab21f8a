//! 单个档案会话运行器 - 编排层
//!
//! ## 职责
//!
//! 跑完一个档案的一次会话：
//! 1. **读取档案**：从阶段 store 加载配置，名字不存在对本档案致命
//! 2. **启动浏览器**：带指纹、代理和该档案的数据目录
//! 3. **委托流程**：交给 SessionFlow 执行导航 → 动作循环 → 收尾
//! 4. **保证释放**：无论流程成败，浏览器都会关闭
//! 5. **回写状态**：把会话结束时打开的页面记回 store

use anyhow::Result;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::AppError;
use crate::store::ProfileStore;
use crate::workflow::{SessionCtx, SessionFlow, SessionOutcome, SessionStrategy};

/// 运行单个档案的会话
///
/// 这里的错误只代表"这一个档案没跑成"，调度器记一笔后继续跑别的档案
pub async fn run_profile_session<S: SessionStrategy>(
    config: &Config,
    strategy: &S,
    ctx: &SessionCtx,
) -> Result<SessionOutcome> {
    let name = &ctx.profile_name;
    let store = ProfileStore::new(&config.profiles_root, ctx.stage);

    // 读取档案配置
    let profiles = store.load()?;
    let profile = profiles
        .get(name)
        .cloned()
        .ok_or_else(|| AppError::profile_not_found(name, ctx.stage))?;

    // 启动浏览器
    let session = browser::launch_profile_context(config, ctx.stage, name, &profile).await?;

    // 跑流程；结果先留着，释放完浏览器再处理
    let flow = SessionFlow::new(config);
    let result = flow.run(strategy, &session, ctx).await;

    // 无论成败都收集页面并释放浏览器
    let last_urls = session.open_urls().await;
    session.shutdown().await;

    if let Err(e) = store.set_last_urls(name, last_urls) {
        warn!("{} ⚠️ 回写页面记录失败: {}", ctx, e);
    }

    match &result {
        Ok(outcome) => {
            info!(
                "{} ✅ 会话完成: 单元 {} 成 / {} 败",
                ctx, outcome.units_done, outcome.units_failed
            );
        }
        Err(e) => {
            error!("{} ❌ 会话失败: {}", ctx, e);
        }
    }
    result
}
