//! 批量会话调度器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量档案的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、打印启动横幅
//! 2. **分波处理**：把档案按并发上限切成一波一波，按输入顺序启动
//! 3. **错峰启动**：同一波内相邻两次启动之间隔固定秒数
//! 4. **波间停顿**：两波之间随机停顿（最后一波之后不停）
//! 5. **故障隔离**：单个档案崩了只记一笔，不影响同波和后面的波
//! 6. **全局统计**：汇总所有会话的成功/失败数量
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个会话的细节，向下委托 session_runner
//! - **租约先行**：启动前先取档案的运行租约，会话结束自动归还
//! - **并发安全**：通过 Semaphore 和 tokio::spawn 实现并发

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::lease::LeaseRegistry;
use crate::models::Stage;
use crate::orchestrator::session_runner;
use crate::services::{ShortsWatcher, VideoUploader};
use crate::store::ProfileStore;
use crate::transition;
use crate::workflow::{SessionCtx, SessionOutcome, SessionStrategy};

/// 分波参数
#[derive(Debug, Clone)]
pub struct WaveParams {
    /// 同时运行的会话数量上限
    pub max_parallel: usize,
    /// 同一波内相邻启动之间的固定间隔（秒）
    pub stagger_secs: u64,
    /// 两波之间随机停顿的上下限（秒）
    pub wave_pause_secs: (u64, u64),
}

impl WaveParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_parallel: config.max_parallel,
            stagger_secs: config.stagger_secs,
            wave_pause_secs: (config.wave_pause_min_secs, config.wave_pause_max_secs),
        }
    }
}

/// 调度统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub waves: usize,
}

/// 应用主结构
pub struct App {
    config: Config,
    leases: LeaseRegistry,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        Ok(Self {
            config,
            leases: LeaseRegistry::new(),
        })
    }

    /// 按运行模式分发
    pub async fn run(&self) -> Result<()> {
        match self.config.run_mode.as_str() {
            "watch" => {
                let strategy = Arc::new(ShortsWatcher::new(&self.config));
                self.run_sessions(strategy).await
            }
            "upload" => {
                let strategy = Arc::new(VideoUploader::new(&self.config));
                self.run_sessions(strategy).await
            }
            "transition" => self.run_transitions(),
            other => anyhow::bail!("未知的运行模式: {}", other),
        }
    }

    /// 对配置指定的阶段跑一轮批量会话
    async fn run_sessions<S>(&self, strategy: Arc<S>) -> Result<()>
    where
        S: SessionStrategy + 'static,
    {
        let stage = Stage::parse(&self.config.run_stage)?;
        let store = ProfileStore::new(&self.config.profiles_root, stage);

        let mut names = store.names()?;
        if names.is_empty() {
            warn!("⚠️ {} 阶段没有档案，程序结束", stage);
            return Ok(());
        }
        if self.config.max_profiles > 0 && names.len() > self.config.max_profiles {
            names.truncate(self.config.max_profiles);
        }

        log_profiles_loaded(names.len(), self.config.max_parallel);

        let params = WaveParams::from_config(&self.config);
        let config = self.config.clone();
        let runner = move |ctx: SessionCtx| {
            let config = config.clone();
            let strategy = Arc::clone(&strategy);
            async move { session_runner::run_profile_session(&config, strategy.as_ref(), &ctx).await }
        };

        let stats = run_waves(&names, stage, &params, &self.leases, runner).await?;
        print_final_stats(&stats, &self.config);
        Ok(())
    }

    /// transition 模式：按配置批量转移档案并校验残留
    fn run_transitions(&self) -> Result<()> {
        let root = Path::new(&self.config.profiles_root);
        let source = Stage::parse(&self.config.transition_source)?;
        let dest = Stage::parse(&self.config.transition_dest)?;

        let names: Vec<String> = if self.config.transition_names.trim().is_empty() {
            transition::list_profiles(root, source)?
        } else {
            self.config
                .transition_names
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        if names.is_empty() {
            warn!("⚠️ 没有待转移的档案，程序结束");
            return Ok(());
        }

        let outcome = transition::move_profiles(root, &names, source, dest);
        if !outcome.failed.is_empty() {
            warn!("⚠️ 转移失败的档案: {}", outcome.failed.join(", "));
        }

        let findings = transition::verify(root)?;
        if !findings.is_empty() {
            warn!("⚠️ 检测到 {} 处阶段残留，请人工处理", findings.len());
        }
        Ok(())
    }
}

/// 把总数切成波，返回每一波的 [start, end) 区间，保持输入顺序
pub fn wave_bounds(total: usize, per_wave: usize) -> Vec<(usize, usize)> {
    if total == 0 || per_wave == 0 {
        return Vec::new();
    }
    (0..total)
        .step_by(per_wave)
        .map(|start| (start, (start + per_wave).min(total)))
        .collect()
}

/// 分波跑完所有档案
///
/// 每个档案一个独立任务；上一波全部结束前下一波不启动；
/// 单个档案出错或崩溃只记入失败数
pub async fn run_waves<F, Fut>(
    names: &[String],
    stage: Stage,
    params: &WaveParams,
    leases: &LeaseRegistry,
    runner: F,
) -> Result<RunStats>
where
    F: Fn(SessionCtx) -> Fut,
    Fut: Future<Output = Result<SessionOutcome>> + Send + 'static,
{
    let total = names.len();
    let semaphore = Arc::new(Semaphore::new(params.max_parallel.max(1)));
    let bounds = wave_bounds(total, params.max_parallel);
    let mut stats = RunStats {
        total,
        waves: bounds.len(),
        ..Default::default()
    };

    for (wave_idx, (start, end)) in bounds.iter().copied().enumerate() {
        let wave_num = wave_idx + 1;
        log_wave_start(wave_num, bounds.len(), start + 1, end, total);

        let mut handles = Vec::new();
        for (offset, name) in names[start..end].iter().enumerate() {
            // 错峰启动，避免同时拉起一排浏览器
            if offset > 0 && params.stagger_secs > 0 {
                sleep(Duration::from_secs(params.stagger_secs)).await;
            }

            let permit = semaphore.clone().acquire_owned().await?;
            let lease = match leases.acquire(name) {
                Some(lease) => lease,
                None => {
                    warn!("⚠️ 档案 \"{}\" 已在运行，跳过", name);
                    stats.failed += 1;
                    continue;
                }
            };

            let ctx = SessionCtx::new(name.clone(), start + offset + 1, total, stage);
            info!("{} 🚀 启动会话...", ctx);

            let fut = runner(ctx.clone());
            let handle = tokio::spawn(async move {
                let _permit = permit;
                let _lease = lease;
                fut.await
            });
            handles.push((ctx, handle));
        }

        // 等待本波所有会话结束
        let mut wave_success = 0usize;
        let mut wave_failed = 0usize;
        for (ctx, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => {
                    wave_success += 1;
                    debug!(
                        "{} 单元 {} 成 / {} 败",
                        ctx, outcome.units_done, outcome.units_failed
                    );
                }
                Ok(Err(e)) => {
                    error!("{} ❌ 会话出错: {}", ctx, e);
                    wave_failed += 1;
                }
                Err(e) => {
                    error!("{} 任务执行失败: {}", ctx, e);
                    wave_failed += 1;
                }
            }
        }
        stats.success += wave_success;
        stats.failed += wave_failed;
        log_wave_complete(wave_num, wave_success, wave_success + wave_failed);

        // 两波之间的随机停顿（最后一波之后不停）
        if wave_num < bounds.len() {
            let (pause_min, pause_max) = params.wave_pause_secs;
            let pause = {
                let mut rng = rand::thread_rng();
                rng.gen_range(pause_min..=pause_max.max(pause_min))
            };
            info!("⏸️ 波间停顿 {} 秒...", pause);
            sleep(Duration::from_secs(pause)).await;
        }
    }

    Ok(stats)
}

// ========== 日志辅助函数 ==========

fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量会话日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    std::fs::write(log_file_path, log_header)?;
    Ok(())
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量档案调度模式 ({})", config.run_mode);
    info!("📊 最大并发数: {}", config.max_parallel);
    info!("{}", "=".repeat(60));
}

fn log_profiles_loaded(total: usize, max_parallel: usize) {
    info!("✓ 找到 {} 个待运行的档案", total);
    info!("📋 将以每波 {} 个的方式启动", max_parallel);
    info!("💡 每波全部结束后再开始下一波\n");
}

fn log_wave_start(wave_num: usize, total_waves: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始第 {}/{} 波", wave_num, total_waves);
    info!("👤 本波档案: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

fn log_wave_complete(wave_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 波结束: 成功 {}/{}", wave_num, success, total);
    info!("{}", "─".repeat(60));
}

fn print_final_stats(stats: &RunStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部会话完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}", stats.failed);
    info!("🌊 波数: {}", stats.waves);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", config.output_log_file);
}
