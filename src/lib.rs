//! # Profile Batch Runner
//!
//! 一个用于批量调度浏览器档案会话的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageActor` - 唯一的 page owner，提供 eval / 点击 / 输入 / 按键能力
//! - `browser/` - 按档案指纹和代理启动持久化浏览器
//! - `lease/` - 档案运行租约，挡住运行期间的并发修改
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能在平台上做什么"，只处理单个会话
//! - `ShortsWatcher` - 养号浏览能力
//! - `VideoUploader` - 投稿能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次会话"的完整流程
//! - `SessionCtx` - 上下文封装（档案名 + 序号 + 阶段）
//! - `SessionFlow` - 状态机编排（导航 → 动作循环 → 收尾）
//! - `SessionStrategy` - 平台策略接口
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_runner` - 批量会话调度器，分波、错峰、统计
//! - `orchestrator/session_runner` - 单个档案会话运行器，保证资源释放
//!
//! 持久化归 `store/`（阶段目录的 profiles.json），档案在阶段之间的
//! 搬迁归 `transition/`。
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod lease;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod transition;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::PageActor;
pub use lease::{IdentityLease, LeaseRegistry};
pub use models::{Fingerprint, Profile, Proxy, Stage};
pub use orchestrator::{run_waves, wave_bounds, App, RunStats, WaveParams};
pub use store::{ProfileMap, ProfileStore};
pub use transition::{move_profile, move_profiles, verify, TransitionFinding, TransitionOutcome};
pub use workflow::{
    SessionBudget, SessionCtx, SessionFlow, SessionOutcome, SessionParams, SessionStrategy,
    WorkItem,
};
