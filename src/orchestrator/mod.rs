//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度和会话生命周期，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_runner` - 批量会话调度器
//! - 管理应用生命周期（初始化、运行、统计）
//! - 把档案切成波（Vec<String> → 每波 ≤ max_parallel）
//! - 错峰启动、波间随机停顿
//! - 发放运行租约
//!
//! ### `session_runner` - 单个档案会话运行器
//! - 读取单个档案的配置
//! - 启动并保证释放浏览器
//! - 委托 workflow::SessionFlow 执行状态机
//! - 回写 last_urls
//!
//! ## 层次关系
//!
//! ```text
//! batch_runner (调度 Vec<档案名>)
//!     ↓
//! session_runner (跑单个档案的一次会话)
//!     ↓
//! workflow::SessionFlow (状态机：导航 → 动作循环 → 收尾)
//!     ↓
//! services (策略层：shorts_watch / video_upload)
//!     ↓
//! infrastructure (基础设施：PageActor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_runner 管批量，session_runner 管单个
//! 2. **故障隔离**：会话之间不共享内存，单个失败不传染
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不碰页面

pub mod batch_runner;
pub mod session_runner;

// 重新导出主要类型
pub use batch_runner::{run_waves, wave_bounds, App, RunStats, WaveParams};
pub use session_runner::run_profile_session;
