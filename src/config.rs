use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 阶段目录的根目录
    pub profiles_root: String,
    /// 本次运行针对的阶段目录名
    pub run_stage: String,
    /// 运行模式: watch / upload / transition
    pub run_mode: String,
    /// 启动多少个档案（0 = 全部）
    pub max_profiles: usize,
    /// 同时运行的档案数量上限
    pub max_parallel: usize,
    /// 同一波内相邻两次启动之间的固定间隔（秒）
    pub stagger_secs: u64,
    /// 两波之间的随机停顿下限（秒）
    pub wave_pause_min_secs: u64,
    /// 两波之间的随机停顿上限（秒）
    pub wave_pause_max_secs: u64,
    /// 单个会话的时长预算（秒，0 = 不限时）
    pub session_duration_secs: u64,
    /// 每个档案的任务条数（upload 模式）
    pub items_per_profile: usize,
    /// 动作循环里随机停顿的下限（秒）
    pub pacing_min_secs: f64,
    /// 动作循环里随机停顿的上限（秒）
    pub pacing_max_secs: f64,
    /// 单个工作单元的超时（秒）
    pub unit_timeout_secs: u64,
    /// 可选微动作的超时（秒）
    pub action_timeout_secs: f64,
    /// 是否无头运行
    pub headless: bool,
    /// Chrome 可执行文件路径（空 = 自动探测）
    pub chrome_executable: String,
    /// 素材视频目录
    pub videos_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- transition 模式参数 ---
    /// 待转移的档案名，逗号分隔（空 = 源阶段全部）
    pub transition_names: String,
    pub transition_source: String,
    pub transition_dest: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles_root: ".".to_string(),
            run_stage: "user_data".to_string(),
            run_mode: "watch".to_string(),
            max_profiles: 0,
            max_parallel: 5,
            stagger_secs: 3,
            wave_pause_min_secs: 10,
            wave_pause_max_secs: 30,
            session_duration_secs: 60,
            items_per_profile: 3,
            pacing_min_secs: 5.0,
            pacing_max_secs: 15.0,
            unit_timeout_secs: 120,
            action_timeout_secs: 3.0,
            headless: false,
            chrome_executable: String::new(),
            videos_dir: "videos".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            transition_names: String::new(),
            transition_source: "user_data".to_string(),
            transition_dest: "upload_profiles".to_string(),
        }
    }
}

/// config.toml 里的可选覆盖项（缺省的字段保持环境变量/默认值）
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    profiles_root: Option<String>,
    run_stage: Option<String>,
    run_mode: Option<String>,
    max_profiles: Option<usize>,
    max_parallel: Option<usize>,
    stagger_secs: Option<u64>,
    wave_pause_min_secs: Option<u64>,
    wave_pause_max_secs: Option<u64>,
    session_duration_secs: Option<u64>,
    items_per_profile: Option<usize>,
    pacing_min_secs: Option<f64>,
    pacing_max_secs: Option<f64>,
    unit_timeout_secs: Option<u64>,
    action_timeout_secs: Option<f64>,
    headless: Option<bool>,
    chrome_executable: Option<String>,
    videos_dir: Option<String>,
    verbose_logging: Option<bool>,
    output_log_file: Option<String>,
    transition_names: Option<String>,
    transition_source: Option<String>,
    transition_dest: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            profiles_root: std::env::var("PROFILES_ROOT").unwrap_or(default.profiles_root),
            run_stage: std::env::var("RUN_STAGE").unwrap_or(default.run_stage),
            run_mode: std::env::var("RUN_MODE").unwrap_or(default.run_mode),
            max_profiles: std::env::var("MAX_PROFILES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_profiles),
            max_parallel: std::env::var("MAX_PARALLEL").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_parallel),
            stagger_secs: std::env::var("STAGGER_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.stagger_secs),
            wave_pause_min_secs: std::env::var("WAVE_PAUSE_MIN_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.wave_pause_min_secs),
            wave_pause_max_secs: std::env::var("WAVE_PAUSE_MAX_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.wave_pause_max_secs),
            session_duration_secs: std::env::var("SESSION_DURATION_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.session_duration_secs),
            items_per_profile: std::env::var("ITEMS_PER_PROFILE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.items_per_profile),
            pacing_min_secs: std::env::var("PACING_MIN_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.pacing_min_secs),
            pacing_max_secs: std::env::var("PACING_MAX_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.pacing_max_secs),
            unit_timeout_secs: std::env::var("UNIT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.unit_timeout_secs),
            action_timeout_secs: std::env::var("ACTION_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.action_timeout_secs),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").unwrap_or(default.chrome_executable),
            videos_dir: std::env::var("VIDEOS_DIR").unwrap_or(default.videos_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            transition_names: std::env::var("TRANSITION_NAMES").unwrap_or(default.transition_names),
            transition_source: std::env::var("TRANSITION_SOURCE").unwrap_or(default.transition_source),
            transition_dest: std::env::var("TRANSITION_DEST").unwrap_or(default.transition_dest),
        }
    }

    /// 先读环境变量，再用 config.toml（如果存在）覆盖
    pub fn load() -> Self {
        let mut config = Self::from_env();
        let path = Path::new("config.toml");
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<ConfigOverlay>(&content) {
                    Ok(overlay) => config.apply_overlay(overlay),
                    Err(e) => warn!("⚠️ config.toml 解析失败，忽略: {}", e),
                },
                Err(e) => warn!("⚠️ 读取 config.toml 失败，忽略: {}", e),
            }
        }
        config
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.profiles_root { self.profiles_root = v; }
        if let Some(v) = overlay.run_stage { self.run_stage = v; }
        if let Some(v) = overlay.run_mode { self.run_mode = v; }
        if let Some(v) = overlay.max_profiles { self.max_profiles = v; }
        if let Some(v) = overlay.max_parallel { self.max_parallel = v; }
        if let Some(v) = overlay.stagger_secs { self.stagger_secs = v; }
        if let Some(v) = overlay.wave_pause_min_secs { self.wave_pause_min_secs = v; }
        if let Some(v) = overlay.wave_pause_max_secs { self.wave_pause_max_secs = v; }
        if let Some(v) = overlay.session_duration_secs { self.session_duration_secs = v; }
        if let Some(v) = overlay.items_per_profile { self.items_per_profile = v; }
        if let Some(v) = overlay.pacing_min_secs { self.pacing_min_secs = v; }
        if let Some(v) = overlay.pacing_max_secs { self.pacing_max_secs = v; }
        if let Some(v) = overlay.unit_timeout_secs { self.unit_timeout_secs = v; }
        if let Some(v) = overlay.action_timeout_secs { self.action_timeout_secs = v; }
        if let Some(v) = overlay.headless { self.headless = v; }
        if let Some(v) = overlay.chrome_executable { self.chrome_executable = v; }
        if let Some(v) = overlay.videos_dir { self.videos_dir = v; }
        if let Some(v) = overlay.verbose_logging { self.verbose_logging = v; }
        if let Some(v) = overlay.output_log_file { self.output_log_file = v; }
        if let Some(v) = overlay.transition_names { self.transition_names = v; }
        if let Some(v) = overlay.transition_source { self.transition_source = v; }
        if let Some(v) = overlay.transition_dest { self.transition_dest = v; }
    }
}
