use std::fmt;
use std::path::PathBuf;

use crate::models::stage::Stage;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 档案仓库错误
    Store(StoreError),
    /// 阶段转移错误
    Transition(TransitionError),
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 会话运行错误
    Session(SessionError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Store(e) => write!(f, "仓库错误: {}", e),
            AppError::Transition(e) => write!(f, "转移错误: {}", e),
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Session(e) => write!(f, "会话错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Store(e) => Some(e),
            AppError::Transition(e) => Some(e),
            AppError::Browser(e) => Some(e),
            AppError::Session(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 档案仓库错误
#[derive(Debug)]
pub enum StoreError {
    /// 读取 store 文件失败
    ReadFailed {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入 store 文件失败
    WriteFailed {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// store 文件损坏，反序列化失败（该阶段视为致命错误）
    DeserializeFailed {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 序列化失败
    SerializeFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 档案名已存在
    DuplicateName {
        name: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ReadFailed { path, source } => {
                write!(f, "读取 store 文件失败 ({}): {}", path.display(), source)
            }
            StoreError::WriteFailed { path, source } => {
                write!(f, "写入 store 文件失败 ({}): {}", path.display(), source)
            }
            StoreError::DeserializeFailed { path, source } => {
                write!(f, "store 文件损坏 ({}): {}", path.display(), source)
            }
            StoreError::SerializeFailed { source } => {
                write!(f, "序列化失败: {}", source)
            }
            StoreError::DuplicateName { name } => {
                write!(f, "档案 \"{}\" 已存在", name)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::ReadFailed { source, .. }
            | StoreError::WriteFailed { source, .. }
            | StoreError::DeserializeFailed { source, .. }
            | StoreError::SerializeFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            StoreError::DuplicateName { .. } => None,
        }
    }
}

/// 阶段转移错误
///
/// 每个前置条件不满足都对应一个独立的错误变体，便于逐条上报
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("源阶段 store 文件不存在: {path}")]
    SourceStoreMissing { path: PathBuf },

    #[error("源阶段中没有档案目录: {path}")]
    SourceDirMissing { path: PathBuf },

    #[error("档案 \"{name}\" 不在 {stage} 阶段的 store 中")]
    NotInSourceStore { name: String, stage: Stage },

    #[error("{stage} 阶段已存在同名档案 \"{name}\"（未允许覆盖）")]
    DestOccupied { name: String, stage: Stage },

    #[error("复制档案目录失败 ({path}): {source}")]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("删除档案目录失败 ({path}): {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("扫描阶段目录失败 ({path}): {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 浏览器配置失败
    ConfigurationFailed {
        message: String,
    },
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 页面操作超时
    ActionTimeout {
        action: String,
        secs: f64,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ConfigurationFailed { message } => {
                write!(f, "浏览器配置失败: {}", message)
            }
            BrowserError::LaunchFailed { source } => {
                write!(f, "启动浏览器失败: {}", source)
            }
            BrowserError::PageCreationFailed { source } => {
                write!(f, "创建页面失败: {}", source)
            }
            BrowserError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            BrowserError::ActionTimeout { action, secs } => {
                write!(f, "页面操作超时 ({}): {:.1}s", action, secs)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::PageCreationFailed { source }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 会话运行错误（只对单个档案致命，不影响同批其他档案）
#[derive(Debug)]
pub enum SessionError {
    /// store 中没有该档案
    ProfileNotFound {
        name: String,
        stage: Stage,
    },
    /// 档案正在运行，拒绝并发操作
    AlreadyRunning {
        name: String,
    },
    /// 工作队列为空
    EmptyWorkQueue {
        detail: String,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ProfileNotFound { name, stage } => {
                write!(f, "档案 \"{}\" 不在 {} 阶段的 store 中", name, stage)
            }
            SessionError::AlreadyRunning { name } => {
                write!(f, "档案 \"{}\" 正在运行中", name)
            }
            SessionError::EmptyWorkQueue { detail } => {
                write!(f, "工作队列为空: {}", detail)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 代理字符串格式错误
    InvalidProxyFormat {
        value: String,
    },
    /// socks5 代理不支持账号密码认证
    Socks5AuthUnsupported {
        value: String,
    },
    /// 未知的阶段名
    UnknownStage {
        value: String,
    },
    /// 配置文件解析失败
    FileParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidProxyFormat { value } => {
                write!(
                    f,
                    "代理格式错误: \"{}\"，应为 protocol:host:port 或 protocol:host:port:user:pass",
                    value
                )
            }
            ConfigError::Socks5AuthUnsupported { value } => {
                write!(f, "socks5 代理不支持账号密码认证: \"{}\"", value)
            }
            ConfigError::UnknownStage { value } => {
                write!(f, "未知的阶段名: \"{}\"", value)
            }
            ConfigError::FileParseFailed { path, source } => {
                write!(f, "配置文件解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::Transition(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Store(StoreError::ReadFailed {
            path: PathBuf::new(),
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(StoreError::SerializeFailed {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器启动错误
    pub fn launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建页面操作超时错误
    pub fn action_timeout(action: impl Into<String>, secs: f64) -> Self {
        AppError::Browser(BrowserError::ActionTimeout {
            action: action.into(),
            secs,
        })
    }

    /// 创建档案缺失错误
    pub fn profile_not_found(name: impl Into<String>, stage: Stage) -> Self {
        AppError::Session(SessionError::ProfileNotFound {
            name: name.into(),
            stage,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = std::result::Result<T, AppError>;
