//! 档案仓库 - 持久化层
//!
//! ## 职责
//!
//! - 把一个阶段目录下的 profiles.json 读成内存映射表
//! - 把整张映射表写回磁盘
//! - 提供创建档案、更新代理、列出档案名几个单点操作
//!
//! 每次变更都整表重写 store 文件；写入中途失败会留下损坏或残缺的文件，
//! 没有备份恢复机制。多个进程同时读写同一个阶段目录时后写者覆盖先写者，
//! 默认同一时刻只有一个调度器或转移操作在碰一个阶段目录。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppError, AppResult, SessionError, StoreError};
use crate::lease::LeaseRegistry;
use crate::models::fingerprint::{self, FingerprintConstraints};
use crate::models::{Profile, Proxy, Stage};

/// 档案名 → 档案配置（BTreeMap 保证列出顺序稳定）
pub type ProfileMap = BTreeMap<String, Profile>;

/// 一个阶段目录的档案仓库
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
    stage: Stage,
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>, stage: Stage) -> Self {
        Self {
            root: root.into(),
            stage,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// store 文件路径
    pub fn store_path(&self) -> PathBuf {
        self.stage.store_path(&self.root)
    }

    /// 某个档案的浏览器数据目录
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.stage.profile_dir(&self.root, name)
    }

    /// 加载整张档案表
    ///
    /// store 文件不存在时返回空表；文件存在但损坏时报
    /// `StoreError::DeserializeFailed`，该阶段的后续操作视为不可用
    pub fn load(&self) -> AppResult<ProfileMap> {
        let path = self.store_path();
        if !path.exists() {
            debug!("store 文件不存在，返回空表: {}", path.display());
            return Ok(ProfileMap::new());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            AppError::Store(StoreError::ReadFailed {
                path: path.clone(),
                source: Box::new(e),
            })
        })?;

        let profiles: ProfileMap = serde_json::from_str(&content).map_err(|e| {
            AppError::Store(StoreError::DeserializeFailed {
                path: path.clone(),
                source: Box::new(e),
            })
        })?;

        debug!(
            "已从 {} 加载 {} 个档案",
            path.display(),
            profiles.len()
        );
        Ok(profiles)
    }

    /// 整表写回 store 文件（直接覆盖，非事务性）
    pub fn save(&self, profiles: &ProfileMap) -> AppResult<()> {
        let path = self.store_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(StoreError::WriteFailed {
                    path: path.clone(),
                    source: Box::new(e),
                })
            })?;
        }

        let content = serde_json::to_string_pretty(profiles).map_err(|e| {
            AppError::Store(StoreError::SerializeFailed {
                source: Box::new(e),
            })
        })?;

        fs::write(&path, content).map_err(|e| {
            AppError::Store(StoreError::WriteFailed {
                path: path.clone(),
                source: Box::new(e),
            })
        })?;

        debug!("已写回 {} 个档案到 {}", profiles.len(), path.display());
        Ok(())
    }

    /// 创建新档案：生成一次指纹并立即落盘
    pub fn create(&self, name: &str, proxy_str: Option<&str>) -> AppResult<Profile> {
        let mut profiles = self.load()?;
        if profiles.contains_key(name) {
            return Err(AppError::Store(StoreError::DuplicateName {
                name: name.to_string(),
            }));
        }

        let proxy = match proxy_str {
            Some(s) => Some(Proxy::parse(s)?),
            None => None,
        };

        let profile = Profile::new(
            fingerprint::generate(&FingerprintConstraints::default()),
            proxy,
        );
        profiles.insert(name.to_string(), profile.clone());
        self.save(&profiles)?;

        info!("✓ 已创建档案 \"{}\" ({} 阶段)", name, self.stage);
        Ok(profile)
    }

    /// 更新档案代理（传 None 清除代理）
    ///
    /// 档案持有运行租约期间拒绝修改
    pub fn update_proxy(
        &self,
        name: &str,
        proxy_str: Option<&str>,
        leases: &LeaseRegistry,
    ) -> AppResult<()> {
        if leases.is_running(name) {
            return Err(AppError::Session(SessionError::AlreadyRunning {
                name: name.to_string(),
            }));
        }

        let mut profiles = self.load()?;
        let profile = profiles
            .get_mut(name)
            .ok_or_else(|| AppError::profile_not_found(name, self.stage))?;

        profile.proxy = match proxy_str {
            Some(s) => Some(Proxy::parse(s)?),
            None => None,
        };
        self.save(&profiles)?;

        info!("✓ 已更新档案 \"{}\" 的代理", name);
        Ok(())
    }

    /// 按顺序列出所有档案名
    pub fn names(&self) -> AppResult<Vec<String>> {
        Ok(self.load()?.keys().cloned().collect())
    }

    /// 覆盖某个档案的上次页面记录（会话收尾时调用，尽力而为）
    pub fn set_last_urls(&self, name: &str, urls: Vec<String>) -> AppResult<()> {
        let mut profiles = self.load()?;
        if let Some(profile) = profiles.get_mut(name) {
            profile.last_urls = urls;
            self.save(&profiles)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
