//! 生命周期阶段
//!
//! 每个阶段对应磁盘上的一个目录：目录里有一个 profiles.json（store 文件）
//! 和每个档案各自的浏览器数据子目录

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ConfigError};

/// store 文件名（阶段目录下的序列化档案表）
pub const STORE_FILE_NAME: &str = "profiles.json";

/// 档案的生命周期阶段，按养成顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// 养号期
    Warmup,
    /// 投稿期
    Upload,
    /// 装修期
    Design,
    /// 活跃期
    Active,
}

impl Stage {
    /// 全部阶段，按生命周期顺序
    pub const ALL: [Stage; 4] = [Stage::Warmup, Stage::Upload, Stage::Design, Stage::Active];

    /// 阶段目录名
    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::Warmup => "user_data",
            Stage::Upload => "upload_profiles",
            Stage::Design => "design_profiles",
            Stage::Active => "active_profiles",
        }
    }

    /// 阶段中文名（用于日志）
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Warmup => "养号",
            Stage::Upload => "投稿",
            Stage::Design => "装修",
            Stage::Active => "活跃",
        }
    }

    /// 阶段目录的完整路径
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(self.dir_name())
    }

    /// store 文件的完整路径
    pub fn store_path(&self, root: &Path) -> PathBuf {
        self.dir(root).join(STORE_FILE_NAME)
    }

    /// 某个档案的浏览器数据目录
    pub fn profile_dir(&self, root: &Path, name: &str) -> PathBuf {
        self.dir(root).join(name)
    }

    /// 从目录名解析阶段
    pub fn parse(value: &str) -> Result<Stage, AppError> {
        Stage::ALL
            .iter()
            .copied()
            .find(|s| s.dir_name() == value)
            .ok_or_else(|| {
                AppError::Config(ConfigError::UnknownStage {
                    value: value.to_string(),
                })
            })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label(), self.dir_name())
    }
}
