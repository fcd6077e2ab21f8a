//! 阶段转移
//!
//! ## 职责
//!
//! 把一个档案的磁盘目录和 store 条目从一个阶段搬到另一个阶段。
//! 批量模式逐个转移、单个失败不中断，最后汇总成功/失败清单。
//!
//! 转移分四步顺序执行，步骤之间没有事务保护：
//! 1. 递归复制档案目录到目标阶段
//! 2. 目标 store 写入该档案条目
//! 3. 删除源阶段的档案目录
//! 4. 源 store 删除该档案条目
//!
//! 中途被打断会留下"两边都有"或"目录和条目不一致"的中间态，
//! `verify` 用来检出这类残留，只报告、不自动修复。

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{AppResult, TransitionError};
use crate::models::Stage;
use crate::store::{ProfileMap, ProfileStore};

/// 批量转移的汇总结果
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

/// 半途转移留下的不一致状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionFinding {
    /// 同一档案名出现在两个阶段的 store 中；按生命周期顺序靠前的阶段视为持有者
    DuplicateEntry {
        name: String,
        owner: Stage,
        shadowed: Stage,
    },
    /// store 里有条目但没有对应目录
    EntryWithoutDir { stage: Stage, name: String },
    /// 有目录但 store 里没有条目
    DirWithoutEntry { stage: Stage, name: String },
}

/// 转移单个档案
///
/// 前置条件逐条检查，每条不满足都返回独立的错误：
/// 源 store 文件存在、源档案目录存在、档案名在源 store 中、
/// 目标阶段没有同名目录（或显式允许覆盖）
pub fn move_profile(
    root: &Path,
    name: &str,
    source: Stage,
    dest: Stage,
    overwrite: bool,
) -> AppResult<()> {
    let source_store = ProfileStore::new(root, source);
    let dest_store = ProfileStore::new(root, dest);

    let source_store_path = source_store.store_path();
    if !source_store_path.exists() {
        return Err(TransitionError::SourceStoreMissing {
            path: source_store_path,
        }
        .into());
    }

    let source_dir = source_store.profile_dir(name);
    if !source_dir.exists() {
        return Err(TransitionError::SourceDirMissing { path: source_dir }.into());
    }

    let dest_dir = dest_store.profile_dir(name);
    if dest_dir.exists() {
        if !overwrite {
            return Err(TransitionError::DestOccupied {
                name: name.to_string(),
                stage: dest,
            }
            .into());
        }
        warn!("⚠️ 档案 \"{}\" 已存在于 {}，覆盖旧数据", name, dest);
        fs::remove_dir_all(&dest_dir).map_err(|e| TransitionError::RemoveFailed {
            path: dest_dir.clone(),
            source: e,
        })?;
    }

    let mut source_profiles = source_store.load()?;
    let profile = source_profiles
        .get(name)
        .cloned()
        .ok_or(TransitionError::NotInSourceStore {
            name: name.to_string(),
            stage: source,
        })?;

    info!("📦 正在转移档案: {}", name);
    info!("   从: {}", source);
    info!("   到: {}", dest);

    // 1. 复制档案目录
    copy_dir_recursive(&source_dir, &dest_dir).map_err(|e| TransitionError::CopyFailed {
        path: dest_dir.clone(),
        source: e,
    })?;

    // 2. 写入目标 store
    let mut dest_profiles = dest_store.load()?;
    dest_profiles.insert(name.to_string(), profile);
    dest_store.save(&dest_profiles)?;

    // 3. 删除源目录
    fs::remove_dir_all(&source_dir).map_err(|e| TransitionError::RemoveFailed {
        path: source_dir.clone(),
        source: e,
    })?;

    // 4. 从源 store 删除条目
    source_profiles.remove(name);
    source_store.save(&source_profiles)?;

    info!("✅ 档案 \"{}\" 转移完成", name);
    Ok(())
}

/// 批量转移，逐个执行、失败不中断，返回成功/失败清单
pub fn move_profiles(root: &Path, names: &[String], source: Stage, dest: Stage) -> TransitionOutcome {
    let total = names.len();
    let mut outcome = TransitionOutcome::default();

    info!("🚀 开始批量转移: {} 个档案 ({} → {})", total, source, dest);

    for (i, name) in names.iter().enumerate() {
        info!("[{}/{}] 正在转移 {}...", i + 1, total, name);
        match move_profile(root, name, source, dest, false) {
            Ok(()) => {
                outcome.succeeded.push(name.clone());
            }
            Err(e) => {
                warn!("[{}/{}] ❌ 转移 {} 失败: {}", i + 1, total, name, e);
                outcome.failed.push(name.clone());
            }
        }
    }

    log_outcome(&outcome);
    outcome
}

/// 列出某个阶段的所有档案名，带代理摘要
pub fn list_profiles(root: &Path, stage: Stage) -> AppResult<Vec<String>> {
    let store = ProfileStore::new(root, stage);
    let profiles = store.load()?;

    info!("📋 {} 阶段的档案:", stage);
    for (i, (name, profile)) in profiles.iter().enumerate() {
        match &profile.proxy {
            Some(proxy) => info!("   {}. {} (代理: {})", i + 1, name, proxy.summary()),
            None => info!("   {}. {}", i + 1, name),
        }
    }

    Ok(profiles.keys().cloned().collect())
}

/// 检出残留的中间态：store 双写、目录和条目不一致
///
/// 只检测并报告，不做任何修复；同名双写时按生命周期顺序，
/// 靠前的阶段视为持有者
pub fn verify(root: &Path) -> AppResult<Vec<TransitionFinding>> {
    let mut findings = Vec::new();

    let mut loaded: Vec<(Stage, ProfileMap)> = Vec::new();
    for stage in Stage::ALL {
        let store = ProfileStore::new(root, stage);
        loaded.push((stage, store.load()?));
    }

    // 同一个名字出现在两个阶段的 store 里
    for i in 0..loaded.len() {
        for j in (i + 1)..loaded.len() {
            let (owner, ref owner_map) = loaded[i];
            let (shadowed, ref shadowed_map) = loaded[j];
            for name in owner_map.keys() {
                if shadowed_map.contains_key(name) {
                    warn!(
                        "⚠️ 档案 \"{}\" 同时存在于 {} 和 {} 的 store 中",
                        name, owner, shadowed
                    );
                    findings.push(TransitionFinding::DuplicateEntry {
                        name: name.clone(),
                        owner,
                        shadowed,
                    });
                }
            }
        }
    }

    // 条目和目录的一致性
    for (stage, profiles) in &loaded {
        for name in profiles.keys() {
            if !stage.profile_dir(root, name).exists() {
                warn!("⚠️ {} 阶段的档案 \"{}\" 缺少数据目录", stage, name);
                findings.push(TransitionFinding::EntryWithoutDir {
                    stage: *stage,
                    name: name.clone(),
                });
            }
        }

        let stage_dir = stage.dir(root);
        if stage_dir.exists() {
            for entry in fs::read_dir(&stage_dir).map_err(|e| TransitionError::ScanFailed {
                path: stage_dir.clone(),
                source: e,
            })? {
                let entry = entry.map_err(|e| TransitionError::ScanFailed {
                    path: stage_dir.clone(),
                    source: e,
                })?;
                if !entry.path().is_dir() {
                    continue;
                }
                let dir_name = entry.file_name().to_string_lossy().to_string();
                if !profiles.contains_key(&dir_name) {
                    warn!("⚠️ {} 阶段的目录 \"{}\" 没有对应的 store 条目", stage, dir_name);
                    findings.push(TransitionFinding::DirWithoutEntry {
                        stage: *stage,
                        name: dir_name,
                    });
                }
            }
        }
    }

    if findings.is_empty() {
        info!("✓ 各阶段 store 与目录一致，未发现残留");
    }
    Ok(findings)
}

/// 递归复制目录
fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

// ========== 日志辅助函数 ==========

fn log_outcome(outcome: &TransitionOutcome) {
    info!("{}", "=".repeat(60));
    info!("🎉 批量转移完成!");
    info!("   ✅ 成功: {}", outcome.succeeded.len());
    if !outcome.failed.is_empty() {
        info!("   ❌ 失败: {}", outcome.failed.len());
    }
    info!("{}", "=".repeat(60));
}
