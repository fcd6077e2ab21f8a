//! 投稿策略 - 业务能力层
//!
//! 工作队列来自素材目录：每个单元上传一个视频文件。
//! 选文件是必做步骤，失败只废掉当前单元；确认弹窗之类的可选步骤
//! 点不到就跳过。

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::error::{AppError, SessionError};
use crate::infrastructure::PageActor;
use crate::workflow::strategy::{SessionBudget, SessionStrategy, WorkItem};
use crate::workflow::SessionCtx;

/// 投稿策略
pub struct VideoUploader {
    videos_dir: PathBuf,
    action_timeout_secs: f64,
}

impl VideoUploader {
    pub fn new(config: &Config) -> Self {
        Self {
            videos_dir: PathBuf::from(&config.videos_dir).join("youtube"),
            action_timeout_secs: config.action_timeout_secs,
        }
    }

    /// 扫描素材目录下的 mp4 文件
    fn video_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.videos_dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("mp4"))
            .collect()
    }
}

#[async_trait]
impl SessionStrategy for VideoUploader {
    type Entry = PageActor;

    fn name(&self) -> &'static str {
        "video_upload"
    }

    /// 队列 = 随机抽取的素材文件
    async fn build_queue(&self, budget: &SessionBudget) -> Result<Option<VecDeque<WorkItem>>> {
        let mut videos = self.video_files();
        if videos.is_empty() {
            return Err(AppError::Session(SessionError::EmptyWorkQueue {
                detail: format!("{} 里没有 mp4 文件", self.videos_dir.display()),
            })
            .into());
        }

        {
            let mut rng = rand::thread_rng();
            videos.shuffle(&mut rng);
        }
        if let SessionBudget::Items(n) = budget {
            videos.truncate(*n);
        }

        info!("📹 本次会话将上传 {} 个视频", videos.len());
        Ok(Some(
            videos
                .into_iter()
                .enumerate()
                .map(|(i, path)| WorkItem::file(i + 1, path))
                .collect(),
        ))
    }

    async fn navigate(&self, session: &BrowserSession, ctx: &SessionCtx) -> Result<PageActor> {
        let page = session.new_page().await?;
        let actor = PageActor::new(page, self.action_timeout_secs);

        info!("{} 🌐 打开 YouTube...", ctx);
        actor.goto("https://www.youtube.com").await?;
        actor.pause(2.0, 4.0).await;

        info!("{} 🎬 进入创作者后台...", ctx);
        actor.goto("https://studio.youtube.com").await?;
        actor.pause(3.0, 5.0).await;

        Ok(actor)
    }

    async fn perform_unit(
        &self,
        actor: &PageActor,
        item: &WorkItem,
        ctx: &SessionCtx,
    ) -> Result<bool> {
        let Some(path) = &item.path else {
            return Ok(false);
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("{} 📤 上传第 {} 个视频: {}", ctx, item.index, file_name);

        // 必做：打开上传入口
        if !actor.try_click("#create-icon").await {
            warn!("{} ⚠️ 没找到上传入口，放弃本单元", ctx);
            return Ok(false);
        }
        actor.pause(0.5, 1.5).await;
        let _ = actor
            .try_click("tp-yt-paper-item[test-id=\"upload-beta\"]")
            .await;
        actor.pause(1.0, 2.0).await;

        // 必做：选择文件
        if let Err(e) = actor.set_input_files("input[type=\"file\"]", path).await {
            warn!("{} ⚠️ 选择文件失败: {}，放弃本单元", ctx, e);
            let _ = actor.press("Escape").await;
            return Ok(false);
        }
        actor.pause(3.0, 6.0).await;

        // 可选：逐页点"下一步"，弹窗没出现就跳过
        for _ in 0..3 {
            let _ = actor.try_click("#next-button").await;
            actor.pause(1.0, 2.0).await;
        }

        let published = actor.try_click("#done-button").await;
        if published {
            info!("{} ✓ 视频已提交: {}", ctx, file_name);
        } else {
            warn!("{} ⚠️ 未能确认提交: {}", ctx, file_name);
        }
        actor.pause(2.0, 4.0).await;
        Ok(published)
    }
}
