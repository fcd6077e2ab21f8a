//! 养号浏览策略 - 业务能力层
//!
//! 像真人一样从 Google 搜进 YouTube Shorts，一条一条往下刷，
//! 小概率点赞、订阅、评论。只处理单个档案的一次会话，不关心批次。

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::infrastructure::PageActor;
use crate::workflow::strategy::{SessionStrategy, WorkItem};
use crate::workflow::SessionCtx;

const COMMENTS: &[&str] = &[
    "👍",
    "🔥🔥🔥",
    "Nice! 😍",
    "💯",
    "Amazing 👏",
    "❤️❤️❤️",
    "😂😂😂",
    "Top! 💪",
    "🥰",
];

/// 养号浏览策略
pub struct ShortsWatcher {
    action_timeout_secs: f64,
}

impl ShortsWatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            action_timeout_secs: config.action_timeout_secs,
        }
    }

    /// 小概率写一条评论，任何一步失败都放弃本次评论
    async fn leave_comment(&self, actor: &PageActor, ctx: &SessionCtx) {
        let comment = {
            let mut rng = rand::thread_rng();
            COMMENTS.choose(&mut rng).copied().unwrap_or("👍")
        };
        info!("{} 💬 写评论: {}", ctx, comment);

        if !actor
            .try_click("button[aria-label*=\"comment\" i], button[aria-label*=\"Comment\"]")
            .await
        {
            return;
        }
        actor.pause(1.0, 2.0).await;

        if !actor.try_click("#simplebox-placeholder").await {
            return;
        }
        actor.pause(0.5, 1.0).await;

        if actor
            .type_text("#contenteditable-root[contenteditable=\"true\"]", comment)
            .await
            .is_err()
        {
            return;
        }
        actor.pause(0.5, 1.5).await;

        if actor
            .try_click("button[aria-label*=\"Comment\"][aria-label*=\"submit\" i], #submit-button")
            .await
        {
            info!("{} ✓ 评论已发送", ctx);
        }
        actor.pause(1.0, 2.0).await;

        // 关掉评论面板，关不掉就按 Esc
        if !actor.try_click("button[aria-label=\"Close\"]").await {
            let _ = actor.press("Escape").await;
        }
        actor.pause(0.5, 1.0).await;
    }
}

#[async_trait]
impl SessionStrategy for ShortsWatcher {
    type Entry = PageActor;

    fn name(&self) -> &'static str {
        "shorts_watch"
    }

    async fn navigate(&self, session: &BrowserSession, ctx: &SessionCtx) -> Result<PageActor> {
        let page = session.new_page().await?;
        let actor = PageActor::new(page, self.action_timeout_secs);

        // 从 Google 搜进去，不直接敲目标地址
        info!("{} 🔍 打开 Google...", ctx);
        actor.goto("https://www.google.com").await?;
        actor.pause(2.0, 4.0).await;

        info!("{} ⌨️ 输入搜索词...", ctx);
        if actor.type_text("textarea[name=\"q\"]", "youtube").await.is_ok() {
            actor.pause(1.0, 2.0).await;
            let _ = actor.press("Enter").await;
            actor.pause(2.0, 4.0).await;

            if !actor.try_click("a[href*=\"youtube.com\"]").await {
                info!("{} ⚠️ 没找到搜索结果链接，直接跳转...", ctx);
                actor.goto("https://www.youtube.com").await?;
            }
        } else {
            actor.goto("https://www.youtube.com").await?;
        }
        actor.pause(3.0, 5.0).await;

        info!("{} 📱 进入 Shorts...", ctx);
        if !actor
            .try_click("a[title=\"Shorts\"], a[href*=\"/shorts\"]")
            .await
        {
            info!("{} ⚠️ 没找到入口按钮，直接跳转...", ctx);
            actor.goto("https://www.youtube.com/shorts").await?;
        }
        actor.pause(2.0, 4.0).await;

        // 点一下页面让键盘事件生效
        let _ = actor.try_click("body").await;
        info!("{} ✅ 已进入 Shorts", ctx);
        Ok(actor)
    }

    async fn perform_unit(
        &self,
        actor: &PageActor,
        item: &WorkItem,
        ctx: &SessionCtx,
    ) -> Result<bool> {
        // 必做步骤：切到下一条；按不动说明本单元做不成
        if actor.press("ArrowDown").await.is_err() {
            return Ok(false);
        }
        info!("{} ⏬ 正在看第 {} 条", ctx, item.index);

        let (roll_back, roll_like, roll_subscribe, roll_comment, roll_scroll, roll_pause) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen::<f64>(),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
            )
        };

        // 偶尔回看上一条
        if roll_back < 0.03 {
            info!("{} ⬆️ 回看上一条", ctx);
            let _ = actor.press("ArrowUp").await;
            actor.pause(3.0, 8.0).await;
        }

        if roll_like < 0.15 {
            if actor.try_click("button[aria-label*=\"like\" i]").await {
                info!("{} ❤️ 点赞", ctx);
                actor.pause(0.5, 1.5).await;
            } else {
                debug!("{} 没点到赞", ctx);
            }
        }

        if roll_subscribe < 0.05 {
            if actor
                .try_click("#subscribe-button button, button[aria-label*=\"Subscribe\"]")
                .await
            {
                info!("{} 🔔 订阅了频道", ctx);
                actor.pause(1.0, 2.0).await;
            }
        }

        if roll_comment < 0.07 {
            self.leave_comment(actor, ctx).await;
        }

        if roll_scroll < 0.05 {
            debug!("{} 💬 翻了翻评论", ctx);
            let _ = actor.scroll_by(300).await;
            actor.pause(2.0, 4.0).await;
            let _ = actor.scroll_by(-300).await;
        }

        if roll_pause < 0.02 {
            let _ = actor.press("Space").await;
            actor.pause(1.0, 3.0).await;
            let _ = actor.press("Space").await;
        }

        Ok(true)
    }

    /// 自然收尾：随机选一种退出方式，避免掐秒停止的痕迹
    async fn drain(&self, actor: &PageActor, ctx: &SessionCtx) -> Result<()> {
        // 先把当前这条看完
        info!("{} 👀 看完最后一条...", ctx);
        actor.pause(5.0, 15.0).await;

        let (choice, extra) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..3u8), rng.gen_range(1..=2usize))
        };

        match choice {
            0 => {
                info!("{} 📱 再多看 {} 条...", ctx, extra);
                for _ in 0..extra {
                    let _ = actor.press("ArrowDown").await;
                    actor.pause(3.0, 8.0).await;
                }
            }
            1 => {
                info!("{} 🏠 回到首页翻一翻...", ctx);
                if actor.try_click("a#logo, yt-icon#logo-icon").await {
                    actor.pause(2.0, 4.0).await;
                    let _ = actor.scroll_by(1000).await;
                    actor.pause(2.0, 5.0).await;
                }
            }
            _ => {
                info!("{} 🚪 直接退出", ctx);
                actor.pause(1.0, 2.0).await;
            }
        }
        Ok(())
    }
}
