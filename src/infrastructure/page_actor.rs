//! 页面操作器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS / 点击 / 输入 / 按键"这些能力。
//! 不认识档案和会话流程。每个操作都有自己的超时。

use std::future::Future;
use std::path::Path;

use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use rand::Rng;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, timeout, Duration};
use tracing::debug;

use crate::error::{AppError, AppResult, BrowserError};

/// 页面操作器
pub struct PageActor {
    page: Page,
    action_timeout: Duration,
}

impl PageActor {
    pub fn new(page: Page, action_timeout_secs: f64) -> Self {
        Self {
            page,
            action_timeout: Duration::from_secs_f64(action_timeout_secs),
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 导航到指定地址
    pub async fn goto(&self, url: &str) -> AppResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    /// 点击选择器命中的第一个元素（必做步骤用，超时报错）
    pub async fn click(&self, selector: &str) -> AppResult<()> {
        self.with_timeout(selector, async {
            let element = self.page.find_element(selector).await?;
            element.click().await?;
            Ok(())
        })
        .await
    }

    /// 尝试点击（可选步骤用）：失败只记 debug 日志，返回是否点到
    pub async fn try_click(&self, selector: &str) -> bool {
        match self.click(selector).await {
            Ok(()) => true,
            Err(e) => {
                debug!("可选点击失败 ({}): {}", selector, e);
                false
            }
        }
    }

    /// 逐字输入文本，字符之间随机停顿
    pub async fn type_text(&self, selector: &str, text: &str) -> AppResult<()> {
        let element = self
            .with_timeout(selector, async {
                let element = self.page.find_element(selector).await?;
                element.click().await?;
                Ok(element)
            })
            .await?;

        for ch in text.chars() {
            let mut buf = [0u8; 4];
            element
                .type_str(ch.encode_utf8(&mut buf))
                .await
                .map_err(AppError::from)?;
            let pause = {
                let mut rng = rand::thread_rng();
                rng.gen_range(0.1..0.3)
            };
            sleep(Duration::from_secs_f64(pause)).await;
        }
        Ok(())
    }

    /// 在页面上按键（焦点落在 body 上）
    pub async fn press(&self, key: &str) -> AppResult<()> {
        self.with_timeout(key, async {
            let body = self.page.find_element("body").await?;
            body.press_key(key).await?;
            Ok(())
        })
        .await
    }

    /// 页面滚动
    pub async fn scroll_by(&self, dy: i64) -> AppResult<()> {
        self.eval(format!("window.scrollBy(0, {})", dy)).await?;
        Ok(())
    }

    /// 给文件选择框设置本地文件
    pub async fn set_input_files(&self, selector: &str, path: &Path) -> AppResult<()> {
        let element = self
            .with_timeout(selector, async {
                Ok(self.page.find_element(selector).await?)
            })
            .await?;

        let params = SetFileInputFilesParams::builder()
            .file(path.display().to_string())
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(|message| {
                AppError::Browser(BrowserError::ConfigurationFailed { message })
            })?;
        self.page.execute(params).await?;
        Ok(())
    }

    /// 人类式随机停顿
    pub async fn pause(&self, min_secs: f64, max_secs: f64) {
        let secs = {
            let mut rng = rand::thread_rng();
            rng.gen_range(min_secs..=max_secs)
        };
        sleep(Duration::from_secs_f64(secs)).await;
    }

    async fn with_timeout<T>(
        &self,
        action: &str,
        fut: impl Future<Output = Result<T, CdpError>>,
    ) -> AppResult<T> {
        match timeout(self.action_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(AppError::action_timeout(
                action,
                self.action_timeout.as_secs_f64(),
            )),
        }
    }
}
