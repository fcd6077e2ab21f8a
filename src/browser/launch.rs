//! 浏览器启动
//!
//! 用档案自己的指纹、代理和数据目录启动一个持久化浏览器实例。
//! 启动参数里去掉会暴露自动化的开关，指纹补丁脚本在任何页面加载前注入。

use std::path::Path;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, BrowserError};
use crate::models::{Profile, Proxy, Stage};

/// 一次会话期间独占的浏览器实例
///
/// 持有浏览器进程和它的事件处理任务，会话结束时必须调用 `shutdown`
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    init_script: String,
    extra_headers: serde_json::Value,
    profile_name: String,
}

/// 为档案启动持久化浏览器
pub async fn launch_profile_context(
    config: &Config,
    stage: Stage,
    name: &str,
    profile: &Profile,
) -> AppResult<BrowserSession> {
    let root = Path::new(&config.profiles_root);
    let user_data_dir = stage.profile_dir(root, name);
    let fingerprint = &profile.fingerprint;

    info!("[账号 {}] 🚀 启动浏览器...", name);
    debug!("[账号 {}] 数据目录: {}", name, user_data_dir.display());

    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-infobars".to_string(),
        format!("--user-agent={}", fingerprint.user_agent),
        format!("--lang={}", fingerprint.locale),
    ];
    if let Some(proxy) = &profile.proxy {
        args.push(proxy_arg(proxy));
    }

    let mut builder = BrowserConfig::builder()
        .user_data_dir(&user_data_dir)
        .viewport(Viewport {
            width: fingerprint.screen_width,
            height: fingerprint.screen_height,
            ..Default::default()
        })
        .args(args);

    if !config.headless {
        builder = builder.with_head();
    }
    if !config.chrome_executable.is_empty() {
        builder = builder.chrome_executable(Path::new(&config.chrome_executable));
    }

    let browser_config = builder
        .build()
        .map_err(|message| AppError::Browser(BrowserError::ConfigurationFailed { message }))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(AppError::launch_failed)?;
    debug!("[账号 {}] 浏览器启动成功", name);

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    // 恢复的空白启动页异步延迟关闭，避免打断浏览器初始化
    if let Ok(pages) = browser.pages().await {
        for page in pages {
            if page_url(&page).await.as_deref() == Some("about:blank") {
                tokio::spawn(close_page_with_delay(page, 0.25));
            }
        }
    }

    Ok(BrowserSession {
        browser,
        handler_task,
        init_script: fingerprint.init_script(),
        extra_headers: json!(fingerprint.headers),
        profile_name: name.to_string(),
    })
}

impl BrowserSession {
    /// 打开一个已注入指纹补丁和头部覆盖的新页面
    pub async fn new_page(&self) -> AppResult<Page> {
        let page = self.browser.new_page("about:blank").await.map_err(|e| {
            AppError::Browser(BrowserError::PageCreationFailed {
                source: Box::new(e),
            })
        })?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            self.init_script.clone(),
        ))
        .await?;
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            self.extra_headers.clone(),
        )))
        .await?;

        Ok(page)
    }

    /// 当前打开的页面地址，尽力收集（空白页除外）
    pub async fn open_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        if let Ok(pages) = self.browser.pages().await {
            for page in pages {
                if let Some(url) = page_url(&page).await {
                    if url != "about:blank" {
                        urls.push(url);
                    }
                }
            }
        }
        urls
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// 释放浏览器：关闭进程、停掉事件处理任务
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("[账号 {}] 关闭浏览器时出错: {}", self.profile_name, e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        info!("[账号 {}] 👋 浏览器已关闭", self.profile_name);
    }
}

/// 拼浏览器的代理启动参数
fn proxy_arg(proxy: &Proxy) -> String {
    match (&proxy.username, &proxy.password) {
        (Some(user), Some(pass)) => {
            let endpoint = proxy.endpoint();
            match endpoint.split_once("://") {
                Some((scheme, rest)) => {
                    format!("--proxy-server={}://{}:{}@{}", scheme, user, pass, rest)
                }
                None => format!("--proxy-server={}", endpoint),
            }
        }
        _ => format!("--proxy-server={}", proxy.endpoint()),
    }
}

async fn page_url(page: &Page) -> Option<String> {
    page.url().await.ok().flatten()
}

async fn close_page_with_delay(page: Page, delay_secs: f64) {
    sleep(Duration::from_secs_f64(delay_secs)).await;
    let _ = page.close().await;
}
