//! 档案数据结构
//!
//! 一个档案 = 一个模拟身份：固定的浏览器指纹 + 可选代理 + 上次会话的页面记录。
//! 档案名不放在结构体里，它是 store 映射表的键。

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ConfigError};
use crate::models::fingerprint::Fingerprint;

/// 一个受管理的身份档案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// 浏览器指纹，创建时生成一次，之后不再变化
    pub fingerprint: Fingerprint,
    /// 代理配置，只能通过显式的"更新代理"操作修改
    pub proxy: Option<Proxy>,
    /// 上次会话结束时打开的页面（尽力记录，每次运行覆盖）
    #[serde(default)]
    pub last_urls: Vec<String>,
}

impl Profile {
    /// 用新生成的指纹创建档案
    pub fn new(fingerprint: Fingerprint, proxy: Option<Proxy>) -> Self {
        Self {
            fingerprint,
            proxy,
            last_urls: Vec::new(),
        }
    }
}

/// 代理配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    /// 形如 `http://1.2.3.4` 的协议加主机
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Proxy {
    /// 解析代理字符串
    ///
    /// 格式：`protocol:host:port` 或 `protocol:host:port:user:pass`，
    /// protocol 为 http 或 socks5。socks5 不支持账号密码认证。
    pub fn parse(proxy_str: &str) -> Result<Proxy, AppError> {
        let parts: Vec<&str> = proxy_str.split(':').collect();
        if parts.len() != 3 && parts.len() != 5 {
            return Err(AppError::Config(ConfigError::InvalidProxyFormat {
                value: proxy_str.to_string(),
            }));
        }

        if parts[0] == "socks5" && parts.len() == 5 {
            return Err(AppError::Config(ConfigError::Socks5AuthUnsupported {
                value: proxy_str.to_string(),
            }));
        }

        let port: u16 =
            parts[2]
                .parse()
                .map_err(|_| AppError::Config(ConfigError::InvalidProxyFormat {
                    value: proxy_str.to_string(),
                }))?;

        Ok(Proxy {
            server: format!("{}://{}", parts[0], parts[1]),
            port,
            username: parts.get(3).map(|s| s.to_string()),
            password: parts.get(4).map(|s| s.to_string()),
        })
    }

    /// 拼出带端口的代理地址（传给浏览器启动参数）
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    /// 日志用的一行摘要，不带密码
    pub fn summary(&self) -> String {
        match &self.username {
            Some(user) => format!("{} (认证: {})", self.endpoint(), user),
            None => self.endpoint(),
        }
    }
}
