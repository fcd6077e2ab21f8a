//! 浏览器指纹生成
//!
//! 指纹生成库的边界：对外只有"按约束生成一份指纹描述"这一个能力。
//! 约束固定为 Chrome 130 / windows 或 macos 桌面端 / en-US，
//! 生成结果在档案创建时固化，之后不再变化。

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 一份指纹描述：浏览器对外可观测的设备特征集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub user_agent: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub locale: String,
    /// 随请求发送的头部集合（Accept-Language、sec-ch-ua 等）
    pub headers: BTreeMap<String, String>,
}

/// 指纹生成约束
#[derive(Debug, Clone)]
pub struct FingerprintConstraints {
    pub chrome_major: u32,
    pub locale: &'static str,
}

impl Default for FingerprintConstraints {
    fn default() -> Self {
        Self {
            chrome_major: 130,
            locale: "en-US",
        }
    }
}

// Chrome 130 桌面端 UA，按平台分组
const WINDOWS_UA: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 11.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
];

const MACOS_UA: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
];

// 常见桌面分辨率
const SCREENS: &[(u32, u32)] = &[
    (1920, 1080),
    (1536, 864),
    (1440, 900),
    (1680, 1050),
    (2560, 1440),
];

/// 按约束生成一份指纹
pub fn generate(constraints: &FingerprintConstraints) -> Fingerprint {
    let mut rng = rand::thread_rng();

    let user_agent = if rng.gen_bool(0.5) {
        WINDOWS_UA.choose(&mut rng)
    } else {
        MACOS_UA.choose(&mut rng)
    }
    .copied()
    .unwrap_or(WINDOWS_UA[0])
    .to_string();

    let platform = if user_agent.contains("Windows") {
        "\"Windows\""
    } else {
        "\"macOS\""
    };

    let (screen_width, screen_height) = *SCREENS.choose(&mut rng).unwrap_or(&SCREENS[0]);

    let mut headers = BTreeMap::new();
    headers.insert(
        "Accept-Language".to_string(),
        format!("{},en;q=0.9", constraints.locale),
    );
    headers.insert(
        "sec-ch-ua".to_string(),
        format!(
            "\"Chromium\";v=\"{major}\", \"Google Chrome\";v=\"{major}\", \"Not?A_Brand\";v=\"99\"",
            major = constraints.chrome_major
        ),
    );
    headers.insert("sec-ch-ua-mobile".to_string(), "?0".to_string());
    headers.insert("sec-ch-ua-platform".to_string(), platform.to_string());

    Fingerprint {
        user_agent,
        screen_width,
        screen_height,
        locale: constraints.locale.to_string(),
        headers,
    }
}

impl Fingerprint {
    /// 注入到每个新页面的补丁脚本：在任何页面代码运行前覆盖可探测的自动化痕迹
    pub fn init_script(&self) -> String {
        format!(
            r#"
            Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }});
            Object.defineProperty(navigator, 'language', {{ get: () => '{locale}' }});
            Object.defineProperty(navigator, 'languages', {{ get: () => ['{locale}', 'en'] }});
            Object.defineProperty(screen, 'width', {{ get: () => {width} }});
            Object.defineProperty(screen, 'height', {{ get: () => {height} }});
            window.chrome = window.chrome || {{ runtime: {{}} }};
            "#,
            locale = self.locale,
            width = self.screen_width,
            height = self.screen_height,
        )
    }
}
