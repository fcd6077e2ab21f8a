use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use profile_batch_runner::browser::BrowserSession;
use profile_batch_runner::error::{AppError, SessionError, TransitionError};
use profile_batch_runner::models::fingerprint::{self, FingerprintConstraints};
use profile_batch_runner::orchestrator::run_profile_session;
use profile_batch_runner::services::ShortsWatcher;
use profile_batch_runner::{
    logger, move_profile, move_profiles, run_waves, verify, wave_bounds, Config, LeaseRegistry,
    Profile, ProfileMap, ProfileStore, Proxy, SessionBudget, SessionCtx, SessionFlow,
    SessionOutcome, SessionParams, SessionStrategy, Stage, TransitionFinding, WaveParams, WorkItem,
};

/// 造一个阶段：store 里写入档案，再给每个档案建一个带文件的数据目录
fn seed_stage(root: &Path, stage: Stage, names: &[&str]) -> ProfileMap {
    let store = ProfileStore::new(root, stage);
    let mut map = ProfileMap::new();
    for name in names {
        map.insert(
            name.to_string(),
            Profile::new(fingerprint::generate(&FingerprintConstraints::default()), None),
        );
        let dir = stage.profile_dir(root, name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Cookies"), b"opaque").unwrap();
    }
    store.save(&map).unwrap();
    map
}

// ========== 档案仓库 ==========

#[test]
fn store_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = ProfileStore::new(tmp.path(), Stage::Warmup);

    let mut map = ProfileMap::new();
    let mut with_proxy = Profile::new(
        fingerprint::generate(&FingerprintConstraints::default()),
        Some(Proxy::parse("http:1.2.3.4:8080:user:pass").unwrap()),
    );
    with_proxy.last_urls = vec!["https://www.youtube.com/shorts".to_string()];
    map.insert("acct_01".to_string(), with_proxy);
    map.insert(
        "acct_02".to_string(),
        Profile::new(fingerprint::generate(&FingerprintConstraints::default()), None),
    );

    store.save(&map).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded, map);
}

#[test]
fn store_load_missing_file_returns_empty() {
    let tmp = TempDir::new().unwrap();
    let store = ProfileStore::new(tmp.path(), Stage::Upload);
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn store_load_corrupt_file_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let store = ProfileStore::new(tmp.path(), Stage::Warmup);
    fs::create_dir_all(Stage::Warmup.dir(tmp.path())).unwrap();
    fs::write(store.store_path(), b"not json at all").unwrap();

    assert!(store.load().is_err());
}

#[test]
fn store_create_rejects_duplicate_name() {
    let tmp = TempDir::new().unwrap();
    let store = ProfileStore::new(tmp.path(), Stage::Warmup);
    store.create("acct_01", None).unwrap();
    assert!(store.create("acct_01", None).is_err());
}

#[test]
fn proxy_parse_accepts_and_rejects() {
    let plain = Proxy::parse("http:1.2.3.4:8080").unwrap();
    assert_eq!(plain.server, "http://1.2.3.4");
    assert_eq!(plain.port, 8080);
    assert!(plain.username.is_none());

    let auth = Proxy::parse("http:1.2.3.4:8080:user:pass").unwrap();
    assert_eq!(auth.username.as_deref(), Some("user"));
    assert_eq!(auth.password.as_deref(), Some("pass"));

    assert!(Proxy::parse("1.2.3.4:8080").is_err());
    assert!(Proxy::parse("http:1.2.3.4:notaport").is_err());
    assert!(Proxy::parse("socks5:1.2.3.4:1080:user:pass").is_err());
}

#[test]
fn update_proxy_refused_while_lease_held() {
    let tmp = TempDir::new().unwrap();
    let store = ProfileStore::new(tmp.path(), Stage::Warmup);
    store.create("acct_01", None).unwrap();

    let leases = LeaseRegistry::new();
    let lease = leases.acquire("acct_01").unwrap();
    assert!(leases.acquire("acct_01").is_none());

    let err = store
        .update_proxy("acct_01", Some("http:1.2.3.4:8080"), &leases)
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Session(SessionError::AlreadyRunning { .. })
    ));

    drop(lease);
    store
        .update_proxy("acct_01", Some("http:1.2.3.4:8080"), &leases)
        .unwrap();
    let profiles = store.load().unwrap();
    assert_eq!(profiles["acct_01"].proxy.as_ref().unwrap().port, 8080);
}

// ========== 阶段转移 ==========

#[test]
fn transition_moves_entry_and_dir() {
    let tmp = TempDir::new().unwrap();
    let seeded = seed_stage(tmp.path(), Stage::Upload, &["acct_01", "acct_02"]);

    move_profile(tmp.path(), "acct_01", Stage::Upload, Stage::Active, false).unwrap();

    let upload = ProfileStore::new(tmp.path(), Stage::Upload).load().unwrap();
    let active = ProfileStore::new(tmp.path(), Stage::Active).load().unwrap();

    assert_eq!(upload.keys().collect::<Vec<_>>(), vec!["acct_02"]);
    assert_eq!(active.keys().collect::<Vec<_>>(), vec!["acct_01"]);
    assert_eq!(active["acct_01"], seeded["acct_01"]);

    assert!(!Stage::Upload.profile_dir(tmp.path(), "acct_01").exists());
    assert!(Stage::Upload.profile_dir(tmp.path(), "acct_02").exists());
    let moved_dir = Stage::Active.profile_dir(tmp.path(), "acct_01");
    assert!(moved_dir.exists());
    assert_eq!(fs::read(moved_dir.join("Cookies")).unwrap(), b"opaque");
}

#[test]
fn transition_unknown_name_leaves_both_stages_untouched() {
    let tmp = TempDir::new().unwrap();
    let seeded = seed_stage(tmp.path(), Stage::Upload, &["acct_02"]);
    // 目录在、store 条目不在
    fs::create_dir_all(Stage::Upload.profile_dir(tmp.path(), "acct_01")).unwrap();

    let err = move_profile(tmp.path(), "acct_01", Stage::Upload, Stage::Active, false).unwrap_err();
    assert!(matches!(
        err,
        AppError::Transition(TransitionError::NotInSourceStore { .. })
    ));

    let upload = ProfileStore::new(tmp.path(), Stage::Upload).load().unwrap();
    let active = ProfileStore::new(tmp.path(), Stage::Active).load().unwrap();
    assert_eq!(upload, seeded);
    assert!(active.is_empty());
    assert!(Stage::Upload.profile_dir(tmp.path(), "acct_01").exists());
}

#[test]
fn transition_requires_source_store_file() {
    let tmp = TempDir::new().unwrap();
    let err = move_profile(tmp.path(), "acct_01", Stage::Upload, Stage::Active, false).unwrap_err();
    assert!(matches!(
        err,
        AppError::Transition(TransitionError::SourceStoreMissing { .. })
    ));
}

#[test]
fn transition_dest_occupied_needs_overwrite() {
    let tmp = TempDir::new().unwrap();
    seed_stage(tmp.path(), Stage::Upload, &["acct_01"]);
    seed_stage(tmp.path(), Stage::Active, &["acct_01"]);

    let err = move_profile(tmp.path(), "acct_01", Stage::Upload, Stage::Active, false).unwrap_err();
    assert!(matches!(
        err,
        AppError::Transition(TransitionError::DestOccupied { .. })
    ));

    move_profile(tmp.path(), "acct_01", Stage::Upload, Stage::Active, true).unwrap();
    assert!(ProfileStore::new(tmp.path(), Stage::Upload)
        .load()
        .unwrap()
        .is_empty());
}

#[test]
fn transition_batch_continues_past_failures() {
    let tmp = TempDir::new().unwrap();
    seed_stage(tmp.path(), Stage::Upload, &["acct_01", "acct_02", "acct_03"]);

    let names = vec![
        "acct_01".to_string(),
        "acct_missing".to_string(),
        "acct_03".to_string(),
    ];
    let outcome = move_profiles(tmp.path(), &names, Stage::Upload, Stage::Active);

    assert_eq!(outcome.succeeded, vec!["acct_01", "acct_03"]);
    assert_eq!(outcome.failed, vec!["acct_missing"]);

    let upload = ProfileStore::new(tmp.path(), Stage::Upload).load().unwrap();
    let active = ProfileStore::new(tmp.path(), Stage::Active).load().unwrap();
    assert_eq!(upload.keys().collect::<Vec<_>>(), vec!["acct_02"]);
    assert_eq!(active.keys().collect::<Vec<_>>(), vec!["acct_01", "acct_03"]);
}

#[test]
fn verify_reports_duplicate_across_stages() {
    let tmp = TempDir::new().unwrap();
    seed_stage(tmp.path(), Stage::Warmup, &["acct_01"]);
    seed_stage(tmp.path(), Stage::Upload, &["acct_01"]);

    let findings = verify(tmp.path()).unwrap();
    assert!(findings.contains(&TransitionFinding::DuplicateEntry {
        name: "acct_01".to_string(),
        owner: Stage::Warmup,
        shadowed: Stage::Upload,
    }));
}

#[test]
fn verify_clean_stages_report_nothing() {
    let tmp = TempDir::new().unwrap();
    seed_stage(tmp.path(), Stage::Warmup, &["acct_01"]);
    seed_stage(tmp.path(), Stage::Upload, &["acct_02"]);

    assert!(verify(tmp.path()).unwrap().is_empty());
}

// ========== 调度器 ==========

#[test]
fn wave_bounds_partitions_in_order() {
    assert_eq!(wave_bounds(7, 3), vec![(0, 3), (3, 6), (6, 7)]);
    assert_eq!(wave_bounds(3, 5), vec![(0, 3)]);
    assert_eq!(wave_bounds(6, 3), vec![(0, 3), (3, 6)]);
    assert!(wave_bounds(0, 3).is_empty());
}

#[tokio::test]
async fn run_waves_launches_all_and_isolates_failures() {
    let names: Vec<String> = (1..=7).map(|i| format!("acct_{:02}", i)).collect();
    let launched = Arc::new(Mutex::new(Vec::new()));

    let runner = {
        let launched = Arc::clone(&launched);
        move |ctx: SessionCtx| {
            launched.lock().unwrap().push(ctx.profile_name.clone());
            async move {
                match ctx.profile_name.as_str() {
                    "acct_03" => anyhow::bail!("动作循环炸了"),
                    "acct_05" => panic!("会话崩溃"),
                    _ => Ok(SessionOutcome::default()),
                }
            }
        }
    };

    let params = WaveParams {
        max_parallel: 3,
        stagger_secs: 0,
        wave_pause_secs: (0, 0),
    };
    let stats = run_waves(&names, Stage::Warmup, &params, &LeaseRegistry::new(), runner)
        .await
        .unwrap();

    assert_eq!(stats.total, 7);
    assert_eq!(stats.waves, 3);
    assert_eq!(stats.success, 5);
    assert_eq!(stats.failed, 2);
    // 全部 7 个都被启动，且启动顺序就是输入顺序
    assert_eq!(*launched.lock().unwrap(), names);
}

#[tokio::test]
async fn run_waves_releases_leases() {
    let names: Vec<String> = vec!["acct_01".to_string(), "acct_02".to_string()];
    let leases = LeaseRegistry::new();

    let params = WaveParams {
        max_parallel: 2,
        stagger_secs: 0,
        wave_pause_secs: (0, 0),
    };
    let stats = run_waves(&names, Stage::Warmup, &params, &leases, |_ctx| async {
        Ok(SessionOutcome::default())
    })
    .await
    .unwrap();

    assert_eq!(stats.success, 2);
    assert_eq!(leases.running_count(), 0);
}

// ========== 会话状态机 ==========

/// 不碰浏览器的测试策略：入口句柄为空元组
struct CountingStrategy {
    performed: AtomicUsize,
    drained: AtomicBool,
}

impl CountingStrategy {
    fn new() -> Self {
        Self {
            performed: AtomicUsize::new(0),
            drained: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SessionStrategy for CountingStrategy {
    type Entry = ();

    fn name(&self) -> &'static str {
        "counting"
    }

    async fn navigate(&self, _session: &BrowserSession, _ctx: &SessionCtx) -> Result<()> {
        Ok(())
    }

    async fn perform_unit(&self, _entry: &(), _item: &WorkItem, _ctx: &SessionCtx) -> Result<bool> {
        self.performed.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn drain(&self, _entry: &(), _ctx: &SessionCtx) -> Result<()> {
        self.drained.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// 第 2 个单元报错、第 3 个单元做不成，其余成功
struct FlakyStrategy;

#[async_trait]
impl SessionStrategy for FlakyStrategy {
    type Entry = ();

    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn navigate(&self, _session: &BrowserSession, _ctx: &SessionCtx) -> Result<()> {
        Ok(())
    }

    async fn perform_unit(&self, _entry: &(), item: &WorkItem, _ctx: &SessionCtx) -> Result<bool> {
        match item.index {
            2 => anyhow::bail!("必做步骤失败"),
            3 => Ok(false),
            _ => Ok(true),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn duration_budget_drains_at_first_check() {
    let strategy = CountingStrategy::new();
    let flow = SessionFlow::with_params(SessionParams {
        budget: SessionBudget::Duration(1),
        pacing_secs: (5.0, 5.0),
        unit_timeout_secs: 60,
    });
    let ctx = SessionCtx::new("acct_01".to_string(), 1, 1, Stage::Warmup);

    let outcome = flow.run_action_loop(&strategy, &(), &ctx).await.unwrap();

    // 1 秒预算撑不过 5 秒的停顿：第一个单元之后的检查点就该收尾
    assert_eq!(strategy.performed.load(Ordering::SeqCst), 1);
    assert!(strategy.drained.load(Ordering::SeqCst));
    assert!(outcome.drained);
    assert_eq!(outcome.units_done, 1);
}

#[tokio::test(start_paused = true)]
async fn action_loop_tolerates_unit_failures() {
    let flow = SessionFlow::with_params(SessionParams {
        budget: SessionBudget::Items(4),
        pacing_secs: (0.0, 0.0),
        unit_timeout_secs: 60,
    });
    let ctx = SessionCtx::new("acct_01".to_string(), 1, 1, Stage::Warmup);

    let outcome = flow.run_action_loop(&FlakyStrategy, &(), &ctx).await.unwrap();

    // 单元失败不终止循环：4 个单元全部被尝试
    assert_eq!(outcome.units_done, 2);
    assert_eq!(outcome.units_failed, 2);
    assert!(!outcome.drained);
}

#[tokio::test(start_paused = true)]
async fn items_budget_consumes_queue_then_stops() {
    let strategy = CountingStrategy::new();
    let flow = SessionFlow::with_params(SessionParams {
        budget: SessionBudget::Items(3),
        pacing_secs: (0.0, 0.0),
        unit_timeout_secs: 60,
    });
    let ctx = SessionCtx::new("acct_01".to_string(), 1, 1, Stage::Warmup);

    let outcome = flow.run_action_loop(&strategy, &(), &ctx).await.unwrap();

    assert_eq!(outcome.units_done, 3);
    assert!(!strategy.drained.load(Ordering::SeqCst));
}

// ========== 指纹 ==========

#[test]
fn fingerprint_respects_constraints() {
    let fp = fingerprint::generate(&FingerprintConstraints::default());
    assert!(fp.user_agent.contains("Chrome/130"));
    assert!(fp.screen_width >= 1440);
    assert_eq!(fp.locale, "en-US");
    assert!(fp.headers["Accept-Language"].starts_with("en-US"));
    assert!(fp.headers["sec-ch-ua"].contains("130"));
}

// ========== 需要真实浏览器的测试 ==========

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_watch_single_profile() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::load();
    let stage = Stage::parse(&config.run_stage).expect("解析阶段失败");

    let store = ProfileStore::new(&config.profiles_root, stage);
    if store.load().expect("加载 store 失败").is_empty() {
        store.create("acct_smoke", None).expect("创建档案失败");
    }
    let names = store.names().expect("列出档案失败");

    let ctx = SessionCtx::new(names[0].clone(), 1, 1, stage);
    let strategy = ShortsWatcher::new(&config);

    let outcome = run_profile_session(&config, &strategy, &ctx)
        .await
        .expect("会话运行失败");

    assert!(
        outcome.units_done + outcome.units_failed > 0,
        "应该至少尝试一个单元"
    );
}

#[tokio::test]
#[ignore]
async fn test_launch_browser_for_profile() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::load();
    let stage = Stage::parse(&config.run_stage).expect("解析阶段失败");

    let store = ProfileStore::new(&config.profiles_root, stage);
    let profile = store.create("acct_launch_check", None).expect("创建档案失败");

    let session = profile_batch_runner::browser::launch_profile_context(
        &config,
        stage,
        "acct_launch_check",
        &profile,
    )
    .await
    .expect("启动浏览器失败");

    session.shutdown().await;
}
