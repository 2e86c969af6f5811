use std::io::ErrorKind;

use configs::AppConfig;
use dotenvy::dotenv;
use service::{observability, StoreError, StoreRegistry};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Values stored by the default process are arbitrary JSON documents keyed by string.
type Registry = StoreRegistry<String, serde_json::Value>;

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    service::runtime::ensure_env(&cfg.store.data_dir).await?;

    let registry = Registry::with_default_name(&cfg.store.default_name);
    let default_name = registry.default_name().to_string();
    let snapshot = cfg.store.snapshot_path();

    if let (true, Some(path)) = (cfg.store.load_on_start, snapshot.as_ref()) {
        match registry.load(&default_name, path).await {
            Ok(()) => info!(service = "kvstore", event = "startup_load", path = %path.display(), "startup snapshot loaded"),
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                warn!(service = "kvstore", event = "startup_load", path = %path.display(), "no snapshot yet; starting empty");
            }
            // refuse to start on a bad snapshot so shutdown cannot overwrite it with an empty table
            Err(e) => return Err(e.into()),
        }
    }

    let admin = if cfg.admin.enabled {
        Some(common::admin_http::spawn_admin_server(&cfg.admin.addr, observability::encode_metrics).await?)
    } else {
        None
    };

    info!(service = "kvstore", event = "ready", store = %default_name, stores = ?registry.names(), "store service ready");
    tokio::signal::ctrl_c().await?;
    info!(service = "kvstore", event = "shutdown_signal", "received Ctrl+C, shutting down");

    let mut result = Ok(());
    if let (true, Some(path)) = (cfg.store.save_on_shutdown, snapshot.as_ref()) {
        if let Err(e) = registry.save(&default_name, path).await {
            error!(service = "kvstore", event = "shutdown_save_failed", error = %e, code = e.code(), "final snapshot not written");
            result = Err(e.into());
        }
    }

    registry.shutdown().await;
    if let Some((_, task)) = admin {
        task.abort();
    }
    result
}

fn main() -> std::process::ExitCode {
    // 提前加载 .env，使得 RUST_LOG / CONFIG_PATH 等环境变量生效
    dotenv().ok();
    let loaded = AppConfig::load_or_default();
    let format = loaded.as_ref().map(|(cfg, _)| cfg.logging.format.clone()).unwrap_or_default();
    common::utils::logging::init_logging(&format);
    info!(service = "kvstore", event = "logger_init", "tracing subscriber initialized");

    let cfg = match loaded {
        Ok((cfg, true)) => cfg,
        Ok((cfg, false)) => {
            warn!(service = "kvstore", event = "config_missing", "config file not found; using defaults");
            cfg
        }
        Err(e) => {
            error!(service = "kvstore", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    // Panic 钩子：捕获异常并输出错误日志，便于排查问题
    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "kvstore",
            event = "panic",
            %service_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.runtime.worker_threads { builder.worker_threads(w); }

    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "kvstore", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "kvstore",
        event = "start",
        %service_id,
        pid,
        version,
        threads = cfg.runtime.worker_threads.unwrap_or_default(),
        "kvstore service starting"
    );

    match rt.block_on(run(cfg)) {
        Ok(()) => {
            info!(service = "kvstore", event = "stop", %service_id, pid, "kvstore stopped normally");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "kvstore", event = "run_failed", error = %e, "kvstore exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}
