//! 按领域分组的配置结构体
//!
//! 从环境变量加载，统一 fallback 逻辑。

use super::env_keys::{
    diagnostics as diag_keys, install as install_keys, launch as launch_keys,
    observability as obv_keys, pack as pack_keys, paths as path_keys, runtime as rt_keys,
};
use super::loader::{env_bool, env_list, env_optional, env_or, env_os, load_dotenv};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Interpreter names tried when `PIPSTRAP_PYTHON` is unset.
pub const DEFAULT_PYTHON_CANDIDATES: &[&str] = &["python3", "python"];
pub const DEFAULT_VENV_DIR: &str = "venv";
pub const DEFAULT_MANIFEST: &str = "requirements.txt";
pub const DEFAULT_ENTRY: &str = "src/main.py";
pub const DEFAULT_PACK_DESCRIPTOR: &str = "pipstrap.pack.yaml";
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Join `p` onto `root` unless it is already absolute.
pub fn resolve_under(root: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// 启动阶段注入给目标程序的环境
///
/// Inherited values are captured once here and threaded through the launch
/// call; the bootstrap never writes them back into its own process environment.
#[derive(Debug, Clone, Default)]
pub struct LaunchEnvConfig {
    /// Prepend the working dir to an inherited `PYTHONPATH` instead of replacing it.
    pub extend_pythonpath: bool,
    pub inherited_pythonpath: Option<OsString>,
    pub inherited_path: Option<OsString>,
    pub qt_plugin_path: Option<String>,
    pub qt_debug_plugins: Option<String>,
}

impl LaunchEnvConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            extend_pythonpath: env_bool(launch_keys::PIPSTRAP_EXTEND_PYTHONPATH, &[], true),
            inherited_pythonpath: env_os(launch_keys::PYTHONPATH),
            inherited_path: env_os(launch_keys::PATH),
            qt_plugin_path: env_optional(launch_keys::PIPSTRAP_QT_PLUGIN_PATH, &[]),
            qt_debug_plugins: env_optional(launch_keys::PIPSTRAP_QT_DEBUG_PLUGINS, &[]),
        }
    }
}

/// 引导流程配置：项目根目录、沙箱、依赖清单、入口
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub project_root: PathBuf,
    pub venv_dir: PathBuf,
    pub manifest: PathBuf,
    /// Entry script, resolved against the project root.
    pub entry_point: PathBuf,
    pub python_candidates: Vec<String>,
    pub min_python: Option<String>,
    pub index_url: Option<String>,
    pub skip_unchanged: bool,
    /// Dump listings, tool versions and env vars on failure.
    pub diagnostics: bool,
    pub launch: LaunchEnvConfig,
}

impl BootstrapConfig {
    /// 从环境变量加载（会自动加载 .env），路径相对 `project_root` 解析
    ///
    /// A relative root is made absolute against the current directory, so every
    /// derived path stays valid for children started with another cwd.
    pub fn from_env_in(project_root: &Path) -> Self {
        load_dotenv();
        let absolute = std::path::absolute(project_root).unwrap_or_else(|_| project_root.to_path_buf());
        let project_root = absolute.as_path();
        let venv = env_or(path_keys::PIPSTRAP_VENV_DIR, path_keys::VENV_DIR_ALIASES, || {
            DEFAULT_VENV_DIR.to_string()
        });
        let manifest = env_or(path_keys::PIPSTRAP_MANIFEST, path_keys::MANIFEST_ALIASES, || {
            DEFAULT_MANIFEST.to_string()
        });
        let entry = env_or(path_keys::PIPSTRAP_ENTRY, &[], || DEFAULT_ENTRY.to_string());
        let python_candidates = env_list(rt_keys::PIPSTRAP_PYTHON, &[]).unwrap_or_else(|| {
            DEFAULT_PYTHON_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect()
        });

        Self {
            project_root: project_root.to_path_buf(),
            venv_dir: resolve_under(project_root, &venv),
            manifest: resolve_under(project_root, &manifest),
            entry_point: resolve_under(project_root, &entry),
            python_candidates,
            min_python: env_optional(rt_keys::PIPSTRAP_MIN_PYTHON, &[]),
            index_url: env_optional(
                install_keys::PIPSTRAP_INDEX_URL,
                install_keys::INDEX_URL_ALIASES,
            ),
            skip_unchanged: env_bool(install_keys::PIPSTRAP_SKIP_UNCHANGED, &[], false),
            diagnostics: env_bool(diag_keys::PIPSTRAP_DIAGNOSTICS, &[], true),
            launch: LaunchEnvConfig::from_env(),
        }
    }

    /// Defaults only, no environment lookups.
    pub fn with_defaults(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            venv_dir: project_root.join(DEFAULT_VENV_DIR),
            manifest: project_root.join(DEFAULT_MANIFEST),
            entry_point: project_root.join(DEFAULT_ENTRY),
            python_candidates: DEFAULT_PYTHON_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_python: None,
            index_url: None,
            skip_unchanged: false,
            diagnostics: true,
            launch: LaunchEnvConfig {
                extend_pythonpath: true,
                ..Default::default()
            },
        }
    }
}

/// 打包配置
#[derive(Debug, Clone)]
pub struct PackConfig {
    pub descriptor: PathBuf,
    pub dist_dir: PathBuf,
}

impl PackConfig {
    pub fn from_env_in(project_root: &Path) -> Self {
        load_dotenv();
        let descriptor = env_or(pack_keys::PIPSTRAP_PACK_DESCRIPTOR, &[], || {
            DEFAULT_PACK_DESCRIPTOR.to_string()
        });
        let dist = env_or(pack_keys::PIPSTRAP_DIST_DIR, &[], || DEFAULT_DIST_DIR.to_string());
        Self {
            descriptor: resolve_under(project_root, &descriptor),
            dist_dir: resolve_under(project_root, &dist),
        }
    }
}

/// 可观测性配置：quiet、log_level、log_json、audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            load_dotenv();
            Self {
                quiet: env_bool(obv_keys::PIPSTRAP_QUIET, &[], false),
                log_level: env_or(obv_keys::PIPSTRAP_LOG_LEVEL, &[], || {
                    "pipstrap=info".to_string()
                }),
                log_json: env_bool(obv_keys::PIPSTRAP_LOG_JSON, &[], false),
                audit_log: env_optional(obv_keys::PIPSTRAP_AUDIT_LOG, &[]),
            }
        })
    }
}
