//! 环境变量 key 常量与别名定义
//!
//! 主变量统一使用 `PIPSTRAP_*`，部分兼容 pip 自身的变量名。

/// 项目与沙箱路径
pub mod paths {
    pub const PIPSTRAP_PROJECT_ROOT: &str = "PIPSTRAP_PROJECT_ROOT";

    /// Sandbox root, relative to the project root unless absolute.
    pub const PIPSTRAP_VENV_DIR: &str = "PIPSTRAP_VENV_DIR";
    pub const VENV_DIR_ALIASES: &[&str] = &["PIPSTRAP_SANDBOX_DIR"];

    pub const PIPSTRAP_MANIFEST: &str = "PIPSTRAP_MANIFEST";
    pub const MANIFEST_ALIASES: &[&str] = &["PIPSTRAP_REQUIREMENTS"];

    pub const PIPSTRAP_ENTRY: &str = "PIPSTRAP_ENTRY";
}

/// 运行时探测
pub mod runtime {
    /// Comma-separated interpreter candidates, tried in order.
    pub const PIPSTRAP_PYTHON: &str = "PIPSTRAP_PYTHON";
    pub const PIPSTRAP_MIN_PYTHON: &str = "PIPSTRAP_MIN_PYTHON";
}

/// 依赖安装
pub mod install {
    pub const PIPSTRAP_INDEX_URL: &str = "PIPSTRAP_INDEX_URL";
    pub const INDEX_URL_ALIASES: &[&str] = &["PIP_INDEX_URL"];

    pub const PIPSTRAP_SKIP_UNCHANGED: &str = "PIPSTRAP_SKIP_UNCHANGED";
}

/// 启动目标程序时注入的变量
pub mod launch {
    pub const PIPSTRAP_EXTEND_PYTHONPATH: &str = "PIPSTRAP_EXTEND_PYTHONPATH";
    pub const PIPSTRAP_QT_PLUGIN_PATH: &str = "PIPSTRAP_QT_PLUGIN_PATH";
    pub const PIPSTRAP_QT_DEBUG_PLUGINS: &str = "PIPSTRAP_QT_DEBUG_PLUGINS";

    /// Variables read by the launched program.
    pub const PYTHONPATH: &str = "PYTHONPATH";
    pub const PATH: &str = "PATH";
    pub const VIRTUAL_ENV: &str = "VIRTUAL_ENV";
    pub const PYTHONHOME: &str = "PYTHONHOME";
    pub const QT_PLUGIN_PATH: &str = "QT_PLUGIN_PATH";
    pub const QT_DEBUG_PLUGINS: &str = "QT_DEBUG_PLUGINS";
}

/// 诊断输出
pub mod diagnostics {
    pub const PIPSTRAP_DIAGNOSTICS: &str = "PIPSTRAP_DIAGNOSTICS";
}

/// 打包
pub mod pack {
    pub const PIPSTRAP_PACK_DESCRIPTOR: &str = "PIPSTRAP_PACK_DESCRIPTOR";
    pub const PIPSTRAP_DIST_DIR: &str = "PIPSTRAP_DIST_DIR";
}

/// 可观测性与日志
pub mod observability {
    pub const PIPSTRAP_QUIET: &str = "PIPSTRAP_QUIET";
    pub const PIPSTRAP_LOG_LEVEL: &str = "PIPSTRAP_LOG_LEVEL";
    pub const PIPSTRAP_LOG_JSON: &str = "PIPSTRAP_LOG_JSON";
    pub const PIPSTRAP_AUDIT_LOG: &str = "PIPSTRAP_AUDIT_LOG";
}
