//! # Error Module / 错误模块
//!
//! Typed errors raised while loading, validating and planning a run.
//! Configuration errors are always fatal and surface before any test file
//! is imported.
//!
//! 加载、校验和规划运行时产生的类型化错误。
//! 配置错误总是致命的，并且会在导入任何测试文件之前报告。

use std::path::PathBuf;

/// Boxed error used for failures coming from user supplied callbacks.
/// 用于承载用户回调失败的装箱错误。
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An activated reporter is not part of `reporters.list`.
    #[error(
        "Invalid reporter \"{0}\". Make sure to register it first inside the \"reporters.list\" array"
    )]
    UnknownReporter(String),

    /// A suites filter was given but the config is files based.
    #[error("Cannot apply suites filter. You have not configured any test suites")]
    SuitesFilterWithoutSuites,

    /// A suites filter references a suite that does not exist.
    #[error("Cannot apply suites filter. \"{0}\" suite is not configured")]
    UnknownSuite(String),

    /// Two configured suites share a name.
    #[error("Duplicate suite \"{0}\"")]
    DuplicateSuite(String),

    #[error("Invalid glob pattern \"{pattern}\"")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to collect test files under {}", path.display())]
    FileCollection {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("The file collection task failed")]
    CollectorTask(#[source] tokio::task::JoinError),

    #[error("The test files callback failed")]
    FilesCallback(#[source] BoxError),

    #[error("Failed to read config file: {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Neither `files` nor `suites` is configured.
    #[error("Missing test files. Define either \"files\" or \"suites\" in the config")]
    MissingTestFiles,

    /// Both `files` and `suites` are configured.
    #[error("Cannot use \"files\" and \"suites\" together. Define only one of them")]
    ConflictingTestFiles,

    #[error("Failed to import test file: {}", file.display())]
    Import {
        file: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Plugin failed")]
    Plugin(#[source] BoxError),

    #[error("Global {phase} hook failed")]
    Hook {
        phase: &'static str,
        #[source]
        source: BoxError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
