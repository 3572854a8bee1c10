//! # config 模块说明
//!
//! ## 角色定位（Why）
//! - 完整性校验开关来自外部多值配置（`none` / `abort` / `retry`），写出器只关心“是否计算校验和”；
//! - 配置在进程启动、构造写出器时解析一次，之后只读，不存在运行期查询全局状态的路径。
//!
//! ## 配置格式（What）
//! ```toml
//! [exchange]
//! data-integrity-verification = "abort"
//! ```
//! - 缺省 `[exchange]` 段或字段时取默认值 `abort`；
//! - `[exchange]` 段内出现未知字段视为配置错误，其余段落留给宿主使用。

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// 交换数据完整性校验策略。
///
/// 对写出端而言，`abort` 与 `retry` 都意味着需要计算校验和；两者的差异只体现在读取端
/// 发现校验失败后的处置。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataIntegrityVerification {
    /// 不计算校验和，帧头写入保留值。
    #[serde(alias = "NONE", alias = "None")]
    None,
    /// 校验失败时中止查询。
    #[default]
    #[serde(alias = "ABORT", alias = "Abort")]
    Abort,
    /// 校验失败时重新拉取数据。
    #[serde(alias = "RETRY", alias = "Retry")]
    Retry,
}

impl DataIntegrityVerification {
    /// 折叠为写出端使用的布尔开关。
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }

    /// 稳定字符串表示。
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Abort => "abort",
            Self::Retry => "retry",
        }
    }
}

/// 交换链路配置。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExchangeConfig {
    /// 完整性校验策略。
    pub data_integrity_verification: DataIntegrityVerification,
}

#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    exchange: ExchangeConfig,
}

impl ExchangeConfig {
    /// 以指定策略构建配置。
    pub fn new(data_integrity_verification: DataIntegrityVerification) -> Self {
        Self {
            data_integrity_verification,
        }
    }

    /// 从 TOML 文本解析。
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = toml::from_str(source)?;
        Ok(document.exchange)
    }

    /// 从 TOML 文件加载。
    ///
    /// 文件不可读或内容非法都返回 [`ConfigError`]，调用方应将其视为启动失败。
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(
            path = %path.display(),
            data_integrity_verification = config.data_integrity_verification.as_str(),
            "exchange configuration loaded"
        );
        Ok(config)
    }

    /// 写出端是否需要计算校验和。
    pub fn is_integrity_verification_enabled(&self) -> bool {
        self.data_integrity_verification.is_enabled()
    }
}
