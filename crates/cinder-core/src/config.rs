//! 流水线的声明式配置。
//!
//! # 模块定位（Why）
//! - 宿主通常以 TOML 片段描述“用哪些步骤、按什么顺序”，由 [`StepRegistry`](crate::StepRegistry)
//!   把每个条目落地为具体步骤；
//! - 库本身不读取文件或环境变量，只负责解析调用方交来的文本。
//!
//! # 格式（What）
//! ```toml
//! max_frame_size = 1048576
//!
//! [[steps]]
//! kind = "lz4"
//! options = { max_decompressed_len = 8388608 }
//! ```
//! `steps` 的声明顺序即写出顺序，读取时反向撤销。

use serde::Deserialize;

use crate::error::codes;
use crate::{CoreError, Result};

/// 整条流水线的配置。
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// 按写出顺序排列的步骤条目；缺省为空，即直通。
    #[serde(default)]
    pub steps: Vec<StepSpec>,
    /// 线上帧长上限；缺省不限制。
    #[serde(default)]
    pub max_frame_size: Option<usize>,
}

impl PipelineConfig {
    /// 从 TOML 文本解析配置。
    ///
    /// # 契约说明（What）
    /// - 语法错误、字段类型不符或出现未知字段时返回 `config.invalid`，
    ///   原始的解析错误作为底层原因保留；
    /// - 解析成功不代表步骤可落地，未知 `kind` 在装配阶段才会报告。
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|err| {
            CoreError::new(codes::CONFIG_INVALID, "failed to parse pipeline configuration")
                .with_cause(err)
        })
    }
}

/// 单个步骤条目：`kind` 选择工厂，`options` 原样交给工厂解释。
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    pub kind: String,
    #[serde(default)]
    pub options: toml::Table,
}

impl StepSpec {
    /// 构造不带选项的条目。
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: toml::Table::new(),
        }
    }

    /// 追加一个选项。
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn parses_steps_in_declaration_order() {
        let config = PipelineConfig::from_toml_str(
            r#"
            max_frame_size = 4096

            [[steps]]
            kind = "tag"
            options = { tag = "A" }

            [[steps]]
            kind = "lz4"
            "#,
        )
        .expect("合法配置应当解析成功");

        assert_eq!(config.max_frame_size, Some(4096));
        let kinds: Vec<_> = config.steps.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, ["tag", "lz4"]);
        assert_eq!(
            config.steps[0].options.get("tag").and_then(|v| v.as_str()),
            Some("A")
        );
        assert!(config.steps[1].options.is_empty());
    }

    #[test]
    fn empty_document_is_pass_through() {
        let config = PipelineConfig::from_toml_str("").expect("空文档应当解析为默认配置");
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn malformed_document_reports_config_invalid() {
        let err = PipelineConfig::from_toml_str("[[steps]]\nkind = 3\n")
            .expect_err("kind 类型错误应当失败");
        assert_eq!(err.code(), codes::CONFIG_INVALID);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.cause().is_some());

        let err = PipelineConfig::from_toml_str("unknown = true\n").expect_err("未知字段应当失败");
        assert_eq!(err.code(), codes::CONFIG_INVALID);
    }

    #[test]
    fn step_spec_builder_collects_options() {
        let spec = StepSpec::new("lz4").with_option("max_decompressed_len", 1024_i64);
        assert_eq!(spec.kind, "lz4");
        assert_eq!(
            spec.options
                .get("max_decompressed_len")
                .and_then(|v| v.as_integer()),
            Some(1024)
        );
    }
}
