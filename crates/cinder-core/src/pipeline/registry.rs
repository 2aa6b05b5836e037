use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::PipelineStep;
use crate::config::StepSpec;
use crate::error::codes;
use crate::{CoreError, Result};

/// 根据声明式配置构造流水线步骤的工厂。
///
/// `kind` 是配置中引用该步骤的名字；`build` 负责解析该步骤自己的选项表。
pub trait StepFactory: Send + Sync + 'static {
    /// 工厂负责的步骤类型名。
    fn kind(&self) -> &'static str;

    /// 使用选项构造步骤实例。
    fn build(&self, options: &toml::Table) -> Result<Arc<dyn PipelineStep>>;
}

/// `StepRegistry` 维护步骤类型名到工厂的映射。
///
/// # 设计背景（Why）
/// - 核心 crate 不依赖任何具体变换（例如 LZ4），由实现 crate 把自己的工厂注册进来，
///   配置只需引用类型名即可装配流水线。
///
/// # 契约说明（What）
/// - 同名重复注册返回 `config.invalid`，不覆盖已有工厂；
/// - 解析未注册的类型名返回 `config.invalid`。
#[derive(Default)]
pub struct StepRegistry {
    factories: BTreeMap<&'static str, Arc<dyn StepFactory>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个工厂。
    pub fn register(&mut self, factory: Arc<dyn StepFactory>) -> Result<()> {
        let kind = factory.kind();
        if self.factories.contains_key(kind) {
            return Err(CoreError::new(
                codes::CONFIG_INVALID,
                format!("pipeline step kind `{kind}` is already registered"),
            ));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// 按配置条目构造步骤。
    pub fn resolve(&self, spec: &StepSpec) -> Result<Arc<dyn PipelineStep>> {
        let factory = self.factories.get(spec.kind.as_str()).ok_or_else(|| {
            CoreError::new(
                codes::CONFIG_INVALID,
                format!("unknown pipeline step kind `{}`", spec.kind),
            )
        })?;
        factory.build(&spec.options)
    }

    /// 已注册的类型名，按字典序排列。
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
