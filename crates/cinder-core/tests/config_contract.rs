//! `config_contract` 集成测试：声明式配置经由注册表装配出的流水线与手工装配的行为一致。

use std::sync::Arc;

use cinder_buffer::SlabBufferPool;
use cinder_core::codec::{DecodeContext, Decoder, EncodeContext, Encoder};
use cinder_core::error::codes;
use cinder_core::pipeline::{PipelineCodec, StepRegistry};
use cinder_core::test_stubs::{TagStepFactory, Utf8StringCodec};
use cinder_core::{ErrorKind, PipelineConfig, StepSpec};

fn registry() -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry
        .register(Arc::new(TagStepFactory))
        .expect("首次注册不应冲突");
    registry
}

#[test]
fn config_assembles_steps_in_declared_order() {
    let config = PipelineConfig::from_toml_str(
        r#"
        max_frame_size = 64

        [[steps]]
        kind = "tag"
        options = { tag = "<a>" }

        [[steps]]
        kind = "tag"
        options = { tag = "<b>" }
        "#,
    )
    .expect("解析配置");
    let codec = PipelineCodec::from_config(Utf8StringCodec::new(), &config, &registry())
        .expect("装配流水线");

    let names: Vec<_> = codec.steps().iter().map(|step| step.name().to_owned()).collect();
    assert_eq!(names, ["tag:<a>", "tag:<b>"]);
    assert_eq!(codec.max_frame_size(), Some(64));

    let pool = SlabBufferPool::new();
    let mut ctx = EncodeContext::new(&pool);
    let payload = codec.encode(&"v".to_owned(), &mut ctx).expect("编码");
    assert_eq!(payload.as_slice(), b"v<a><b>");

    let mut src = pool.alloc_readable(payload.as_slice()).expect("分配源缓冲");
    drop(payload);
    let mut ctx = DecodeContext::new(&pool);
    assert_eq!(codec.decode(&mut *src, &mut ctx).expect("解码"), "v");
}

#[test]
fn unknown_kind_is_a_configuration_error() {
    let config = PipelineConfig {
        steps: vec![StepSpec::new("zstd")],
        max_frame_size: None,
    };
    let err = PipelineCodec::from_config(Utf8StringCodec::new(), &config, &registry())
        .expect_err("未注册的 kind 应失败");
    assert_eq!(err.code(), codes::CONFIG_INVALID);
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn factory_rejects_missing_options() {
    let config = PipelineConfig {
        steps: vec![StepSpec::new("tag")],
        max_frame_size: None,
    };
    let err = PipelineCodec::from_config(Utf8StringCodec::new(), &config, &registry())
        .expect_err("缺少 tag 选项应失败");
    assert_eq!(err.code(), codes::CONFIG_INVALID);
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = registry();
    let err = registry
        .register(Arc::new(TagStepFactory))
        .expect_err("重复注册应失败");
    assert_eq!(err.code(), codes::CONFIG_INVALID);
    assert_eq!(registry.kinds().collect::<Vec<_>>(), ["tag"]);
}

#[test]
fn empty_config_yields_pass_through_pipeline() {
    let codec = PipelineCodec::from_config(
        Utf8StringCodec::new(),
        &PipelineConfig::default(),
        &StepRegistry::new(),
    )
    .expect("空配置应装配成功");
    assert!(codec.steps().is_empty());
    assert_eq!(codec.max_frame_size(), None);

    let spec = StepSpec::new("tag").with_option("tag", "!");
    let step = registry().resolve(&spec).expect("解析单个条目");
    assert_eq!(step.name(), "tag:!");
}
