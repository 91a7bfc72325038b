use std::fs;

use model_tools::SummaryConfig;
use models::prelude::*;
use models::{ActivationConfig, NormConfig};

fn write_temp_config(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("vggconv.toml");
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn loads_encoder_head_and_input_sections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_temp_config(
        &dir,
        r#"
[model.encoder]
layers = [3, 16, 32, 32]
layer_order = ["conv", "activation"]

[model.encoder.activation]
kind = "relu"

[model.head]
in_channels = 32
out_channels = 1
latent_channels = [8]

[model.init]
kind = "framework"

[input]
batch = 2
height = 64
width = 64
"#,
    );

    let cfg = SummaryConfig::from_path(&path).expect("load config");
    assert_eq!(cfg.source.as_deref(), Some(path.as_path()));
    assert_eq!(cfg.model.encoder.layers, vec![3, 16, 32, 32]);
    assert_eq!(
        cfg.model.encoder.layer_order,
        vec![Role::Conv, Role::Activation]
    );
    assert_eq!(cfg.model.encoder.activation, ActivationConfig::Relu);
    // Fields left out of a section keep their defaults.
    assert_eq!(cfg.model.encoder.norm, Some(NormConfig::default()));
    assert_eq!(cfg.model.head.latent_channels, vec![8]);
    assert_eq!(cfg.model.init, InitConfig::Framework);
    assert_eq!(cfg.input.dims(), [2, 3, 64, 64]);
    assert_eq!(cfg.downsample_factor(), 2);
}

#[test]
fn empty_file_falls_back_to_default_discriminator() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_temp_config(&dir, "");
    let cfg = SummaryConfig::from_path(&path).expect("load config");
    assert_eq!(cfg.model, VggConvConfig::default());
    assert_eq!(cfg.input.dims(), [4, 3, 128, 128]);
}

#[test]
fn loaded_config_builds_a_working_model() {
    use burn::backend::NdArray;
    use burn::tensor::Tensor;

    let cfg = SummaryConfig::from_toml(
        r#"
[model.encoder]
layers = [3, 8, 16]

[model.head]
in_channels = 16
out_channels = 1

[input]
batch = 1
height = 16
width = 16
"#,
    )
    .expect("parse config");

    let device = Default::default();
    let model = cfg.model.init::<NdArray<f32>>(&device).expect("build model");
    let logits = model.forward(Tensor::zeros(cfg.input.dims(), &device));
    assert_eq!(logits.dims(), [1, 1]);
}

#[test]
fn unknown_role_is_a_parse_error() {
    let err = SummaryConfig::from_toml("[model.encoder]\nlayer_order = [\"conv\", \"maxpool\"]\n");
    assert!(err.is_err());
}

#[test]
fn missing_file_reports_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");
    let err = SummaryConfig::from_path(&path).expect_err("missing file");
    assert!(format!("{err:#}").contains("absent.toml"));
}
