use burn::backend::NdArray;
use burn::tensor::{Distribution, Tensor};
use models::prelude::*;
use models::{ActivationConfig, DenseLayer, DropoutFactory, NormConfig};

type TestBackend = NdArray<f32>;

fn count_linear(head: &LinearHead<TestBackend>) -> usize {
    head.layers()
        .iter()
        .filter(|layer| matches!(layer, DenseLayer::Linear(_)))
        .count()
}

#[test]
fn single_latent_gives_two_linear_layers_ending_bare() {
    let device = Default::default();
    let head = LinearHeadConfig::new(512, 1)
        .with_latent_channels(vec![128])
        .init::<TestBackend>(&device)
        .unwrap();

    assert_eq!(count_linear(&head), 2);
    assert_eq!(
        head.roles(),
        vec![Role::Linear, Role::Activation, Role::Linear]
    );
    assert_eq!(head.roles().last(), Some(&Role::Linear));

    let output = head.forward(Tensor::random([3, 512], Distribution::Default, &device));
    assert_eq!(output.dims(), [3, 1]);
}

#[test]
fn empty_latent_is_one_projection() {
    let device = Default::default();
    let head = LinearHeadConfig::new(64, 10)
        .init::<TestBackend>(&device)
        .unwrap();
    assert_eq!(head.layers().len(), 1);
    assert_eq!(count_linear(&head), 1);
    assert_eq!(head.in_channels(), 64);
    assert_eq!(head.out_channels(), 10);
}

#[test]
fn full_order_applies_to_every_hidden_pair_only() {
    let device = Default::default();
    let config = LinearHeadConfig {
        in_channels: 32,
        out_channels: 2,
        latent_channels: vec![16, 8],
        layer_order: vec![Role::Linear, Role::Norm, Role::Activation, Role::Dropout],
        norm: Some(NormConfig::default()),
        dropout: Some(DropoutFactory { prob: 0.3 }),
        ..Default::default()
    };
    let head = config.init::<TestBackend>(&device).unwrap();
    let hidden = [Role::Linear, Role::Norm, Role::Activation, Role::Dropout];
    let mut expected = Vec::new();
    expected.extend(hidden);
    expected.extend(hidden);
    expected.push(Role::Linear);
    assert_eq!(head.roles(), expected);
}

fn normalized_head(norm: NormConfig) -> LinearHead<TestBackend> {
    let config = LinearHeadConfig {
        in_channels: 32,
        out_channels: 1,
        latent_channels: vec![16],
        layer_order: vec![Role::Linear, Role::Norm, Role::Activation, Role::Dropout],
        norm: Some(norm),
        dropout: Some(DropoutFactory { prob: 0.2 }),
        ..Default::default()
    };
    config.init::<TestBackend>(&Default::default()).unwrap()
}

#[test]
fn batch_and_layer_norm_run_on_feature_vectors() {
    let device = Default::default();
    for norm in [NormConfig::default(), NormConfig::Layer { epsilon: 1e-5 }] {
        let head = normalized_head(norm);
        assert!(head
            .layers()
            .iter()
            .any(|layer| matches!(layer, DenseLayer::Dropout(_))));
        let input = Tensor::random([4, 32], Distribution::Default, &device);
        assert_eq!(head.forward(input).dims(), [4, 1], "{norm:?}");
    }
}

#[test]
fn disabled_roles_are_skipped() {
    let device = Default::default();
    let config = LinearHeadConfig {
        in_channels: 16,
        out_channels: 1,
        latent_channels: vec![8],
        layer_order: vec![Role::Linear, Role::Activation, Role::Dropout],
        activation: Some(ActivationConfig::Relu),
        dropout: None,
        ..Default::default()
    };
    let head = config.init::<TestBackend>(&device).unwrap();
    assert_eq!(
        head.roles(),
        vec![Role::Linear, Role::Activation, Role::Linear]
    );
}

#[test]
fn conv_role_is_not_registered_for_the_head() {
    let device = Default::default();
    let config = LinearHeadConfig {
        layer_order: vec![Role::Conv, Role::Activation],
        ..Default::default()
    };
    let err = config.init::<TestBackend>(&device).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UnregisteredRole {
            role: Role::Conv,
            ..
        }
    ));
}

#[test]
fn instance_norm_is_unsupported_in_dense_blocks() {
    let device = Default::default();
    let config = LinearHeadConfig {
        latent_channels: vec![64],
        layer_order: vec![Role::Linear, Role::Norm],
        norm: Some(NormConfig::Instance {
            affine: true,
            epsilon: 1e-5,
        }),
        ..Default::default()
    };
    let err = config.init::<TestBackend>(&device).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedLayer { role: Role::Norm, .. }));
}
