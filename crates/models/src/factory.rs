//! Layer factories: the seam through which layer families are injected.
//!
//! A factory turns a [`LayerSpec`] (channel counts plus extra arguments such
//! as the inferred stride) into a concrete layer. The built-in factories are
//! plain serializable data so whole networks can be described in a config
//! file; any closure with the right signature is a factory as well.

use burn::nn::conv::Conv2dConfig;
use burn::nn::{
    BatchNormConfig, DropoutConfig, Gelu, GroupNormConfig, InstanceNormConfig, LayerNormConfig,
    LeakyReluConfig, LinearConfig, PReluConfig, PaddingConfig2d, Relu, Sigmoid, Tanh,
};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::layers::{Activation, ConvLayer, DenseLayer, Norm, Residual};
use crate::role::Role;

const CONV_CONTEXT: &str = "a convolutional block";
const DENSE_CONTEXT: &str = "a fully-connected block";

/// Arguments handed to a factory for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSpec {
    pub in_channels: usize,
    pub out_channels: usize,
    /// Only set for convolutions whose stride was inferred from the channel ratio.
    pub stride: Option<usize>,
}

impl LayerSpec {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            stride: None,
        }
    }

    /// Arguments for a layer that keeps the width of its input (norm, activation, dropout).
    pub fn preserving(channels: usize) -> Self {
        Self::new(channels, channels)
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    pub fn stride_or_default(&self) -> usize {
        self.stride.unwrap_or(1)
    }
}

/// Builds a layer of type `L` for a given [`LayerSpec`].
pub trait LayerFactory<B: Backend, L> {
    fn build(&self, spec: &LayerSpec, device: &B::Device) -> ConfigResult<L>;

    /// Whether the built layer maps a tensor to one of identical shape.
    /// Residual wrapping relies on this holding for every layer of a block.
    fn preserves_shape(&self, spec: &LayerSpec) -> bool {
        spec.in_channels == spec.out_channels && spec.stride_or_default() == 1
    }
}

impl<B, L, F> LayerFactory<B, L> for F
where
    B: Backend,
    F: Fn(&LayerSpec, &B::Device) -> ConfigResult<L>,
{
    fn build(&self, spec: &LayerSpec, device: &B::Device) -> ConfigResult<L> {
        self(spec, device)
    }
}

/// Square 2D convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conv2dFactory {
    pub kernel_size: usize,
    pub padding: usize,
    pub bias: bool,
}

impl Default for Conv2dFactory {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            padding: 1,
            bias: true,
        }
    }
}

impl<B: Backend> LayerFactory<B, ConvLayer<B>> for Conv2dFactory {
    fn build(&self, spec: &LayerSpec, device: &B::Device) -> ConfigResult<ConvLayer<B>> {
        let stride = spec.stride_or_default();
        let conv = Conv2dConfig::new(
            [spec.in_channels, spec.out_channels],
            [self.kernel_size, self.kernel_size],
        )
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(self.padding, self.padding))
        .with_bias(self.bias)
        .init(device);
        Ok(ConvLayer::Conv(conv))
    }

    fn preserves_shape(&self, spec: &LayerSpec) -> bool {
        spec.in_channels == spec.out_channels
            && spec.stride_or_default() == 1
            && self.kernel_size == 2 * self.padding + 1
    }
}

/// Fully-connected projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearFactory {
    pub bias: bool,
}

impl Default for LinearFactory {
    fn default() -> Self {
        Self { bias: true }
    }
}

impl<B: Backend> LayerFactory<B, DenseLayer<B>> for LinearFactory {
    fn build(&self, spec: &LayerSpec, device: &B::Device) -> ConfigResult<DenseLayer<B>> {
        let linear = LinearConfig::new(spec.in_channels, spec.out_channels)
            .with_bias(self.bias)
            .init(device);
        Ok(DenseLayer::Linear(linear))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormConfig {
    Batch { momentum: f64, epsilon: f64 },
    Instance { affine: bool, epsilon: f64 },
    Group { num_groups: usize, epsilon: f64 },
    Layer { epsilon: f64 },
}

impl Default for NormConfig {
    fn default() -> Self {
        NormConfig::Batch {
            momentum: 0.1,
            epsilon: 1e-5,
        }
    }
}

impl NormConfig {
    fn name(&self) -> &'static str {
        match self {
            NormConfig::Batch { .. } => "batch norm",
            NormConfig::Instance { .. } => "instance norm",
            NormConfig::Group { .. } => "group norm",
            NormConfig::Layer { .. } => "layer norm",
        }
    }

    fn init<B: Backend>(&self, channels: usize, device: &B::Device) -> ConfigResult<Norm<B>> {
        let norm = match *self {
            NormConfig::Batch { momentum, epsilon } => Norm::Batch(
                BatchNormConfig::new(channels)
                    .with_momentum(momentum)
                    .with_epsilon(epsilon)
                    .init(device),
            ),
            NormConfig::Instance { affine, epsilon } => Norm::Instance(
                InstanceNormConfig::new(channels)
                    .with_affine(affine)
                    .with_epsilon(epsilon)
                    .init(device),
            ),
            NormConfig::Group {
                num_groups,
                epsilon,
            } => {
                if num_groups == 0 || channels % num_groups != 0 {
                    return Err(ConfigError::InvalidGroups {
                        num_groups,
                        channels,
                    });
                }
                Norm::Group(
                    GroupNormConfig::new(num_groups, channels)
                        .with_epsilon(epsilon)
                        .init(device),
                )
            }
            NormConfig::Layer { epsilon } => Norm::Layer(
                LayerNormConfig::new(channels)
                    .with_epsilon(epsilon)
                    .init(device),
            ),
        };
        Ok(norm)
    }

    fn unsupported(&self, context: &'static str) -> ConfigError {
        ConfigError::UnsupportedLayer {
            layer: self.name(),
            role: Role::Norm,
            context,
        }
    }
}

impl<B: Backend> LayerFactory<B, ConvLayer<B>> for NormConfig {
    fn build(&self, spec: &LayerSpec, device: &B::Device) -> ConfigResult<ConvLayer<B>> {
        // Layer norm normalizes the trailing (width) axis, not channels.
        if matches!(self, NormConfig::Layer { .. }) {
            return Err(self.unsupported(CONV_CONTEXT));
        }
        self.init(spec.out_channels, device).map(ConvLayer::from)
    }
}

impl<B: Backend> LayerFactory<B, DenseLayer<B>> for NormConfig {
    fn build(&self, spec: &LayerSpec, device: &B::Device) -> ConfigResult<DenseLayer<B>> {
        match self {
            NormConfig::Batch { .. } | NormConfig::Layer { .. } => {
                self.init(spec.out_channels, device).map(DenseLayer::from)
            }
            NormConfig::Instance { .. } | NormConfig::Group { .. } => {
                Err(self.unsupported(DENSE_CONTEXT))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivationConfig {
    Relu,
    LeakyRelu { negative_slope: f64 },
    Gelu,
    Sigmoid,
    Tanh,
    /// Learnable slope; one per channel unless `shared`.
    PRelu { shared: bool, alpha: f64 },
}

impl Default for ActivationConfig {
    fn default() -> Self {
        ActivationConfig::LeakyRelu {
            negative_slope: 0.2,
        }
    }
}

impl ActivationConfig {
    pub fn init<B: Backend>(&self, channels: usize, device: &B::Device) -> Activation<B> {
        match *self {
            ActivationConfig::Relu => Activation::Relu(Relu::new()),
            ActivationConfig::LeakyRelu { negative_slope } => Activation::LeakyRelu(
                LeakyReluConfig::new()
                    .with_negative_slope(negative_slope)
                    .init(),
            ),
            ActivationConfig::Gelu => Activation::Gelu(Gelu::new()),
            ActivationConfig::Sigmoid => Activation::Sigmoid(Sigmoid::new()),
            ActivationConfig::Tanh => Activation::Tanh(Tanh::new()),
            ActivationConfig::PRelu { shared, alpha } => {
                let num_parameters = if shared { 1 } else { channels };
                Activation::PRelu(
                    PReluConfig::new()
                        .with_num_parameters(num_parameters)
                        .with_alpha(alpha)
                        .init(device),
                )
            }
        }
    }
}

impl<B: Backend> LayerFactory<B, ConvLayer<B>> for ActivationConfig {
    fn build(&self, spec: &LayerSpec, device: &B::Device) -> ConfigResult<ConvLayer<B>> {
        Ok(self.init(spec.out_channels, device).into())
    }
}

impl<B: Backend> LayerFactory<B, DenseLayer<B>> for ActivationConfig {
    fn build(&self, spec: &LayerSpec, device: &B::Device) -> ConfigResult<DenseLayer<B>> {
        Ok(self.init(spec.out_channels, device).into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropoutFactory {
    pub prob: f64,
}

impl Default for DropoutFactory {
    fn default() -> Self {
        Self { prob: 0.5 }
    }
}

impl<B: Backend> LayerFactory<B, DenseLayer<B>> for DropoutFactory {
    fn build(&self, _spec: &LayerSpec, _device: &B::Device) -> ConfigResult<DenseLayer<B>> {
        if !(0.0..1.0).contains(&self.prob) {
            return Err(ConfigError::InvalidDropout(self.prob));
        }
        Ok(DenseLayer::Dropout(DropoutConfig::new(self.prob).init()))
    }
}

/// Residual adapter applied to blocks whose input and output widths match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidualConfig {
    pub scale: f64,
}

impl Default for ResidualConfig {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl ResidualConfig {
    pub fn init(&self) -> Residual {
        Residual::new(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn conv_preserves_shape_only_with_same_padding_and_unit_stride() {
        let conv = Conv2dFactory::default();
        let same = LayerSpec::preserving(16);
        assert!(LayerFactory::<TestBackend, ConvLayer<TestBackend>>::preserves_shape(&conv, &same));
        assert!(!LayerFactory::<TestBackend, ConvLayer<TestBackend>>::preserves_shape(
            &conv,
            &same.with_stride(2)
        ));

        let valid = Conv2dFactory {
            padding: 0,
            ..Default::default()
        };
        assert!(!LayerFactory::<TestBackend, ConvLayer<TestBackend>>::preserves_shape(
            &valid, &same
        ));
    }

    #[test]
    fn layer_norm_is_rejected_in_conv_blocks() {
        let device = Default::default();
        let norm = NormConfig::Layer { epsilon: 1e-5 };
        let err = LayerFactory::<TestBackend, ConvLayer<TestBackend>>::build(
            &norm,
            &LayerSpec::preserving(8),
            &device,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedLayer {
                role: Role::Norm,
                ..
            }
        ));
    }

    #[test]
    fn group_norm_requires_divisible_channels() {
        let device = Default::default();
        let norm = NormConfig::Group {
            num_groups: 3,
            epsilon: 1e-5,
        };
        let err = LayerFactory::<TestBackend, ConvLayer<TestBackend>>::build(
            &norm,
            &LayerSpec::preserving(8),
            &device,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidGroups {
                num_groups: 3,
                channels: 8
            }
        );
    }

    #[test]
    fn dropout_probability_is_validated() {
        let device = Default::default();
        let dropout = DropoutFactory { prob: 1.0 };
        let err = LayerFactory::<TestBackend, DenseLayer<TestBackend>>::build(
            &dropout,
            &LayerSpec::preserving(4),
            &device,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidDropout(1.0));
    }

    #[test]
    fn closures_act_as_factories() {
        let device = Default::default();
        let factory = |spec: &LayerSpec,
                       device: &<TestBackend as Backend>::Device|
         -> ConfigResult<DenseLayer<TestBackend>> {
            Ok(DenseLayer::Linear(
                LinearConfig::new(spec.in_channels, spec.out_channels).init(device),
            ))
        };
        let layer = LayerFactory::<TestBackend, DenseLayer<TestBackend>>::build(
            &factory,
            &LayerSpec::new(4, 2),
            &device,
        )
        .unwrap();
        assert_eq!(layer.role(), Role::Linear);
    }
}
