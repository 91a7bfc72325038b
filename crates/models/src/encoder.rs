//! Fully convolutional encoder with strided downsampling.
//!
//! Shapes:
//! - Input: `[B, layers[0], H, W]`
//! - Output: `[B, layers[last], H / s, W / s]` where `s` is the product of
//!   the per-block strides (`out_channels / in_channels`).

use burn::module::{Ignored, Module};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::block::assemble_block;
use crate::error::{ConfigError, ConfigResult};
use crate::factory::{ActivationConfig, Conv2dFactory, NormConfig, ResidualConfig};
use crate::layers::{ConvLayer, Residual};
use crate::registry::LayerRegistry;
use crate::role::Role;

const CONTEXT: &str = "the strided conv encoder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StridedConvEncoderConfig {
    /// Feature map width at each block boundary.
    pub layers: Vec<usize>,
    /// Layers applied within each non-stem block, in order.
    pub layer_order: Vec<Role>,
    pub conv: Conv2dFactory,
    pub norm: Option<NormConfig>,
    pub activation: ActivationConfig,
    pub residual: Option<ResidualConfig>,
}

impl Default for StridedConvEncoderConfig {
    fn default() -> Self {
        Self {
            layers: vec![3, 64, 128, 128, 256, 256, 512, 512],
            layer_order: vec![Role::Conv, Role::Norm, Role::Activation],
            conv: Conv2dFactory::default(),
            norm: Some(NormConfig::default()),
            activation: ActivationConfig::default(),
            residual: None,
        }
    }
}

impl StridedConvEncoderConfig {
    pub fn registry<B: Backend>(&self) -> LayerRegistry<B, ConvLayer<B>> {
        LayerRegistry::new(CONTEXT)
            .with(Role::Conv, self.conv)
            .with(Role::Activation, self.activation)
            .with_optional(Role::Norm, self.norm)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ConfigResult<StridedConvEncoder<B>> {
        StridedConvEncoder::new(
            &self.layers,
            &self.layer_order,
            &self.registry(),
            self.residual.as_ref(),
            device,
        )
    }
}

/// One encoder stage, optionally wrapped in an additive skip.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    layers: Vec<ConvLayer<B>>,
    residual: Option<Residual>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(layers: Vec<ConvLayer<B>>) -> Self {
        Self {
            layers,
            residual: None,
        }
    }

    /// Wrap the block so that it computes `input + scale * block(input)`.
    pub fn wrap(self, residual: Residual) -> Self {
        Self {
            residual: Some(residual),
            ..self
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match &self.residual {
            Some(residual) => {
                let output = self.forward_layers(input.clone());
                residual.forward(input, output)
            }
            None => self.forward_layers(input),
        }
    }

    fn forward_layers(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.layers
            .iter()
            .fold(input, |x, layer| layer.forward(x))
    }

    pub fn layers(&self) -> &[ConvLayer<B>] {
        &self.layers
    }

    pub fn roles(&self) -> Vec<Role> {
        self.layers.iter().map(ConvLayer::role).collect()
    }

    pub fn is_residual(&self) -> bool {
        self.residual.is_some()
    }
}

#[derive(Module, Debug)]
pub struct StridedConvEncoder<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    channels: Ignored<Vec<usize>>,
}

impl<B: Backend> StridedConvEncoder<B> {
    /// Assemble the encoder.
    ///
    /// Block 0 is a stem of `conv` then `activation` with no stride
    /// inference. Every later pair of `layers` becomes one block built from
    /// `layer_order`; blocks with equal input and output widths are wrapped
    /// in `residual` when one is given.
    pub fn new(
        layers: &[usize],
        layer_order: &[Role],
        registry: &LayerRegistry<B, ConvLayer<B>>,
        residual: Option<&ResidualConfig>,
        device: &B::Device,
    ) -> ConfigResult<Self> {
        validate_schedule(layers)?;
        registry.validate_order(layer_order)?;

        let mut blocks = Vec::with_capacity(layers.len() - 1);

        let stem = assemble_block(
            registry,
            &[Role::Conv, Role::Activation],
            0,
            layers[0],
            layers[1],
            false,
            device,
        )?;
        tracing::debug!(
            block = 0,
            in_channels = layers[0],
            out_channels = layers[1],
            "assembled stem block"
        );
        blocks.push(ConvBlock::new(stem.layers));

        for (i, pair) in layers[1..].windows(2).enumerate() {
            let index = i + 1;
            let (in_ch, out_ch) = (pair[0], pair[1]);
            let assembled =
                assemble_block(registry, layer_order, index, in_ch, out_ch, true, device)?;
            let mut block = ConvBlock::new(assembled.layers);

            if let Some(residual) = residual.filter(|_| in_ch == out_ch) {
                if !assembled.preserves_shape {
                    return Err(ConfigError::ResidualShape { block: index });
                }
                block = block.wrap(residual.init());
            }

            tracing::debug!(
                block = index,
                in_channels = in_ch,
                out_channels = out_ch,
                stride = assembled.stride,
                residual = block.is_residual(),
                "assembled encoder block"
            );
            blocks.push(block);
        }

        Ok(Self {
            blocks,
            channels: Ignored(layers.to_vec()),
        })
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks
            .iter()
            .fold(input, |x, block| block.forward(x))
    }

    /// Number of channels in the feature map of the input.
    pub fn in_channels(&self) -> usize {
        self.channels.0[0]
    }

    /// Number of channels produced by the encoder.
    pub fn out_channels(&self) -> usize {
        self.channels.0[self.channels.0.len() - 1]
    }

    pub fn channel_schedule(&self) -> &[usize] {
        &self.channels.0
    }

    pub fn blocks(&self) -> &[ConvBlock<B>] {
        &self.blocks
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}

fn validate_schedule(layers: &[usize]) -> ConfigResult<()> {
    if layers.len() < 2 {
        return Err(ConfigError::ScheduleTooShort { len: layers.len() });
    }
    if let Some(index) = layers.iter().position(|&c| c == 0) {
        return Err(ConfigError::ZeroChannels { index });
    }
    Ok(())
}
