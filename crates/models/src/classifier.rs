//! VGG-like discriminator: encoder, spatial pooling, then a linear head.
//!
//! Shapes:
//! - Input images: `[B, C, H, W]`
//! - Pooled embeddings: `[B, C_enc, P_h, P_w]`, flattened to `[B, C_enc * P_h * P_w]`
//! - Logits: `[B, head.out_channels]`

use burn::module::Module;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::encoder::{StridedConvEncoder, StridedConvEncoderConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::head::{LinearHead, LinearHeadConfig};
use crate::init::{InitConfig, NetInit};

/// Adaptive average pooling to a fixed spatial size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub output_size: [usize; 2],
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            output_size: [1, 1],
        }
    }
}

impl PoolConfig {
    pub fn init(&self) -> AdaptiveAvgPool2d {
        AdaptiveAvgPool2dConfig::new(self.output_size).init()
    }

    /// Number of values each channel is reduced to.
    pub fn cells(&self) -> usize {
        self.output_size[0] * self.output_size[1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VggConvConfig {
    pub encoder: StridedConvEncoderConfig,
    pub pool: PoolConfig,
    pub head: LinearHeadConfig,
    pub init: InitConfig,
}

impl Default for VggConvConfig {
    fn default() -> Self {
        Self {
            encoder: StridedConvEncoderConfig::default(),
            pool: PoolConfig::default(),
            head: LinearHeadConfig::new(512, 1).with_latent_channels(vec![1024]),
            init: InitConfig::default(),
        }
    }
}

impl VggConvConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConfigResult<VggConv<B>> {
        let encoder = self.encoder.init(device)?;
        let head = self.head.init(device)?;
        let model = VggConv::new(encoder, &self.pool, head, &self.init)?;
        tracing::info!(
            params = model.num_params(),
            blocks = model.encoder.num_blocks(),
            init = self.init.name(),
            "initialized discriminator"
        );
        Ok(model)
    }
}

#[derive(Module, Debug)]
pub struct VggConv<B: Backend> {
    encoder: StridedConvEncoder<B>,
    pool: AdaptiveAvgPool2d,
    head: LinearHead<B>,
}

impl<B: Backend> VggConv<B> {
    /// Compose the parts and run `init` over the whole network once.
    pub fn new<I: NetInit<B>>(
        encoder: StridedConvEncoder<B>,
        pool: &PoolConfig,
        head: LinearHead<B>,
        init: &I,
    ) -> ConfigResult<Self> {
        let pooled = encoder.out_channels() * pool.cells();
        if head.in_channels() != pooled {
            return Err(ConfigError::HeadWidthMismatch {
                expected: head.in_channels(),
                actual: pooled,
            });
        }

        Ok(init.apply(Self {
            encoder,
            pool: pool.init(),
            head,
        }))
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.encoder.forward(input));
        let [batch, channels, height, width] = x.dims();
        let x = x.reshape([batch, channels * height * width]);
        self.head.forward(x)
    }

    pub fn encoder(&self) -> &StridedConvEncoder<B> {
        &self.encoder
    }

    pub fn head(&self) -> &LinearHead<B> {
        &self.head
    }
}
