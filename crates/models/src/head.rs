//! Stack of fully-connected layers used to classify embeddings.

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::block::assemble_block;
use crate::error::{ConfigError, ConfigResult};
use crate::factory::{ActivationConfig, DropoutFactory, LinearFactory, NormConfig};
use crate::layers::DenseLayer;
use crate::registry::LayerRegistry;
use crate::role::Role;

const CONTEXT: &str = "the linear head";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearHeadConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    /// Widths of the hidden layers; empty for a single projection.
    pub latent_channels: Vec<usize>,
    pub layer_order: Vec<Role>,
    pub linear: LinearFactory,
    pub activation: Option<ActivationConfig>,
    pub norm: Option<NormConfig>,
    pub dropout: Option<DropoutFactory>,
}

impl Default for LinearHeadConfig {
    fn default() -> Self {
        Self {
            in_channels: 512,
            out_channels: 1,
            latent_channels: Vec::new(),
            layer_order: vec![Role::Linear, Role::Activation],
            linear: LinearFactory::default(),
            activation: Some(ActivationConfig::default()),
            norm: None,
            dropout: None,
        }
    }
}

impl LinearHeadConfig {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            ..Default::default()
        }
    }

    pub fn with_latent_channels(mut self, latent_channels: Vec<usize>) -> Self {
        self.latent_channels = latent_channels;
        self
    }

    pub fn registry<B: Backend>(&self) -> LayerRegistry<B, DenseLayer<B>> {
        LayerRegistry::new(CONTEXT)
            .with(Role::Linear, self.linear)
            .with_optional(Role::Activation, self.activation)
            .with_optional(Role::Norm, self.norm)
            .with_optional(Role::Dropout, self.dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ConfigResult<LinearHead<B>> {
        LinearHead::new(
            self.in_channels,
            self.out_channels,
            &self.latent_channels,
            &self.layer_order,
            &self.registry(),
            device,
        )
    }
}

#[derive(Module, Debug)]
pub struct LinearHead<B: Backend> {
    layers: Vec<DenseLayer<B>>,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> LinearHead<B> {
    /// Assemble the head.
    ///
    /// Every hidden pair of widths gets the full `layer_order`; the last
    /// pair is a bare linear projection so the head emits raw logits.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        latent_channels: &[usize],
        layer_order: &[Role],
        registry: &LayerRegistry<B, DenseLayer<B>>,
        device: &B::Device,
    ) -> ConfigResult<Self> {
        registry.validate_order(layer_order)?;

        let mut channels = Vec::with_capacity(latent_channels.len() + 2);
        channels.push(in_channels);
        channels.extend_from_slice(latent_channels);
        channels.push(out_channels);
        if let Some(index) = channels.iter().position(|&c| c == 0) {
            return Err(ConfigError::ZeroChannels { index });
        }
        let pairs: Vec<(usize, usize)> = channels.windows(2).map(|w| (w[0], w[1])).collect();
        let (hidden, last) = pairs.split_at(pairs.len() - 1);
        let (last_in, last_out) = last[0];

        let mut layers = Vec::new();
        for (index, &(in_ch, out_ch)) in hidden.iter().enumerate() {
            let block =
                assemble_block(registry, layer_order, index, in_ch, out_ch, false, device)?;
            layers.extend(block.layers);
        }
        let projection = assemble_block(
            registry,
            &[Role::Linear],
            hidden.len(),
            last_in,
            last_out,
            false,
            device,
        )?;
        layers.extend(projection.layers);

        tracing::debug!(
            in_channels,
            out_channels,
            hidden = hidden.len(),
            layers = layers.len(),
            "assembled linear head"
        );

        Ok(Self {
            layers,
            in_channels,
            out_channels,
        })
    }

    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.layers
            .iter()
            .fold(input, |x, layer| layer.forward(x))
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn layers(&self) -> &[DenseLayer<B>] {
        &self.layers
    }

    pub fn roles(&self) -> Vec<Role> {
        self.layers.iter().map(DenseLayer::role).collect()
    }
}
