#![recursion_limit = "256"]

//! Burn building blocks for the super-resolution discriminator.
//!
//! This crate assembles variable-depth networks from abstract descriptions:
//! - `StridedConvEncoder`: conv blocks from a channel schedule, downsampling by
//!   strided convolution whenever the channel count grows.
//! - `LinearHead`: fully-connected blocks ending in a bare projection (raw logits).
//! - `VggConv`: encoder, adaptive pooling and head chained into one classifier.
//!
//! Layers are never named directly by the networks. Each block follows a layer
//! order (`conv`, `norm`, `activation`, `linear`, `dropout`) and resolves every
//! role through a `LayerRegistry` of `LayerFactory` values, so a layer family can be
//! swapped or disabled without touching the assembly code.
//!
//! ## Design Note
//! All validation happens at assembly time and surfaces as `ConfigError`.
//! Once built, a network is structurally immutable; only parameter values change.

pub mod block;
pub mod classifier;
pub mod encoder;
pub mod error;
pub mod factory;
pub mod head;
pub mod init;
pub mod layers;
pub mod registry;
pub mod role;

pub use classifier::{PoolConfig, VggConv, VggConvConfig};
pub use encoder::{ConvBlock, StridedConvEncoder, StridedConvEncoderConfig};
pub use error::{ConfigError, ConfigResult};
pub use factory::{
    ActivationConfig, Conv2dFactory, DropoutFactory, LayerFactory, LayerSpec, LinearFactory,
    NormConfig, ResidualConfig,
};
pub use head::{LinearHead, LinearHeadConfig};
pub use init::{FanMode, InitConfig, NetInit};
pub use layers::{ConvLayer, DenseLayer};
pub use registry::{LayerRegistry, Slot};
pub use role::Role;

pub mod prelude {
    pub use super::{
        ConfigError, ConfigResult, InitConfig, LayerFactory, LayerRegistry, LayerSpec,
        LinearHead, LinearHeadConfig, Role, StridedConvEncoder, StridedConvEncoderConfig,
        VggConv, VggConvConfig,
    };
}
