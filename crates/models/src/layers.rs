//! Layer modules produced by the factories.
//!
//! Each role resolves to one variant of a tagged enum, so an assembled block
//! is a plain `Vec` of concrete burn modules with no "is this enabled"
//! branching left in the forward path.
//!
//! Shapes:
//! - [`ConvLayer`]: `[B, C, H, W]`
//! - [`DenseLayer`]: `[B, F]`

use burn::module::Module;
use burn::nn::conv::Conv2d;
use burn::nn::{
    BatchNorm, Dropout, Gelu, GroupNorm, InstanceNorm, LayerNorm, LeakyRelu, Linear, PRelu, Relu,
    Sigmoid, Tanh,
};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::role::Role;

#[derive(Module, Debug)]
pub enum Activation<B: Backend> {
    Relu(Relu),
    LeakyRelu(LeakyRelu),
    Gelu(Gelu),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
    PRelu(PRelu<B>),
}

impl<B: Backend> Activation<B> {
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Relu(act) => act.forward(input),
            Activation::LeakyRelu(act) => act.forward(input),
            Activation::Gelu(act) => act.forward(input),
            Activation::Sigmoid(act) => act.forward(input),
            Activation::Tanh(act) => act.forward(input),
            Activation::PRelu(act) => act.forward(input),
        }
    }
}

/// Normalization over the channel (feature) dimension.
#[derive(Module, Debug)]
pub enum Norm<B: Backend> {
    Batch(BatchNorm<B>),
    Instance(InstanceNorm<B>),
    Group(GroupNorm<B>),
    Layer(LayerNorm<B>),
}

impl<B: Backend> Norm<B> {
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Norm::Batch(norm) => norm.forward(input),
            Norm::Instance(norm) => norm.forward(input),
            Norm::Group(norm) => norm.forward(input),
            Norm::Layer(norm) => norm.forward(input),
        }
    }
}

/// A single layer of a convolutional block.
#[derive(Module, Debug)]
pub enum ConvLayer<B: Backend> {
    Conv(Conv2d<B>),
    Norm(Norm<B>),
    Activation(Activation<B>),
}

impl<B: Backend> ConvLayer<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            ConvLayer::Conv(conv) => conv.forward(input),
            ConvLayer::Norm(norm) => norm.forward(input),
            ConvLayer::Activation(act) => act.forward(input),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            ConvLayer::Conv(_) => Role::Conv,
            ConvLayer::Norm(_) => Role::Norm,
            ConvLayer::Activation(_) => Role::Activation,
        }
    }
}

impl<B: Backend> From<Norm<B>> for ConvLayer<B> {
    fn from(norm: Norm<B>) -> Self {
        ConvLayer::Norm(norm)
    }
}

impl<B: Backend> From<Activation<B>> for ConvLayer<B> {
    fn from(act: Activation<B>) -> Self {
        ConvLayer::Activation(act)
    }
}

/// A single layer of a fully-connected block.
#[derive(Module, Debug)]
pub enum DenseLayer<B: Backend> {
    Linear(Linear<B>),
    Norm(Norm<B>),
    Activation(Activation<B>),
    Dropout(Dropout),
}

impl<B: Backend> DenseLayer<B> {
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            DenseLayer::Linear(linear) => linear.forward(input),
            DenseLayer::Norm(norm) => norm.forward(input),
            DenseLayer::Activation(act) => act.forward(input),
            DenseLayer::Dropout(dropout) => dropout.forward(input),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            DenseLayer::Linear(_) => Role::Linear,
            DenseLayer::Norm(_) => Role::Norm,
            DenseLayer::Activation(_) => Role::Activation,
            DenseLayer::Dropout(_) => Role::Dropout,
        }
    }
}

impl<B: Backend> From<Norm<B>> for DenseLayer<B> {
    fn from(norm: Norm<B>) -> Self {
        DenseLayer::Norm(norm)
    }
}

impl<B: Backend> From<Activation<B>> for DenseLayer<B> {
    fn from(act: Activation<B>) -> Self {
        DenseLayer::Activation(act)
    }
}

/// Additive skip around a shape-preserving block: `input + scale * block(input)`.
#[derive(Module, Clone, Debug)]
pub struct Residual {
    pub scale: f64,
}

impl Residual {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    pub fn forward<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
        block_output: Tensor<B, D>,
    ) -> Tensor<B, D> {
        if self.scale == 1.0 {
            input + block_output
        } else {
            input + block_output.mul_scalar(self.scale)
        }
    }
}
