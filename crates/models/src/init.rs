//! One-shot parameter initialization applied to an assembled network.

use burn::module::{Module, ModuleMapper, Param};
use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Distribution, Int, Tensor};
use serde::{Deserialize, Serialize};

/// Mutates the parameters of a fully assembled module.
pub trait NetInit<B: Backend> {
    fn apply<M: Module<B>>(&self, module: M) -> M;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanMode {
    #[default]
    FanIn,
    FanOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitConfig {
    /// Keep the initialization burn applied when each layer was built.
    Framework,
    /// He-normal weights scaled for a leaky ReLU with `negative_slope`.
    KaimingNormal { negative_slope: f64, mode: FanMode },
}

impl Default for InitConfig {
    fn default() -> Self {
        InitConfig::KaimingNormal {
            negative_slope: 0.2,
            mode: FanMode::FanIn,
        }
    }
}

impl<B: Backend> NetInit<B> for InitConfig {
    fn apply<M: Module<B>>(&self, module: M) -> M {
        match *self {
            InitConfig::Framework => module,
            InitConfig::KaimingNormal {
                negative_slope,
                mode,
            } => module.map(&mut KaimingNormal {
                gain: leaky_relu_gain(negative_slope),
                mode,
            }),
        }
    }
}

impl InitConfig {
    pub fn name(&self) -> &'static str {
        match self {
            InitConfig::Framework => "framework",
            InitConfig::KaimingNormal { .. } => "kaiming_normal",
        }
    }
}

pub fn leaky_relu_gain(negative_slope: f64) -> f64 {
    (2.0 / (1.0 + negative_slope * negative_slope)).sqrt()
}

/// Fan-in and fan-out of a weight tensor.
///
/// Linear weights are stored `[d_input, d_output]`; conv kernels are
/// `[channels_out, channels_in / groups, k_h, k_w]`. Rank-1 parameters have
/// no fan and are left alone.
pub fn fans(dims: &[usize]) -> Option<(usize, usize)> {
    match dims {
        [d_input, d_output] => Some((*d_input, *d_output)),
        [out_ch, in_ch, kernel @ ..] if !kernel.is_empty() => {
            let receptive: usize = kernel.iter().product();
            Some((in_ch * receptive, out_ch * receptive))
        }
        _ => None,
    }
}

struct KaimingNormal {
    gain: f64,
    mode: FanMode,
}

impl<B: Backend> ModuleMapper<B> for KaimingNormal {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let (id, tensor, mapper) = param.consume();
        let tensor = match fans(&tensor.dims()) {
            Some((fan_in, fan_out)) => {
                let fan = match self.mode {
                    FanMode::FanIn => fan_in,
                    FanMode::FanOut => fan_out,
                };
                let std = self.gain / (fan.max(1) as f64).sqrt();
                let device = tensor.device();
                Tensor::random(tensor.shape(), Distribution::Normal(0.0, std), &device)
            }
            None => tensor,
        };
        Param::from_mapped_value(id, tensor, mapper)
    }

    fn map_int<const D: usize>(
        &mut self,
        param: Param<Tensor<B, D, Int>>,
    ) -> Param<Tensor<B, D, Int>> {
        param
    }

    fn map_bool<const D: usize>(
        &mut self,
        param: Param<Tensor<B, D, Bool>>,
    ) -> Param<Tensor<B, D, Bool>> {
        param
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fans_follow_burn_weight_layouts() {
        assert_eq!(fans(&[512, 128]), Some((512, 128)));
        assert_eq!(fans(&[64, 3, 3, 3]), Some((27, 576)));
        assert_eq!(fans(&[64]), None);
    }

    #[test]
    fn gain_matches_relu_at_zero_slope() {
        assert!((leaky_relu_gain(0.0) - 2f64.sqrt()).abs() < 1e-12);
        assert!(leaky_relu_gain(0.2) < leaky_relu_gain(0.0));
    }
}
