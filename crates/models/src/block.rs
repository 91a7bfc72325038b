//! Turns one `(in_channels, out_channels)` pair plus a layer order into layers.

use burn::tensor::backend::Backend;

use crate::error::{ConfigError, ConfigResult};
use crate::factory::LayerSpec;
use crate::registry::LayerRegistry;
use crate::role::Role;

#[derive(Debug)]
pub struct AssembledBlock<L> {
    pub layers: Vec<L>,
    /// True when every layer maps its input to an identically shaped output.
    pub preserves_shape: bool,
    /// Stride of the width-changing layer, if one was inferred.
    pub stride: Option<usize>,
}

/// Stride implied by growing `in_channels` to `out_channels`.
///
/// Doubling the channels halves the spatial size, which replaces a separate
/// 2x2 pooling layer. Ratios that are not exact integers are rejected rather
/// than truncated.
pub fn infer_stride(block: usize, in_channels: usize, out_channels: usize) -> ConfigResult<usize> {
    if in_channels == 0 || out_channels == 0 || out_channels % in_channels != 0 {
        return Err(ConfigError::NonIntegerStride {
            block,
            in_channels,
            out_channels,
        });
    }
    Ok(out_channels / in_channels)
}

/// Build the layers of block `block` following `order`.
///
/// The width of the tensor flowing through the block is tracked while
/// walking the order: width-changing roles map it to `out_channels`,
/// every other role is built for the current width.
pub fn assemble_block<B: Backend, L>(
    registry: &LayerRegistry<B, L>,
    order: &[Role],
    block: usize,
    in_channels: usize,
    out_channels: usize,
    stride_from_ratio: bool,
    device: &B::Device,
) -> ConfigResult<AssembledBlock<L>> {
    registry.validate_order(order)?;

    let mut width = in_channels;
    let mut layers = Vec::with_capacity(order.len());
    let mut preserves_shape = true;
    let mut stride = None;

    for &role in order {
        let Some(factory) = registry.resolve(role)? else {
            continue;
        };
        let spec = if role.changes_width() {
            let mut spec = LayerSpec::new(width, out_channels);
            if stride_from_ratio {
                let inferred = infer_stride(block, width, out_channels)?;
                stride = Some(inferred);
                spec = spec.with_stride(inferred);
            }
            width = out_channels;
            spec
        } else {
            LayerSpec::preserving(width)
        };
        preserves_shape &= factory.preserves_shape(&spec);
        layers.push(factory.build(&spec, device)?);
    }

    if width != out_channels {
        return Err(ConfigError::ChannelMismatch {
            block,
            expected: out_channels,
            actual: width,
        });
    }

    Ok(AssembledBlock {
        layers,
        preserves_shape,
        stride,
    })
}
