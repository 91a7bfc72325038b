//! Assembly-time configuration errors.

use thiserror::Error;

use crate::role::Role;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Raised while a network is being assembled from its configuration.
///
/// Forward-time shape problems are reported by burn itself and never pass
/// through this type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("channel schedule needs at least 2 entries, got {len}")]
    ScheduleTooShort { len: usize },
    #[error("channel schedule entry {index} is zero")]
    ZeroChannels { index: usize },
    #[error("unknown layer role `{0}`")]
    UnknownRole(String),
    #[error("role `{role}` is not registered for {context}")]
    UnregisteredRole { role: Role, context: &'static str },
    #[error(
        "block {block}: {out_channels} output channels is not an integer multiple of {in_channels} input channels"
    )]
    NonIntegerStride {
        block: usize,
        in_channels: usize,
        out_channels: usize,
    },
    #[error("block {block}: layer order ends at {actual} channels, expected {expected}")]
    ChannelMismatch {
        block: usize,
        expected: usize,
        actual: usize,
    },
    #[error("block {block}: residual wrapping needs a shape-preserving block")]
    ResidualShape { block: usize },
    #[error("{layer} cannot be used as a `{role}` layer in {context}")]
    UnsupportedLayer {
        layer: &'static str,
        role: Role,
        context: &'static str,
    },
    #[error("group norm: {channels} channels are not divisible into {num_groups} groups")]
    InvalidGroups { num_groups: usize, channels: usize },
    #[error("dropout probability {0} is outside [0, 1)")]
    InvalidDropout(f64),
    #[error("head expects {expected} input features but the pooled encoder yields {actual}")]
    HeadWidthMismatch { expected: usize, actual: usize },
}
