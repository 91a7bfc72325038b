use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

/// Named position of a layer inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Conv,
    Norm,
    Activation,
    Linear,
    Dropout,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Conv,
        Role::Norm,
        Role::Activation,
        Role::Linear,
        Role::Dropout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Conv => "conv",
            Role::Norm => "norm",
            Role::Activation => "activation",
            Role::Linear => "linear",
            Role::Dropout => "dropout",
        }
    }

    /// Whether a layer in this role maps `in_channels` to `out_channels`.
    /// Every other role keeps the width of its input.
    pub fn changes_width(&self) -> bool {
        matches!(self, Role::Conv | Role::Linear)
    }

    /// Parse an ordered list of role names, e.g. `["conv", "norm", "activation"]`.
    pub fn parse_order<I, S>(names: I) -> ConfigResult<Vec<Role>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownRole(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        let order = Role::parse_order(["conv", "Norm", " activation "]).unwrap();
        assert_eq!(order, vec![Role::Conv, Role::Norm, Role::Activation]);
    }

    #[test]
    fn rejects_unknown_name() {
        let err = Role::parse_order(["conv", "pool"]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownRole("pool".into()));
    }

    #[test]
    fn only_conv_and_linear_change_width() {
        let reshaping: Vec<Role> = Role::ALL
            .into_iter()
            .filter(Role::changes_width)
            .collect();
        assert_eq!(reshaping, vec![Role::Conv, Role::Linear]);
    }
}
