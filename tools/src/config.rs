use std::path::{Path, PathBuf};

use anyhow::Context;
use models::VggConvConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_NAME: &str = "vggconv.toml";
const CONFIG_ENV: &str = "VGGCONV_CONFIG";

/// Shape of the probe batch pushed through the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputShape {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Default for InputShape {
    fn default() -> Self {
        Self {
            batch: 4,
            channels: 3,
            height: 128,
            width: 128,
        }
    }
}

impl InputShape {
    pub fn dims(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub model: VggConvConfig,
    pub input: InputShape,
    /// File the config was read from; `None` when running on defaults.
    pub source: Option<PathBuf>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: VggConvConfig::default(),
            input: InputShape::default(),
            source: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct SummaryConfigFile {
    model: Option<VggConvConfig>,
    input: Option<InputShape>,
}

impl SummaryConfig {
    /// Resolve the config: explicit path, then `VGGCONV_CONFIG`, then
    /// `vggconv.toml` in the working directory, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let cfg = if let Some(path) = explicit {
            Self::from_path(&expand_path(&path.to_string_lossy()))?
        } else if let Ok(raw) = std::env::var(CONFIG_ENV) {
            Self::from_path(&expand_path(&raw))?
        } else if Path::new(DEFAULT_CONFIG_NAME).exists() {
            Self::from_path(Path::new(DEFAULT_CONFIG_NAME))?
        } else {
            tracing::info!("no config file found; using default discriminator");
            Self::default()
        };
        cfg.warn_if_invalid();
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut cfg = Self::from_toml(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        cfg.source = Some(path.to_path_buf());
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let file: SummaryConfigFile = toml::from_str(raw)?;
        Ok(Self {
            model: file.model.unwrap_or_default(),
            input: file.input.unwrap_or_default(),
            source: None,
        })
    }

    /// Total spatial reduction of the encoder, assuming every ratio is exact.
    pub fn downsample_factor(&self) -> usize {
        let layers = &self.model.encoder.layers;
        layers
            .iter()
            .skip(1)
            .zip(layers.iter().skip(2))
            .filter(|&(&i, &o)| i > 0 && o % i == 0)
            .map(|(&i, &o)| o / i)
            .product()
    }

    fn warn_if_invalid(&self) {
        let encoder_in = self.model.encoder.layers.first().copied().unwrap_or(0);
        if self.input.channels != encoder_in {
            tracing::warn!(
                input = self.input.channels,
                encoder = encoder_in,
                "input channels do not match the encoder; forward will fail"
            );
        }
        if self.input.dims().contains(&0) {
            tracing::warn!(dims = ?self.input.dims(), "input shape has a zero dimension");
        }
        let factor = self.downsample_factor();
        if factor > 1 && (self.input.height % factor != 0 || self.input.width % factor != 0) {
            tracing::warn!(
                factor,
                height = self.input.height,
                width = self.input.width,
                "input size is not a multiple of the encoder downsampling"
            );
        }
    }
}

/// Config path with a leading `~` mapped to `$HOME` and `${VAR}` expanded.
pub fn expand_path(raw: &str) -> PathBuf {
    let home_relative = raw
        .strip_prefix('~')
        .zip(std::env::var("HOME").ok())
        .map(|(rest, home)| format!("{home}{rest}"));
    PathBuf::from(expand_env(home_relative.as_deref().unwrap_or(raw)))
}

/// Replace `${VAR}` with its value; unknown variables are left in place.
pub fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        match tail.find('}') {
            Some(end) => {
                let key = &tail[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => out.push_str(&rest[start..start + end + 3]),
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
