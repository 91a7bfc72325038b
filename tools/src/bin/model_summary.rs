use std::path::PathBuf;

use anyhow::Context;
use burn::backend::NdArray;
use burn::module::Module;
use burn::tensor::Tensor;
use clap::{Parser, ValueEnum};
use model_tools::SummaryConfig;
use models::{Role, VggConv};
use tracing_subscriber::EnvFilter;

type SummaryBackend = NdArray<f32>;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum BackendKind {
    NdArray,
}

#[derive(Parser, Debug)]
#[command(
    name = "model_summary",
    about = "Build the VGG-style discriminator from config and print its layout"
)]
struct Args {
    /// Config file (falls back to $VGGCONV_CONFIG, then ./vggconv.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the probe batch size.
    #[arg(long)]
    batch: Option<usize>,
    /// Override the probe image height.
    #[arg(long)]
    height: Option<usize>,
    /// Override the probe image width.
    #[arg(long)]
    width: Option<usize>,
    /// Backend to build on.
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    backend: BackendKind,
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn print_layout(model: &VggConv<SummaryBackend>) {
    let encoder = model.encoder();
    let schedule = encoder.channel_schedule();
    println!("encoder: {} blocks", encoder.num_blocks());
    for (idx, block) in encoder.blocks().iter().enumerate() {
        let residual = if block.is_residual() { " (residual)" } else { "" };
        println!(
            "  [{idx}] {:>4} -> {:<4} {}{residual}",
            schedule[idx],
            schedule[idx + 1],
            join_roles(&block.roles())
        );
    }
    let head = model.head();
    println!(
        "head: {} -> {} {}",
        head.in_channels(),
        head.out_channels(),
        join_roles(&head.roles())
    );
    println!("parameters: {}", model.num_params());
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = SummaryConfig::load(args.config.as_deref())?;
    if let Some(batch) = args.batch {
        cfg.input.batch = batch;
    }
    if let Some(height) = args.height {
        cfg.input.height = height;
    }
    if let Some(width) = args.width {
        cfg.input.width = width;
    }

    match args.backend {
        BackendKind::NdArray => {
            let device = <SummaryBackend as burn::tensor::backend::Backend>::Device::default();
            let model = cfg
                .model
                .init::<SummaryBackend>(&device)
                .context("invalid model configuration")?;
            print_layout(&model);

            let probe = Tensor::<SummaryBackend, 4>::zeros(cfg.input.dims(), &device);
            let logits = model.forward(probe);
            println!("input {:?} -> logits {:?}", cfg.input.dims(), logits.dims());
        }
    }
    Ok(())
}
