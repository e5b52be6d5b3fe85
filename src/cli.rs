use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kubectl-dump")]
#[command(about = "Dump every API resource type of a Kubernetes cluster into log files")]
pub struct Cli {
    /// Output directory for logs
    #[arg(short, long, default_value = "resources")]
    pub output: PathBuf,

    /// Maximum number of concurrent kubectl calls
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u16).range(1..))]
    pub max_channels: u16,

    /// Context
    #[arg(long)]
    pub context: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// kubectl binary to invoke
    #[arg(long, default_value = "kubectl")]
    pub kubectl: String,

    /// Only fetch resources whose name matches this regex
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
