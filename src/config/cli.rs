use crate::core::commitment::CommitmentTerm;
use crate::domain::model::Tier;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "gcp-sizer")]
#[command(about = "Sizing and pricing calculator for Google Cloud resources")]
pub struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Recommend a resource amount from current usage and persist the inputs.
    Recommend(RecommendArgs),
    /// Price a quantity against block-rate tiers.
    Tiered(TieredArgs),
    /// Price a month of usage with sustained-use discounts.
    SustainedUse(SustainedUseArgs),
    /// Price a committed-use contract.
    Committed(CommittedArgs),
    /// Decode a custom machine identifier.
    ParseCustom(ParseCustomArgs),
    /// Estimate a machine's monthly cost from a sku catalog.
    Estimate(EstimateArgs),
    /// Download the sku catalog to a JSON snapshot.
    FetchCatalog(FetchCatalogArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RecommendArgs {
    /// Dimension title, e.g. "vCPU" or "Memory"; also the storage key prefix.
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "units")]
    pub unit_label: String,

    #[arg(long)]
    pub current: Option<f64>,

    /// Observed utilization, percent.
    #[arg(long)]
    pub utilization: Option<f64>,

    /// Target utilization, percent.
    #[arg(long)]
    pub desired: Option<f64>,

    /// Spread around the recommendation, percent.
    #[arg(long)]
    pub spread: Option<f64>,

    /// Overrides `store.path` from the configuration.
    #[arg(long)]
    pub store: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct TieredArgs {
    #[arg(long)]
    pub quantity: f64,

    /// Tier as `threshold:rate`; repeat in ascending order.
    #[arg(long = "tier", value_parser = parse_tier, required = true)]
    pub tiers: Vec<Tier>,
}

#[derive(Debug, Clone, Args)]
pub struct SustainedUseArgs {
    /// Hourly unit price.
    #[arg(long)]
    pub unit_price: f64,

    #[arg(long)]
    pub hours: f64,

    #[arg(long, default_value = "N1")]
    pub family: String,

    #[arg(long)]
    pub preemptible: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CommittedArgs {
    #[arg(long)]
    pub cores: u32,

    #[arg(long)]
    pub ram_gb: f64,

    #[arg(long, default_value = "N1")]
    pub family: String,

    /// `1y` or `3y`.
    #[arg(long, default_value = "1y")]
    pub term: CommitmentTerm,

    #[arg(long, default_value = "us-central1")]
    pub region: String,

    #[arg(long)]
    pub sole_tenancy: bool,

    #[arg(long)]
    pub cpu_overcommit: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ParseCustomArgs {
    pub identifier: String,
}

#[derive(Debug, Clone, Args)]
pub struct EstimateArgs {
    /// Catalog snapshot written by `fetch-catalog`; fetched live when omitted.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// JSON list of predefined machine types to match against.
    #[arg(long)]
    pub machines: Option<PathBuf>,

    #[arg(long, default_value = "N1")]
    pub family: String,

    #[arg(long)]
    pub vcpu: f64,

    #[arg(long)]
    pub memory_gb: f64,

    #[arg(long, default_value = "us-central1")]
    pub region: String,

    #[arg(long, default_value = "730")]
    pub hours: f64,

    #[arg(long)]
    pub preemptible: bool,
}

#[derive(Debug, Clone, Args)]
pub struct FetchCatalogArgs {
    #[arg(long, default_value = "./catalog.json")]
    pub output: PathBuf,
}

fn parse_tier(value: &str) -> std::result::Result<Tier, String> {
    let (threshold, rate) = value
        .split_once(':')
        .ok_or_else(|| format!("expected threshold:rate, got '{}'", value))?;
    let threshold = match threshold.trim() {
        "inf" | "max" => f64::MAX,
        t => t.parse::<f64>().map_err(|e| format!("invalid threshold '{}': {}", t, e))?,
    };
    let rate = rate
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid rate '{}': {}", rate, e))?;
    Ok(Tier { threshold, rate })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tier() {
        let tier = parse_tier("100:0.023").unwrap();
        assert_eq!(tier.threshold, 100.0);
        assert_eq!(tier.rate, 0.023);
        assert_eq!(parse_tier("inf:0.02").unwrap().threshold, f64::MAX);
        assert!(parse_tier("100").is_err());
        assert!(parse_tier("abc:0.1").is_err());
    }

    #[test]
    fn test_parse_committed_command() {
        let cli = Cli::try_parse_from([
            "gcp-sizer",
            "committed",
            "--cores",
            "4",
            "--ram-gb",
            "30",
            "--term",
            "3y",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Committed(args) => {
                assert_eq!(args.cores, 4);
                assert_eq!(args.term, CommitmentTerm::ThreeYear);
                assert_eq!(args.region, "us-central1");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_tiered_requires_tiers() {
        assert!(Cli::try_parse_from(["gcp-sizer", "tiered", "--quantity", "10"]).is_err());
        let cli = Cli::try_parse_from([
            "gcp-sizer",
            "tiered",
            "--quantity",
            "650",
            "--tier",
            "100:0.023",
            "--tier",
            "500:0.022",
        ])
        .unwrap();
        let Command::Tiered(args) = cli.command else {
            panic!("expected tiered");
        };
        assert_eq!(args.tiers.len(), 2);
    }
}
