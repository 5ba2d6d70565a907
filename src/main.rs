use clap::Parser;
use gcp_sizer::config::cli::{
    CommittedArgs, EstimateArgs, FetchCatalogArgs, RecommendArgs, SustainedUseArgs, TieredArgs,
};
use gcp_sizer::core::commitment::CommitmentOptions;
use gcp_sizer::core::custom::parse_custom_with;
use gcp_sizer::core::estimate::estimate_instance;
use gcp_sizer::core::matcher::fit_or_custom;
use gcp_sizer::core::tiers::price_tiers;
use gcp_sizer::domain::model::MachineType;
use gcp_sizer::domain::ports::{CatalogSnapshot, CatalogSource};
use gcp_sizer::utils::error::ErrorSeverity;
use gcp_sizer::utils::{logger, validation};
use gcp_sizer::utils::validation::Validate;
use gcp_sizer::{
    CartLedger, Cli, Command, FileStore, GeometryModel, HttpCatalog, Result, SizerConfig,
    SkuClassifier,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting gcp-sizer CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SizerConfig> {
    let config = match path {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            SizerConfig::from_file(path)?
        }
        None => SizerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

async fn run(command: Command, config: &SizerConfig) -> Result<()> {
    match command {
        Command::Recommend(args) => recommend(args, config),
        Command::Tiered(args) => tiered(args),
        Command::SustainedUse(args) => sustained_use(args, config),
        Command::Committed(args) => committed(args, config),
        Command::ParseCustom(args) => {
            let shape = parse_custom_with(&args.identifier, &config.custom.ram_in_gb_prefixes)?;
            print_json(&shape)
        }
        Command::Estimate(args) => estimate(args, config).await,
        Command::FetchCatalog(args) => fetch_catalog(args, config).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn recommend(args: RecommendArgs, config: &SizerConfig) -> Result<()> {
    if let Some(utilization) = args.utilization {
        validation::validate_utilization("utilization", utilization)?;
    }
    if let Some(desired) = args.desired {
        validation::validate_utilization("desired", desired)?;
    }

    let store_path = args
        .store
        .unwrap_or_else(|| PathBuf::from(&config.store.path));
    let store = FileStore::open(&store_path)?;
    let mut model = GeometryModel::load(&args.title, &args.unit_label, store);

    if let Some(current) = args.current {
        model.set_current(current);
    }
    if let Some(utilization) = args.utilization {
        model.set_utilization(utilization);
    }
    if let Some(desired) = args.desired {
        model.set_utilization_desired(desired);
    }
    if let Some(spread) = args.spread {
        model.set_spread_percent(spread);
    }

    print_json(&serde_json::json!({
        "key": model.slug(),
        "input": model.input(),
        "recommendation": model.recommendation(),
        "store": store_path,
    }))
}

fn tiered(args: TieredArgs) -> Result<()> {
    let price = price_tiers(&args.tiers, args.quantity)?;
    print_json(&serde_json::json!({
        "quantity": args.quantity,
        "price": price,
    }))
}

fn sustained_use(args: SustainedUseArgs, config: &SizerConfig) -> Result<()> {
    let price = config
        .sustained_use
        .price(&args.family, args.unit_price, args.hours, args.preemptible)?;
    print_json(&price)
}

fn committed(args: CommittedArgs, config: &SizerConfig) -> Result<()> {
    let options = CommitmentOptions {
        sole_tenancy: args.sole_tenancy,
        cpu_overcommit: args.cpu_overcommit,
    };
    let price = config.commitment_pricer().price_committed(
        args.cores,
        args.ram_gb,
        &args.family,
        args.term,
        &args.region,
        options,
    )?;
    print_json(&serde_json::json!({
        "price": price,
        "monthly": price.monthly(),
    }))
}

async fn load_snapshot(path: Option<&Path>, config: &SizerConfig) -> Result<CatalogSnapshot> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let snapshot: CatalogSnapshot = serde_json::from_str(&content)?;
            tracing::info!(
                "Loaded {} skus fetched at {}",
                snapshot.skus.len(),
                snapshot.fetched_at
            );
            Ok(snapshot)
        }
        None => HttpCatalog::new(&config.catalog)?.fetch_skus().await,
    }
}

async fn estimate(args: EstimateArgs, config: &SizerConfig) -> Result<()> {
    validation::validate_range("hours", args.hours, 0.0, f64::MAX)?;

    let snapshot = load_snapshot(args.catalog.as_deref(), config).await?;
    let machines: Vec<MachineType> = match &args.machines {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let machine = fit_or_custom(&machines, args.vcpu, args.memory_gb, &args.family);
    let estimate = estimate_instance(
        &SkuClassifier::new(),
        &config.sustained_use,
        &machine,
        &snapshot.skus,
        &args.region,
        args.hours,
        args.preemptible,
    )?;

    let mut ledger = CartLedger::new(config.ledger_settings());
    for request in estimate.line_items() {
        ledger.add_line_item(request)?;
    }

    print_json(&serde_json::json!({
        "estimate": estimate,
        "cart": ledger.summary(),
    }))
}

async fn fetch_catalog(args: FetchCatalogArgs, config: &SizerConfig) -> Result<()> {
    let snapshot = HttpCatalog::new(&config.catalog)?.fetch_skus().await?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&args.output, serde_json::to_string_pretty(&snapshot)?)?;

    tracing::info!("📁 Catalog saved to: {}", args.output.display());
    println!("✅ {} skus saved to {}", snapshot.skus.len(), args.output.display());
    Ok(())
}
