use gcp_sizer::core::commitment::{CommitmentOptions, CommitmentPricer, CommitmentTerm};
use gcp_sizer::core::custom::parse_custom;
use gcp_sizer::core::tiers::{price_sustained_use, price_tiers, SustainedUseTables};
use gcp_sizer::domain::model::{SustainedUseTierSet, Tier};
use gcp_sizer::SizerError;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_block_rate_storage_tiers() {
    let tiers = [
        Tier { threshold: 100.0, rate: 0.023 },
        Tier { threshold: 500.0, rate: 0.022 },
        Tier { threshold: 1000.0, rate: 0.021 },
    ];

    assert!(close(price_tiers(&tiers, 650.0).unwrap(), 14.25));
    assert!(close(price_tiers(&tiers, 0.0).unwrap(), 0.0));
    assert!(close(price_tiers(&tiers, 100.0).unwrap(), 2.3));
}

#[test]
fn test_block_rate_rejects_unordered_thresholds() {
    let tiers = [
        Tier { threshold: 500.0, rate: 0.022 },
        Tier { threshold: 500.0, rate: 0.021 },
    ];
    assert!(matches!(
        price_tiers(&tiers, 10.0),
        Err(SizerError::MalformedTiers { .. })
    ));
}

#[test]
fn test_sustained_use_blending() {
    let tiers = SustainedUseTierSet::from_pairs(&[(0.5, 1.0), (1.0, 0.8)]).unwrap();
    let result = price_sustained_use(1.0, 80.0, &tiers, 100.0);

    assert!(close(result.total_price, 74.0));
    assert!(close(result.cumulative_discount, 0.075));
    assert!(close(result.effective_rate, 0.925));
}

#[test]
fn test_sustained_use_breakdown_sums_to_total() {
    let tables = SustainedUseTables::default();
    for family in ["N1", "N2", "E2", "M2"] {
        for hours in [0.0, 50.0, 182.5, 400.0, 730.0] {
            let result = tables.price(family, 0.0475, hours, false).unwrap();
            let sum: f64 = result.breakdown.iter().map(|band| band.price).sum();
            assert!(close(sum, result.total_price));
            assert!(result.cumulative_discount >= -1e-12 && result.cumulative_discount <= 1.0);
        }
    }
}

#[test]
fn test_custom_identifier() {
    let shape = parse_custom("CUSTOM-4-16384").unwrap();
    assert_eq!(shape.cores, 4);
    assert!(close(shape.ram_gb, 16.0));

    let identifier = "CP-COMPUTEENGINE-VMIMAGE-N2-CUSTOM-8-65536-EXTENDED-PREEMPTIBLE";
    let shape = parse_custom(identifier).unwrap();
    assert_eq!(shape.cores, 8);
    assert!(close(shape.ram_gb, 64.0));
    assert!(shape.extended);
    assert!(shape.preemptible);

    let shape = parse_custom("CP-ML-TRAINING-CUSTOM-4-15").unwrap();
    assert!(close(shape.ram_gb, 15.0));

    assert!(matches!(
        parse_custom("n1-standard-4"),
        Err(SizerError::ParseError { .. })
    ));
}

#[test]
fn test_committed_pricing_with_premiums() {
    let pricer = CommitmentPricer::default();

    let plain = pricer
        .price_committed(
            4,
            15.0,
            "n1",
            CommitmentTerm::OneYear,
            "us-central1",
            CommitmentOptions::default(),
        )
        .unwrap();
    assert!(close(plain.committed_hourly, 4.0 * 0.019915 + 15.0 * 0.002669));
    assert!(close(plain.premiums_hourly, 0.0));
    assert!(close(plain.extended_ram_gb, 0.0));

    let sole_tenant = pricer
        .price_committed(
            4,
            15.0,
            "N1",
            CommitmentTerm::OneYear,
            "us-central1",
            CommitmentOptions { sole_tenancy: true, cpu_overcommit: false },
        )
        .unwrap();
    let on_demand = 4.0 * 0.031611 + 15.0 * 0.004237;
    assert!(close(sole_tenant.premiums_hourly, on_demand * 0.10 * 0.7));
    assert!(close(sole_tenant.hourly, plain.hourly + sole_tenant.premiums_hourly));

    let europe = pricer
        .price_committed(
            4,
            15.0,
            "N1",
            CommitmentTerm::OneYear,
            "europe-west1",
            CommitmentOptions::default(),
        )
        .unwrap();
    assert!(close(europe.hourly, plain.hourly * 1.1));
}

#[test]
fn test_committed_pricing_family_rules() {
    let pricer = CommitmentPricer::default();
    let overcommit = CommitmentOptions { sole_tenancy: false, cpu_overcommit: true };

    let e2 = pricer
        .price_committed(2, 8.0, "E2", CommitmentTerm::ThreeYear, "us-central1", overcommit)
        .unwrap();
    assert!(close(e2.premiums_hourly, 0.0));

    let m2 = pricer
        .price_committed(
            208,
            5888.0,
            "M2",
            CommitmentTerm::OneYear,
            "us-central1",
            CommitmentOptions::default(),
        )
        .unwrap();
    assert!(m2.premiums_hourly > 0.0);

    let f1 = pricer
        .price_committed(1, 0.6, "F1", CommitmentTerm::OneYear, "us-central1", overcommit)
        .unwrap();
    assert!(close(f1.hourly, 0.0048));
    assert!(close(f1.premiums_hourly, 0.0));

    assert!(matches!(
        pricer.price_committed(2, 8.0, "Z9", CommitmentTerm::OneYear, "us-central1", overcommit),
        Err(SizerError::UnknownFamily { .. })
    ));
    assert!(matches!(
        pricer.price_committed(2, 8.0, "N1", CommitmentTerm::OneYear, "mars-north1", overcommit),
        Err(SizerError::PriceUnavailable { .. })
    ));
}

#[test]
fn test_extended_memory_is_split_out() {
    let pricer = CommitmentPricer::default();
    let price = pricer
        .price_committed(
            4,
            30.0,
            "N1",
            CommitmentTerm::ThreeYear,
            "us-central1",
            CommitmentOptions::default(),
        )
        .unwrap();
    assert!(close(price.extended_ram_gb, 4.0));
}
