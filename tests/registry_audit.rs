use econ_dashboards_lib::core::pipeline::TransformChoice;
use econ_dashboards_lib::core::timeseries::{Granularity, SeriesKind};
use econ_dashboards_lib::dashboard::view::ChartKind;
use econ_dashboards_lib::indicators::registry::{Country, Registry, SourceType};
use std::collections::HashSet;

#[test]
fn audit_all_indicators() {
    println!("\n========= INDICATOR AUDIT REPORT =========\n");

    let indicators = Registry::get_all_indicators();
    println!("Total Indicators in Registry: {}", indicators.len());

    let mut slugs = HashSet::new();
    for ind in indicators {
        println!("  {:<18} {:<35} {:?} {:?}", ind.slug, ind.name, ind.kind, ind.frequency);

        assert!(slugs.insert(ind.slug.as_str()), "duplicate slug {}", ind.slug);
        assert!(Registry::get_metadata(&ind.slug).is_some());

        // Every offered option must be usable
        assert!(!ind.granularities.is_empty(), "{} offers no granularity", ind.slug);
        assert!(ind.allows_transform(TransformChoice::Levels), "{} lacks levels", ind.slug);
        for &g in &ind.granularities {
            let effective = ind.frequency.after(g);
            for t in &ind.transforms {
                assert!(
                    t.resolve(effective).is_some(),
                    "{}: {} undefined at {}",
                    ind.slug,
                    t.label(),
                    g.label()
                );
            }
        }

        if let SourceType::Table(spec) = &ind.source {
            assert!(spec.file.ends_with(".csv"), "{} is not a CSV export", ind.slug);
            assert!(spec.date_column.is_some() || spec.generated_index.is_some());
        }
    }

    println!("\n=========================================\n");
}

#[test]
fn flows_are_never_sampled_finer_than_native() {
    for ind in Registry::get_all_indicators().iter().filter(|i| i.kind == SeriesKind::Flow) {
        assert!(!ind.allows_granularity(Granularity::Daily), "{}", ind.slug);
        assert!(!ind.allows_granularity(Granularity::Weekly), "{}", ind.slug);
    }
}

#[test]
fn both_countries_are_covered() {
    let ar = Registry::by_country(Country::Argentina);
    let py = Registry::by_country(Country::Paraguay);
    assert_eq!(ar.len() + py.len(), Registry::get_all_indicators().len());
    assert!(py.iter().all(|m| m.multi_column));
    assert!(ar.iter().any(|m| m.chart == ChartKind::Bar));
}
