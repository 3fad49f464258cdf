//! Population-normalized rates and compound growth.
//!
//! All rates are null-safe: a municipality with no population figure, or a
//! zero one, gets 0 rather than a division error or a NaN.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::types::{FactRow, PopulationRow};

/// Shortest window, in years, over which a growth rate is reported.
pub const MIN_CAGR_YEARS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityMetrics {
    pub municipio: String,
    pub municipio_normalizado: String,
    pub populacao_feminina: Option<f64>,
    pub total_fatos: usize,
    pub media_anual_fatos: f64,
    pub taxa_por_mil_mulheres: f64,
    pub percentual_mulheres_vitimas: f64,
}

/// Smallest and largest value of each metric, for range widgets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricBounds {
    pub populacao_feminina: (f64, f64),
    pub media_anual_fatos: (f64, f64),
    pub taxa_por_mil_mulheres: (f64, f64),
    pub percentual_mulheres_vitimas: (f64, f64),
}

/// Distinct years present in the slice, never less than 1.
pub fn year_divisor(facts: &[FactRow]) -> usize {
    let years: BTreeSet<i32> = facts.iter().filter_map(|f| f.ano).collect();
    years.len().max(1)
}

/// `numerator / population * scale`, or 0 when the population is missing,
/// zero or not a number.
pub fn per_population(numerator: f64, population: Option<f64>, scale: f64) -> f64 {
    match population {
        Some(p) if p.is_finite() && p > 0.0 => {
            let v = numerator / p * scale;
            if v.is_finite() {
                v
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Per-municipality counts and rates for a filtered slice.
///
/// One output row per population row, in population-table order;
/// municipalities with no incidents in the slice get zero counts. Facts
/// with the empty key are never attributed to a population row.
pub fn municipality_metrics(facts: &[FactRow], population: &[PopulationRow]) -> Vec<MunicipalityMetrics> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for fact in facts.iter().filter(|f| !f.municipio_normalizado.is_empty()) {
        *counts.entry(fact.municipio_normalizado.as_str()).or_default() += 1;
    }
    let years = year_divisor(facts) as f64;

    population
        .iter()
        .map(|row| {
            let total = counts
                .get(row.municipio_normalizado.as_str())
                .copied()
                .unwrap_or(0);
            let annual = total as f64 / years;
            MunicipalityMetrics {
                municipio: row.municipio.clone(),
                municipio_normalizado: row.municipio_normalizado.clone(),
                populacao_feminina: row.populacao_feminina,
                total_fatos: total,
                media_anual_fatos: annual,
                taxa_por_mil_mulheres: per_population(annual, row.populacao_feminina, 1000.0),
                percentual_mulheres_vitimas: per_population(annual, row.populacao_feminina, 100.0),
            }
        })
        .collect()
}

impl MetricBounds {
    /// Bounds over the given rows; every bound is finite, and an empty
    /// input gives all-zero bounds.
    pub fn of(metrics: &[MunicipalityMetrics]) -> Self {
        fn span(values: impl Iterator<Item = f64>) -> (f64, f64) {
            let (lo, hi) = values
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if lo.is_finite() && hi.is_finite() {
                (lo, hi)
            } else {
                (0.0, 0.0)
            }
        }
        Self {
            populacao_feminina: span(metrics.iter().filter_map(|m| m.populacao_feminina)),
            media_anual_fatos: span(metrics.iter().map(|m| m.media_anual_fatos)),
            taxa_por_mil_mulheres: span(metrics.iter().map(|m| m.taxa_por_mil_mulheres)),
            percentual_mulheres_vitimas: span(
                metrics.iter().map(|m| m.percentual_mulheres_vitimas),
            ),
        }
    }
}

/// Compound annual growth rate in percent between the first and last value
/// of an `n_years` window.
///
/// Undefined (`None`) when either value is missing or NaN, when the initial
/// value is zero, or when the window is shorter than [`MIN_CAGR_YEARS`].
pub fn cagr(initial: Option<f64>, last: Option<f64>, n_years: u32) -> Option<f64> {
    if n_years < MIN_CAGR_YEARS {
        return None;
    }
    let initial = initial.filter(|v| !v.is_nan())?;
    let last = last.filter(|v| !v.is_nan())?;
    if initial == 0.0 {
        return None;
    }
    let periods = f64::from(n_years - 1);
    let rate = ((last / initial).powf(1.0 / periods) - 1.0) * 100.0;
    (!rate.is_nan()).then_some(rate)
}

/// Element-wise [`cagr`] over pairs sharing one window length.
pub fn cagr_batch(pairs: &[(Option<f64>, Option<f64>)], n_years: u32) -> Vec<Option<f64>> {
    pairs
        .iter()
        .map(|&(initial, last)| cagr(initial, last, n_years))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Informed;
    use approx::assert_relative_eq;
    use chrono::{Datelike, NaiveDate};

    fn fact(key: &str, year: i32) -> FactRow {
        let date = NaiveDate::from_ymd_opt(year, 6, 1);
        FactRow {
            data_fato: date,
            fato_comunicado: "Ameaça".to_string(),
            municipio: key.to_string(),
            municipio_normalizado: key.to_string(),
            mesoregiao: Informed::NotInformed,
            associacao: Informed::NotInformed,
            idade_vitima: None,
            ano: date.map(|d| d.year()),
            mes: None,
            femicide: None,
        }
    }

    fn pop(key: &str, women: Option<f64>) -> PopulationRow {
        PopulationRow {
            municipio: key.to_string(),
            municipio_normalizado: key.to_string(),
            populacao_feminina: women,
        }
    }

    #[test]
    fn rates_use_distinct_years_as_divisor() {
        let facts = vec![fact("A", 2020), fact("A", 2021), fact("A", 2021), fact("B", 2020)];
        let metrics = municipality_metrics(&facts, &[pop("A", Some(1500.0)), pop("B", Some(500.0))]);
        let a = &metrics[0];
        assert_eq!(a.total_fatos, 3);
        assert_relative_eq!(a.media_anual_fatos, 1.5);
        assert_relative_eq!(a.taxa_por_mil_mulheres, 1.0);
        assert_relative_eq!(a.percentual_mulheres_vitimas, 0.1);
        let b = &metrics[1];
        assert_relative_eq!(b.media_anual_fatos, 0.5);
        assert_relative_eq!(b.taxa_por_mil_mulheres, 1.0);
    }

    #[test]
    fn missing_or_zero_population_gives_zero_rates() {
        let facts = vec![fact("A", 2020), fact("B", 2020)];
        let metrics = municipality_metrics(&facts, &[pop("A", None), pop("B", Some(0.0)), pop("C", Some(10.0))]);
        for m in &metrics {
            assert_eq!(m.taxa_por_mil_mulheres, 0.0);
            assert_eq!(m.percentual_mulheres_vitimas, 0.0);
        }
        assert_eq!(metrics[2].total_fatos, 0);
        let bounds = MetricBounds::of(&metrics);
        assert_eq!(bounds.taxa_por_mil_mulheres, (0.0, 0.0));
        assert_eq!(bounds.populacao_feminina, (0.0, 10.0));
    }

    #[test]
    fn blank_keys_never_collect_counts() {
        let facts = vec![fact("", 2020), fact("", 2020), fact("A", 2020)];
        let metrics = municipality_metrics(&facts, &[pop("", Some(100.0)), pop("A", Some(100.0))]);
        assert_eq!(metrics[0].total_fatos, 0);
        assert_eq!(metrics[0].taxa_por_mil_mulheres, 0.0);
        assert_eq!(metrics[1].total_fatos, 1);
    }

    #[test]
    fn empty_slice_divides_by_one() {
        assert_eq!(year_divisor(&[]), 1);
        let metrics = municipality_metrics(&[], &[pop("A", Some(100.0))]);
        assert_eq!(metrics[0].media_anual_fatos, 0.0);
        assert_eq!(MetricBounds::of(&[]).media_anual_fatos, (0.0, 0.0));
    }

    #[test]
    fn cagr_guards() {
        assert_eq!(cagr(Some(100.0), Some(100.0), 5), Some(0.0));
        assert_eq!(cagr(Some(100.0), Some(200.0), 2), None);
        assert_eq!(cagr(Some(0.0), Some(100.0), 5), None);
        assert_eq!(cagr(None, Some(100.0), 5), None);
        assert_eq!(cagr(Some(100.0), None, 5), None);
        assert_eq!(cagr(Some(f64::NAN), Some(100.0), 5), None);
    }

    #[test]
    fn cagr_follows_the_compound_formula() {
        // four compounding periods across a five-year window
        assert_relative_eq!(cagr(Some(100.0), Some(400.0), 5).unwrap(), 41.421356, epsilon = 1e-5);
        assert_relative_eq!(cagr(Some(100.0), Some(121.0), 3).unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(cagr(Some(200.0), Some(50.0), 3).unwrap(), -50.0, epsilon = 1e-9);
    }

    #[test]
    fn batch_and_scalar_agree() {
        let pairs = vec![
            (Some(100.0), Some(100.0)),
            (Some(0.0), Some(100.0)),
            (None, Some(3.0)),
            (Some(100.0), Some(400.0)),
            (Some(10.0), Some(f64::NAN)),
        ];
        for n in [2, 3, 5] {
            let batch = cagr_batch(&pairs, n);
            for (i, &(a, b)) in pairs.iter().enumerate() {
                assert_eq!(batch[i], cagr(a, b, n));
            }
        }
        assert!(cagr_batch(&pairs, 2).iter().all(Option::is_none));
    }
}
