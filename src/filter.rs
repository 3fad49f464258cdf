//! Filter stage.
//!
//! A selection is applied to the loaded tables and always yields new
//! vectors; the loaded snapshot is never modified, so the next selection
//! starts again from the full data.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use crate::metrics::{municipality_metrics, MunicipalityMetrics};
use crate::normalize::normalize;
use crate::types::{FactRow, PopulationRow, RegionRow, NOT_INFORMED};

/// Upper age bound that stands for "this age and above".
pub const OPEN_AGE_BOUND: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Every filter the dashboard exposes. `None` means "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Municipality names in any spelling; matched by canonical key.
    pub municipios: Option<BTreeSet<String>>,
    pub mesoregioes: Option<BTreeSet<String>>,
    pub associacoes: Option<BTreeSet<String>>,
    pub fatos: Option<BTreeSet<String>>,
    /// Victim age range; a maximum of [`OPEN_AGE_BOUND`] is open-ended.
    pub idade: Option<Range>,
    pub populacao_feminina: Option<Range>,
    pub media_anual_fatos: Option<Range>,
    pub taxa_por_mil_mulheres: Option<Range>,
    pub percentual_mulheres_vitimas: Option<Range>,
}

/// Values offered by the selection widgets for the current period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub municipios: Vec<String>,
    pub mesoregioes: Vec<String>,
    pub associacoes: Vec<String>,
    pub fatos: Vec<String>,
    pub period: Option<(NaiveDate, NaiveDate)>,
}

fn in_set(set: &Option<BTreeSet<String>>, value: &str) -> bool {
    set.as_ref().map_or(true, |s| s.contains(value))
}

/// Per-apply state: selected municipalities as canonical keys and the keys
/// passing the population ranges.
struct Resolved {
    municipios: Option<HashSet<String>>,
    population: Option<HashSet<String>>,
}

impl Resolved {
    fn admits(&self, key: &str) -> bool {
        let allowed = |set: &Option<HashSet<String>>| set.as_ref().map_or(true, |s| s.contains(key));
        allowed(&self.municipios) && allowed(&self.population)
    }
}

impl FilterSelection {
    pub fn has_population_filters(&self) -> bool {
        self.populacao_feminina.is_some()
            || self.media_anual_fatos.is_some()
            || self.taxa_por_mil_mulheres.is_some()
            || self.percentual_mulheres_vitimas.is_some()
    }

    /// Rows with a date inside the period. Rows without a date are excluded
    /// once any bound is set.
    pub fn matches_period(&self, row: &FactRow) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        match row.data_fato {
            None => false,
            Some(d) => self.from.map_or(true, |f| d >= f) && self.to.map_or(true, |t| d <= t),
        }
    }

    fn matches_age(&self, row: &FactRow) -> bool {
        let Some(range) = self.idade else {
            return true;
        };
        let max = if range.max >= OPEN_AGE_BOUND {
            f64::INFINITY
        } else {
            range.max
        };
        row.idade_vitima
            .is_some_and(|age| Range::new(range.min, max).contains(age))
    }

    fn matches_region(&self, row: &FactRow) -> bool {
        in_set(&self.mesoregioes, row.mesoregiao.as_label())
            && in_set(&self.associacoes, row.associacao.as_label())
    }

    /// Canonical keys of the selected municipalities. Names that normalize
    /// to nothing select nothing.
    pub fn municipio_keys(&self) -> Option<HashSet<String>> {
        let names = self.municipios.as_ref()?;
        Some(
            names
                .iter()
                .map(|name| normalize(Some(name)))
                .filter(|key| !key.is_empty())
                .collect(),
        )
    }

    fn resolve(&self, geral: &[FactRow], population: &[PopulationRow]) -> Resolved {
        Resolved {
            municipios: self.municipio_keys(),
            population: self.population_keys(&self.period_slice(geral), population),
        }
    }

    /// Canonical keys of municipalities inside every population range, or
    /// `None` when no population range is set.
    pub fn population_keys(
        &self,
        period_facts: &[FactRow],
        population: &[PopulationRow],
    ) -> Option<HashSet<String>> {
        if !self.has_population_filters() {
            return None;
        }
        let metrics = municipality_metrics(period_facts, population);
        Some(
            metrics
                .into_iter()
                .filter(|m| self.matches_metrics(m))
                .map(|m| m.municipio_normalizado)
                .collect(),
        )
    }

    fn matches_metrics(&self, m: &MunicipalityMetrics) -> bool {
        let within = |range: &Option<Range>, v: f64| range.map_or(true, |r| r.contains(v));
        let pop_ok = match (self.populacao_feminina, m.populacao_feminina) {
            (None, _) => true,
            (Some(r), Some(p)) => r.contains(p),
            (Some(_), None) => false,
        };
        pop_ok
            && within(&self.media_anual_fatos, m.media_anual_fatos)
            && within(&self.taxa_por_mil_mulheres, m.taxa_por_mil_mulheres)
            && within(&self.percentual_mulheres_vitimas, m.percentual_mulheres_vitimas)
    }

    /// Filter the unified table. Population ranges are evaluated over the
    /// period slice of the same table.
    pub fn apply(&self, geral: &[FactRow], population: &[PopulationRow]) -> Vec<FactRow> {
        let resolved = self.resolve(geral, population);
        geral
            .iter()
            .filter(|row| self.matches_row(row, &resolved, true))
            .cloned()
            .collect()
    }

    /// Filter the femicide table: everything except crime type applies, and
    /// population ranges are evaluated over the unified table's period slice.
    pub fn apply_femicide(
        &self,
        feminicidio: &[FactRow],
        geral: &[FactRow],
        population: &[PopulationRow],
    ) -> Vec<FactRow> {
        let resolved = self.resolve(geral, population);
        feminicidio
            .iter()
            .filter(|row| self.matches_row(row, &resolved, false))
            .cloned()
            .collect()
    }

    pub fn period_slice(&self, rows: &[FactRow]) -> Vec<FactRow> {
        rows.iter()
            .filter(|row| self.matches_period(row))
            .cloned()
            .collect()
    }

    fn matches_row(&self, row: &FactRow, resolved: &Resolved, with_crime_type: bool) -> bool {
        self.matches_period(row)
            && (!with_crime_type || in_set(&self.fatos, &row.fato_comunicado))
            && self.matches_region(row)
            && self.matches_age(row)
            && resolved.admits(&row.municipio_normalizado)
    }
}

impl FilterOptions {
    /// Widget options derived from the period slice. Region and association
    /// lists leave out the "not informed" sentinel.
    ///
    /// Municipalities are listed once per canonical key, under the name the
    /// region table uses for it, or the first spelling seen in the facts.
    pub fn from_period(period_facts: &[FactRow], regions: &[RegionRow]) -> Self {
        let display: HashMap<&str, &str> = regions
            .iter()
            .filter(|r| !r.municipio_normalizado.is_empty())
            .map(|r| (r.municipio_normalizado.as_str(), r.municipio.trim()))
            .collect();
        let mut municipios: BTreeMap<&str, &str> = BTreeMap::new();
        let mut mesoregioes = BTreeSet::new();
        let mut associacoes = BTreeSet::new();
        let mut fatos = BTreeSet::new();
        let mut period: Option<(NaiveDate, NaiveDate)> = None;
        for row in period_facts {
            let key = row.municipio_normalizado.as_str();
            if !key.is_empty() {
                municipios
                    .entry(key)
                    .or_insert_with(|| display.get(key).copied().unwrap_or(row.municipio.trim()));
            }
            if let Some(m) = row.mesoregiao.known() {
                mesoregioes.insert(m.clone());
            }
            if let Some(a) = row.associacao.known() {
                associacoes.insert(a.clone());
            }
            fatos.insert(row.fato_comunicado.clone());
            if let Some(d) = row.data_fato {
                period = Some(match period {
                    None => (d, d),
                    Some((lo, hi)) => (lo.min(d), hi.max(d)),
                });
            }
        }
        mesoregioes.remove(NOT_INFORMED);
        associacoes.remove(NOT_INFORMED);
        Self {
            municipios: municipios
                .into_values()
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            mesoregioes: mesoregioes.into_iter().collect(),
            associacoes: associacoes.into_iter().collect(),
            fatos: fatos.into_iter().collect(),
            period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Informed;
    use chrono::Datelike;

    fn row(municipio: &str, meso: Option<&str>, fato: &str, date: Option<(i32, u32, u32)>, age: Option<f64>) -> FactRow {
        let data_fato = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        FactRow {
            data_fato,
            fato_comunicado: fato.to_string(),
            municipio: municipio.to_string(),
            municipio_normalizado: normalize(Some(municipio)),
            mesoregiao: meso.map_or(Informed::NotInformed, |m| Informed::Known(m.to_string())),
            associacao: Informed::NotInformed,
            idade_vitima: age,
            ano: data_fato.map(|d| d.year()),
            mes: None,
            femicide: None,
        }
    }

    fn set(values: &[&str]) -> Option<BTreeSet<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    fn sample() -> Vec<FactRow> {
        vec![
            row("Blumenau", Some("Vale do Itajaí"), "Ameaça", Some((2021, 1, 10)), Some(30.0)),
            row("Blumenau", Some("Vale do Itajaí"), "Estupro", Some((2022, 7, 1)), Some(105.0)),
            row("Lages", Some("Serrana"), "Ameaça", Some((2022, 3, 5)), None),
            row("Xanxerê", None, "Ameaça", None, Some(40.0)),
        ]
    }

    #[test]
    fn empty_selection_keeps_everything_and_copies() {
        let data = sample();
        let out = FilterSelection::default().apply(&data, &[]);
        assert_eq!(out, data);
    }

    #[test]
    fn period_excludes_undated_rows() {
        let data = sample();
        let sel = FilterSelection {
            from: NaiveDate::from_ymd_opt(2022, 1, 1),
            ..Default::default()
        };
        let out = sel.apply(&data, &[]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.ano == Some(2022)));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn open_ended_age_bound_and_null_ages() {
        let data = sample();
        let sel = FilterSelection {
            idade: Some(Range::new(18.0, OPEN_AGE_BOUND)),
            ..Default::default()
        };
        let out = sel.apply(&data, &[]);
        // the 105-year-old row passes, the null-age row does not
        assert_eq!(out.len(), 3);
        let capped = FilterSelection {
            idade: Some(Range::new(18.0, 60.0)),
            ..Default::default()
        };
        assert_eq!(capped.apply(&data, &[]).len(), 2);
    }

    #[test]
    fn location_and_crime_type_sets() {
        let data = sample();
        let sel = FilterSelection {
            mesoregioes: set(&["Vale do Itajaí", NOT_INFORMED]),
            fatos: set(&["Ameaça"]),
            ..Default::default()
        };
        let out = sel.apply(&data, &[]);
        let names: Vec<_> = out.iter().map(|r| r.municipio.as_str()).collect();
        assert_eq!(names, ["Blumenau", "Xanxerê"]);
        // the femicide variant ignores the crime-type set
        let fem = sel.apply_femicide(&data, &data, &[]);
        assert_eq!(fem.len(), 3);
    }

    #[test]
    fn population_ranges_select_municipalities() {
        let data = sample();
        let population = vec![
            PopulationRow {
                municipio: "Blumenau".to_string(),
                municipio_normalizado: "BLUMENAU".to_string(),
                populacao_feminina: Some(180_000.0),
            },
            PopulationRow {
                municipio: "Lages".to_string(),
                municipio_normalizado: "LAGES".to_string(),
                populacao_feminina: Some(80_000.0),
            },
        ];
        let sel = FilterSelection {
            populacao_feminina: Some(Range::new(100_000.0, 200_000.0)),
            ..Default::default()
        };
        let out = sel.apply(&data, &population);
        assert!(out.iter().all(|r| r.municipio == "Blumenau"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn municipality_selection_matches_any_spelling() {
        let mut data = sample();
        data.push(row("BLUMENAU ", None, "Ameaça", Some((2023, 1, 1)), None));
        let sel = FilterSelection {
            municipios: set(&["blumenáu"]),
            ..Default::default()
        };
        let out = sel.apply(&data, &[]);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.municipio_normalizado == "BLUMENAU"));

        let nothing = FilterSelection {
            municipios: set(&["  "]),
            ..Default::default()
        };
        assert!(nothing.apply(&data, &[]).is_empty());
    }

    #[test]
    fn options_list_one_name_per_key() {
        let mut data = sample();
        data.push(row("BLUMENAU ", None, "Ameaça", Some((2023, 1, 1)), None));
        let regions = vec![RegionRow {
            municipio: "Lages".to_string(),
            municipio_normalizado: "LAGES".to_string(),
            mesoregiao: "Serrana".to_string(),
            associacao: "AMURES".to_string(),
        }];
        let opts = FilterOptions::from_period(&data, &regions);
        assert_eq!(opts.municipios, ["Blumenau", "Lages", "Xanxerê"]);
    }

    #[test]
    fn options_skip_sentinel_and_track_period() {
        let opts = FilterOptions::from_period(&sample(), &[]);
        assert_eq!(opts.mesoregioes, ["Serrana", "Vale do Itajaí"]);
        assert!(opts.associacoes.is_empty());
        assert_eq!(opts.fatos, ["Ameaça", "Estupro"]);
        assert_eq!(
            opts.period,
            Some((
                NaiveDate::from_ymd_opt(2021, 1, 10).unwrap(),
                NaiveDate::from_ymd_opt(2022, 7, 1).unwrap()
            ))
        );
    }
}
