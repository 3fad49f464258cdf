use crate::metrics::{cagr, municipality_metrics};
use crate::types::{
    AgeBandRow, CategoryCountRow, FactRow, GroupTrendRow, HolidayComparisonRow, HolidayRow,
    MonthCountRow, MunicipalityRateRow, PopulationRow, SummaryStats, WeekdayCountRow, YearCountRow,
    NOT_INFORMED,
};
use crate::util::{format_change, format_number, month_index, weekday_name};
use chrono::{Datelike, NaiveDate, Weekday};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// How incidents are grouped in the time-series reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Consolidated,
    Municipality,
    Mesoregion,
    Association,
}

impl Grouping {
    pub const CONSOLIDATED_LABEL: &'static str = "Consolidado";

    /// Group label of a row. Municipalities are grouped by canonical key.
    fn key(&self, row: &FactRow) -> String {
        match self {
            Grouping::Consolidated => Self::CONSOLIDATED_LABEL.to_string(),
            Grouping::Municipality if row.municipio_normalizado.is_empty() => NOT_INFORMED.to_string(),
            Grouping::Municipality => row.municipio_normalizado.clone(),
            Grouping::Mesoregion => row.mesoregiao.as_label().to_string(),
            Grouping::Association => row.associacao.as_label().to_string(),
        }
    }
}

/// Femicide-only categorical columns the dashboard charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FemicideBreakdown {
    Relationship,
    Method,
    Location,
    Arrest,
    DomesticViolenceReport,
}

impl FemicideBreakdown {
    fn label(&self, row: &FactRow) -> Option<String> {
        let details = row.femicide.as_ref()?;
        let label = match self {
            FemicideBreakdown::Relationship => details
                .relacao_autor
                .clone()
                .unwrap_or_else(|| NOT_INFORMED.to_string()),
            FemicideBreakdown::Method => details
                .meio_crime
                .clone()
                .unwrap_or_else(|| NOT_INFORMED.to_string()),
            FemicideBreakdown::Location => details.localidade.as_label().to_string(),
            FemicideBreakdown::Arrest => details.autor_preso.as_label().to_string(),
            FemicideBreakdown::DomesticViolenceReport => {
                details.bo_de_vd_contra_o_autor.as_label().to_string()
            }
        };
        Some(label)
    }
}

fn yearly_counts(data: &[FactRow], grouping: Grouping) -> BTreeMap<String, BTreeMap<i32, usize>> {
    let mut map: BTreeMap<String, BTreeMap<i32, usize>> = BTreeMap::new();
    for r in data {
        let Some(year) = r.ano else { continue };
        *map.entry(grouping.key(r))
            .or_default()
            .entry(year)
            .or_default() += 1;
    }
    map
}

/// Incident counts per year and group, with the change against the
/// previous calendar year of the same group.
pub fn generate_year_counts(data: &[FactRow], grouping: Grouping) -> Vec<YearCountRow> {
    let mut rows = Vec::new();
    for (group, years) in yearly_counts(data, grouping) {
        for (&year, &count) in &years {
            let yoy = years
                .get(&(year - 1))
                .filter(|prev| **prev > 0)
                .map(|&prev| (count as f64 - prev as f64) / prev as f64 * 100.0);
            rows.push(YearCountRow {
                group: group.clone(),
                year,
                count,
                yoy_change: format_change(yoy),
            });
        }
    }
    rows
}

/// Growth of each group between the first and last year of the slice.
/// A group absent in the first year has no defined growth rate.
pub fn generate_group_trends(data: &[FactRow], grouping: Grouping) -> Vec<GroupTrendRow> {
    let years: Vec<i32> = data.iter().filter_map(|r| r.ano).collect();
    let (Some(&first_year), Some(&last_year)) = (years.iter().min(), years.iter().max()) else {
        return Vec::new();
    };
    let n_years = (last_year - first_year + 1) as u32;

    let mut tmp: Vec<(Option<f64>, GroupTrendRow)> = yearly_counts(data, grouping)
        .into_iter()
        .map(|(group, counts)| {
            let first_count = counts.get(&first_year).copied().unwrap_or(0);
            let last_count = counts.get(&last_year).copied().unwrap_or(0);
            let rate = cagr(Some(first_count as f64), Some(last_count as f64), n_years);
            let row = GroupTrendRow {
                group,
                first_year,
                last_year,
                first_count,
                last_count,
                cagr: format_change(rate),
            };
            (rate, row)
        })
        .collect();
    // defined rates first, highest growth on top
    tmp.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.1.group.cmp(&b.1.group),
    });
    tmp.into_iter().map(|(_, row)| row).collect()
}

fn ranked(counts: HashMap<String, usize>) -> Vec<CategoryCountRow> {
    let total: usize = counts.values().sum();
    let mut tmp: Vec<(String, usize)> = counts.into_iter().collect();
    tmp.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tmp.into_iter()
        .enumerate()
        .map(|(idx, (category, count))| {
            let share = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            CategoryCountRow {
                rank: idx + 1,
                category,
                count,
                share: format!("{}%", format_number(share, 2)),
            }
        })
        .collect()
}

pub fn generate_crime_ranking(data: &[FactRow]) -> Vec<CategoryCountRow> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for r in data {
        *counts.entry(r.fato_comunicado.clone()).or_default() += 1;
    }
    ranked(counts)
}

/// Counts per month name in calendar order; months without incidents are
/// left out.
pub fn generate_month_counts(data: &[FactRow]) -> Vec<MonthCountRow> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in data {
        if let Some(m) = r.mes.as_deref() {
            *counts.entry(m).or_default() += 1;
        }
    }
    let mut rows: Vec<MonthCountRow> = counts
        .into_iter()
        .map(|(month, count)| MonthCountRow {
            month: month.to_string(),
            count,
        })
        .collect();
    rows.sort_by_key(|r| month_index(&r.month).unwrap_or(usize::MAX));
    rows
}

/// Victim age bands as upper bound (inclusive) and label.
pub const AGE_BANDS: [(f64, &str); 6] = [
    (17.0, "0-17 anos"),
    (29.0, "18-29 anos"),
    (40.0, "30-40 anos"),
    (50.0, "41-50 anos"),
    (60.0, "51-60 anos"),
    (120.0, "60+ anos"),
];

fn age_band(age: f64) -> Option<usize> {
    if age.is_nan() || age < 0.0 {
        return None;
    }
    AGE_BANDS.iter().position(|(upper, _)| age <= *upper)
}

/// Counts per victim age band, every band listed in order. Missing ages
/// and ages above the last bound are left out.
pub fn generate_age_bands(data: &[FactRow]) -> Vec<AgeBandRow> {
    let mut counts = [0usize; AGE_BANDS.len()];
    for idx in data.iter().filter_map(|r| r.idade_vitima).filter_map(age_band) {
        counts[idx] += 1;
    }
    AGE_BANDS
        .iter()
        .zip(counts)
        .map(|((_, label), count)| AgeBandRow {
            band: label.to_string(),
            count,
        })
        .collect()
}

/// Counts per weekday from Monday to Sunday; undated rows are left out.
pub fn generate_weekday_counts(data: &[FactRow]) -> Vec<WeekdayCountRow> {
    let mut counts = [0usize; 7];
    for d in data.iter().filter_map(|r| r.data_fato) {
        counts[d.weekday().num_days_from_monday() as usize] += 1;
    }
    let mut day = Weekday::Mon;
    counts
        .into_iter()
        .map(|count| {
            let row = WeekdayCountRow {
                weekday: weekday_name(day).to_string(),
                count,
            };
            day = day.succ();
            row
        })
        .collect()
}

/// Population-normalized table, highest rate per 1,000 women first.
pub fn generate_municipality_rates(
    data: &[FactRow],
    population: &[PopulationRow],
) -> Vec<MunicipalityRateRow> {
    let mut metrics = municipality_metrics(data, population);
    metrics.sort_by(|a, b| {
        b.taxa_por_mil_mulheres
            .partial_cmp(&a.taxa_por_mil_mulheres)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.municipio.cmp(&b.municipio))
    });
    metrics
        .into_iter()
        .map(|m| MunicipalityRateRow {
            municipio: m.municipio,
            female_population: m
                .populacao_feminina
                .map(|p| format_number(p, 0))
                .unwrap_or_else(|| "-".to_string()),
            total: m.total_fatos,
            annual_average: format_number(m.media_anual_fatos, 2),
            rate_per_thousand: format_number(m.taxa_por_mil_mulheres, 4),
            percent_of_women: format_number(m.percentual_mulheres_vitimas, 4),
        })
        .collect()
}

/// Ranked counts of one femicide attribute. Rows without femicide details
/// are skipped.
pub fn generate_femicide_breakdown(
    data: &[FactRow],
    breakdown: FemicideBreakdown,
) -> Vec<CategoryCountRow> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for r in data {
        if let Some(label) = breakdown.label(r) {
            *counts.entry(label).or_default() += 1;
        }
    }
    ranked(counts)
}

fn dated_period(data: &[FactRow]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = data.iter().filter_map(|r| r.data_fato);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// Daily average on holidays against ordinary days, over the dated span of
/// the slice.
pub fn generate_holiday_comparison(
    data: &[FactRow],
    calendar: &[HolidayRow],
) -> Vec<HolidayComparisonRow> {
    let Some((start, end)) = dated_period(data) else {
        return Vec::new();
    };
    let holidays: HashSet<NaiveDate> = calendar
        .iter()
        .map(|h| h.data)
        .filter(|d| *d >= start && *d <= end)
        .collect();
    let span_days = (end - start).num_days() as usize + 1;
    let holiday_days = holidays.len();

    let (mut on_holiday, mut ordinary) = (0usize, 0usize);
    for d in data.iter().filter_map(|r| r.data_fato) {
        if holidays.contains(&d) {
            on_holiday += 1;
        } else {
            ordinary += 1;
        }
    }
    let row = |kind: &str, days: usize, count: usize| HolidayComparisonRow {
        day_kind: kind.to_string(),
        days,
        count,
        daily_average: if days == 0 {
            "-".to_string()
        } else {
            format_number(count as f64 / days as f64, 2)
        },
    };
    vec![
        row("Feriado", holiday_days, on_holiday),
        row("Dia comum", span_days - holiday_days, ordinary),
    ]
}

/// Holidays ranked by incidents recorded on their date.
pub fn generate_holiday_ranking(data: &[FactRow], calendar: &[HolidayRow]) -> Vec<CategoryCountRow> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for d in data.iter().filter_map(|r| r.data_fato) {
        *per_day.entry(d).or_default() += 1;
    }
    let mut counts: HashMap<String, usize> = HashMap::new();
    for h in calendar {
        if let Some(&n) = per_day.get(&h.data) {
            *counts
                .entry(format!("{} ({})", h.feriado, h.data.format("%d/%m/%Y")))
                .or_default() += n;
        }
    }
    ranked(counts)
}

pub fn generate_summary(data: &[FactRow], feminicidio: &[FactRow]) -> SummaryStats {
    let municipalities: HashSet<&str> = data
        .iter()
        .map(|r| r.municipio_normalizado.as_str())
        .filter(|k| !k.is_empty())
        .collect();
    let period = dated_period(data);
    SummaryStats {
        total_incidents: data.len(),
        total_femicides: feminicidio.len(),
        municipalities_affected: municipalities.len(),
        period_start: period.map(|p| p.0),
        period_end: period.map(|p| p.1),
        rows_without_date: data.iter().filter(|r| r.data_fato.is_none()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FemicideDetails, Informed};
    use crate::util::month_name;

    fn fact(municipio: &str, fato: &str, y: i32, m: u32, d: u32) -> FactRow {
        let date = NaiveDate::from_ymd_opt(y, m, d);
        FactRow {
            data_fato: date,
            fato_comunicado: fato.to_string(),
            municipio: municipio.to_string(),
            municipio_normalizado: crate::normalize::normalize(Some(municipio)),
            mesoregiao: Informed::NotInformed,
            associacao: Informed::NotInformed,
            idade_vitima: None,
            ano: date.map(|d| d.year()),
            mes: date.map(|d| month_name(d).to_string()),
            femicide: None,
        }
    }

    fn femicide(relacao: Option<&str>, preso: Informed<String>) -> FactRow {
        let mut row = fact("Joinville", "Feminicídio", 2022, 2, 1);
        row.femicide = Some(FemicideDetails {
            idade_autor: None,
            etnia_vitima: Informed::NotInformed,
            etnia_autor: Informed::NotInformed,
            relacao_autor: relacao.map(str::to_string),
            passagem_policial: Informed::NotInformed,
            passagem_por_violencia_domestica: Informed::NotInformed,
            bo_de_vd_contra_o_autor: Informed::NotInformed,
            autor_preso: preso,
            meio_crime: None,
            localidade: Informed::NotInformed,
            hora_fato: Informed::NotInformed,
        });
        row
    }

    #[test]
    fn year_counts_carry_previous_year_change() {
        let data = vec![
            fact("Lages", "Ameaça", 2020, 1, 1),
            fact("Lages", "Ameaça", 2020, 2, 1),
            fact("Lages", "Ameaça", 2021, 3, 1),
            fact("Lages", "Ameaça", 2023, 3, 1),
        ];
        let rows = generate_year_counts(&data, Grouping::Consolidated);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].group, "Consolidado");
        assert_eq!(rows[0].yoy_change, "-");
        assert_eq!(rows[1].yoy_change, "▼ 50.00%");
        // 2022 had no incidents, so 2023 has nothing to compare against
        assert_eq!(rows[2].yoy_change, "-");
    }

    #[test]
    fn group_trends_use_the_slice_window() {
        let mut data = Vec::new();
        for _ in 0..100 {
            data.push(fact("Lages", "Ameaça", 2019, 1, 1));
        }
        for _ in 0..121 {
            data.push(fact("Lages", "Ameaça", 2021, 1, 1));
        }
        data.push(fact("Blumenau", "Ameaça", 2021, 1, 1));
        let rows = generate_group_trends(&data, Grouping::Municipality);
        assert_eq!(rows[0].group, "LAGES");
        assert_eq!(rows[0].cagr, "▲ 10.00%");
        assert_eq!(rows[1].group, "BLUMENAU");
        assert_eq!(rows[1].cagr, "-");
        assert!(generate_group_trends(&[], Grouping::Municipality).is_empty());
    }

    #[test]
    fn municipality_groups_merge_spellings() {
        let data = vec![
            fact("FLORIANOPOLIS ", "Ameaça", 2021, 1, 1),
            fact("Florianópolis", "Ameaça", 2021, 2, 1),
            fact("", "Ameaça", 2021, 3, 1),
        ];
        let rows = generate_year_counts(&data, Grouping::Municipality);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].group.as_str(), rows[0].count), ("FLORIANOPOLIS", 2));
        assert_eq!(rows[1].group, NOT_INFORMED);
    }

    #[test]
    fn ranking_orders_by_count_then_name() {
        let data = vec![
            fact("A", "Estupro", 2021, 1, 1),
            fact("A", "Ameaça", 2021, 1, 1),
            fact("A", "Ameaça", 2021, 1, 1),
            fact("A", "Calúnia", 2021, 1, 1),
        ];
        let rows = generate_crime_ranking(&data);
        let names: Vec<_> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, ["Ameaça", "Calúnia", "Estupro"]);
        assert_eq!(rows[0].share, "50.00%");
        assert_eq!(rows[2].rank, 3);
    }

    #[test]
    fn months_follow_the_calendar() {
        let data = vec![
            fact("A", "Ameaça", 2021, 12, 1),
            fact("A", "Ameaça", 2021, 2, 1),
            fact("A", "Ameaça", 2022, 2, 1),
        ];
        let rows = generate_month_counts(&data);
        assert_eq!(rows[0].month, "February");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[1].month, "December");
    }

    #[test]
    fn age_bands_are_right_inclusive() {
        let data: Vec<FactRow> = [Some(0.0), Some(17.0), Some(17.5), Some(40.0), Some(61.0), Some(130.0), None]
            .into_iter()
            .map(|age| {
                let mut row = fact("A", "Ameaça", 2021, 1, 1);
                row.idade_vitima = age;
                row
            })
            .collect();
        let rows = generate_age_bands(&data);
        let counts: Vec<_> = rows.iter().map(|r| r.count).collect();
        assert_eq!(counts, [2, 1, 1, 0, 0, 1]);
        assert_eq!(rows[5].band, "60+ anos");
    }

    #[test]
    fn weekdays_start_on_monday() {
        // 2021-01-01 was a Friday, 2021-01-04 a Monday
        let mut undated = fact("A", "Ameaça", 2021, 1, 1);
        undated.data_fato = None;
        let data = vec![
            fact("A", "Ameaça", 2021, 1, 1),
            fact("A", "Ameaça", 2021, 1, 8),
            fact("A", "Ameaça", 2021, 1, 4),
            undated,
        ];
        let rows = generate_weekday_counts(&data);
        assert_eq!(rows.len(), 7);
        assert_eq!((rows[0].weekday.as_str(), rows[0].count), ("Monday", 1));
        assert_eq!((rows[4].weekday.as_str(), rows[4].count), ("Friday", 2));
        assert_eq!(rows[6].weekday, "Sunday");
    }

    #[test]
    fn femicide_breakdown_uses_sentinel_for_gaps() {
        let data = vec![
            femicide(Some("Companheiro"), Informed::Known("Sim".to_string())),
            femicide(None, Informed::NotInformed),
            fact("A", "Ameaça", 2021, 1, 1),
        ];
        let rel = generate_femicide_breakdown(&data, FemicideBreakdown::Relationship);
        assert_eq!(rel.len(), 2);
        assert_eq!(rel.iter().map(|r| r.count).sum::<usize>(), 2);
        assert!(rel.iter().any(|r| r.category == NOT_INFORMED));
        let arrest = generate_femicide_breakdown(&data, FemicideBreakdown::Arrest);
        assert!(arrest.iter().any(|r| r.category == "Sim"));
    }

    #[test]
    fn holidays_compare_daily_averages() {
        let data = vec![
            fact("A", "Ameaça", 2021, 1, 1),
            fact("A", "Ameaça", 2021, 1, 1),
            fact("A", "Ameaça", 2021, 1, 3),
        ];
        let calendar = vec![
            HolidayRow {
                data: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                feriado: "Confraternização Universal".to_string(),
            },
            HolidayRow {
                data: NaiveDate::from_ymd_opt(2021, 4, 21).unwrap(),
                feriado: "Tiradentes".to_string(),
            },
        ];
        let rows = generate_holiday_comparison(&data, &calendar);
        assert_eq!((rows[0].days, rows[0].count), (1, 2));
        assert_eq!(rows[0].daily_average, "2.00");
        assert_eq!((rows[1].days, rows[1].count), (2, 1));
        assert_eq!(rows[1].daily_average, "0.50");
        let ranking = generate_holiday_ranking(&data, &calendar);
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].category, "Confraternização Universal (01/01/2021)");
    }

    #[test]
    fn summary_counts_undated_rows() {
        let mut undated = fact("Lages", "Ameaça", 2021, 1, 1);
        undated.data_fato = None;
        undated.ano = None;
        let data = vec![fact("Lages", "Ameaça", 2021, 5, 1), fact("Blumenau", "Ameaça", 2020, 1, 1), undated];
        let s = generate_summary(&data, &[]);
        assert_eq!(s.total_incidents, 3);
        assert_eq!(s.municipalities_affected, 2);
        assert_eq!(s.rows_without_date, 1);
        assert_eq!(s.period_start, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(s.period_end, NaiveDate::from_ymd_opt(2021, 5, 1));
    }
}
