use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use tabled::Tabled;

/// Text stored for any value the sources did not inform.
pub const NOT_INFORMED: &str = "Não informado";

/// Crime label stamped on every femicide-sourced row of the unified table.
pub const FEMICIDE_LABEL: &str = "Feminicídio";

/// A value that is either known or explicitly reported as "not informed".
///
/// Pair it with `Option` when a field may also not apply at all: `None`
/// means "no such field for this row", `Some(NotInformed)` means "the field
/// applies but the source left it blank".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Informed<T> {
    Known(T),
    NotInformed,
}

impl<T> Informed<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Informed::Known(v) => Some(v),
            Informed::NotInformed => None,
        }
    }
}

impl Informed<String> {
    /// Reads back a persisted label; the sentinel text and blanks map to
    /// `NotInformed`.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed == NOT_INFORMED {
            Informed::NotInformed
        } else {
            Informed::Known(trimmed.to_string())
        }
    }

    pub fn as_label(&self) -> &str {
        match self {
            Informed::Known(v) => v.as_str(),
            Informed::NotInformed => NOT_INFORMED,
        }
    }
}

impl fmt::Display for Informed<String> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl Serialize for Informed<String> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_label())
    }
}

/// Fields only the femicide source carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FemicideDetails {
    pub idade_autor: Option<f64>,
    pub etnia_vitima: Informed<String>,
    pub etnia_autor: Informed<String>,
    pub relacao_autor: Option<String>,
    pub passagem_policial: Informed<String>,
    pub passagem_por_violencia_domestica: Informed<String>,
    pub bo_de_vd_contra_o_autor: Informed<String>,
    pub autor_preso: Informed<String>,
    pub meio_crime: Option<String>,
    pub localidade: Informed<String>,
    pub hora_fato: Informed<String>,
}

/// One reported incident after normalization and the region join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRow {
    /// `None` only for general-source rows whose date failed to parse.
    pub data_fato: Option<NaiveDate>,
    pub fato_comunicado: String,
    pub municipio: String,
    pub municipio_normalizado: String,
    pub mesoregiao: Informed<String>,
    pub associacao: Informed<String>,
    pub idade_vitima: Option<f64>,
    pub ano: Option<i32>,
    pub mes: Option<String>,
    pub femicide: Option<FemicideDetails>,
}

impl FactRow {
    pub fn is_femicide_sourced(&self) -> bool {
        self.femicide.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRow {
    pub municipio: String,
    pub municipio_normalizado: String,
    pub mesoregiao: String,
    pub associacao: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationRow {
    pub municipio: String,
    pub municipio_normalizado: String,
    pub populacao_feminina: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolidayRow {
    pub data: NaiveDate,
    pub feriado: String,
}

/// All logical tables of one snapshot.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub geral: Vec<FactRow>,
    pub feminicidio: Vec<FactRow>,
    pub populacao: Vec<PopulationRow>,
    pub regioes: Vec<RegionRow>,
    pub calendario: Vec<HolidayRow>,
}

impl Tables {
    pub fn is_empty(&self) -> bool {
        self.geral.is_empty()
            && self.feminicidio.is_empty()
            && self.populacao.is_empty()
            && self.regioes.is_empty()
            && self.calendario.is_empty()
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct YearCountRow {
    #[serde(rename = "Grupo")]
    #[tabled(rename = "Grupo")]
    pub group: String,
    #[serde(rename = "Ano")]
    #[tabled(rename = "Ano")]
    pub year: i32,
    #[serde(rename = "Quantidade")]
    #[tabled(rename = "Quantidade")]
    pub count: usize,
    #[serde(rename = "VariacaoAnual")]
    #[tabled(rename = "VariacaoAnual")]
    pub yoy_change: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupTrendRow {
    #[serde(rename = "Grupo")]
    #[tabled(rename = "Grupo")]
    pub group: String,
    #[serde(rename = "AnoInicial")]
    #[tabled(rename = "AnoInicial")]
    pub first_year: i32,
    #[serde(rename = "AnoFinal")]
    #[tabled(rename = "AnoFinal")]
    pub last_year: i32,
    #[serde(rename = "QuantidadeInicial")]
    #[tabled(rename = "QuantidadeInicial")]
    pub first_count: usize,
    #[serde(rename = "QuantidadeFinal")]
    #[tabled(rename = "QuantidadeFinal")]
    pub last_count: usize,
    #[serde(rename = "CAGR")]
    #[tabled(rename = "CAGR")]
    pub cagr: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CategoryCountRow {
    #[serde(rename = "Posicao")]
    #[tabled(rename = "Posicao")]
    pub rank: usize,
    #[serde(rename = "Categoria")]
    #[tabled(rename = "Categoria")]
    pub category: String,
    #[serde(rename = "Quantidade")]
    #[tabled(rename = "Quantidade")]
    pub count: usize,
    #[serde(rename = "Percentual")]
    #[tabled(rename = "Percentual")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WeekdayCountRow {
    #[serde(rename = "Dia da Semana")]
    #[tabled(rename = "Dia da Semana")]
    pub weekday: String,
    #[serde(rename = "Quantidade")]
    #[tabled(rename = "Quantidade")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AgeBandRow {
    #[serde(rename = "Faixa Etária")]
    #[tabled(rename = "Faixa Etária")]
    pub band: String,
    #[serde(rename = "Quantidade")]
    #[tabled(rename = "Quantidade")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthCountRow {
    #[serde(rename = "Mes")]
    #[tabled(rename = "Mes")]
    pub month: String,
    #[serde(rename = "Quantidade")]
    #[tabled(rename = "Quantidade")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MunicipalityRateRow {
    #[serde(rename = "Municipio")]
    #[tabled(rename = "Municipio")]
    pub municipio: String,
    #[serde(rename = "PopulacaoFeminina")]
    #[tabled(rename = "PopulacaoFeminina")]
    pub female_population: String,
    #[serde(rename = "TotalFatos")]
    #[tabled(rename = "TotalFatos")]
    pub total: usize,
    #[serde(rename = "MediaAnual")]
    #[tabled(rename = "MediaAnual")]
    pub annual_average: String,
    #[serde(rename = "TaxaPorMil")]
    #[tabled(rename = "TaxaPorMil")]
    pub rate_per_thousand: String,
    #[serde(rename = "PercentualMulheres")]
    #[tabled(rename = "PercentualMulheres")]
    pub percent_of_women: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct HolidayComparisonRow {
    #[serde(rename = "TipoDia")]
    #[tabled(rename = "TipoDia")]
    pub day_kind: String,
    #[serde(rename = "Dias")]
    #[tabled(rename = "Dias")]
    pub days: usize,
    #[serde(rename = "Quantidade")]
    #[tabled(rename = "Quantidade")]
    pub count: usize,
    #[serde(rename = "MediaDiaria")]
    #[tabled(rename = "MediaDiaria")]
    pub daily_average: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_incidents: usize,
    pub total_femicides: usize,
    pub municipalities_affected: usize,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub rows_without_date: usize,
}
