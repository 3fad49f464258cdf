//! Command line and environment configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::filter::{FilterSelection, Range, OPEN_AGE_BOUND};
use crate::reports::Grouping;

#[derive(Parser, Debug)]
#[command(
    name = "observatorio",
    version,
    about = "Observatório da violência contra a mulher em Santa Catarina: ETL e relatórios"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the raw spreadsheets and write the processed snapshot
    Preprocess(PreprocessArgs),
    /// Filter the processed snapshot and export report tables
    Report(ReportArgs),
    /// Print the municipalities sharing a border
    Neighbors(NeighborsArgs),
}

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Directory with the raw exports (base_*.csv, municipios_sc.json)
    #[arg(long, env = "OBSERVATORIO_RAW_DIR", default_value = "data")]
    pub raw_dir: PathBuf,

    /// Snapshot directory (replaced on success)
    #[arg(long, env = "OBSERVATORIO_DATA_DIR", default_value = "data/processed")]
    pub out_dir: PathBuf,

    /// JSON correction table replacing the built-in one
    #[arg(long, value_name = "PATH")]
    pub corrections: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingArg {
    Consolidado,
    Municipio,
    Mesoregiao,
    Associacao,
}

impl From<GroupingArg> for Grouping {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::Consolidado => Grouping::Consolidated,
            GroupingArg::Municipio => Grouping::Municipality,
            GroupingArg::Mesoregiao => Grouping::Mesoregion,
            GroupingArg::Associacao => Grouping::Association,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Snapshot directory written by `preprocess`
    #[arg(long, env = "OBSERVATORIO_DATA_DIR", default_value = "data/processed")]
    pub data_dir: PathBuf,

    /// Where CSV/JSON reports are written (created if absent)
    #[arg(long, env = "OBSERVATORIO_EXPORT_DIR", default_value = "reports")]
    pub export_dir: PathBuf,

    /// First day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the period (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long, value_name = "NOME")]
    pub municipio: Vec<String>,

    #[arg(long, value_name = "NOME")]
    pub mesoregiao: Vec<String>,

    #[arg(long, value_name = "NOME")]
    pub associacao: Vec<String>,

    /// Crime type label; repeat for several
    #[arg(long, value_name = "FATO")]
    pub fato: Vec<String>,

    #[arg(long)]
    pub idade_min: Option<f64>,

    /// 100 or more means no upper limit
    #[arg(long)]
    pub idade_max: Option<f64>,

    #[arg(long)]
    pub populacao_min: Option<f64>,

    #[arg(long)]
    pub populacao_max: Option<f64>,

    #[arg(long)]
    pub media_anual_min: Option<f64>,

    #[arg(long)]
    pub media_anual_max: Option<f64>,

    #[arg(long)]
    pub taxa_min: Option<f64>,

    #[arg(long)]
    pub taxa_max: Option<f64>,

    #[arg(long)]
    pub percentual_min: Option<f64>,

    #[arg(long)]
    pub percentual_max: Option<f64>,

    #[arg(long, value_enum, default_value = "consolidado")]
    pub agrupamento: GroupingArg,

    /// Rows shown per table preview
    #[arg(long, default_value = "5")]
    pub preview_rows: usize,
}

#[derive(Args, Debug)]
pub struct NeighborsArgs {
    #[arg(long, env = "OBSERVATORIO_DATA_DIR", default_value = "data/processed")]
    pub data_dir: PathBuf,

    /// Municipality name in any spelling; omit to list the whole graph
    #[arg(long)]
    pub municipio: Option<String>,

    /// Write the full graph as JSON here
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

fn set(values: &[String]) -> Option<BTreeSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().cloned().collect())
    }
}

fn range(min: Option<f64>, max: Option<f64>) -> Option<Range> {
    match (min, max) {
        (None, None) => None,
        (min, max) => Some(Range::new(
            min.unwrap_or(f64::NEG_INFINITY),
            max.unwrap_or(f64::INFINITY),
        )),
    }
}

impl ReportArgs {
    pub fn selection(&self) -> FilterSelection {
        FilterSelection {
            from: self.from,
            to: self.to,
            municipios: set(&self.municipio),
            mesoregioes: set(&self.mesoregiao),
            associacoes: set(&self.associacao),
            fatos: set(&self.fato),
            idade: match (self.idade_min, self.idade_max) {
                (None, None) => None,
                (min, max) => Some(Range::new(
                    min.unwrap_or(0.0),
                    max.unwrap_or(OPEN_AGE_BOUND),
                )),
            },
            populacao_feminina: range(self.populacao_min, self.populacao_max),
            media_anual_fatos: range(self.media_anual_min, self.media_anual_max),
            taxa_por_mil_mulheres: range(self.taxa_min, self.taxa_max),
            percentual_mulheres_vitimas: range(self.percentual_min, self.percentual_max),
        }
    }
}
