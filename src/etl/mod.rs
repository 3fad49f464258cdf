//! Raw spreadsheets to canonical tables.
//!
//! The pipeline reads every source, cleans headers, folds legacy crime
//! labels, parses dates and numbers, keys every municipality with
//! [`normalize`], joins the region reference table and concatenates the
//! general and femicide facts into one unified table. Nothing is written
//! until every source has been read and validated.

pub mod corrections;
pub mod headers;
pub mod sources;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::geometry::GeoFeatureCollection;
use crate::normalize::normalize;
use crate::snapshot::{self, SnapshotManifest};
use crate::types::{
    FactRow, FemicideDetails, HolidayRow, Informed, PopulationRow, RegionRow, Tables,
    FEMICIDE_LABEL,
};
use crate::util::{is_missing_text, month_name, parse_date_safe, parse_f64_safe};
use corrections::CorrectionTable;
use sources::{cell, RawTable};

/// Location of every raw source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub regioes: PathBuf,
    pub populacao: PathBuf,
    pub calendario: PathBuf,
    pub geral: PathBuf,
    pub feminicidio: PathBuf,
    pub geometria: PathBuf,
}

impl SourcePaths {
    /// The conventional file names inside one raw-data directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            regioes: dir.join("base_regioes_associacoes.csv"),
            populacao: dir.join("base_populacao.csv"),
            calendario: dir.join("base_calendario_feriados.csv"),
            geral: dir.join("base_geral.csv"),
            feminicidio: dir.join("base_feminicidio.csv"),
            geometria: dir.join("municipios_sc.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Cells that failed date/number conversion and were nulled.
    pub parse_errors: usize,
    /// Rows discarded because a required value failed to parse.
    pub dropped_rows: usize,
    /// Fact rows with no matching region row.
    pub region_misses: usize,
}

impl SourceReport {
    fn new(source: &str, total_rows: usize) -> Self {
        Self {
            source: source.to_string(),
            total_rows,
            ..Default::default()
        }
    }
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows read, {} kept, {} dropped, {} parse errors, {} without region",
            self.source,
            self.total_rows,
            self.kept_rows,
            self.dropped_rows,
            self.parse_errors,
            self.region_misses
        )
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EtlReport {
    pub sources: Vec<SourceReport>,
    pub corrected_labels: usize,
    pub correction_version: u32,
    pub keyed_features: usize,
    pub unified_rows: usize,
}

#[derive(Debug, Clone)]
pub struct EtlOutput {
    pub tables: Tables,
    pub geometry: GeoFeatureCollection,
    pub report: EtlReport,
}

/// Region attributes looked up by canonical key. Rows whose name
/// normalizes to the empty key are never indexed.
struct RegionIndex {
    by_key: HashMap<String, (Informed<String>, Informed<String>)>,
}

impl RegionIndex {
    fn new(rows: &[RegionRow]) -> Self {
        let mut by_key = HashMap::with_capacity(rows.len());
        for row in rows {
            if row.municipio_normalizado.is_empty() {
                warn!(mesoregiao = %row.mesoregiao, "region row without a municipality name; skipped");
                continue;
            }
            if by_key.contains_key(&row.municipio_normalizado) {
                warn!(municipio = %row.municipio, "duplicate region row; keeping the first");
                continue;
            }
            by_key.insert(
                row.municipio_normalizado.clone(),
                (
                    Informed::from_label(&row.mesoregiao),
                    Informed::from_label(&row.associacao),
                ),
            );
        }
        Self { by_key }
    }

    /// Left-join lookup; `None` on a miss, which callers count and record
    /// as "not informed".
    fn lookup(&self, key: &str) -> Option<(Informed<String>, Informed<String>)> {
        self.by_key.get(key).cloned()
    }
}

pub struct Pipeline {
    paths: SourcePaths,
    corrections: CorrectionTable,
}

impl Pipeline {
    pub fn new(paths: SourcePaths, corrections: CorrectionTable) -> Self {
        Self { paths, corrections }
    }

    pub fn corrections(&self) -> &CorrectionTable {
        &self.corrections
    }

    /// Read and transform every source. Fails on the first missing or
    /// unreadable file and on the first missing column.
    pub fn run(&self) -> Result<EtlOutput> {
        let mut report = EtlReport {
            correction_version: self.corrections.version,
            ..Default::default()
        };

        let regioes_raw = RawTable::read(&self.paths.regioes, &headers::REGIONS)?;
        let populacao_raw = RawTable::read(&self.paths.populacao, &headers::POPULATION)?;
        let calendario_raw = RawTable::read(&self.paths.calendario, &headers::CALENDAR)?;
        let geral_raw = RawTable::read(&self.paths.geral, &headers::GENERAL)?;
        let feminicidio_raw = RawTable::read(&self.paths.feminicidio, &headers::FEMICIDE)?;
        let mut geometry = GeoFeatureCollection::from_path(&self.paths.geometria)?;

        let (regioes, r) = build_regions(&regioes_raw)?;
        report.sources.push(r);
        let (populacao, r) = build_population(&populacao_raw)?;
        report.sources.push(r);
        let (calendario, r) = build_calendar(&calendario_raw)?;
        report.sources.push(r);

        let index = RegionIndex::new(&regioes);
        let (geral, r, corrected) = build_general(&geral_raw, &index, &self.corrections)?;
        report.corrected_labels = corrected;
        report.sources.push(r);
        let (feminicidio, r) = build_femicide(&feminicidio_raw, &index)?;
        report.sources.push(r);

        let unified = unify(geral, &feminicidio);
        report.unified_rows = unified.len();
        report.keyed_features = geometry.attach_canonical_keys();

        for source in &report.sources {
            info!("{}", source);
        }
        info!(
            unified = report.unified_rows,
            corrected = report.corrected_labels,
            features = report.keyed_features,
            "etl finished"
        );

        Ok(EtlOutput {
            tables: Tables {
                geral: unified,
                feminicidio,
                populacao,
                regioes,
                calendario,
            },
            geometry,
            report,
        })
    }

    /// Run the pipeline and persist the snapshot. An error in any step
    /// leaves `out_dir` untouched.
    pub fn run_and_persist(&self, out_dir: &Path) -> Result<EtlOutput> {
        let output = self.run()?;
        let manifest = SnapshotManifest::describe(&output.tables, self.corrections.version);
        snapshot::write_snapshot(out_dir, &output.tables, &output.geometry, &manifest)?;
        Ok(output)
    }
}

/// Concatenate general rows with the femicide rows relabeled to the
/// single femicide crime label.
pub fn unify(geral: Vec<FactRow>, feminicidio: &[FactRow]) -> Vec<FactRow> {
    let mut unified = geral;
    unified.reserve(feminicidio.len());
    unified.extend(feminicidio.iter().cloned().map(|mut row| {
        row.fato_comunicado = FEMICIDE_LABEL.to_string();
        row
    }));
    unified
}

fn build_regions(raw: &RawTable) -> Result<(Vec<RegionRow>, SourceReport)> {
    let [mun, meso, assoc] = raw.columns(["municipio", "mesoregiao", "associacao"])?;
    let mut report = SourceReport::new(raw.source, raw.len());
    let rows: Vec<RegionRow> = raw
        .rows()
        .iter()
        .map(|row| {
            let municipio = text(row, mun);
            RegionRow {
                municipio_normalizado: normalize(Some(&municipio)),
                municipio,
                mesoregiao: text(row, meso),
                associacao: text(row, assoc),
            }
        })
        .collect();
    report.kept_rows = rows.len();
    Ok((rows, report))
}

fn build_population(raw: &RawTable) -> Result<(Vec<PopulationRow>, SourceReport)> {
    let [mun, pop] = raw.columns(["municipio", "populacao_feminina"])?;
    let mut report = SourceReport::new(raw.source, raw.len());
    let mut rows = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        let municipio = text(row, mun);
        let populacao_feminina = parse_number(cell(row, pop), &mut report);
        rows.push(PopulationRow {
            municipio_normalizado: normalize(Some(&municipio)),
            municipio,
            populacao_feminina,
        });
    }
    report.kept_rows = rows.len();
    Ok((rows, report))
}

fn build_calendar(raw: &RawTable) -> Result<(Vec<HolidayRow>, SourceReport)> {
    let [data, feriado] = raw.columns(["data", "feriado"])?;
    let mut report = SourceReport::new(raw.source, raw.len());
    let mut rows = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        match parse_date_safe(cell(row, data)) {
            Some(date) => rows.push(HolidayRow {
                data: date,
                feriado: text(row, feriado),
            }),
            None => {
                report.parse_errors += 1;
                report.dropped_rows += 1;
            }
        }
    }
    report.kept_rows = rows.len();
    Ok((rows, report))
}

/// General facts. Rows whose date fails to parse are kept with a null
/// date: this source's consumers handle missing dates themselves, unlike
/// the femicide source below.
fn build_general(
    raw: &RawTable,
    regions: &RegionIndex,
    corrections: &CorrectionTable,
) -> Result<(Vec<FactRow>, SourceReport, usize)> {
    let [data, mun, fato, idade] =
        raw.columns(["data_fato", "municipio", "fato_comunicado", "idade_vitima"])?;
    let mut report = SourceReport::new(raw.source, raw.len());
    let mut corrected = 0usize;
    let mut rows = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        let label = cell(row, fato).unwrap_or_default();
        let fixed = corrections.apply(label);
        if fixed != label {
            corrected += 1;
        }
        let data_fato = parse_date(cell(row, data), &mut report);
        let idade_vitima = parse_number(cell(row, idade), &mut report);
        rows.push(fact_row(
            data_fato,
            fixed.to_string(),
            text(row, mun),
            idade_vitima,
            None,
            regions,
            &mut report,
        ));
    }
    report.kept_rows = rows.len();
    Ok((rows, report, corrected))
}

const FEMICIDE_COLUMNS: [&str; 15] = [
    "data_fato",
    "municipio",
    "fato_comunicado",
    "idade_vitima",
    "idade_autor",
    "etnia_vitima",
    "etnia_autor",
    "relacao_autor",
    "passagem_policial",
    "passagem_por_violencia_domestica",
    "bo_de_vd_contra_o_autor",
    "autor_preso",
    "meio_crime",
    "localidade",
    "hora_fato",
];

/// Femicide facts. Rows whose date fails to parse are dropped.
fn build_femicide(raw: &RawTable, regions: &RegionIndex) -> Result<(Vec<FactRow>, SourceReport)> {
    let [data, mun, fato, idade, idade_autor, etnia_vitima, etnia_autor, relacao, passagem, passagem_vd, bo_vd, preso, meio, localidade, hora] =
        raw.columns(FEMICIDE_COLUMNS)?;
    let mut report = SourceReport::new(raw.source, raw.len());
    let mut rows = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        let Some(data_fato) = parse_date(cell(row, data), &mut report) else {
            report.dropped_rows += 1;
            continue;
        };
        let details = FemicideDetails {
            idade_autor: parse_number(cell(row, idade_autor), &mut report),
            etnia_vitima: forced_text(row, etnia_vitima),
            etnia_autor: forced_text(row, etnia_autor),
            relacao_autor: optional_text(row, relacao),
            passagem_policial: forced_text(row, passagem),
            passagem_por_violencia_domestica: forced_text(row, passagem_vd),
            bo_de_vd_contra_o_autor: forced_text(row, bo_vd),
            autor_preso: forced_text(row, preso),
            meio_crime: optional_text(row, meio),
            localidade: forced_text(row, localidade),
            hora_fato: forced_text(row, hora),
        };
        let idade_vitima = parse_number(cell(row, idade), &mut report);
        rows.push(fact_row(
            Some(data_fato),
            text(row, fato),
            text(row, mun),
            idade_vitima,
            Some(details),
            regions,
            &mut report,
        ));
    }
    report.kept_rows = rows.len();
    Ok((rows, report))
}

fn fact_row(
    data_fato: Option<NaiveDate>,
    fato_comunicado: String,
    municipio: String,
    idade_vitima: Option<f64>,
    femicide: Option<FemicideDetails>,
    regions: &RegionIndex,
    report: &mut SourceReport,
) -> FactRow {
    let municipio_normalizado = normalize(Some(&municipio));
    let (mesoregiao, associacao) = regions.lookup(&municipio_normalizado).unwrap_or_else(|| {
        report.region_misses += 1;
        (Informed::NotInformed, Informed::NotInformed)
    });
    FactRow {
        ano: data_fato.map(|d| d.year()),
        mes: data_fato.map(|d| month_name(d).to_string()),
        data_fato,
        fato_comunicado,
        municipio,
        municipio_normalizado,
        mesoregiao,
        associacao,
        idade_vitima,
        femicide,
    }
}

fn text(row: &StringRecord, idx: usize) -> String {
    cell(row, idx).unwrap_or_default().to_string()
}

/// Free text that must stay text; blanks and `nan` become "not informed".
fn forced_text(row: &StringRecord, idx: usize) -> Informed<String> {
    let value = cell(row, idx);
    if is_missing_text(value) {
        Informed::NotInformed
    } else {
        Informed::Known(value.unwrap_or_default().trim().to_string())
    }
}

fn optional_text(row: &StringRecord, idx: usize) -> Option<String> {
    let value = cell(row, idx);
    if is_missing_text(value) {
        None
    } else {
        value.map(|v| v.trim().to_string())
    }
}

/// Blank cells are plain nulls; non-blank cells that fail to parse are
/// counted as parse errors before becoming nulls.
fn parse_date(value: Option<&str>, report: &mut SourceReport) -> Option<NaiveDate> {
    let parsed = parse_date_safe(value);
    if parsed.is_none() && !is_blank(value) {
        report.parse_errors += 1;
    }
    parsed
}

fn parse_number(value: Option<&str>, report: &mut SourceReport) -> Option<f64> {
    let parsed = parse_f64_safe(value);
    if parsed.is_none() && !is_blank(value) {
        report.parse_errors += 1;
    }
    parsed
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::headers::{FEMICIDE, GENERAL, REGIONS};
    use crate::types::NOT_INFORMED;

    fn regions() -> RegionIndex {
        let raw = RawTable::parse(
            "Município,Mesoregião,Associação\nFlorianópolis,Grande Florianópolis,GRANFPOLIS\nBlumenau,Vale do Itajaí,\n",
            Path::new("regioes.csv"),
            &REGIONS,
        )
        .unwrap();
        let (rows, _) = build_regions(&raw).unwrap();
        RegionIndex::new(&rows)
    }

    #[test]
    fn general_rows_are_corrected_keyed_and_joined() {
        let raw = RawTable::parse(
            "Data do Fato,Município,Fato Comunicado,Idade\n\
             2020-05-01,FLORIANOPOLIS ,Lesão Corporal Dolosa,34\n\
             2020-05-02,Cidade Fantasma,Ameaça,abc\n\
             sem data,Blumenau,Estupro coletivo,\n",
            Path::new("geral.csv"),
            &GENERAL,
        )
        .unwrap();
        let (rows, report, corrected) =
            build_general(&raw, &regions(), &CorrectionTable::builtin()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(corrected, 2);

        let first = &rows[0];
        assert_eq!(first.municipio_normalizado, "FLORIANOPOLIS");
        assert_eq!(first.mesoregiao.as_label(), "Grande Florianópolis");
        assert_eq!(first.fato_comunicado, "Lesão corporal grave ou gravíssima - Dolosa");
        assert_eq!(first.idade_vitima, Some(34.0));
        assert_eq!(first.ano, Some(2020));
        assert_eq!(first.mes.as_deref(), Some("May"));

        assert_eq!(rows[1].mesoregiao, Informed::NotInformed);
        assert_eq!(rows[1].associacao.as_label(), NOT_INFORMED);
        assert_eq!(rows[1].idade_vitima, None);

        // unparseable general dates are kept as nulls
        assert_eq!(rows[2].data_fato, None);
        assert_eq!(rows[2].ano, None);
        assert_eq!(rows[2].fato_comunicado, "Estupro");
        // blank association in the reference table is "not informed"
        assert_eq!(rows[2].associacao, Informed::NotInformed);

        assert_eq!(report.parse_errors, 2);
        assert_eq!(report.region_misses, 1);
        assert_eq!(report.dropped_rows, 0);
    }

    #[test]
    fn blank_region_rows_do_not_join_blank_municipalities() {
        let raw = RawTable::parse(
            "Município,Mesoregião,Associação\n,Oeste,AMOSC\nLages,Serrana,AMURES\n",
            Path::new("regioes.csv"),
            &REGIONS,
        )
        .unwrap();
        let (rows, _) = build_regions(&raw).unwrap();
        let index = RegionIndex::new(&rows);
        assert!(index.lookup("").is_none());
        assert!(index.lookup("LAGES").is_some());

        let general = RawTable::parse(
            "Data do Fato,Município,Fato Comunicado,Idade\n2020-05-01,,Ameaça,30\n",
            Path::new("geral.csv"),
            &GENERAL,
        )
        .unwrap();
        let (facts, report, _) = build_general(&general, &index, &CorrectionTable::builtin()).unwrap();
        assert_eq!(facts[0].mesoregiao, Informed::NotInformed);
        assert_eq!(report.region_misses, 1);
    }

    #[test]
    fn femicide_rows_with_bad_dates_are_dropped_and_text_is_forced() {
        let raw = RawTable::parse(
            "FATO,DATA,HORA,MUNICÍPIO,LOCALIDADE,PASSAGEM POR VIOLÊNCIA DOMÉSTICA,RELAÇÃO COM O AUTOR,BO DE VD CONTRA O AUTOR,IDADE AUTOR,ETNIA/RAÇA AUTOR,PASSAGEM POLICIAL,PRISÃO,IDADE VITIMA,ETNIA/RAÇA VITIMA,MEIO\n\
             Feminicídio consumado,2021-03-08,22:30,Blumenau,Residência,Sim,Companheiro,nan,41,Branca,,Sim,38,Parda,Arma branca\n\
             Feminicídio,xx/yy,,Blumenau,,,,,,,,,,,\n",
            Path::new("feminicidio.csv"),
            &FEMICIDE,
        )
        .unwrap();
        let (rows, report) = build_femicide(&raw, &regions()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(report.dropped_rows, 1);

        let row = &rows[0];
        assert_eq!(row.fato_comunicado, "Feminicídio consumado");
        assert_eq!(row.mesoregiao.as_label(), "Vale do Itajaí");
        let details = row.femicide.as_ref().unwrap();
        assert_eq!(details.idade_autor, Some(41.0));
        assert_eq!(details.bo_de_vd_contra_o_autor, Informed::NotInformed);
        assert_eq!(details.passagem_policial, Informed::NotInformed);
        assert_eq!(details.hora_fato, Informed::Known("22:30".to_string()));
        assert_eq!(details.relacao_autor.as_deref(), Some("Companheiro"));
        assert_eq!(details.meio_crime.as_deref(), Some("Arma branca"));
    }

    #[test]
    fn femicide_source_without_required_column_fails() {
        let raw = RawTable::parse(
            "FATO,DATA,MUNICÍPIO\nFeminicídio,2021-01-01,Blumenau\n",
            Path::new("feminicidio.csv"),
            &FEMICIDE,
        )
        .unwrap();
        assert!(matches!(
            build_femicide(&raw, &regions()),
            Err(crate::error::ObservatoryError::Schema { .. })
        ));
    }

    #[test]
    fn unified_table_relabels_every_femicide_row() {
        let base = FactRow {
            data_fato: NaiveDate::from_ymd_opt(2022, 1, 1),
            fato_comunicado: "Feminicídio tentado".to_string(),
            municipio: "Blumenau".to_string(),
            municipio_normalizado: "BLUMENAU".to_string(),
            mesoregiao: Informed::NotInformed,
            associacao: Informed::NotInformed,
            idade_vitima: None,
            ano: Some(2022),
            mes: Some("January".to_string()),
            femicide: None,
        };
        let general = vec![FactRow {
            fato_comunicado: "Ameaça".to_string(),
            ..base.clone()
        }];
        let femicide = vec![base.clone(), base];
        let unified = unify(general, &femicide);
        assert_eq!(unified.len(), 3);
        assert_eq!(unified[0].fato_comunicado, "Ameaça");
        assert!(unified[1..].iter().all(|r| r.fato_comunicado == FEMICIDE_LABEL));
        // the femicide table keeps its own labels
        assert_eq!(femicide[0].fato_comunicado, "Feminicídio tentado");
    }
}
