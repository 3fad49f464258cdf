//! Snapshot persistence.
//!
//! A snapshot is a directory with one Parquet file per logical table, the
//! keyed geometry as `geojson_sc.json` and a small `manifest.json`. Tables
//! are independent: any of them can be read back on its own.
//!
//! [`Observatory`] is the loaded, read-only view of a snapshot. Build it once
//! at startup and hand out references; it never reloads, so files changed on
//! disk after loading are not seen until the process restarts.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int32Array, RecordBatch, StringArray,
};
use arrow_schema::{ArrowError, DataType, Field, Schema, SchemaRef};
use chrono::{Datelike, NaiveDate, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::adjacency::{build_adjacency, AdjacencyGraph};
use crate::error::{ObservatoryError, Result};
use crate::geometry::GeoFeatureCollection;
use crate::types::{
    FactRow, FemicideDetails, HolidayRow, Informed, PopulationRow, RegionRow, Tables,
};

pub const GEOMETRY_FILE: &str = "geojson_sc.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub tables: BTreeMap<String, usize>,
    pub geometry_file: String,
    pub correction_version: u32,
    pub created_at: String,
}

impl SnapshotManifest {
    pub fn describe(tables: &Tables, correction_version: u32) -> Self {
        let counts = BTreeMap::from([
            (FactRow::GERAL.to_string(), tables.geral.len()),
            (FactRow::FEMINICIDIO.to_string(), tables.feminicidio.len()),
            (PopulationRow::TABLE.to_string(), tables.populacao.len()),
            (RegionRow::TABLE.to_string(), tables.regioes.len()),
            (HolidayRow::TABLE.to_string(), tables.calendario.len()),
        ]);
        Self {
            tables: counts,
            geometry_file: GEOMETRY_FILE.to_string(),
            correction_version,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Row types that map onto one Parquet table.
pub trait Columnar: Sized {
    fn schema() -> SchemaRef;
    fn to_batch(rows: &[Self]) -> std::result::Result<RecordBatch, ArrowError>;
    fn from_batch(batch: &RecordBatch, path: &Path) -> Result<Vec<Self>>;
}

/// Write every table plus geometry and manifest.
///
/// The files are staged in a sibling directory and moved into place only
/// when all of them are written, so a failure never leaves a half-written
/// snapshot behind and the previous snapshot stays loadable. An existing
/// `dir` is only replaced when it is empty or holds a snapshot manifest.
pub fn write_snapshot(
    dir: &Path,
    tables: &Tables,
    geometry: &GeoFeatureCollection,
    manifest: &SnapshotManifest,
) -> Result<()> {
    check_target(dir)?;
    let staging = sibling(dir, "partial")?;
    let previous = sibling(dir, "previous")?;

    clear(&staging)?;
    fs::create_dir_all(&staging).map_err(|e| ObservatoryError::snapshot(&staging, e))?;
    if let Err(e) = write_all(&staging, tables, geometry, manifest)
        .and_then(|_| commit(dir, &staging, &previous))
    {
        if staging.is_dir() {
            let _ = fs::remove_dir_all(&staging);
        }
        return Err(e);
    }

    if previous.is_dir() {
        if let Err(e) = fs::remove_dir_all(&previous) {
            warn!(dir = %previous.display(), error = %e, "could not remove the replaced snapshot");
        }
    }
    info!(dir = %dir.display(), "snapshot written");
    Ok(())
}

/// Refuse targets that are not ours to replace.
fn check_target(dir: &Path) -> Result<()> {
    if dir.file_name().is_none() {
        return Err(ObservatoryError::snapshot(dir, "output directory must end in a name"));
    }
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() {
        return Err(ObservatoryError::snapshot(dir, "exists and is not a directory"));
    }
    let mut entries = fs::read_dir(dir).map_err(|e| ObservatoryError::snapshot(dir, e))?;
    if entries.next().is_some() && !dir.join(MANIFEST_FILE).is_file() {
        return Err(ObservatoryError::snapshot(
            dir,
            format!("not empty and has no {MANIFEST_FILE}; refusing to replace it"),
        ));
    }
    Ok(())
}

/// Swap the staged directory in. The old snapshot is parked next to it and
/// restored if the final rename fails.
fn commit(dir: &Path, staging: &Path, previous: &Path) -> Result<()> {
    clear(previous)?;
    let had_previous = dir.exists();
    if had_previous {
        fs::rename(dir, previous).map_err(|e| ObservatoryError::snapshot(dir, e))?;
    }
    if let Err(e) = fs::rename(staging, dir) {
        if had_previous {
            if let Err(restore) = fs::rename(previous, dir) {
                error!(dir = %dir.display(), error = %restore, "could not restore the previous snapshot");
            }
        }
        return Err(ObservatoryError::snapshot(dir, e));
    }
    Ok(())
}

/// Remove a leftover working directory; anything else at that path is an
/// error.
fn clear(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(path).map_err(|e| ObservatoryError::snapshot(path, e))
        }
        Ok(_) => Err(ObservatoryError::snapshot(path, "in the way of the snapshot writer")),
        Err(_) => Ok(()),
    }
}

fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| ObservatoryError::snapshot(dir, "output directory must end in a name"))?;
    Ok(dir.with_file_name(format!(".{}.{suffix}", name.to_string_lossy())))
}

fn write_all(
    dir: &Path,
    tables: &Tables,
    geometry: &GeoFeatureCollection,
    manifest: &SnapshotManifest,
) -> Result<()> {
    write_table(&dir.join(table_file(FactRow::GERAL)), &tables.geral)?;
    write_table(&dir.join(table_file(FactRow::FEMINICIDIO)), &tables.feminicidio)?;
    write_table(&dir.join(table_file(PopulationRow::TABLE)), &tables.populacao)?;
    write_table(&dir.join(table_file(RegionRow::TABLE)), &tables.regioes)?;
    write_table(&dir.join(table_file(HolidayRow::TABLE)), &tables.calendario)?;
    write_json(&dir.join(GEOMETRY_FILE), geometry.as_value())?;
    write_json(&dir.join(MANIFEST_FILE), manifest)?;
    Ok(())
}

fn table_file(name: &str) -> String {
    format!("{name}.parquet")
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| ObservatoryError::snapshot(path, e))?;
    fs::write(path, bytes).map_err(|e| ObservatoryError::snapshot(path, e))
}

pub fn write_table<T: Columnar>(path: &Path, rows: &[T]) -> Result<()> {
    let batch = T::to_batch(rows).map_err(|e| ObservatoryError::snapshot(path, e))?;
    let file = File::create(path).map_err(|e| ObservatoryError::snapshot(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .map_err(|e| ObservatoryError::snapshot(path, e))?;
    writer
        .write(&batch)
        .map_err(|e| ObservatoryError::snapshot(path, e))?;
    writer
        .close()
        .map_err(|e| ObservatoryError::snapshot(path, e))?;
    Ok(())
}

pub fn read_table<T: Columnar>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| ObservatoryError::snapshot(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| ObservatoryError::snapshot(path, e))?
        .build()
        .map_err(|e| ObservatoryError::snapshot(path, e))?;
    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| ObservatoryError::snapshot(path, e))?;
        rows.extend(T::from_batch(&batch, path)?);
    }
    Ok(rows)
}

/// Read-only, in-memory view of one snapshot directory.
#[derive(Debug, Clone)]
pub struct Observatory {
    dir: PathBuf,
    tables: Tables,
    geometry: GeoFeatureCollection,
    manifest: Option<SnapshotManifest>,
}

impl Observatory {
    /// Load every table and the geometry of a snapshot.
    ///
    /// A missing directory or geometry file is an error. A missing table
    /// loads as empty with a warning, since consumers can still render the
    /// others.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ObservatoryError::snapshot(
                dir,
                "directory not found; run the preprocess step first",
            ));
        }
        let geometry_path = dir.join(GEOMETRY_FILE);
        if !geometry_path.is_file() {
            return Err(ObservatoryError::snapshot(
                &geometry_path,
                "geometry file not found in snapshot",
            ));
        }

        let mut tables = Tables::default();
        let entries = fs::read_dir(dir).map_err(|e| ObservatoryError::snapshot(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| ObservatoryError::snapshot(dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match name {
                FactRow::GERAL => tables.geral = read_table(&path)?,
                FactRow::FEMINICIDIO => tables.feminicidio = read_table(&path)?,
                PopulationRow::TABLE => tables.populacao = read_table(&path)?,
                RegionRow::TABLE => tables.regioes = read_table(&path)?,
                HolidayRow::TABLE => tables.calendario = read_table(&path)?,
                other => warn!(table = other, "ignoring unknown snapshot table"),
            }
        }
        for (name, empty) in [
            (FactRow::GERAL, tables.geral.is_empty()),
            (FactRow::FEMINICIDIO, tables.feminicidio.is_empty()),
            (PopulationRow::TABLE, tables.populacao.is_empty()),
            (RegionRow::TABLE, tables.regioes.is_empty()),
            (HolidayRow::TABLE, tables.calendario.is_empty()),
        ] {
            if empty {
                warn!(table = name, "snapshot table missing or empty");
            }
        }

        let text = fs::read_to_string(&geometry_path)
            .map_err(|e| ObservatoryError::snapshot(&geometry_path, e))?;
        let document = serde_json::from_str(&text)
            .map_err(|e| ObservatoryError::snapshot(&geometry_path, e))?;
        let geometry = GeoFeatureCollection::from_value(document)
            .map_err(|e| ObservatoryError::snapshot(&geometry_path, e))?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = fs::read_to_string(&manifest_path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());

        info!(
            dir = %dir.display(),
            geral = tables.geral.len(),
            feminicidio = tables.feminicidio.len(),
            features = geometry.len(),
            "snapshot loaded"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            tables,
            geometry,
            manifest,
        })
    }

    /// Presentation-facing variant: logs the failure and hands back empty
    /// tables and no geometry, so the caller can show a message and stop.
    pub fn load_or_empty(dir: &Path) -> (Tables, Option<GeoFeatureCollection>) {
        match Self::load(dir) {
            Ok(obs) => (obs.tables, Some(obs.geometry)),
            Err(e) => {
                error!(error = %e, "failed to load processed data");
                (Tables::default(), None)
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn geometry(&self) -> &GeoFeatureCollection {
        &self.geometry
    }

    pub fn manifest(&self) -> Option<&SnapshotManifest> {
        self.manifest.as_ref()
    }

    /// Neighbor graph of the loaded geometry, computed on demand.
    pub fn neighbors(&self) -> AdjacencyGraph {
        build_adjacency(&self.geometry)
    }
}

// ── column helpers ─────────────────────────────────────────────────────────

fn utf8(name: &str, nullable: bool) -> Field {
    Field::new(name, DataType::Utf8, nullable)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str, path: &Path) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| {
            ObservatoryError::snapshot(path, format!("column '{name}' missing or mistyped"))
        })
}

fn string_at(a: &StringArray, i: usize) -> String {
    if a.is_null(i) {
        String::new()
    } else {
        a.value(i).to_string()
    }
}

fn opt_string_at(a: &StringArray, i: usize) -> Option<String> {
    (!a.is_null(i)).then(|| a.value(i).to_string())
}

fn opt_f64_at(a: &Float64Array, i: usize) -> Option<f64> {
    (!a.is_null(i)).then(|| a.value(i))
}

fn informed_at(a: &StringArray, i: usize) -> Informed<String> {
    Informed::from_label(&string_at(a, i))
}

fn date_to_days(d: NaiveDate) -> i32 {
    d.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

fn strings<'a, R: 'a>(rows: &'a [R], f: impl Fn(&'a R) -> Option<&'a str>) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn details_str<'a>(
    row: &'a FactRow,
    f: impl Fn(&'a FemicideDetails) -> Option<&'a str>,
) -> Option<&'a str> {
    row.femicide.as_ref().and_then(f)
}

// ── table mappings ─────────────────────────────────────────────────────────

impl FactRow {
    pub const GERAL: &'static str = "geral";
    pub const FEMINICIDIO: &'static str = "feminicidio";
}

impl Columnar for FactRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("data_fato", DataType::Date32, true),
            utf8("fato_comunicado", false),
            utf8("municipio", false),
            utf8("municipio_normalizado", false),
            utf8("mesoregiao", false),
            utf8("associacao", false),
            Field::new("idade_vitima", DataType::Float64, true),
            Field::new("ano", DataType::Int32, true),
            utf8("mes", true),
            Field::new("fonte_feminicidio", DataType::Boolean, false),
            Field::new("idade_autor", DataType::Float64, true),
            utf8("etnia_vitima", true),
            utf8("etnia_autor", true),
            utf8("relacao_autor", true),
            utf8("passagem_policial", true),
            utf8("passagem_por_violencia_domestica", true),
            utf8("bo_de_vd_contra_o_autor", true),
            utf8("autor_preso", true),
            utf8("meio_crime", true),
            utf8("localidade", true),
            utf8("hora_fato", true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> std::result::Result<RecordBatch, ArrowError> {
        let dates = Date32Array::from(
            rows.iter()
                .map(|r| r.data_fato.map(date_to_days))
                .collect::<Vec<_>>(),
        );
        let idades = Float64Array::from(rows.iter().map(|r| r.idade_vitima).collect::<Vec<_>>());
        let anos = Int32Array::from(rows.iter().map(|r| r.ano).collect::<Vec<_>>());
        let fonte = BooleanArray::from(
            rows.iter()
                .map(FactRow::is_femicide_sourced)
                .collect::<Vec<_>>(),
        );
        let idades_autor = Float64Array::from(
            rows.iter()
                .map(|r| r.femicide.as_ref().and_then(|d| d.idade_autor))
                .collect::<Vec<_>>(),
        );
        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(dates),
                strings(rows, |r| Some(r.fato_comunicado.as_str())),
                strings(rows, |r| Some(r.municipio.as_str())),
                strings(rows, |r| Some(r.municipio_normalizado.as_str())),
                strings(rows, |r| Some(r.mesoregiao.as_label())),
                strings(rows, |r| Some(r.associacao.as_label())),
                Arc::new(idades),
                Arc::new(anos),
                strings(rows, |r| r.mes.as_deref()),
                Arc::new(fonte),
                Arc::new(idades_autor),
                strings(rows, |r| details_str(r, |d| Some(d.etnia_vitima.as_label()))),
                strings(rows, |r| details_str(r, |d| Some(d.etnia_autor.as_label()))),
                strings(rows, |r| details_str(r, |d| d.relacao_autor.as_deref())),
                strings(rows, |r| details_str(r, |d| Some(d.passagem_policial.as_label()))),
                strings(rows, |r| {
                    details_str(r, |d| Some(d.passagem_por_violencia_domestica.as_label()))
                }),
                strings(rows, |r| {
                    details_str(r, |d| Some(d.bo_de_vd_contra_o_autor.as_label()))
                }),
                strings(rows, |r| details_str(r, |d| Some(d.autor_preso.as_label()))),
                strings(rows, |r| details_str(r, |d| d.meio_crime.as_deref())),
                strings(rows, |r| details_str(r, |d| Some(d.localidade.as_label()))),
                strings(rows, |r| details_str(r, |d| Some(d.hora_fato.as_label()))),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch, path: &Path) -> Result<Vec<Self>> {
        let dates = column::<Date32Array>(batch, "data_fato", path)?;
        let fato = column::<StringArray>(batch, "fato_comunicado", path)?;
        let municipio = column::<StringArray>(batch, "municipio", path)?;
        let chave = column::<StringArray>(batch, "municipio_normalizado", path)?;
        let meso = column::<StringArray>(batch, "mesoregiao", path)?;
        let assoc = column::<StringArray>(batch, "associacao", path)?;
        let idade = column::<Float64Array>(batch, "idade_vitima", path)?;
        let ano = column::<Int32Array>(batch, "ano", path)?;
        let mes = column::<StringArray>(batch, "mes", path)?;
        let fonte = column::<BooleanArray>(batch, "fonte_feminicidio", path)?;
        let idade_autor = column::<Float64Array>(batch, "idade_autor", path)?;
        let etnia_vitima = column::<StringArray>(batch, "etnia_vitima", path)?;
        let etnia_autor = column::<StringArray>(batch, "etnia_autor", path)?;
        let relacao = column::<StringArray>(batch, "relacao_autor", path)?;
        let passagem = column::<StringArray>(batch, "passagem_policial", path)?;
        let passagem_vd = column::<StringArray>(batch, "passagem_por_violencia_domestica", path)?;
        let bo_vd = column::<StringArray>(batch, "bo_de_vd_contra_o_autor", path)?;
        let preso = column::<StringArray>(batch, "autor_preso", path)?;
        let meio = column::<StringArray>(batch, "meio_crime", path)?;
        let localidade = column::<StringArray>(batch, "localidade", path)?;
        let hora = column::<StringArray>(batch, "hora_fato", path)?;

        let rows = (0..batch.num_rows())
            .map(|i| {
                let femicide = (!fonte.is_null(i) && fonte.value(i)).then(|| FemicideDetails {
                    idade_autor: opt_f64_at(idade_autor, i),
                    etnia_vitima: informed_at(etnia_vitima, i),
                    etnia_autor: informed_at(etnia_autor, i),
                    relacao_autor: opt_string_at(relacao, i),
                    passagem_policial: informed_at(passagem, i),
                    passagem_por_violencia_domestica: informed_at(passagem_vd, i),
                    bo_de_vd_contra_o_autor: informed_at(bo_vd, i),
                    autor_preso: informed_at(preso, i),
                    meio_crime: opt_string_at(meio, i),
                    localidade: informed_at(localidade, i),
                    hora_fato: informed_at(hora, i),
                });
                FactRow {
                    data_fato: (!dates.is_null(i))
                        .then(|| days_to_date(dates.value(i)))
                        .flatten(),
                    fato_comunicado: string_at(fato, i),
                    municipio: string_at(municipio, i),
                    municipio_normalizado: string_at(chave, i),
                    mesoregiao: informed_at(meso, i),
                    associacao: informed_at(assoc, i),
                    idade_vitima: opt_f64_at(idade, i),
                    ano: (!ano.is_null(i)).then(|| ano.value(i)),
                    mes: opt_string_at(mes, i),
                    femicide,
                }
            })
            .collect();
        Ok(rows)
    }
}

impl RegionRow {
    pub const TABLE: &'static str = "regioes";
}

impl Columnar for RegionRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("municipio", false),
            utf8("municipio_normalizado", false),
            utf8("mesoregiao", false),
            utf8("associacao", false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> std::result::Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows, |r| Some(r.municipio.as_str())),
                strings(rows, |r| Some(r.municipio_normalizado.as_str())),
                strings(rows, |r| Some(r.mesoregiao.as_str())),
                strings(rows, |r| Some(r.associacao.as_str())),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch, path: &Path) -> Result<Vec<Self>> {
        let municipio = column::<StringArray>(batch, "municipio", path)?;
        let chave = column::<StringArray>(batch, "municipio_normalizado", path)?;
        let meso = column::<StringArray>(batch, "mesoregiao", path)?;
        let assoc = column::<StringArray>(batch, "associacao", path)?;
        Ok((0..batch.num_rows())
            .map(|i| RegionRow {
                municipio: string_at(municipio, i),
                municipio_normalizado: string_at(chave, i),
                mesoregiao: string_at(meso, i),
                associacao: string_at(assoc, i),
            })
            .collect())
    }
}

impl PopulationRow {
    pub const TABLE: &'static str = "populacao";
}

impl Columnar for PopulationRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            utf8("municipio", false),
            utf8("municipio_normalizado", false),
            Field::new("populacao_feminina", DataType::Float64, true),
        ]))
    }

    fn to_batch(rows: &[Self]) -> std::result::Result<RecordBatch, ArrowError> {
        let populacao = Float64Array::from(
            rows.iter()
                .map(|r| r.populacao_feminina)
                .collect::<Vec<_>>(),
        );
        RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows, |r| Some(r.municipio.as_str())),
                strings(rows, |r| Some(r.municipio_normalizado.as_str())),
                Arc::new(populacao),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch, path: &Path) -> Result<Vec<Self>> {
        let municipio = column::<StringArray>(batch, "municipio", path)?;
        let chave = column::<StringArray>(batch, "municipio_normalizado", path)?;
        let populacao = column::<Float64Array>(batch, "populacao_feminina", path)?;
        Ok((0..batch.num_rows())
            .map(|i| PopulationRow {
                municipio: string_at(municipio, i),
                municipio_normalizado: string_at(chave, i),
                populacao_feminina: opt_f64_at(populacao, i),
            })
            .collect())
    }
}

impl HolidayRow {
    pub const TABLE: &'static str = "calendario";
}

impl Columnar for HolidayRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("data", DataType::Date32, false),
            utf8("feriado", false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> std::result::Result<RecordBatch, ArrowError> {
        let dates = Date32Array::from(
            rows.iter()
                .map(|r| date_to_days(r.data))
                .collect::<Vec<_>>(),
        );
        RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(dates),
                strings(rows, |r| Some(r.feriado.as_str())),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch, path: &Path) -> Result<Vec<Self>> {
        let dates = column::<Date32Array>(batch, "data", path)?;
        let feriado = column::<StringArray>(batch, "feriado", path)?;
        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let data = days_to_date(dates.value(i)).ok_or_else(|| {
                ObservatoryError::snapshot(path, format!("calendar row {i} has an invalid date"))
            })?;
            rows.push(HolidayRow {
                data,
                feriado: string_at(feriado, i),
            });
        }
        Ok(rows)
    }
}
