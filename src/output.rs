use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::error::{ObservatoryError, Result};
use crate::types::FactRow;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let err = |e: csv::Error| ObservatoryError::export(path, e);
    let mut wtr = csv::Writer::from_path(path).map_err(err)?;
    for r in rows {
        wtr.serialize(r).map_err(err)?;
    }
    wtr.flush().map_err(|e| ObservatoryError::export(path, e))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).map_err(|e| ObservatoryError::export(path, e))?;
    std::fs::write(path, s).map_err(|e| ObservatoryError::export(path, e))?;
    Ok(())
}

const FACT_COLUMNS: [&str; 20] = [
    "data_fato",
    "fato_comunicado",
    "municipio",
    "municipio_normalizado",
    "mesoregiao",
    "associacao",
    "idade_vitima",
    "ano",
    "mes",
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

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Export incident rows as one flat CSV. Femicide columns stay empty for
/// rows that do not carry them.
pub fn write_facts_csv(path: &Path, rows: &[FactRow]) -> Result<()> {
    let err = |e: csv::Error| ObservatoryError::export(path, e);
    let mut wtr = csv::Writer::from_path(path).map_err(err)?;
    wtr.write_record(FACT_COLUMNS).map_err(err)?;
    for r in rows {
        let mut record = vec![
            opt(r.data_fato),
            r.fato_comunicado.clone(),
            r.municipio.clone(),
            r.municipio_normalizado.clone(),
            r.mesoregiao.to_string(),
            r.associacao.to_string(),
            opt(r.idade_vitima),
            opt(r.ano),
            r.mes.clone().unwrap_or_default(),
        ];
        match &r.femicide {
            Some(f) => record.extend([
                opt(f.idade_autor),
                f.etnia_vitima.to_string(),
                f.etnia_autor.to_string(),
                f.relacao_autor.clone().unwrap_or_default(),
                f.passagem_policial.to_string(),
                f.passagem_por_violencia_domestica.to_string(),
                f.bo_de_vd_contra_o_autor.to_string(),
                f.autor_preso.to_string(),
                f.meio_crime.clone().unwrap_or_default(),
                f.localidade.to_string(),
                f.hora_fato.to_string(),
            ]),
            None => record.extend(std::iter::repeat(String::new()).take(11)),
        }
        wtr.write_record(&record).map_err(err)?;
    }
    wtr.flush().map_err(|e| ObservatoryError::export(path, e))?;
    Ok(())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    preview_table_rows(rows, max_rows);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(sem linhas)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
