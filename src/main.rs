// Entry point and high-level CLI flow.
//
// - `preprocess` runs the ETL over the raw exports and writes the snapshot.
// - `report` loads the snapshot once, applies the selected filters and
//   writes every report table plus a JSON summary.
// - `neighbors` prints the adjacency of one municipality or the whole graph.
use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use observatorio::config::{Cli, Command, NeighborsArgs, PreprocessArgs, ReportArgs};
use observatorio::etl::corrections::CorrectionTable;
use observatorio::etl::{Pipeline, SourcePaths};
use observatorio::filter::FilterOptions;
use observatorio::metrics::{municipality_metrics, MetricBounds};
use observatorio::normalize::normalize;
use observatorio::reports::{self, FemicideBreakdown, Grouping};
use observatorio::snapshot::Observatory;
use observatorio::{output, util};

/// Handle `preprocess`: run the pipeline and persist the snapshot.
///
/// Nothing is written unless every source loads; on failure the previous
/// snapshot (if any) is left as it was.
fn handle_preprocess(args: &PreprocessArgs) -> Result<()> {
    let corrections = match &args.corrections {
        Some(path) => CorrectionTable::from_path(path)
            .with_context(|| format!("loading corrections from {}", path.display()))?,
        None => CorrectionTable::builtin(),
    };
    let pipeline = Pipeline::new(SourcePaths::in_dir(&args.raw_dir), corrections);
    let out = pipeline
        .run_and_persist(&args.out_dir)
        .context("preprocessing failed; no snapshot was written")?;

    println!("Processing raw data... (correction table v{})", out.report.correction_version);
    for source in &out.report.sources {
        println!(
            "  {:<12} {} rows read, {} kept, {} dropped, {} parse errors",
            source.source,
            util::format_int(source.total_rows),
            util::format_int(source.kept_rows),
            util::format_int(source.dropped_rows),
            util::format_int(source.parse_errors),
        );
        if source.region_misses > 0 {
            println!(
                "  {:<12} {} rows without a region match",
                "",
                util::format_int(source.region_misses)
            );
        }
    }
    println!(
        "Unified table: {} rows ({} labels corrected). Geometry: {} features keyed.",
        util::format_int(out.report.unified_rows),
        util::format_int(out.report.corrected_labels),
        util::format_int(out.report.keyed_features),
    );
    println!("Snapshot saved to {}\n", args.out_dir.display());
    Ok(())
}

/// Handle `report`: filter the snapshot and export every report table.
///
/// Writes one CSV per report, the filtered incidents and `summary.json`
/// into the export directory, and prints a markdown preview of each.
fn handle_report(args: &ReportArgs) -> Result<()> {
    let (tables, geometry) = Observatory::load_or_empty(&args.data_dir);
    if geometry.is_none() {
        bail!(
            "processed data not found in {}; run `observatorio preprocess` first",
            args.data_dir.display()
        );
    }

    let selection = args.selection();
    let period = selection.period_slice(&tables.geral);
    let options = FilterOptions::from_period(&period, &tables.regioes);
    let bounds = MetricBounds::of(&municipality_metrics(&period, &tables.populacao));
    let geral = selection.apply(&tables.geral, &tables.populacao);
    let feminicidio = selection.apply_femicide(&tables.feminicidio, &tables.geral, &tables.populacao);

    fs::create_dir_all(&args.export_dir)
        .with_context(|| format!("creating {}", args.export_dir.display()))?;
    let export = |name: &str| args.export_dir.join(name);

    println!("Generating reports...");
    if let Some((start, end)) = options.period {
        println!("Period with data: {} to {}", start.format("%d/%m/%Y"), end.format("%d/%m/%Y"));
    }
    println!(
        "{} of {} incidents selected ({} femicides).",
        util::format_int(geral.len()),
        util::format_int(tables.geral.len()),
        util::format_int(feminicidio.len()),
    );
    println!(
        "Rate per 1,000 women in period: {} to {}\n",
        util::format_number(bounds.taxa_por_mil_mulheres.0, 4),
        util::format_number(bounds.taxa_por_mil_mulheres.1, 4),
    );

    let grouping: Grouping = args.agrupamento.into();
    let n = args.preview_rows;

    let years = reports::generate_year_counts(&geral, grouping);
    output::write_csv(&export("fatos_por_ano.csv"), &years)?;
    output::preview_table("Fatos por ano", None, &years, n);

    let trends = reports::generate_group_trends(&geral, grouping);
    output::write_csv(&export("tendencia_cagr.csv"), &trends)?;
    output::preview_table("Crescimento anual composto", Some("CAGR entre o primeiro e o último ano"), &trends, n);

    let crimes = reports::generate_crime_ranking(&geral);
    output::write_csv(&export("ranking_fatos.csv"), &crimes)?;
    output::preview_table("Fatos comunicados", None, &crimes, n);

    let months = reports::generate_month_counts(&geral);
    output::write_csv(&export("fatos_por_mes.csv"), &months)?;
    output::preview_table("Fatos por mês", None, &months, 12);

    let weekdays = reports::generate_weekday_counts(&geral);
    output::write_csv(&export("fatos_por_dia_semana.csv"), &weekdays)?;
    output::preview_table("Fatos por dia da semana", None, &weekdays, 7);

    let ages = reports::generate_age_bands(&geral);
    output::write_csv(&export("faixa_etaria_vitima.csv"), &ages)?;
    output::preview_table("Faixa etária da vítima", None, &ages, ages.len());

    let rates = reports::generate_municipality_rates(&geral, &tables.populacao);
    output::write_csv(&export("taxas_municipios.csv"), &rates)?;
    output::preview_table("Taxas por município", Some("por 1.000 mulheres"), &rates, n);

    for (kind, title, file) in [
        (FemicideBreakdown::Relationship, "Vínculo com o autor", "feminicidio_vinculo.csv"),
        (FemicideBreakdown::Method, "Meio utilizado", "feminicidio_meio.csv"),
        (FemicideBreakdown::Location, "Localidade", "feminicidio_localidade.csv"),
        (FemicideBreakdown::Arrest, "Autor preso", "feminicidio_prisao.csv"),
        (
            FemicideBreakdown::DomesticViolenceReport,
            "BO de violência doméstica contra o autor",
            "feminicidio_bo_vd.csv",
        ),
    ] {
        let rows = reports::generate_femicide_breakdown(&feminicidio, kind);
        output::write_csv(&export(file), &rows)?;
        output::preview_table(title, Some("feminicídios"), &rows, n);
    }

    let holidays = reports::generate_holiday_comparison(&geral, &tables.calendario);
    output::write_csv(&export("feriados_comparacao.csv"), &holidays)?;
    output::preview_table("Feriados x dias comuns", None, &holidays, 2);

    let ranking = reports::generate_holiday_ranking(&geral, &tables.calendario);
    output::write_csv(&export("feriados_ranking.csv"), &ranking)?;
    output::preview_table("Feriados com mais ocorrências", None, &ranking, n);

    output::write_facts_csv(&export("fatos_filtrados.csv"), &geral)?;

    let summary = reports::generate_summary(&geral, &feminicidio);
    output::write_json(&export("summary.json"), &summary)?;
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"total_incidents\": {}, \"total_femicides\": {}, \"municipalities_affected\": {}}}\n",
        util::format_int(summary.total_incidents),
        util::format_int(summary.total_femicides),
        util::format_int(summary.municipalities_affected),
    );
    println!("(Full tables exported to {})\n", args.export_dir.display());
    Ok(())
}

/// Handle `neighbors`: look up one municipality or dump the graph.
fn handle_neighbors(args: &NeighborsArgs) -> Result<()> {
    let obs = Observatory::load(&args.data_dir).context("loading processed data")?;
    let graph = obs.neighbors();

    if let Some(path) = &args.output {
        output::write_json(path, &graph)?;
        println!(
            "{} municipalities, {} borders written to {}",
            util::format_int(graph.len()),
            util::format_int(graph.edge_count()),
            path.display()
        );
    }

    match &args.municipio {
        Some(name) => {
            let key = normalize(Some(name));
            let Some(neighbors) = graph.neighbors(&key) else {
                bail!("municipality '{}' ({}) not found in geometry", name, key);
            };
            println!("{} ({} vizinhos):", key, neighbors.len());
            for n in neighbors {
                println!("  - {}", n);
            }
        }
        None if args.output.is_none() => {
            for (key, neighbors) in graph.iter() {
                let list: Vec<&str> = neighbors.iter().map(String::as_str).collect();
                println!("{}: {}", key, list.join(", "));
            }
        }
        None => {}
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Preprocess(args) => handle_preprocess(args),
        Command::Report(args) => handle_report(args),
        Command::Neighbors(args) => handle_neighbors(args),
    }
}
