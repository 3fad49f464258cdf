#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

pub const REGIONS: &str = "\
Município;Mesoregião;Associação
Florianópolis;Grande Florianópolis;GRANFPOLIS
São José;Grande Florianópolis;GRANFPOLIS
Lages;Serrana;AMURES
";

pub const POPULATION: &str = "\
Município,População Feminina
Florianópolis,260000
São José,130000
Lages,80000
";

pub const CALENDAR: &str = "\
Data,Feriado
2021-01-01,Confraternização Universal
2021-04-21,Tiradentes
not a date,Carnaval
";

pub const GENERAL: &str = "\
Data do Fato,Município,Fato Comunicado,Idade
2021-01-01,FLORIANOPOLIS ,Lesão Corporal Dolosa,34
2021-03-15,São José,Ameaça,nan
15/06/2022,Lages,Estupro coletivo,19
sem data,Lages,Ameaça,40
2022-07-01,Palhoça,Ameaça,27
";

pub const FEMICIDE: &str = "\
FATO,DATA,HORA,MUNICÍPIO,LOCALIDADE,PASSAGEM POR VIOLÊNCIA DOMÉSTICA,RELAÇÃO COM O AUTOR,BO DE VD CONTRA O AUTOR,IDADE AUTOR,ETNIA/RAÇA AUTOR,PASSAGEM POLICIAL,PRISÃO,IDADE VITIMA,ETNIA/RAÇA VITIMA,MEIO
Feminicídio consumado,2021-05-10,22:00,Lages,Residência,Sim,Companheiro,Não,41,Branca,Sim,Sim,38,Branca,Arma branca
Feminicídio tentado,,,Lages,,,,,,,,,,,
Feminicídio consumado,2022-02-20 03:15:00,nan,São José,Via pública,nan,Ex-companheiro,,35,,,Não,29,Parda,
";

fn square(x: f64, y: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0], [x, y]]]
    })
}

pub fn geometry() -> Value {
    let feature = |name: &str, geometry: Value| {
        json!({
            "type": "Feature",
            "properties": { "NM_MUN": name, "CD_MUN": "42" },
            "geometry": geometry
        })
    };
    json!({
        "type": "FeatureCollection",
        "features": [
            feature("Florianópolis", square(0.0, 0.0)),
            feature("São José", square(1.0, 0.0)),
            feature("Palhoça", square(1.0, 1.0)),
            feature("Lages", square(5.0, 5.0)),
            feature("Herval d'Oeste", Value::Null),
        ]
    })
}

/// Write a complete raw-data directory.
pub fn write_raw_dir(dir: &Path) {
    fs::write(dir.join("base_regioes_associacoes.csv"), REGIONS).unwrap();
    fs::write(dir.join("base_populacao.csv"), POPULATION).unwrap();
    fs::write(dir.join("base_calendario_feriados.csv"), CALENDAR).unwrap();
    fs::write(dir.join("base_geral.csv"), GENERAL).unwrap();
    fs::write(dir.join("base_feminicidio.csv"), FEMICIDE).unwrap();
    fs::write(
        dir.join("municipios_sc.json"),
        serde_json::to_string(&geometry()).unwrap(),
    )
    .unwrap();
}
