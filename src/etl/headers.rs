//! Column-header cleanup.
//!
//! Every source goes through the same core (trim, lowercase, spaces to
//! underscores, fold a base set of accented letters). Sources differ only in
//! which extra accented letters they fold and which headers they rename, so
//! those two lists are the whole per-source definition.

const BASE_FOLDS: &[(char, char)] = &[('ã', 'a'), ('ç', 'c')];

#[derive(Debug, Clone, Copy)]
pub struct HeaderRules {
    pub source: &'static str,
    /// Accented letters folded on top of the base set.
    pub extra_folds: &'static [(char, char)],
    /// `(from, to)` pairs. `from` is matched against the trimmed raw header
    /// first and against the cleaned header second.
    pub renames: &'static [(&'static str, &'static str)],
}

pub const REGIONS: HeaderRules = HeaderRules {
    source: "regioes",
    extra_folds: &[('ô', 'o'), ('í', 'i')],
    renames: &[],
};

pub const POPULATION: HeaderRules = HeaderRules {
    source: "populacao",
    extra_folds: &[('ô', 'o'), ('í', 'i')],
    renames: &[],
};

pub const CALENDAR: HeaderRules = HeaderRules {
    source: "calendario",
    extra_folds: &[('ô', 'o'), ('í', 'i')],
    renames: &[],
};

pub const GENERAL: HeaderRules = HeaderRules {
    source: "geral",
    extra_folds: &[('ú', 'u')],
    renames: &[
        ("data_do_fato", "data_fato"),
        ("município", "municipio"),
        ("idade", "idade_vitima"),
    ],
};

pub const FEMICIDE: HeaderRules = HeaderRules {
    source: "feminicidio",
    extra_folds: &[('ú', 'u'), ('ô', 'o'), ('ê', 'e'), ('á', 'a')],
    renames: &[
        ("FATO", "fato_comunicado"),
        ("DATA", "data_fato"),
        ("HORA", "hora_fato"),
        ("MUNICÍPIO", "municipio"),
        ("LOCALIDADE", "localidade"),
        ("PASSAGEM POR VIOLÊNCIA DOMÉSTICA", "passagem_por_violencia_domestica"),
        ("RELAÇÃO COM O AUTOR", "relacao_autor"),
        ("BO DE VD CONTRA O AUTOR", "bo_de_vd_contra_o_autor"),
        ("IDADE AUTOR", "idade_autor"),
        ("ETNIA/RAÇA AUTOR", "etnia_autor"),
        ("PASSAGEM POLICIAL", "passagem_policial"),
        ("PRISÃO", "autor_preso"),
        ("IDADE VITIMA", "idade_vitima"),
        ("ETNIA/RAÇA VITIMA", "etnia_vitima"),
        ("MEIO", "meio_crime"),
    ],
};

/// The shared cleanup routine.
pub fn clean_header(raw: &str, extra_folds: &[(char, char)]) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c == ' ' {
                return '_';
            }
            BASE_FOLDS
                .iter()
                .chain(extra_folds)
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

impl HeaderRules {
    pub fn apply(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if let Some((_, to)) = self.renames.iter().find(|(from, _)| *from == trimmed) {
            return (*to).to_string();
        }
        let cleaned = clean_header(raw, self.extra_folds);
        self.renames
            .iter()
            .find(|(from, _)| *from == cleaned)
            .map(|(_, to)| (*to).to_string())
            .unwrap_or(cleaned)
    }
}
