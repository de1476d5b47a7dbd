use log::debug;
use std::collections::BTreeMap;
use std::fmt::Display;

/// The fields a time-study table is expected to provide, whatever the source column names.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum CanonicalField {
    /// What is being done (e.g. "Remove bolt").
    Activity,
    /// A grouping of activities (e.g. "Mechanical").
    Category,
    /// Internal, external or waste, as observed today.
    CurrentType,
    /// Internal, external or waste, in the proposed future state.
    ProposedType,
    /// The measured duration, before numeric normalization.
    DurationRaw,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::Activity,
        CanonicalField::Category,
        CanonicalField::CurrentType,
        CanonicalField::ProposedType,
        CanonicalField::DurationRaw,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Activity => "Activity",
            CanonicalField::Category => "Category",
            CanonicalField::CurrentType => "CurrentType",
            CanonicalField::ProposedType => "ProposedType",
            CanonicalField::DurationRaw => "DurationRaw",
        }
    }

    /// Parses the name of a field, ignoring case.
    pub fn parse(name: &str) -> Option<CanonicalField> {
        CanonicalField::ALL
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    /// Keywords used to suggest a source column, most specific first.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Activity => &[
                "activity",
                "actividad",
                "task",
                "tarea",
                "description",
                "descripción",
            ],
            CanonicalField::Category => &["category", "categoría", "categoria", "group", "grupo"],
            CanonicalField::CurrentType => &[
                "current type",
                "tipo actual",
                "current",
                "actual",
                "type",
                "tipo",
            ],
            CanonicalField::ProposedType => &[
                "proposed",
                "propuest",
                "future",
                "futur",
                "improved",
                "mejora",
            ],
            CanonicalField::DurationRaw => &[
                "duration",
                "duración",
                "duracion",
                "tiempo",
                "time",
                "seconds",
                "segundos",
            ],
        }
    }

    /// Terms that disqualify a column even when it contains one of the keywords.
    ///
    /// "Start time" or "Hora fin" hold clock times, not durations.
    pub fn exclusions(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::DurationRaw => &["start", "end", "inicio", "fin", "hora", "clock"],
            _ => &[],
        }
    }
}

impl Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Suggests the candidate column matching a keyword set.
///
/// Keywords are tried in order and the first candidate containing the current
/// keyword (case-insensitive) is returned. None means that nothing matched: it
/// is not a silent "first column" fallback.
pub fn suggest_column<S: AsRef<str>, K: AsRef<str>>(candidates: &[S], keywords: &[K]) -> Option<usize> {
    let none: [&str; 0] = [];
    suggest_column_excluding(candidates, keywords, &none)
}

/// Same as [suggest_column], ignoring the candidates that contain one of the `exclusions`.
pub fn suggest_column_excluding<S: AsRef<str>, K: AsRef<str>, X: AsRef<str>>(
    candidates: &[S],
    keywords: &[K],
    exclusions: &[X],
) -> Option<usize> {
    let excluded: Vec<String> = exclusions
        .iter()
        .map(|x| x.as_ref().to_lowercase())
        .filter(|x| !x.is_empty())
        .collect();
    let lowered: Vec<Option<String>> = candidates
        .iter()
        .map(|c| c.as_ref().to_lowercase())
        .map(|c| {
            if excluded.iter().any(|x| c.contains(x.as_str())) {
                None
            } else {
                Some(c)
            }
        })
        .collect();
    for k in keywords {
        let lk = k.as_ref().to_lowercase();
        if lk.is_empty() {
            continue;
        }
        let found = lowered
            .iter()
            .position(|c| c.as_ref().map(|c| c.contains(lk.as_str())).unwrap_or(false));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Associates canonical fields to the names of source columns.
///
/// The mapping is advisory: several fields may point to the same column. Use
/// [ColumnMapping::duplicates] to find out and warn.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ColumnMapping {
    fields: BTreeMap<CanonicalField, String>,
}

impl ColumnMapping {
    pub fn new() -> ColumnMapping {
        ColumnMapping::default()
    }

    /// Builds a mapping from keyword suggestions over the given column names.
    ///
    /// Fields without any suggestion are left unmapped.
    pub fn suggest<S: AsRef<str>>(columns: &[S]) -> ColumnMapping {
        let mut res = ColumnMapping::new();
        for field in CanonicalField::ALL.iter() {
            if let Some(idx) = suggest_column_excluding(columns, field.keywords(), field.exclusions()) {
                let name = columns[idx].as_ref().to_string();
                debug!("suggest: {} -> {:?}", field, name);
                res.set(*field, name);
            }
        }
        res
    }

    pub fn set(&mut self, field: CanonicalField, column: String) {
        self.fields.insert(field, column);
    }

    pub fn remove(&mut self, field: CanonicalField) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.fields.iter().map(|(f, c)| (*f, c.as_str()))
    }

    /// The column names chosen by more than one field, in field order.
    pub fn duplicates(&self) -> Vec<String> {
        let mut res: Vec<String> = Vec::new();
        for (idx, (_, col)) in self.fields.iter().enumerate() {
            let seen_before = self.fields.values().take(idx).any(|c| c == col);
            if seen_before && !res.contains(col) {
                res.push(col.clone());
            }
        }
        res
    }
}
