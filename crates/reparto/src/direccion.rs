//! Deterministic canonicalization of free-text addresses. Everything in
//! here is pure and never fails; empty input yields empty output.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Abbreviation → full form, applied on the lowercased, accent-stripped
/// text. Patterns are whole-word.
static ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bav\b", "avenida"),
        (r"\bavda\b", "avenida"),
        (r"\bdpto\b", "departamento"),
        (r"\bdep\b", "departamento"),
        (r"\bbv\b", "boulevard"),
        (r"\bblvd\b", "boulevard"),
        (r"\bcjal\b", "concejal"),
        (r"\bgral\b", "general"),
        (r"\bgte\b", "gente"),
        (r"\bpje\b", "pasaje"),
        (r"\bpas\b", "pasaje"),
        (r"\bsdte\b", "subdelegado"),
        (r"\bpte\b", "presidente"),
        (r"\bdr\b", "doctor"),
        (r"\bsam\b", "san martin"),
        (r"\bprov\b", "provincia"),
        (r"\bloc\b", "localidad"),
        (r"\bhdez\b", "hernandez"),
        (r"\bfdez\b", "fernandez"),
        (r"\bfco\b", "francisco"),
        (r"\bjse\b", "jose"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).expect("static pattern"), replacement)
    })
    .collect()
});

/// Locality aliases folded to the canonical name. Longest alias first so
/// "CIUDAD DE MENDOZA" is not eaten by the bare "CIUDAD" rule.
static CITY_ALIASES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let mut aliases = [
        ("CIUDAD DE MENDOZA", "MENDOZA"),
        ("LUJAN DE CUYO", "LUJÁN DE CUYO"),
        ("CIUDAD", "MENDOZA"),
        ("CAPITAL", "MENDOZA"),
        ("MZA", "MENDOZA"),
        ("GCR", "GODOY CRUZ"),
        ("GUAYMALLEN", "GUAYMALLÉN"),
        ("MAIPU", "MAIPÚ"),
        ("LUJAN", "LUJÁN DE CUYO"),
    ]
    .to_vec();
    aliases.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.len()));
    aliases
        .into_iter()
        .map(|(alias, canonical)| {
            let pattern = format!(r"\b{}\b", regex::escape(alias));
            (Regex::new(&pattern).expect("static pattern"), canonical)
        })
        .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static STREET_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());
static STREET_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(calle|av|avenida|bv|boulevard|pasaje|pje)\b").unwrap()
});

fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Canonical form: NFD accent strip, lowercase, abbreviations expanded,
/// whitespace collapsed. Idempotent.
pub fn normalize(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    let mut text = strip_diacritics(address).to_lowercase().trim().to_owned();
    for (pattern, replacement) in ABBREVIATIONS.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    WHITESPACE.replace_all(&text, " ").trim().to_owned()
}

/// Geocache key: normalized, uppercased, punctuation removed, spaces
/// replaced by underscores.
pub fn normalize_key(address: &str) -> String {
    let normalized = normalize(address).to_uppercase();
    let cleaned = NON_WORD.replace_all(&normalized, "");
    WHITESPACE
        .replace_all(cleaned.trim(), "_")
        .into_owned()
}

/// Folds locality aliases to their canonical names. Output is uppercased.
pub fn fold_city_aliases(address: &str) -> String {
    let mut upper = address.to_uppercase();
    for (pattern, canonical) in CITY_ALIASES.iter() {
        upper = pattern.replace_all(&upper, *canonical).into_owned();
    }
    upper
}

/// Street name without number or street-type prefix, for fuzzy lookups.
pub fn extract_street_base(address: &str) -> String {
    let no_number = STREET_NUMBER.replace_all(address, "");
    let no_prefix = STREET_PREFIX.replace_all(&no_number, "");
    WHITESPACE.replace_all(no_prefix.trim(), " ").into_owned()
}

/// Ensures the address carries a locality and the region name:
/// `CALLE NUMERO, LOCALIDAD, Mendoza`.
pub fn reorder_components(address: &str, localidad: &str) -> String {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    match parts.len() {
        1 => format!("{}, {}, Mendoza", parts[0], localidad),
        2 => format!("{}, {}, Mendoza", parts[0], parts[1]),
        _ => address.to_owned(),
    }
}
