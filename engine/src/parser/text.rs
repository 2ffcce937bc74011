use once_cell::sync::Lazy;
use regex::Regex;

static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("whitespace regex"));
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_`]").expect("emphasis regex"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?[0-9]+(?:\.[0-9]+)?").expect("number regex"));
static PURE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+(?:[.,][0-9]+)?$").expect("pure number regex"));
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*+•]|[0-9]+[.)])\s+").expect("list marker regex"));

/// Collapse runs of blanks and trim.
pub fn norm(s: &str) -> String {
    WS.replace_all(s.trim(), " ").into_owned()
}

/// Drop markdown emphasis characters, then normalize.
pub fn strip_md(s: &str) -> String {
    norm(&EMPHASIS.replace_all(s, ""))
}

/// First number in `s`; `,` is accepted as the decimal separator and `?` means unknown.
pub fn as_number(s: &str) -> Option<f64> {
    let s = strip_md(s).replace(',', ".");
    if s.is_empty() || s.contains('?') {
        return None;
    }
    NUMBER.find(&s).and_then(|m| m.as_str().parse().ok())
}

/// True when the whole value is a single number (no unit, no prose).
pub fn is_pure_number(s: &str) -> bool {
    PURE_NUMBER.is_match(&strip_md(s))
}

/// Parse a `current/max` pair; a bare number stands for both.
pub fn as_pair(s: &str) -> Option<(i32, i32)> {
    let s = strip_md(s);
    match s.split_once('/') {
        Some((cur, max)) => {
            let max = as_number(max)?;
            // "?/30" keeps the max and treats the instance as full
            let cur = as_number(cur).unwrap_or(max);
            Some((cur.round() as i32, max.round() as i32))
        }
        None => as_number(&s).map(|v| (v.round() as i32, v.round() as i32)),
    }
}

/// Remove a leading bullet or ordinal marker.
pub fn strip_list_marker(s: &str) -> &str {
    match LIST_MARKER.find(s) {
        Some(m) => &s[m.end()..],
        None => s.trim_start(),
    }
}

/// Lowercase and fold the accents the documents actually use, for key matching.
pub fn fold_key(s: &str) -> String {
    strip_md(s)
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'û' | 'ù' => 'u',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// `name`, or `name (2)`, `name (3)`… whichever is not taken yet.
pub fn unique_key(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    let mut i = 2;
    loop {
        let candidate = format!("{name} ({i})");
        if !taken(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_tolerate_markup_and_commas() {
        assert_eq!(as_number("**12,5** PM"), Some(12.5));
        assert_eq!(as_number("??"), None);
        assert_eq!(as_number("aucun"), None);
        assert!(is_pure_number(" 14 "));
        assert!(!is_pure_number("14 PV"));
    }

    #[test]
    fn pairs_parse_current_and_max() {
        assert_eq!(as_pair("8/10"), Some((8, 10)));
        assert_eq!(as_pair("25"), Some((25, 25)));
        assert_eq!(as_pair("?/30"), Some((30, 30)));
        assert_eq!(as_pair("?"), None);
    }

    #[test]
    fn list_markers_are_removed() {
        assert_eq!(strip_list_marker("  - Morsure"), "Morsure");
        assert_eq!(strip_list_marker("2. Charge"), "Charge");
        assert_eq!(strip_list_marker("Griffe"), "Griffe");
    }

    #[test]
    fn unique_key_numbers_duplicates() {
        let taken = ["Slime", "Slime (2)"];
        assert_eq!(unique_key("Slime", |k| taken.contains(&k)), "Slime (3)");
        assert_eq!(unique_key("Loup", |k| taken.contains(&k)), "Loup");
    }

    #[test]
    fn keys_fold_accents() {
        assert_eq!(fold_key("**Coût MP**"), "cout mp");
        assert_eq!(fold_key("Compétences"), "competences");
    }
}
