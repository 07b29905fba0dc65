//! Text normalization for ship keys.

use once_cell::sync::Lazy;
use regex::Regex;

static INTEGER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)([0-9]+)$").expect("static regex"));

static NON_SCORED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]+").expect("static regex"));

static REPEATED_SCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("static regex"));

/// Bump the trailing integer of `value`, or append `2` if there is none.
///
/// ```
/// use cadence_core::text::increment_integer_suffix;
///
/// assert_eq!(increment_integer_suffix("leaves"), "leaves2");
/// assert_eq!(increment_integer_suffix("leaves9"), "leaves10");
/// assert_eq!(increment_integer_suffix(""), "2");
/// ```
pub fn increment_integer_suffix(value: &str) -> String {
    if let Some(caps) = INTEGER_SUFFIX.captures(value) {
        let head = &caps[1];
        let digits = &caps[2];
        if let Some(next) = digits.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
            return format!("{}{}", head, next);
        }
    }
    format!("{}2", value)
}

/// Conform a ship key to lower-scored form (`"Buns & Jams"` becomes `"buns_jams"`).
pub fn to_ship_key(raw: &str) -> String {
    let scored = NON_SCORED.replace_all(raw.trim(), "_");
    let collapsed = REPEATED_SCORES.replace_all(&scored, "_");
    collapsed.trim_matches('_').to_lowercase()
}
