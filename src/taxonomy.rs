use serde::Serialize;

/// Literal separator between category path segments, e.g.
/// `"패션의류 > 여성의류 > 원피스"`.
pub const SEPARATOR: &str = " > ";

/// The fixed Naver Shopping top-level taxonomy. The root view asserts this
/// list instead of deriving it from data, because upstream feeds are often
/// incomplete at the root.
pub const CANONICAL_LARGE: [&str; 11] = [
    "패션의류",
    "패션잡화",
    "화장품/미용",
    "디지털/가전",
    "가구/인테리어",
    "출산/육아",
    "식품",
    "스포츠/레저",
    "생활/건강",
    "여가/생활편의",
    "면세점",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathLevels {
    pub large: String,
    pub medium: String,
    pub small: String,
    pub smallest: String,
}

impl PathLevels {
    /// Segment at 0-based depth (0 = large .. 3 = smallest).
    pub fn at(&self, depth: usize) -> &str {
        match depth {
            0 => &self.large,
            1 => &self.medium,
            2 => &self.small,
            _ => &self.smallest,
        }
    }
}

/// Split a path on the literal separator into the four fixed levels.
/// Segments that are empty after trimming map to the empty string for that
/// level. Never fails; a missing or malformed path yields all-empty levels.
pub fn parse_path(path: &str) -> PathLevels {
    let mut levels = PathLevels::default();
    for (i, seg) in path.split(SEPARATOR).take(4).enumerate() {
        let seg = seg.trim();
        match i {
            0 => levels.large = seg.to_string(),
            1 => levels.medium = seg.to_string(),
            2 => levels.small = seg.to_string(),
            _ => levels.smallest = seg.to_string(),
        }
    }
    levels
}

/// Depth of a path: the number of non-empty, trimmed segments (0–4).
/// Display logic uses this recomputed value, never a stored level column.
pub fn actual_level(path: &str) -> i64 {
    path.split(SEPARATOR)
        .take(4)
        .filter(|s| !s.trim().is_empty())
        .count() as i64
}

/// Join the non-empty, trimmed segments with the separator.
pub fn build_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Normalization for top-level category matching: strip all whitespace and
/// lowercase. Tolerates naming drift between data sources ("패션 의류" vs
/// "패션의류", "Fashion" vs "fashion").
pub fn normalize_large(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whitespace- and case-insensitive comparison, used only at the large
/// level. Medium and deeper levels match exact strings.
pub fn matches_large(a: &str, b: &str) -> bool {
    normalize_large(a) == normalize_large(b)
}

pub fn is_canonical_large(s: &str) -> bool {
    let norm = normalize_large(s);
    CANONICAL_LARGE.iter().any(|c| normalize_large(c) == norm)
}

/// Sort labels ascending (or descending). Hangul syllables are laid out in
/// Korean alphabetical order in Unicode, so plain string comparison gives
/// the locale-correct ordering for this data.
pub fn sort_labels(labels: &mut [String], descending: bool) {
    labels.sort();
    if descending {
        labels.reverse();
    }
}
