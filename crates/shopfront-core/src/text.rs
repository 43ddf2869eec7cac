//! Diacritic folding for keyword search.
//!
//! Product names in the catalog carry accented text; search input frequently
//! does not. Both adapters match a folded copy of the name next to the raw
//! text, so `ca phe` finds `Cà Phê`. The table covers the Latin-1 accents
//! plus the full Vietnamese vowel set, which is what the catalog actually
//! contains.

/// Accented forms (already lowercased) and their base letter.
const FOLD_GROUPS: &[(&str, char)] = &[
    ("àáạảãâầấậẩẫăằắặẳẵäåāă", 'a'),
    ("èéẹẻẽêềếệểễëēė", 'e'),
    ("ìíịỉĩïī", 'i'),
    ("òóọỏõôồốộổỗơờớợởỡöøō", 'o'),
    ("ùúụủũưừứựửữüūů", 'u'),
    ("ỳýỵỷỹÿ", 'y'),
    ("đ", 'd'),
    ("çćč", 'c'),
    ("ñń", 'n'),
    ("śš", 's'),
    ("źżž", 'z'),
];

fn fold_char(c: char) -> char {
    for (group, base) in FOLD_GROUPS {
        if group.contains(c) {
            return *base;
        }
    }
    c
}

/// Lowercase `input` and strip diacritics.
pub fn fold_diacritics(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_char)
        .collect()
}

/// True when `haystack` contains `keyword` case-insensitively, with or
/// without diacritics on either side.
pub fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if haystack.to_lowercase().contains(&keyword.to_lowercase()) {
        return true;
    }
    fold_diacritics(haystack).contains(&fold_diacritics(keyword))
}
