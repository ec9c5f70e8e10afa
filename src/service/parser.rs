use crate::models::ParsedOrderNumber;

/// Normalize a raw order identifier into `(base, variant)`.
///
/// The base is the first run of ASCII digits; a separator ends it. After
/// skipping separators (spaces, hyphens, slashes, anything non-alphanumeric),
/// a single letter becomes the upper-cased variant. Longer letter runs and
/// anything else are ignored. No digits yields an empty base.
pub fn parse(raw: &str) -> ParsedOrderNumber {
    let chars: Vec<char> = raw.chars().collect();

    let Some(start) = chars.iter().position(|c| c.is_ascii_digit()) else {
        return ParsedOrderNumber {
            base: String::new(),
            variant: None,
        };
    };

    let base: String = chars[start..]
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    let rest: Vec<char> = chars[start + base.len()..]
        .iter()
        .copied()
        .skip_while(|c| !c.is_alphanumeric())
        .collect();

    let variant = match rest.as_slice() {
        [letter, tail @ ..]
            if letter.is_ascii_alphabetic()
                && tail.first().map_or(true, |next| !next.is_alphabetic()) =>
        {
            Some(letter.to_ascii_uppercase())
        }
        _ => None,
    };

    ParsedOrderNumber { base, variant }
}

/// Duplicate-detection key. Unparsable entries key on their trimmed raw text
/// so unrelated garbage lines are not folded together.
pub fn duplicate_key(raw: &str, parsed: &ParsedOrderNumber) -> String {
    if parsed.is_parsable() {
        parsed.key()
    } else {
        format!("?{}", raw.trim().to_uppercase())
    }
}
