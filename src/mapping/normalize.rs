/// Namespace token stripped from external identifiers, compared case-sensitively.
pub const OMIM_PREFIX: &str = "OMIM:";

/// Trims and uppercases a knowledge-base CURIE (`mondo:0007739` → `MONDO:0007739`).
pub fn normalize_knowledge_base_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

/// Reduces `OMIM:154700`, ` 154700 ` and `154700` to the bare catalog number.
pub fn normalize_external_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix(OMIM_PREFIX).unwrap_or(trimmed).trim();
    if bare.is_empty() {
        return None;
    }
    Some(bare.to_string())
}

/// First `OMIM:` cross-reference in a record's xref list, normalized.
pub fn find_external_id<S: AsRef<str>>(xrefs: &[S]) -> Option<String> {
    xrefs
        .iter()
        .map(|xref| xref.as_ref().trim())
        .filter(|xref| xref.starts_with(OMIM_PREFIX))
        .find_map(normalize_external_id)
}
