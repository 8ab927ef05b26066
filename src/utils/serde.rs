use serde::{Deserialize, Serialize};

/// Upstream fields that arrive as a single string, a list, or not at all.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StringOrVec {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrVec {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Single(value) => vec![value],
            Self::Multiple(values) => values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StringOrVec;

    #[test]
    fn string_or_vec_accepts_all_xref_shapes() {
        let none: StringOrVec = serde_json::from_str("null").unwrap();
        let single: StringOrVec = serde_json::from_str("\"OMIM:154700\"").unwrap();
        let multiple: StringOrVec =
            serde_json::from_str("[\"DOID:14323\",\"OMIM:154700\"]").unwrap();

        assert_eq!(none.into_vec(), Vec::<String>::new());
        assert_eq!(single.into_vec(), vec!["OMIM:154700"]);
        assert_eq!(multiple.into_vec(), vec!["DOID:14323", "OMIM:154700"]);
    }
}
