use std::collections::BTreeSet;

/// A set of billing codes for one patient from one coding source.
///
/// Codes are trimmed and deduplicated; case is preserved as given. Ordering is lexical so that
/// serialised output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CodeSet(BTreeSet<String>);

impl CodeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated code list.
    ///
    /// `None`, the empty string, and lists containing only separators/whitespace all yield the
    /// empty set.
    pub fn parse(input: Option<&str>) -> Self {
        match input {
            Some(text) => Self::from_codes(text.split(',')),
            None => Self::new(),
        }
    }

    /// Builds a set from individual code strings, trimming each and dropping blanks.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            codes
                .into_iter()
                .map(|c| c.as_ref().trim().to_owned())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    /// Codes present in `self` but not in `other`.
    pub fn difference(&self, other: &CodeSet) -> CodeSet {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    /// Codes present in both sets.
    pub fn intersection(&self, other: &CodeSet) -> CodeSet {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Comma-joined serialisation (`"A, B"`), suitable for prompts and round-tripping
    /// through [`CodeSet::parse`].
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(", ")
    }
}

impl<'a> IntoIterator for &'a CodeSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_deduplicates() {
        let set = CodeSet::parse(Some(" R91.8, I63.512 ,R91.8,, "));
        assert_eq!(set.len(), 2);
        assert!(set.contains("R91.8"));
        assert!(set.contains("I63.512"));
    }

    #[test]
    fn parse_preserves_case() {
        let set = CodeSet::parse(Some("r91.8,R91.8"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn missing_and_empty_input_yield_empty_set() {
        assert!(CodeSet::parse(None).is_empty());
        assert!(CodeSet::parse(Some("")).is_empty());
        assert!(CodeSet::parse(Some(" , ,")).is_empty());
    }

    #[test]
    fn joined_serialisation_reparses_to_same_set() {
        for input in ["C78.7, Z87.891", "A", "", "B,A,B, C "] {
            let set = CodeSet::parse(Some(input));
            let reparsed = CodeSet::parse(Some(&set.joined()));
            assert_eq!(set, reparsed, "input: {input:?}");
        }
    }

    #[test]
    fn missed_and_extra_partition_the_sets() {
        let baseline = CodeSet::from_codes(["A", "B", "C"]);
        let ai = CodeSet::from_codes(["A", "B", "D"]);

        let missed = baseline.difference(&ai);
        let extra = ai.difference(&baseline);
        let shared = baseline.intersection(&ai);

        assert_eq!(missed, CodeSet::from_codes(["C"]));
        assert_eq!(extra, CodeSet::from_codes(["D"]));
        assert!(missed.intersection(&extra).is_empty());
        assert!(missed.intersection(&shared).is_empty());
        assert!(extra.intersection(&shared).is_empty());
        assert_eq!(baseline.len(), missed.len() + shared.len());
    }
}
