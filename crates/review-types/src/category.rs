use crate::TextError;

/// Chart-level agreement between baseline and AI code sets.
///
/// The only transition the reconciliation engine performs is promotion of `NoMatch` or
/// `Partial` to `CompletePostReview`. `Complete` and `CompletePostReview` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MatchCategory {
    #[serde(rename = "Complete Match")]
    Complete,
    #[serde(rename = "Partial Match")]
    Partial,
    #[serde(rename = "No Match")]
    NoMatch,
    #[serde(rename = "Complete Match (Post-Review)")]
    CompletePostReview,
}

impl MatchCategory {
    /// The label used in datasets and exported documents.
    pub fn label(self) -> &'static str {
        match self {
            Self::Complete => "Complete Match",
            Self::Partial => "Partial Match",
            Self::NoMatch => "No Match",
            Self::CompletePostReview => "Complete Match (Post-Review)",
        }
    }

    /// Returns the category after adjudication-driven promotion.
    ///
    /// Promotion is one-way and idempotent: promoting an already complete chart is a no-op.
    pub fn promoted(self) -> Self {
        match self {
            Self::Partial | Self::NoMatch => Self::CompletePostReview,
            Self::Complete | Self::CompletePostReview => self,
        }
    }

    /// True for both original and post-review complete matches.
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Complete | Self::CompletePostReview)
    }
}

impl std::fmt::Display for MatchCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for MatchCategory {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Complete Match" => Ok(Self::Complete),
            "Partial Match" => Ok(Self::Partial),
            "No Match" => Ok(Self::NoMatch),
            "Complete Match (Post-Review)" => Ok(Self::CompletePostReview),
            other => Err(TextError::UnknownMatchCategory(other.to_owned())),
        }
    }
}
