use serde::{Deserialize, Serialize};

/// Total order on data sensitivity: `Public < Private < Enterprise < Restricted`.
///
/// A request at level `R` may read a chunk whose source level `S` satisfies
/// `S <= R`; stricter levels never reveal more than looser ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    #[default]
    Public,
    Private,
    Enterprise,
    Restricted,
}

impl PrivacyLevel {
    /// Whether a chunk/source at `self` may be read by a request at `requested`.
    pub fn accessible_at(self, requested: PrivacyLevel) -> bool {
        self <= requested
    }
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PrivacyLevel::Public => "public",
            PrivacyLevel::Private => "private",
            PrivacyLevel::Enterprise => "enterprise",
            PrivacyLevel::Restricted => "restricted",
        };
        f.write_str(label)
    }
}
