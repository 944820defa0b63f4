use crate::error::CoordError;
use crate::hash::ContentId;
use crate::serialize::{canonical_bytes, canonical_digest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const SIGNING_DOMAIN: &str = "trellis.operation.v1";

/// What an operation does to its files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Read,
    Edit,
    Create,
    Delete,
    Custom(String),
}

impl ActionType {
    /// Everything except `read` may change file contents.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Read)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Read => "read",
            Self::Edit => "edit",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Custom(name) => name,
        }
    }
}

impl FromStr for ActionType {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "" => Err(CoordError::InvalidAction(s.to_string())),
            "read" => Ok(Self::Read),
            "edit" => Ok(Self::Edit),
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            _ => Ok(Self::Custom(name)),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Proposed,
    Committed,
    Conflicted,
    Aborted,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }

    /// Still competing for its files.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Proposed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Committed => "committed",
            Self::Conflicted => "conflicted",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A proposed or completed file-level action by one agent; one DAG vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub agent_id: String,
    pub action_type: ActionType,
    pub files: BTreeSet<String>,
    /// Causal predecessors, by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_ids: Vec<String>,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
    /// Logical clock tick at insertion; parents always carry smaller ticks.
    pub sequence: u64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "signature_hex"
    )]
    pub signature: Option<Vec<u8>>,
}

/// The fields covered by an operation signature.
///
/// Status and the signature itself are excluded so that a signature stays
/// valid while the operation moves through its lifecycle.
#[derive(Serialize)]
struct SigningPayload<'a> {
    id: &'a str,
    agent_id: &'a str,
    action_type: &'a ActionType,
    files: &'a BTreeSet<String>,
    parent_ids: &'a [String],
    created_at: &'a DateTime<Utc>,
}

impl Operation {
    fn payload(&self) -> SigningPayload<'_> {
        SigningPayload {
            id: &self.id,
            agent_id: &self.agent_id,
            action_type: &self.action_type,
            files: &self.files,
            parent_ids: &self.parent_ids,
            created_at: &self.created_at,
        }
    }

    /// Exact bytes a provenance signature is computed over.
    pub fn signing_payload(&self) -> Result<Vec<u8>, CoordError> {
        canonical_bytes(SIGNING_DOMAIN, &self.payload())
    }

    pub fn content_id(&self) -> Result<ContentId, CoordError> {
        canonical_digest(SIGNING_DOMAIN, &self.payload())
    }
}

/// Normalize a list of caller-supplied paths into a file set.
///
/// Trims whitespace, converts `\` to `/`, strips leading `./` and drops
/// entries that end up empty.
pub fn normalize_files<I, S>(files: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    files
        .into_iter()
        .filter_map(|f| {
            let mut path = f.as_ref().trim().replace('\\', "/");
            while let Some(rest) = path.strip_prefix("./") {
                path = rest.to_string();
            }
            (!path.is_empty()).then_some(path)
        })
        .collect()
}

mod signature_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&hex::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|h| hex::decode(h).map_err(serde::de::Error::custom))
            .transpose()
    }
}
