//! Predetermined winner: an optional configured candidate id, fetched once per draw session.

use crate::logic::selection::{self, Selection};
use crate::models::{Candidate, CandidateId};
use async_trait::async_trait;

/// Where the predetermined winner id comes from.
#[async_trait]
pub trait WinnerIdSource: Send + Sync {
    /// `Ok(None)` means "no override, draw fully at random".
    async fn winner_id(&self) -> anyhow::Result<Option<String>>;
}

/// Fixed value, typically read from the server configuration at startup.
#[derive(Clone, Debug, Default)]
pub struct StaticWinnerSource(pub Option<String>);

#[async_trait]
impl WinnerIdSource for StaticWinnerSource {
    async fn winner_id(&self) -> anyhow::Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Always "no override".
#[derive(Clone, Copy, Debug, Default)]
pub struct NoWinnerSource;

#[async_trait]
impl WinnerIdSource for NoWinnerSource {
    async fn winner_id(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Resolved configuration for one session. Never changes after [`PredeterminedWinner::fetch`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PredeterminedWinner {
    id: Option<CandidateId>,
}

impl PredeterminedWinner {
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from a raw configured value. Blank ids count as not configured.
    pub fn from_id(id: Option<&str>) -> Self {
        Self {
            id: id.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    /// Ask the source once. Any failure degrades to "no override".
    pub async fn fetch(source: &dyn WinnerIdSource) -> Self {
        match source.winner_id().await {
            Ok(id) => Self::from_id(id.as_deref()),
            Err(e) => {
                log::warn!("Predetermined winner unavailable, drawing at random: {e:#}");
                Self::none()
            }
        }
    }

    pub fn id(&self) -> Option<&CandidateId> {
        self.id.as_ref()
    }

    /// The configured candidate if it is still in `remaining`.
    pub fn lookup(&self, remaining: &[Candidate]) -> Option<Selection> {
        self.id.as_ref().and_then(|id| selection::find(remaining, id))
    }
}
