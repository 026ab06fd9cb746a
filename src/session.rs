//! Page session bootstrap
//!
//! Tracks whether the visitor has entered before and decides how the
//! full-page loader is dismissed. The state is persisted as a small JSON
//! file in place of a browser cookie.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{PanelError, PanelResult};
use crate::surface::{Surface, HIDDEN_CLASS, LOADER_ELEMENT, PAGE_ELEMENT};

/// Loader delay for first visits
pub const FIRST_VISIT_DELAY: Duration = Duration::ZERO;
/// Loader delay for returning visitors
pub const RETURN_VISIT_DELAY: Duration = Duration::ZERO;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub has_entered: bool,
    #[serde(default)]
    pub first_entered_at: Option<DateTime<Utc>>,
}

/// How the loader goes away on this page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderPlan {
    pub delay: Duration,
    pub first_visit: bool,
}

impl LoaderPlan {
    /// Wait out the delay, then hide the loader and reveal the page
    pub async fn unload(&self, surface: &dyn Surface) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        surface.set_class(LOADER_ELEMENT, HIDDEN_CLASS, true);
        surface.set_class(PAGE_ELEMENT, HIDDEN_CLASS, false);
    }
}

impl SessionState {
    /// Record the first entry and return the loader plan for this visit
    pub fn enter(&mut self, now: DateTime<Utc>) -> LoaderPlan {
        if self.has_entered {
            LoaderPlan {
                delay: RETURN_VISIT_DELAY,
                first_visit: false,
            }
        } else {
            self.has_entered = true;
            self.first_entered_at = Some(now);
            LoaderPlan {
                delay: FIRST_VISIT_DELAY,
                first_visit: true,
            }
        }
    }
}

/// File-backed session store
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Missing file means a first visit
    pub fn load(&self) -> PanelResult<SessionState> {
        if !self.path.exists() {
            return Ok(SessionState::default());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            PanelError::Configuration(format!("read session {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PanelError::Configuration(format!("parse session {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, state: &SessionState) -> PanelResult<()> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| PanelError::Internal(format!("encode session: {}", e)))?;
        std::fs::write(&self.path, content).map_err(|e| {
            PanelError::Configuration(format!("write session {}: {}", self.path.display(), e))
        })
    }

    /// Load, enter and persist in one step
    pub fn initialize(&self) -> PanelResult<(SessionState, LoaderPlan)> {
        let mut state = self.load()?;
        let plan = state.enter(Utc::now());
        if plan.first_visit {
            self.save(&state)?;
            tracing::info!(path = %self.path.display(), "First visit recorded");
        }
        Ok((state, plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;

    #[test]
    fn test_first_then_return_visit() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let (state, plan) = store.initialize().unwrap();
        assert!(state.has_entered);
        assert!(plan.first_visit);
        assert!(state.first_entered_at.is_some());

        let (again, plan) = store.initialize().unwrap();
        assert!(!plan.first_visit);
        assert_eq!(again.first_entered_at, state.first_entered_at);
    }

    #[test]
    fn test_both_visits_unload_immediately() {
        let mut state = SessionState::default();
        assert_eq!(state.enter(Utc::now()).delay, Duration::ZERO);
        assert_eq!(state.enter(Utc::now()).delay, Duration::ZERO);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(SessionStore::new(&path).load().is_err());
    }

    #[tokio::test]
    async fn test_unload_reveals_page() {
        let surface = MemorySurface::new().with_class(PAGE_ELEMENT, HIDDEN_CLASS);
        let plan = LoaderPlan {
            delay: Duration::ZERO,
            first_visit: true,
        };
        plan.unload(&surface).await;
        assert!(surface.has_class(LOADER_ELEMENT, HIDDEN_CLASS));
        assert!(!surface.has_class(PAGE_ELEMENT, HIDDEN_CLASS));
    }
}
