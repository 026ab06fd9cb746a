//! Structure sub-view tabs
//!
//! A click on an inactive tab makes it the only active one and shows only
//! its content pane. A click on the active tab toggles everything off.

use crate::errors::{PanelError, PanelResult};
use crate::surface::{Surface, ACTIVE_CLASS, HIDDEN_CLASS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: String,
    /// Selector of the pane this tab reveals
    pub content_selector: String,
    pub is_active: bool,
}

impl Tab {
    pub fn new(id: impl Into<String>, content_selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_selector: content_selector.into(),
            is_active: false,
        }
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }
}

/// Desired rendering of the whole tab strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabView {
    /// `(tab id, active)` in display order
    pub tabs: Vec<(String, bool)>,
    /// `(content selector, visible)` in display order
    pub panes: Vec<(String, bool)>,
}

impl TabView {
    pub fn visible_panes(&self) -> Vec<&str> {
        self.panes
            .iter()
            .filter(|(_, visible)| *visible)
            .map(|(selector, _)| selector.as_str())
            .collect()
    }

    pub fn apply(&self, surface: &dyn Surface) {
        for (id, active) in &self.tabs {
            surface.set_class(id, ACTIVE_CLASS, *active);
        }
        for (selector, visible) in &self.panes {
            surface.set_class(selector, HIDDEN_CLASS, !*visible);
        }
    }
}

/// Ordered tab strip with at most one active entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSet {
    tabs: Vec<Tab>,
}

impl TabSet {
    pub fn new(tabs: Vec<Tab>) -> PanelResult<Self> {
        let active = tabs.iter().filter(|t| t.is_active).count();
        if active > 1 {
            return Err(PanelError::Configuration(format!(
                "{} tabs marked active, at most one allowed",
                active
            )));
        }
        for (i, tab) in tabs.iter().enumerate() {
            if tabs[..i].iter().any(|other| other.id == tab.id) {
                return Err(PanelError::Configuration(format!(
                    "duplicate tab id '{}'",
                    tab.id
                )));
            }
        }
        Ok(Self { tabs })
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active(&self) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.is_active)
    }

    /// Handle a click on `clicked`. Unknown ids leave the set untouched.
    pub fn select(&mut self, clicked: &str) -> Option<TabView> {
        let index = self.tabs.iter().position(|t| t.id == clicked)?;
        let was_active = self.tabs[index].is_active;

        for tab in &mut self.tabs {
            tab.is_active = false;
        }
        if !was_active {
            self.tabs[index].is_active = true;
        }

        tracing::debug!(tab = %clicked, toggled_off = was_active, "Tab selected");
        Some(self.view())
    }

    /// Rendering implied by the current state
    pub fn view(&self) -> TabView {
        let active = self.active().map(|t| t.content_selector.as_str());
        TabView {
            tabs: self
                .tabs
                .iter()
                .map(|t| (t.id.clone(), t.is_active))
                .collect(),
            panes: self
                .tabs
                .iter()
                .map(|t| {
                    let visible = Some(t.content_selector.as_str()) == active;
                    (t.content_selector.clone(), visible)
                })
                .collect(),
        }
    }
}

/// Select a tab and push the resulting view to the surface
pub fn select_tab(tabs: &mut TabSet, clicked: &str, surface: &dyn Surface) -> bool {
    match tabs.select(clicked) {
        Some(view) => {
            view.apply(surface);
            true
        }
        None => {
            tracing::warn!(tab = %clicked, "Click on unknown tab ignored");
            false
        }
    }
}
