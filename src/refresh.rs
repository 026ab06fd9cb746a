//! Structure panel refresh
//!
//! Refreshing is a two-request pipeline: ask the server to recompute the
//! structure, then fetch the recomputed markup and swap it into the panel.
//! [`RefreshCoordinator`] walks the pipeline one [`Stage`] per `advance()`
//! call so callers (and tests) can step through it. The GET is never issued
//! before the POST has succeeded.

use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::channel::{FormFields, Transport};
use crate::errors::{PanelError, PanelResult};
use crate::surface::{ControlState, Surface, RELOAD_CONTROL, STRUCTURE_PANEL};

/// Identifier of the structure whose panel is refreshed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructureAddress(String);

impl StructureAddress {
    pub fn new(address: &str) -> PanelResult<Self> {
        let address = address.trim();
        if address.is_empty() || address.contains(&['/', '?', '#'][..]) || address.contains(char::is_whitespace) {
            return Err(PanelError::InvalidAddress(address.to_string()));
        }
        Ok(Self(address.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StructureAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the address-keyed structure endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routes {
    /// Inserted between the leading slash and the address
    prefix: String,
}

impl Routes {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn update_structure(&self, address: &StructureAddress) -> String {
        format!("/{}{}/update/structure/", self.prefix, address)
    }

    pub fn get_structure(&self, address: &StructureAddress) -> String {
        format!("/{}{}/get/structure/", self.prefix, address)
    }
}

/// Position in the refresh pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Recompute request pending
    Updating,
    /// Recompute done, markup fetch pending
    Fetching,
    /// Panel swapped, control released
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// How the trigger control should look in this stage
    pub fn control_state(&self, restore_on_failure: bool) -> ControlState {
        match self {
            Stage::Updating | Stage::Fetching => ControlState::BUSY,
            Stage::Done => ControlState::READY,
            Stage::Failed if restore_on_failure => ControlState::READY,
            // Left disabled and loading until the page is reloaded
            Stage::Failed => ControlState::BUSY,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Updating => "updating",
            Stage::Fetching => "fetching",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Options shared by every refresh
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    pub routes: Routes,
    /// Re-enable the trigger after a failed request instead of leaving it disabled
    pub restore_on_failure: bool,
}

/// One refresh of one structure panel
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    surface: Arc<dyn Surface>,
    options: RefreshOptions,
    address: StructureAddress,
    stage: Stage,
    last_error: Option<PanelError>,
}

impl RefreshCoordinator {
    /// Disable the trigger control and enter [`Stage::Updating`]. No request is sent yet.
    pub fn begin(
        transport: Arc<dyn Transport>,
        surface: Arc<dyn Surface>,
        options: RefreshOptions,
        address: StructureAddress,
    ) -> Self {
        info!(address = %address, "Updating structure");
        let stage = Stage::Updating;
        stage
            .control_state(options.restore_on_failure)
            .apply(surface.as_ref(), RELOAD_CONTROL);

        Self {
            transport,
            surface,
            options,
            address,
            stage,
            last_error: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn address(&self) -> &StructureAddress {
        &self.address
    }

    pub fn last_error(&self) -> Option<&PanelError> {
        self.last_error.as_ref()
    }

    /// Perform the request of the current stage and move to the next one.
    ///
    /// Terminal stages are returned unchanged.
    pub async fn advance(&mut self) -> Stage {
        let next = match self.stage {
            Stage::Updating => {
                let endpoint = self.options.routes.update_structure(&self.address);
                match self.transport.post_form(&endpoint, &FormFields::new()).await {
                    Ok(_) => Stage::Fetching,
                    Err(e) => self.fail(e),
                }
            }
            Stage::Fetching => {
                let endpoint = self.options.routes.get_structure(&self.address);
                match self.transport.get(&endpoint).await {
                    Ok(response) => {
                        self.surface.replace_markup(STRUCTURE_PANEL, &response.body);
                        info!(address = %self.address, bytes = response.body.len(), "Structure panel replaced");
                        Stage::Done
                    }
                    Err(e) => self.fail(e),
                }
            }
            terminal => return terminal,
        };

        self.stage = next;
        next.control_state(self.options.restore_on_failure)
            .apply(self.surface.as_ref(), RELOAD_CONTROL);
        next
    }

    /// Drive the pipeline to a terminal stage
    pub async fn run(mut self) -> (Stage, Option<PanelError>) {
        while !self.stage.is_terminal() {
            self.advance().await;
        }
        (self.stage, self.last_error)
    }

    fn fail(&mut self, err: PanelError) -> Stage {
        error!(address = %self.address, stage = %self.stage, error = %err, "Structure refresh failed");
        self.last_error = Some(err);
        Stage::Failed
    }
}

/// Refresh the structure panel for `address` end to end
pub async fn update_structure(
    transport: Arc<dyn Transport>,
    surface: Arc<dyn Surface>,
    options: RefreshOptions,
    address: StructureAddress,
) -> (Stage, Option<PanelError>) {
    RefreshCoordinator::begin(transport, surface, options, address)
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemorySurface, LOADING_CLASS};
    use crate::test_utils::{Scripted, ScriptedTransport};
    use std::time::Duration;

    fn addr() -> StructureAddress {
        StructureAddress::new("0xABC").unwrap()
    }

    #[test]
    fn test_routes() {
        let routes = Routes::default();
        assert_eq!(routes.update_structure(&addr()), "/0xABC/update/structure/");
        assert_eq!(routes.get_structure(&addr()), "/0xABC/get/structure/");

        let prefixed = Routes::new("€");
        assert_eq!(prefixed.get_structure(&addr()), "/€0xABC/get/structure/");
    }

    #[test]
    fn test_address_validation() {
        assert!(StructureAddress::new("").is_err());
        assert!(StructureAddress::new("a/b").is_err());
        assert!(StructureAddress::new("a b").is_err());
        assert_eq!(StructureAddress::new(" 0xABC ").unwrap().as_str(), "0xABC");
    }

    #[tokio::test]
    async fn test_stages_in_order() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script_get(Scripted::Reply("<div id=\"structure-modal\">new</div>".to_string()));
        let surface = Arc::new(MemorySurface::new());

        let mut coordinator = RefreshCoordinator::begin(
            transport.clone(),
            surface.clone(),
            RefreshOptions::default(),
            addr(),
        );
        assert_eq!(coordinator.stage(), Stage::Updating);
        assert_eq!(surface.control_state(RELOAD_CONTROL), ControlState::BUSY);
        assert!(transport.calls().is_empty());

        assert_eq!(coordinator.advance().await, Stage::Fetching);
        assert_eq!(transport.call_lines(), vec!["POST /0xABC/update/structure/"]);
        assert_eq!(surface.control_state(RELOAD_CONTROL), ControlState::BUSY);

        assert_eq!(coordinator.advance().await, Stage::Done);
        assert_eq!(
            transport.call_lines(),
            vec!["POST /0xABC/update/structure/", "GET /0xABC/get/structure/"]
        );
        assert_eq!(
            surface.markup(STRUCTURE_PANEL).as_deref(),
            Some("<div id=\"structure-modal\">new</div>")
        );
        assert_eq!(surface.control_state(RELOAD_CONTROL), ControlState::READY);

        assert_eq!(coordinator.advance().await, Stage::Done);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_update_never_fetches() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script_post(Scripted::Hang);
        let surface = Arc::new(MemorySurface::new());

        let refresh = update_structure(
            transport.clone(),
            surface.clone(),
            RefreshOptions::default(),
            addr(),
        );
        let outcome = tokio::time::timeout(Duration::from_secs(3600), refresh).await;

        assert!(outcome.is_err(), "refresh must still be pending");
        assert_eq!(transport.call_lines(), vec!["POST /0xABC/update/structure/"]);
        assert!(surface.is_disabled(RELOAD_CONTROL));
        assert!(surface.markup(STRUCTURE_PANEL).is_none());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_control_disabled() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script_post(Scripted::Fail(PanelError::Status {
            endpoint: "/0xABC/update/structure/".to_string(),
            status: 500,
        }));
        let surface = Arc::new(MemorySurface::new());

        let (stage, err) = update_structure(
            transport.clone(),
            surface.clone(),
            RefreshOptions::default(),
            addr(),
        )
        .await;

        assert_eq!(stage, Stage::Failed);
        assert!(matches!(err, Some(PanelError::Status { status: 500, .. })));
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(surface.control_state(RELOAD_CONTROL), ControlState::BUSY);
        assert!(surface.has_class(RELOAD_CONTROL, LOADING_CLASS));
    }

    #[tokio::test]
    async fn test_failed_fetch_can_restore_control() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script_get(Scripted::Fail(PanelError::Transport {
            endpoint: "/0xABC/get/structure/".to_string(),
            message: "reset".to_string(),
        }));
        let surface = Arc::new(MemorySurface::new());
        let options = RefreshOptions {
            restore_on_failure: true,
            ..RefreshOptions::default()
        };

        let (stage, _) = update_structure(transport.clone(), surface.clone(), options, addr()).await;

        assert_eq!(stage, Stage::Failed);
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(surface.control_state(RELOAD_CONTROL), ControlState::READY);
        assert!(surface.markup(STRUCTURE_PANEL).is_none());
    }
}
