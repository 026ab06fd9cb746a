//! Tab strip and amount field driven against one surface

use erc360_panel::amount::{AmountField, Key, KeyDecision};
use erc360_panel::surface::{MemorySurface, ACTIVE_CLASS, AMOUNT_INPUT, HIDDEN_CLASS};
use erc360_panel::tabs::{select_tab, Tab, TabSet};

fn structure_tabs() -> TabSet {
    TabSet::new(vec![
        Tab::new("#tab-shares", ".pane-shares").active(),
        Tab::new("#tab-admins", ".pane-admins"),
        Tab::new("#tab-bank", ".pane-bank"),
    ])
    .unwrap()
}

#[test]
fn test_tab_clicks_toggle_panes() {
    let surface = MemorySurface::new();
    let mut tabs = structure_tabs();

    select_tab(&mut tabs, "#tab-admins", &surface);
    assert!(surface.has_class("#tab-admins", ACTIVE_CLASS));
    assert!(!surface.has_class("#tab-shares", ACTIVE_CLASS));
    assert!(!surface.has_class(".pane-admins", HIDDEN_CLASS));
    assert!(surface.has_class(".pane-shares", HIDDEN_CLASS));
    assert!(surface.has_class(".pane-bank", HIDDEN_CLASS));

    select_tab(&mut tabs, "#tab-admins", &surface);
    assert!(tabs.active().is_none());
    for tab in ["#tab-shares", "#tab-admins", "#tab-bank"] {
        assert!(!surface.has_class(tab, ACTIVE_CLASS));
    }
    for pane in [".pane-shares", ".pane-admins", ".pane-bank"] {
        assert!(surface.has_class(pane, HIDDEN_CLASS));
    }
}

#[test]
fn test_amount_field_keeps_single_separator() {
    let surface = MemorySurface::new();
    let mut field = AmountField::new();

    let typed = [
        (',', KeyDecision::Accept, "0,"),
        ('5', KeyDecision::Accept, "0,5"),
        ('.', KeyDecision::Reject, "0,5"),
        ('0', KeyDecision::Accept, "0,50"),
    ];
    for (c, decision, shown) in typed {
        assert_eq!(field.on_key(Key::Char(c), &surface), decision);
        assert_eq!(surface.value(AMOUNT_INPUT).as_deref(), Some(shown));
    }

    field.on_blur(&surface);
    assert_eq!(surface.value(AMOUNT_INPUT).as_deref(), Some("0,50"));
}
