//! Projection of engine state onto the page.
//!
//! Nothing here reads state back from the DOM; the engine is the only
//! source of truth and painting is one-directional.

use pricing_calendar::CalendarEngine;
use shared::{CellTag, MonthView, GRID_SLOTS};
use web_sys::{Document, Element};

use crate::dom;

/// One of the 42 fixed day slots of the page
struct DaySlot {
    day: Element,
    wrapper: Element,
    price: Option<Element>,
    currency: Option<Element>,
}

/// Grid anchors found on the page at startup
pub struct CalendarDom {
    document: Document,
    label: Element,
    slots: Vec<Option<DaySlot>>,
}

impl CalendarDom {
    /// Find the month label and day slots. `None` when the page has no
    /// label or no slot at all.
    pub fn bind(document: &Document) -> Option<Self> {
        let label = dom::query(document, dom::MONTH_LABEL)?;
        let slots: Vec<Option<DaySlot>> = (0..GRID_SLOTS)
            .map(|slot| {
                let day = dom::query(document, &dom::day_selector(slot))?;
                let wrapper = day.closest(dom::DAY_WRAPPER).ok().flatten()?;
                Some(DaySlot {
                    price: dom::query_in(&wrapper, dom::SERVICE_PRICE),
                    currency: dom::query_in(&wrapper, dom::PRICE_CURRENCY),
                    day,
                    wrapper,
                })
            })
            .collect();

        if slots.iter().all(Option::is_none) {
            return None;
        }
        log::debug!(
            "Bound {} of {} day slots",
            slots.iter().filter(|slot| slot.is_some()).count(),
            GRID_SLOTS
        );
        Some(Self { document: document.clone(), label, slots })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Slot whose wrapper contains `element`
    pub fn slot_of(&self, element: &Element) -> Option<usize> {
        let wrapper = element.closest(dom::DAY_WRAPPER).ok().flatten()?;
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|slot| slot.wrapper == wrapper))
    }

    pub fn paint(&self, view: &MonthView) {
        dom::set_text(&self.label, &view.label);

        for cell in &view.cells {
            let Some(Some(slot)) = self.slots.get(cell.slot) else {
                continue;
            };

            let day_text = cell.day.map(|day| day.to_string()).unwrap_or_default();
            dom::set_text(&slot.day, &day_text);

            for tag in CellTag::ALL {
                dom::toggle_class(&slot.wrapper, tag.css_class(), cell.has(tag));
            }

            let display = if cell.price.is_some() { "" } else { "none" };
            if let Some(price) = &slot.price {
                dom::set_display(price, display);
                if let Some(value) = cell.price {
                    dom::set_text(price, &value.to_string());
                }
            }
            if let Some(currency) = &slot.currency {
                dom::set_display(currency, display);
            }
        }

        if let Some(prev) = dom::query(&self.document, dom::PREV_BUTTON) {
            dom::set_style(&prev, "opacity", if view.can_go_back { "1" } else { "0.5" });
            dom::set_style(&prev, "pointer-events", if view.can_go_back { "auto" } else { "none" });
        }
    }

    pub fn paint_panel(&self, panel: &PanelState) {
        let document = &self.document;

        if let Some(settings) = dom::query(document, dom::SETTINGS_PANEL) {
            dom::set_display(&settings, if panel.awaiting_confirmation { "none" } else { "block" });
        }
        if let Some(chosen) = dom::query(document, dom::CHOSEN_PANEL) {
            dom::set_display(&chosen, if panel.awaiting_confirmation { "flex" } else { "none" });
        }
        if let (Some(element), Some(label)) =
            (dom::query(document, dom::CHOSEN_DATES), panel.chosen_label.as_deref())
        {
            dom::set_text(&element, label);
        }

        if let Some(block) = dom::query(document, dom::BLOCK_BUTTON) {
            dom::toggle_class(&block, dom::ACTIVE_BUTTON_CLASS, panel.blocking_mode);
        }
        if let Some(open) = dom::query(document, dom::OPEN_BUTTON) {
            dom::toggle_class(
                &open,
                dom::ACTIVE_BUTTON_CLASS,
                !panel.blocking_mode && panel.has_selection,
            );
        }

        if let Some(input) = dom::query_input(document, dom::SELECTED_DISCOUNT) {
            input.set_disabled(panel.blocking_mode);
            input.set_placeholder(if panel.blocking_mode { "Block" } else { "" });
            if let Ok(Some(wrapper)) = input.closest(dom::DISCOUNT_WRAPPER) {
                dom::set_display(&wrapper, if panel.blocking_mode { "none" } else { "" });
            }
        }
    }
}

/// Side-panel state derived from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelState {
    pub awaiting_confirmation: bool,
    pub blocking_mode: bool,
    pub has_selection: bool,
    pub chosen_label: Option<String>,
}

impl PanelState {
    pub fn from_engine(engine: &CalendarEngine) -> Self {
        let selection = engine.selection();
        Self {
            awaiting_confirmation: selection.is_awaiting_confirmation(),
            blocking_mode: selection.blocking_mode(),
            has_selection: selection.has_selection(),
            chosen_label: engine.chosen_dates_label(),
        }
    }
}
