//! DOM event wiring.
//!
//! Every handler mutates the engine through a short borrow and then asks
//! the [`Calendar`] to repaint. Missing page elements simply leave the
//! matching feature unwired.

use gloo::events::EventListener;
use log::{debug, error, info};
use pricing_calendar::{parse_percent, parse_positive_price, ClickOutcome, MonthGrid};
use std::rc::Rc;
use web_sys::{Event, EventTarget, HtmlInputElement};

use crate::app::Calendar;
use crate::dom;

pub fn attach(calendar: &Rc<Calendar>) {
    attach_day_handlers(calendar);
    attach_navigation(calendar);
    attach_discount_handlers(calendar);
    attach_blocking_handlers(calendar);
    attach_weekend_handlers(calendar);
    attach_cost_handler(calendar);
    attach_clear_handler(calendar);
    attach_form_submission(calendar);
}

fn on<F>(target: &EventTarget, event_type: &'static str, handler: F)
where
    F: FnMut(&Event) + 'static,
{
    EventListener::new(target, event_type, handler).forget();
}

/// Attach `handler` to the first element matching `selector`, if any
fn on_selector<F>(calendar: &Calendar, selector: &str, event_type: &'static str, handler: F)
where
    F: FnMut(&Event) + 'static,
{
    match dom::query(calendar.document(), selector) {
        Some(element) => on(&element, event_type, handler),
        None => debug!("No {} on this page", selector),
    }
}

/// Day of the displayed month under an event target
fn day_for_event(calendar: &Calendar, event: &Event) -> Option<u32> {
    let element = dom::event_element(event)?;
    let slot = calendar.dom.slot_of(&element)?;
    let month = calendar.api.engine().borrow().displayed_month();
    MonthGrid::build(month).day_at(slot)
}

fn attach_day_handlers(calendar: &Rc<Calendar>) {
    let document = calendar.document().clone();

    let click_calendar = Rc::clone(calendar);
    on(&document, "click", move |event| {
        let Some(day) = day_for_event(&click_calendar, event) else {
            return;
        };
        let outcome = click_calendar.api.engine().borrow_mut().click(day);
        match outcome {
            Ok(ClickOutcome::RangeClosed(_)) => {
                if let Some(input) =
                    dom::query_input(click_calendar.document(), dom::SELECTED_DISCOUNT)
                {
                    input.set_value("");
                }
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Click ignored: {}", e);
                return;
            }
        }
        click_calendar.refresh();
    });

    let hover_calendar = Rc::clone(calendar);
    on(&document, "mouseover", move |event| {
        let Some(day) = day_for_event(&hover_calendar, event) else {
            return;
        };
        let changed = hover_calendar.api.engine().borrow_mut().hover(day);
        if changed {
            hover_calendar.repaint();
        }
    });

    let leave_calendar = Rc::clone(calendar);
    on_selector(calendar, dom::CALENDAR_WRAP, "mouseleave", move |_| {
        let cleared = leave_calendar.api.engine().borrow_mut().leave();
        if cleared {
            leave_calendar.repaint();
        }
    });
}

fn attach_navigation(calendar: &Rc<Calendar>) {
    for (selector, step) in [(dom::PREV_BUTTON, -1), (dom::NEXT_BUTTON, 1)] {
        let nav_calendar = Rc::clone(calendar);
        on_selector(calendar, selector, "click", move |_| {
            let moved = nav_calendar.api.engine().borrow_mut().navigate(step);
            if moved {
                nav_calendar.refresh();
            }
        });
    }
}

/// Strip non-numeric text while typing, add `%` on blur, drop it on focus
fn attach_percent_formatting(input: &HtmlInputElement) {
    let typing = input.clone();
    on(input, "input", move |_| {
        let value = typing.value();
        let sanitized = dom::sanitize_percent(&value);
        if sanitized != value {
            typing.set_value(&sanitized);
        }
    });

    let blurred = input.clone();
    on(input, "blur", move |_| {
        if let Some(display) = dom::percent_display(&blurred.value()) {
            blurred.set_value(&display);
        }
    });

    let focused = input.clone();
    on(input, "focus", move |_| {
        if let Some(editing) = dom::percent_editing(&focused.value()) {
            focused.set_value(&editing);
        }
    });
}

fn attach_discount_handlers(calendar: &Rc<Calendar>) {
    if let Some(input) = dom::query_input(calendar.document(), dom::SELECTED_DISCOUNT) {
        attach_percent_formatting(&input);
    }

    let apply_calendar = Rc::clone(calendar);
    on_selector(calendar, dom::APPLY_BUTTON, "click", move |event| {
        event.prevent_default();
        let text = dom::query_input(apply_calendar.document(), dom::SELECTED_DISCOUNT)
            .map(|input| input.value())
            .unwrap_or_default();
        let action = apply_calendar.api.engine().borrow_mut().apply(&text);
        debug!("Apply: {:?}", action);
        apply_calendar.refresh();
    });

    let cancel_calendar = Rc::clone(calendar);
    on_selector(calendar, dom::CANCEL_BUTTON, "click", move |event| {
        event.prevent_default();
        cancel_calendar.api.engine().borrow_mut().cancel();
        cancel_calendar.refresh();
    });
}

fn attach_blocking_handlers(calendar: &Rc<Calendar>) {
    let block_calendar = Rc::clone(calendar);
    on_selector(calendar, dom::BLOCK_BUTTON, "click", move |event| {
        event.prevent_default();
        block_calendar.api.engine().borrow_mut().enter_blocking_mode();
        block_calendar.repaint();
    });

    let open_calendar = Rc::clone(calendar);
    on_selector(calendar, dom::OPEN_BUTTON, "click", move |event| {
        event.prevent_default();
        open_calendar.api.engine().borrow_mut().exit_blocking_mode();
        open_calendar.repaint();
    });
}

fn attach_weekend_handlers(calendar: &Rc<Calendar>) {
    let document = calendar.document();
    let (Some(checkbox), Some(input)) = (
        dom::query_input(document, dom::WEEKEND_CHECKBOX),
        dom::query_input(document, dom::WEEKEND_INPUT),
    ) else {
        return;
    };
    attach_percent_formatting(&input);

    let toggle_calendar = Rc::clone(calendar);
    let toggle_input = input.clone();
    let toggled = checkbox.clone();
    on(&checkbox, "change", move |_| {
        let enabled = toggled.checked();
        let percent = parse_percent(&toggle_input.value());
        dom::set_display(&toggle_input, if enabled { "block" } else { "none" });
        toggle_calendar
            .api
            .engine()
            .borrow_mut()
            .set_weekend_discount(enabled, percent);
        toggle_calendar.refresh();
    });

    let typing_calendar = Rc::clone(calendar);
    let typed = input.clone();
    on(&input, "input", move |_| {
        let percent = parse_percent(&typed.value());
        if checkbox.checked() && percent > 0.0 {
            typing_calendar
                .api
                .engine()
                .borrow_mut()
                .set_weekend_discount(true, percent);
            typing_calendar.refresh();
        }
    });
}

fn attach_cost_handler(calendar: &Rc<Calendar>) {
    let Some(input) = dom::query_input(calendar.document(), dom::COST_INPUT) else {
        return;
    };

    let cost_calendar = Rc::clone(calendar);
    let typed = input.clone();
    on(&input, "input", move |_| {
        let cost = parse_positive_price(&typed.value()).unwrap_or(cost_calendar.fallback_cost);
        let result = cost_calendar.api.engine().borrow_mut().set_default_cost(cost);
        if let Err(e) = result {
            debug!("Default cost unchanged: {}", e);
            return;
        }
        cost_calendar.refresh();
    });
}

fn attach_clear_handler(calendar: &Rc<Calendar>) {
    let clear_calendar = Rc::clone(calendar);
    on_selector(calendar, dom::CLEAR_BUTTON, "click", move |event| {
        event.prevent_default();
        let view = clear_calendar.api.clear_all();
        clear_calendar.paint(&view);
        clear_calendar.sync_weekend_inputs();
    });
}

/// In edit mode, submitting the page form also saves the prices remotely
fn attach_form_submission(calendar: &Rc<Calendar>) {
    if !calendar.api.engine().borrow().mode().is_remote() {
        return;
    }

    let submit_calendar = Rc::clone(calendar);
    on_selector(calendar, dom::FORM, "submit", move |_| {
        let calendar = Rc::clone(&submit_calendar);
        wasm_bindgen_futures::spawn_local(async move {
            match calendar.api.save_to_remote().await {
                Ok(saved) => {
                    info!("Saved {} dates on form submit", saved);
                    calendar.repaint();
                }
                Err(e) => error!("Saving on form submit failed: {}", e),
            }
        });
    });
}
