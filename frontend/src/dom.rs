//! Page anchors and small DOM helpers.
//!
//! The calendar binds to markup it does not own; every lookup here may come
//! back empty and callers treat that as "feature not present on this page".

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement};

pub const MONTH_LABEL: &str = "[current_month_year]";
pub const DAY_WRAPPER: &str = ".calendar_day-wrapper";
pub const DAY_ATTRIBUTE: &str = "day";
pub const SERVICE_PRICE: &str = "[service-price]";
pub const PRICE_CURRENCY: &str = "[price-currency]";
pub const CALENDAR_WRAP: &str = ".calendar_wrap";
pub const PREV_BUTTON: &str = ".calendar_prev";
pub const NEXT_BUTTON: &str = ".calendar_next";

pub const CHOSEN_DATES: &str = "[chosen-dates]";
pub const SETTINGS_PANEL: &str = "[calendar-settings]";
pub const CHOSEN_PANEL: &str = "[calendar-choosen]";
pub const SELECTED_DISCOUNT: &str = "#selected_discount";
pub const DISCOUNT_WRAPPER: &str = ".input-wrap";
pub const APPLY_BUTTON: &str = "[calendar-apply-button]";
pub const CANCEL_BUTTON: &str = "[calendar-choosen-cancel]";
pub const BLOCK_BUTTON: &str = "[button_block]";
pub const OPEN_BUTTON: &str = "[button_open]";
pub const CLEAR_BUTTON: &str = "[clear-dates]";
/// Marks the active one of the block/open buttons
pub const ACTIVE_BUTTON_CLASS: &str = "is--add-service";

pub const WEEKEND_CHECKBOX: &str =
    r#"#Weekend-Discount, input[name="weekend_discount"][type="checkbox"]"#;
pub const WEEKEND_INPUT: &str = r#"#weekend_discount, input[name="weekend_discount"][type="text"], input[name="Weekend-Discount"][type="text"]"#;
pub const COST_INPUT: &str =
    r#"input[name="cost_per_show"], #cost_per_show, [data-name="cost_per_show"]"#;
pub const SERVICE_ID_INPUT: &str =
    r#"input[name="service_id"], #service_id, [data-name="service_id"]"#;
pub const FORM: &str = "form";
/// `<script type="application/json">` holding the engine configuration
pub const CONFIG_SCRIPT: &str = "#calendar-config";

/// Selector of the day-number element of a grid slot
pub fn day_selector(slot: usize) -> String {
    format!("[{}='{}']", DAY_ATTRIBUTE, slot)
}

pub fn query(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

pub fn query_in(parent: &Element, selector: &str) -> Option<Element> {
    parent.query_selector(selector).ok().flatten()
}

pub fn query_input(document: &Document, selector: &str) -> Option<HtmlInputElement> {
    query(document, selector).and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
}

/// Value of the first matching input, `None` when missing or blank
pub fn input_value(document: &Document, selector: &str) -> Option<String> {
    query_input(document, selector)
        .map(|input| input.value())
        .filter(|value| !value.trim().is_empty())
}

pub fn set_text(element: &Element, text: &str) {
    element.set_text_content(Some(text));
}

pub fn set_style(element: &Element, property: &str, value: &str) {
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        let _ = element.style().set_property(property, value);
    }
}

pub fn set_display(element: &Element, value: &str) {
    set_style(element, "display", value);
}

pub fn toggle_class(element: &Element, class: &str, on: bool) {
    let _ = element.class_list().toggle_with_force(class, on);
}

/// Element an event was dispatched to, as an [`Element`]
pub fn event_element(event: &web_sys::Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

/// Keep only digits and dots, the way percent inputs accept text
pub fn sanitize_percent(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}

/// Display form of a percent input after blur: `"20"` becomes `"20%"`.
///
/// `None` when the value should stay as typed.
pub fn percent_display(value: &str) -> Option<String> {
    if value.contains('%') {
        return None;
    }
    let percent = value.trim().parse::<f64>().ok()?;
    (percent.is_finite() && percent > 0.0).then(|| format!("{}%", percent))
}

/// Editing form of a percent input on focus
pub fn percent_editing(value: &str) -> Option<String> {
    value.contains('%').then(|| value.replacen('%', "", 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_selector() {
        assert_eq!(day_selector(0), "[day='0']");
        assert_eq!(day_selector(41), "[day='41']");
    }

    #[test]
    fn test_sanitize_percent() {
        assert_eq!(sanitize_percent("15 %"), "15");
        assert_eq!(sanitize_percent("abc12.5x"), "12.5");
        assert_eq!(sanitize_percent(""), "");
    }

    #[test]
    fn test_percent_display_round_trip() {
        assert_eq!(percent_display("20").as_deref(), Some("20%"));
        assert_eq!(percent_display("12.50").as_deref(), Some("12.5%"));
        assert_eq!(percent_display("20%"), None);
        assert_eq!(percent_display("0"), None);
        assert_eq!(percent_display(""), None);

        assert_eq!(percent_editing("20%").as_deref(), Some("20"));
        assert_eq!(percent_editing("20"), None);
    }
}
