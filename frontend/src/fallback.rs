//! Degraded mode for pages the calendar cannot bind to.
//!
//! Only visible prices are filled with the default cost; editing is off.

use gloo::timers::callback::Timeout;
use js_sys::Object;
use log::{info, warn};
use pricing_calendar::parse_positive_price;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element};

use crate::bridge;
use crate::dom;

const PAST_CLASS: &str = "is-past";
const NOT_EXIST_CLASS: &str = "not_exist";
const AUTO_FIX_DELAY_MS: u32 = 1_000;

/// Write `cost` into every price of an existing, upcoming day.
///
/// Returns how many prices were written.
pub fn fill_default_prices(document: &Document, cost: u32) -> usize {
    let Ok(prices) = document.query_selector_all(dom::SERVICE_PRICE) else {
        return 0;
    };

    let text = cost.to_string();
    let mut written = 0;
    for index in 0..prices.length() {
        let Some(price) = prices.get(index).and_then(|node| node.dyn_into::<Element>().ok()) else {
            continue;
        };
        let Ok(Some(wrapper)) = price.closest(dom::DAY_WRAPPER) else {
            continue;
        };
        let classes = wrapper.class_list();
        if classes.contains(PAST_CLASS) || classes.contains(NOT_EXIST_CLASS) {
            continue;
        }
        dom::set_text(&price, &text);
        written += 1;
    }
    written
}

/// Cost input value when it holds a positive integer, else `fallback_cost`
fn current_cost(document: &Document, fallback_cost: u32) -> u32 {
    dom::input_value(document, dom::COST_INPUT)
        .and_then(|value| parse_positive_price(&value))
        .unwrap_or(fallback_cost)
}

pub fn install(document: &Document, fallback_cost: u32) {
    let api = Object::new();

    let fix_document = document.clone();
    bridge::method0(&api, "fixPrices", move || {
        let cost = current_cost(&fix_document, fallback_cost);
        let written = fill_default_prices(&fix_document, cost);
        info!("Fallback prices set to {} on {} days", cost, written);
        JsValue::UNDEFINED
    });
    bridge::method0(&api, "clearAllData", || {
        warn!("clearAllData is not available in fallback mode");
        JsValue::UNDEFINED
    });
    bridge::publish(&api);

    let delayed = document.clone();
    Timeout::new(AUTO_FIX_DELAY_MS, move || {
        let cost = current_cost(&delayed, fallback_cost);
        fill_default_prices(&delayed, cost);
    })
    .forget();
}
