//! `window.calendarAPI`, the calendar's surface for page scripts.
//!
//! ```text
//! getStatus()              -> state snapshot object
//! reload()                 -> Promise<boolean>
//! saveToDatabase()         -> Promise<boolean>
//! setPrice(day, price)     -> boolean
//! setDefaultCost(cost)     -> boolean
//! unblockDate("DD.MM.YYYY") -> boolean
//! clearAllData()
//! fixPrices()
//! ```

use js_sys::{Object, Reflect};
use log::{info, warn};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::app::Calendar;

pub const API_NAME: &str = "calendarAPI";

/// Whole non-negative JS number that fits a `u32`
pub fn whole_number(value: Option<f64>) -> Option<u32> {
    let value = value?;
    let whole = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (whole && value <= f64::from(u32::MAX)).then_some(value as u32)
}

fn define(target: &Object, name: &str, function: &JsValue) {
    if Reflect::set(target, &JsValue::from_str(name), function).is_err() {
        warn!("Could not define {}.{}", API_NAME, name);
    }
}

pub fn method0<F>(target: &Object, name: &str, f: F)
where
    F: FnMut() -> JsValue + 'static,
{
    let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut() -> JsValue>);
    define(target, name, closure.as_ref());
    closure.forget();
}

fn method1<F>(target: &Object, name: &str, f: F)
where
    F: FnMut(JsValue) -> JsValue + 'static,
{
    let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut(JsValue) -> JsValue>);
    define(target, name, closure.as_ref());
    closure.forget();
}

fn method2<F>(target: &Object, name: &str, f: F)
where
    F: FnMut(JsValue, JsValue) -> JsValue + 'static,
{
    let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut(JsValue, JsValue) -> JsValue>);
    define(target, name, closure.as_ref());
    closure.forget();
}

/// Install `api` as `window.calendarAPI`
pub fn publish(api: &Object) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if Reflect::set(&window, &JsValue::from_str(API_NAME), api).is_err() {
        warn!("Could not publish window.{}", API_NAME);
    }
}

pub fn expose(calendar: &Rc<Calendar>) {
    let api = Object::new();

    let status = Rc::clone(calendar);
    method0(&api, "getStatus", move || {
        let snapshot = status.api.status();
        serde_json::to_string(&snapshot)
            .ok()
            .and_then(|json| js_sys::JSON::parse(&json).ok())
            .unwrap_or(JsValue::NULL)
    });

    let reload = Rc::clone(calendar);
    method0(&api, "reload", move || {
        let calendar = Rc::clone(&reload);
        future_to_promise(async move {
            let reloaded = match calendar.api.reload().await {
                Ok(view) => {
                    calendar.paint(&view);
                    true
                }
                Err(e) => {
                    warn!("Reload failed: {}", e);
                    false
                }
            };
            Ok(JsValue::from_bool(reloaded))
        })
        .into()
    });

    let save = Rc::clone(calendar);
    method0(&api, "saveToDatabase", move || {
        let calendar = Rc::clone(&save);
        future_to_promise(async move {
            let saved = match calendar.api.save_to_remote().await {
                Ok(_) => {
                    calendar.repaint();
                    true
                }
                Err(e) => {
                    warn!("Save failed: {}", e);
                    false
                }
            };
            Ok(JsValue::from_bool(saved))
        })
        .into()
    });

    let set_price = Rc::clone(calendar);
    method2(&api, "setPrice", move |day, price| {
        let (Some(day), Some(price)) = (whole_number(day.as_f64()), whole_number(price.as_f64()))
        else {
            warn!("setPrice expects whole numbers");
            return JsValue::FALSE;
        };
        match set_price.api.set_price(day, price) {
            Ok(view) => {
                set_price.paint(&view);
                JsValue::TRUE
            }
            Err(e) => {
                warn!("setPrice failed: {}", e);
                JsValue::FALSE
            }
        }
    });

    let set_cost = Rc::clone(calendar);
    method1(&api, "setDefaultCost", move |cost| {
        let Some(cost) = whole_number(cost.as_f64()) else {
            warn!("setDefaultCost expects a whole number");
            return JsValue::FALSE;
        };
        match set_cost.api.set_default_cost(cost) {
            Ok(view) => {
                set_cost.paint(&view);
                set_cost.sync_cost_input();
                JsValue::TRUE
            }
            Err(e) => {
                warn!("setDefaultCost failed: {}", e);
                JsValue::FALSE
            }
        }
    });

    let unblock = Rc::clone(calendar);
    method1(&api, "unblockDate", move |date| {
        let Some(text) = date.as_string() else {
            return JsValue::FALSE;
        };
        match unblock.api.unblock_date(&text) {
            Ok(removed) => {
                unblock.repaint();
                JsValue::from_bool(removed)
            }
            Err(e) => {
                warn!("unblockDate failed: {}", e);
                JsValue::FALSE
            }
        }
    });

    let clear = Rc::clone(calendar);
    method0(&api, "clearAllData", move || {
        let view = clear.api.clear_all();
        clear.paint(&view);
        clear.sync_weekend_inputs();
        JsValue::UNDEFINED
    });

    let fix = Rc::clone(calendar);
    method0(&api, "fixPrices", move || {
        let view = fix.api.fix_prices();
        fix.paint(&view);
        JsValue::UNDEFINED
    });

    publish(&api);
    info!("window.{} is available", API_NAME);
}
