//! Startup and the page-wide calendar controller.

use log::{error, info, warn};
use pricing_calendar::storage::{KeyValueStore, MemoryKeyValueStore, PeriodStore};
use pricing_calendar::{CalendarApi, CalendarEngine};
use shared::MonthView;
use std::rc::Rc;
use web_sys::Document;

use crate::dom;
use crate::fallback;
use crate::render::{CalendarDom, PanelState};
use crate::services::browser_storage::BrowserStorage;
use crate::services::date_utils;
use crate::services::page_context;
use crate::services::rest_store::RestPeriodStore;
use crate::{bridge, handlers};

/// Engine API plus the page anchors it paints into
pub struct Calendar {
    pub api: CalendarApi,
    pub dom: CalendarDom,
    pub fallback_cost: u32,
}

impl Calendar {
    pub fn document(&self) -> &Document {
        self.dom.document()
    }

    /// Recompute, persist (local mode) and paint
    pub fn refresh(&self) {
        let view = self.api.engine().borrow_mut().refresh();
        self.paint(&view);
    }

    /// Paint without persisting; used for hover feedback
    pub fn repaint(&self) {
        let view = self.api.engine().borrow().month_view();
        self.paint(&view);
    }

    pub fn paint(&self, view: &MonthView) {
        let panel = PanelState::from_engine(&self.api.engine().borrow());
        self.dom.paint(view);
        self.dom.paint_panel(&panel);
    }

    /// Write the default cost into the cost input
    pub fn sync_cost_input(&self) {
        if let Some(input) = dom::query_input(self.document(), dom::COST_INPUT) {
            input.set_value(&self.api.engine().borrow().default_cost().to_string());
        }
    }

    /// Reflect the stored weekend rule in its checkbox and input
    pub fn sync_weekend_inputs(&self) {
        let weekend = self.api.engine().borrow().weekend();
        let document = self.document();
        let (Some(checkbox), Some(input)) = (
            dom::query_input(document, dom::WEEKEND_CHECKBOX),
            dom::query_input(document, dom::WEEKEND_INPUT),
        ) else {
            return;
        };

        checkbox.set_checked(weekend.enabled);
        dom::set_display(&input, if weekend.enabled { "block" } else { "none" });
        if weekend.enabled && weekend.percent > 0.0 {
            input.set_value(&format!("{}%", weekend.percent));
        }
    }
}

async fn wait_for_dom(document: &Document) {
    while document.ready_state() == "loading" {
        gloo::timers::future::TimeoutFuture::new(50).await;
    }
}

pub async fn start() {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        error!("No document to bind the calendar to");
        return;
    };
    wait_for_dom(&document).await;

    let config =
        page_context::load_config(&document).with_mode(page_context::detect_mode(&document));

    let (Some(calendar_dom), Some(today)) = (CalendarDom::bind(&document), date_utils::today())
    else {
        warn!("Calendar markup not found, starting in fallback mode");
        fallback::install(&document, config.fallback_default_cost);
        return;
    };

    let kv: Box<dyn KeyValueStore> = match BrowserStorage::open() {
        Ok(storage) => Box::new(storage),
        Err(e) => {
            warn!("Local storage unavailable, keeping data in memory: {:#}", e);
            Box::new(MemoryKeyValueStore::new())
        }
    };
    let mut engine = CalendarEngine::new(&config, kv, today);
    let cost_from_input = dom::input_value(&document, dom::COST_INPUT)
        .is_some_and(|value| engine.adopt_input_cost(&value));

    let periods: Option<Rc<dyn PeriodStore>> = if config.mode.is_remote() {
        if !config.remote.is_configured() {
            warn!("Edit mode without a remote endpoint; prices cannot be loaded or saved");
        }
        config
            .remote
            .is_configured()
            .then(|| Rc::new(RestPeriodStore::new(&config.remote)) as Rc<dyn PeriodStore>)
    } else {
        None
    };

    let api = CalendarApi::new(engine, periods);
    let view = api.load().await;
    let calendar = Rc::new(Calendar {
        api,
        dom: calendar_dom,
        fallback_cost: config.fallback_default_cost,
    });

    calendar.paint(&view);
    if !cost_from_input {
        calendar.sync_cost_input();
    }
    calendar.sync_weekend_inputs();
    handlers::attach(&calendar);
    bridge::expose(&calendar);

    info!("Pricing calendar ready ({})", view.label);
}
