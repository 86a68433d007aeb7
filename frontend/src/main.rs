mod app;
mod bridge;
mod dom;
mod fallback;
mod handlers;
mod render;
mod services;

use services::logging::ConsoleLogger;

fn main() {
    ConsoleLogger::init(log::LevelFilter::Info);
    wasm_bindgen_futures::spawn_local(app::start());
}
