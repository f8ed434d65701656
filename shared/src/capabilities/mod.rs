//! Effects the core asks the shell to perform: view refreshes through
//! Crux's `Render`, model API calls through `crux_http`.

pub mod http;

pub use self::http::{into_http_result, HttpError, HttpResult, RawResponse, ValidatedUrl};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::event::Event;
// The Effect derive refers to the app type by its default name.
use crate::App;

pub type AppHttp = Http<Event>;
pub type AppRender = Render<Event>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}
