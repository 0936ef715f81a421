//! Cookies: [`Cookies`] accessor, [`CookieDocument`] and the in-memory
//! [`DefaultCookieDocument`].

mod accessor;
mod cookie;
mod document;

pub use accessor::{CookieItem, CookieOptions, Cookies};
pub use cookie::{format_http_date, parse_http_date, Cookie};
pub use document::{CookieDocument, DefaultCookieDocument};
