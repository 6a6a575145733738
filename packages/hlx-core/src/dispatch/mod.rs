//! Request dispatch: server-side verb routing and client-side
//! request/response correlation.

pub mod dispatcher;
pub mod exchange;
pub mod fn_handler;

pub use dispatcher::{Dispatcher, Handler};
pub use exchange::{ExchangeManager, Notification};
pub use fn_handler::FnHandler;
