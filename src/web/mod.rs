// HTTP front end: listener setup, request framing, routing and the
// sequential accept loop.

mod framer;
mod handlers;
mod listeners;
mod models;
mod server;

pub use framer::{FramerState, RequestFramer, read_request};
pub use listeners::create_listener;
pub use models::{Headers, IncomingRequest, OutgoingResponse};
pub use server::{handle_connection, serve};
