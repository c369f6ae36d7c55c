mod account;
mod admin;
pub mod dto;
mod media;
mod public;
pub mod response;
mod router;
mod student;
mod teacher;
mod ws;

pub use router::{AppState, create_router};
