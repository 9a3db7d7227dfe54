pub mod event;
pub mod game;
pub mod pack;
pub mod session;
