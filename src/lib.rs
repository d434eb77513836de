// Live player-auction console library.
//
// An administrator puts players on the block, accepts team bids against
// per-category price ceilings, and finalizes each lot as sold or unsold.
// State lives in SQLite; connected WebSocket clients receive a full snapshot
// after every change.

pub mod app;
pub mod auction;
pub mod config;
pub mod model;
pub mod protocol;
pub mod roster_import;
pub mod server;
pub mod store;
