// Auction rules: bidding, settlement, and roster repair. Pure logic only;
// persistence and fan-out live in `store` and `app`.

pub mod bid;
pub mod reconcile;
pub mod settle;
