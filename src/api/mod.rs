// HTTP APIレイヤー

pub mod models;
pub mod routes;
