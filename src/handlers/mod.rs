// handlers/mod.rs - HTTP entry points
//
// rates:  /api/data (GET) and /api/guardar (POST), the sheet/webhook glue
// health: /health liveness probe
// assets: the front-end's static files

pub mod assets;
pub mod health;
pub mod rates;

pub use assets::asset_routes;
pub use health::health;
pub use rates::{list as rates_list, save as rates_save};
