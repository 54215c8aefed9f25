//! Election results backend: records elections, their candidates, voting
//! centers and offices, accepts per-office tallies and aggregates them.

#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
mod config;
pub mod error;
mod logging;
pub mod model;
pub mod tally;

pub use config::{Config, ConfigFairing, DatabaseFairing};
pub use logging::{LoggerFairing, RequestId};

/// Assemble the server: routes plus the config, database and logging fairings.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(LoggerFairing)
}

/// Connect to the test database server configured in `Rocket.toml`.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let config: config::DbConfig = rocket::Config::figment()
        .extract()
        .expect("Database config missing from Rocket.toml");
    mongodb::Client::with_uri_str(config.db_uri)
        .await
        .expect("Failed to connect to test database")
}

/// A fresh database name, so tests never see each other's data.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    log::info!("Using database {db}");
    db
}

/// The server, bound to an already-connected test database.
#[cfg(test)]
pub(crate) async fn rocket_for_db(db_client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = db_client.database(db_name);
    config::prepare_database(&db)
        .await
        .expect("Failed to prepare test database");
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .manage(db_client)
        .manage(db)
}

/// An `Authorization` header carrying a valid token for the given user.
#[cfg(test)]
pub(crate) fn auth_header(
    client: &rocket::local::asynchronous::Client,
    user_id: model::common::UserId,
) -> rocket::http::Header<'static> {
    let config = client
        .rocket()
        .state::<Config>()
        .expect("Config is managed once ignited");
    let token = model::auth::AuthToken::new(user_id)
        .encode(config)
        .unwrap();
    rocket::http::Header::new("Authorization", format!("Bearer {token}"))
}
