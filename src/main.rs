mod config;
mod database;
mod logging;
mod menu;
mod server;
mod timing;

use std::sync::Arc;

use anyhow::Context;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use config::Config;
use database::{
    setup::{connection_manager, create_tables},
    sqlite::SqliteDatabase,
};
use menu::models::Role;
use server::server::Server;
use timing::clock::timestamp;

pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging()?;
    let config = Config::load()?;
    let timezone = config.timezone()?;

    let manager = connection_manager(&config.database_path);
    let pool = r2d2::Pool::builder()
        .build(manager)
        .context("Could not build the connection pool")?;
    create_tables(&pool).map_err(anyhow::Error::msg)?;

    {
        let connection = pool.get()?;
        for user_id in &config.admin_users {
            SqliteDatabase::ensure_role(&connection, user_id, Role::Admin, &timestamp(timezone))?;
            tracing::info!(user_id = %user_id, "Admin role granted");
        }
    }

    let server = Server::setup(Arc::new(pool), timezone)?;

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Could not bind {}", config.bind_address))?;
    tracing::info!(address = %config.bind_address, "Listening");

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(connection) => connection,
            Err(err) => {
                tracing::warn!(error = %err, "Could not accept connection");
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let server_clone = server.clone();
        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, server_clone)
                .await
            {
                tracing::debug!(error = %err, "Connection closed with error");
            }
        });
    }
}
