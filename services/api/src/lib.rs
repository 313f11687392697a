mod cli;
mod demo;
mod infra;
mod routes;
mod schedule;
mod server;

use installer_market::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
