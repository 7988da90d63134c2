use std::process;

use log::error;

use shortin::{app, errors::AppError};

#[actix_web::main]
async fn main() {
    // Run the server with error handling for critical failures
    if let Err(err) = app::server().await {
        match err {
            AppError::Server(e) => {
                error!("Critical server error: {}", e);
                process::exit(1);
            }
            AppError::Config(e) => {
                eprintln!("Critical configuration error: {}", e);
                process::exit(2);
            }
            AppError::Logger(e) => {
                eprintln!("Critical logger error: {}", e);
                process::exit(3);
            }
            AppError::Store(e) => {
                error!("Critical store error: {}", e);
                process::exit(4);
            }
        }
    }
}
