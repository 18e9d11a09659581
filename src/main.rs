extern crate pretty_env_logger;

mod cli;
mod db;
mod engine;
mod entity;
mod err;
mod handlers;
mod migration;
mod notify;
mod queue;
mod reminder;

fn exit_with_error(message: String) {
    eprintln!("ERROR: {}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    if let Err(error) = handlers::run().await {
        exit_with_error(error.to_string());
    }
}
