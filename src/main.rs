use std::process;

use env_logger::Env;
use log::error;

mod cli;
mod config;
mod error;
mod output;
mod request_builder;
mod template;
mod url_builder;

use crate::error::Error;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(err) = cli::run(std::env::args()).await {
        match &err {
            Error::Usage(usage) => {
                if let Err(err) = usage.print() {
                    error!("write usage: {}", err);
                }
            }
            _ => error!("{}", err),
        }

        process::exit(err.exit_code());
    }
}
