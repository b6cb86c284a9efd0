use std::env;
use std::path::Path;
use std::sync::Arc;

use installment_flow::csv::{read_actions, write_rates, write_summary};
use installment_flow::{Config, Driver, HttpBackend, SimulatedGateway};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let arg = env::args()
        .nth(1)
        .expect("usage: installment-flow <script.csv> | installment-flow rates");

    if arg == "rates" {
        write_rates(std::io::stdout()).expect("failed to write rates");
        return;
    }

    if !arg.ends_with(".csv") {
        warn!(path = %arg, "input file seems to not be a csv file");
    }

    let config = Config::from_env();
    let backend = HttpBackend::new(config.clone())
        .expect("failed to build http client");
    let base_dir = Path::new(&arg)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut driver =
        Driver::new(Arc::new(backend), Arc::new(SimulatedGateway), config).with_base_dir(base_dir);

    let actions = read_actions(arg.clone()).expect("failed to open script");
    let (action_sender, action_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in actions {
            match result {
                Ok(action) => {
                    action_sender.send(action).await.unwrap();
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    driver.run(ReceiverStream::new(action_receiver)).await;

    write_summary(std::io::stdout(), &driver.summary())
        .expect("failed to write summary");
}
