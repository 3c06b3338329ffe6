use std::env;

use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use jetons_eng::Engine;
use jetons_eng::csv::{Row, read_rows, write_standings};
use jetons_eng::store::{CustomerStore, RewardStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let path = env::args().nth(1).expect("usage: jetons-eng <program.csv>");

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    let mut engine = Engine::in_memory();
    let (op_sender, op_receiver) = tokio::sync::mpsc::channel(16);

    // Seed rows go straight to the stores; operations are replayed
    // through the engine in file order.
    let mut ops = Vec::new();
    for result in read_rows(&path) {
        match result {
            Ok(Row::Customer(customer)) => engine.store_mut().save_customer(customer),
            Ok(Row::Reward(reward)) => engine.store_mut().save_reward(reward),
            Ok(Row::Op(op)) => ops.push(op),
            Err(e) => warn!("{e}"),
        }
    }

    tokio::spawn(async move {
        for op in ops {
            op_sender.send(op).await.unwrap();
        }
    });

    engine.run(ReceiverStream::new(op_receiver)).await;

    write_standings(engine.standings());
}
