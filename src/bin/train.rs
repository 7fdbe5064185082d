use std::path::PathBuf;
use std::process;

use clap::Parser;
use synapses::feed_forward::*;
use synapses::trainer::{self, Example, Logging, StopCondition, Trainer};
use tracing::{error, info, Level};

/// Trains a network on labelled examples and reports its accuracy.
///
/// Without arguments, trains a 2-3-1 network on XOR.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON network configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of `{"input": ..., "target": [...]}` examples
    #[arg(long)]
    examples: Option<PathBuf>,

    /// Number of passes over the examples
    #[arg(long, default_value_t = 5_000)]
    epochs: usize,

    /// Log every `n` epochs
    #[arg(long, default_value_t = 500)]
    log_every: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn xor_config() -> NetworkConfig {
    NetworkConfig::new(&[2], 0.01)
        .layer(LayerSpec::FullyConnected {
            architecture: vec![3],
            rectifier: Rectifier::ReLU,
        })
        .layer(LayerSpec::FullyConnected {
            architecture: vec![1],
            rectifier: Rectifier::Step,
        })
}

fn xor_examples() -> Vec<Example> {
    vec![Example::new([0.0, 0.0], &[0.0]),
         Example::new([0.0, 1.0], &[1.0]),
         Example::new([1.0, 0.0], &[1.0]),
         Example::new([1.0, 1.0], &[0.0])]
}

fn run(args: &Args) -> Result<()> {
    let config = match args.config {
        Some(ref path) => NetworkConfig::load(path)?,
        None => xor_config(),
    };
    let examples = match args.examples {
        Some(ref path) => Example::load_all(path)?,
        None => xor_examples(),
    };

    let network = Network::from_config(&config)?;
    info!("Built network with {} layers, {} neurons, {} parameters",
          network.layers().len(),
          network.graph().neuron_count(),
          network.graph().params().len());

    let mut network = Trainer::new(network)
        .logging(Logging::Epochs(args.log_every))
        .stop_condition(StopCondition::Epochs(args.epochs))
        .train(&examples)?;

    for example in &examples {
        let output = network.predict(&example.input)?;
        info!("{:?} -> {:?} (target {:?})",
              example.input,
              output,
              example.target);
    }
    let accuracy = trainer::evaluate(&mut network, &examples)?;
    println!("Training set results: {:.1}% correct", accuracy * 100.0);
    Ok(())
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    if let Err(err) = run(&args) {
        error!("{}", err);
        process::exit(1);
    }
}
