// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and routes each command
// to its use case in Layer 2. Results are printed here.
//
//   1. `train`   — multitask fine-tuning, then `predict`
//                  unless --skip-predict
//   2. `predict` — dev metrics + dev/test prediction files
//                  from the best checkpoint of a run

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

use crate::application::config::RunConfig;
use crate::domain::task::Task;
use crate::ml::evaluator::MultitaskEvaluation;

#[derive(Parser, Debug)]
#[command(
    name = "multitask-bert",
    version = "0.1.0",
    about = "Fine-tune one shared encoder for sentiment, paraphrase and similarity."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let skip_predict   = args.skip_predict;
    let cfg: RunConfig = args.into();
    tracing::info!("Starting training, checkpoints in '{}'", cfg.checkpoint_dir.display());

    let outcome = TrainUseCase::new(cfg.clone()).execute()?;
    match outcome.best_epoch {
        Some(epoch) => println!(
            "Training complete. Best dev average {:.3} at epoch {}.",
            outcome.best_dev_score, epoch,
        ),
        None => println!("Training complete. No checkpoint was written."),
    }

    if skip_predict {
        return Ok(());
    }
    predict(cfg)
}

fn run_predict(args: PredictArgs) -> Result<()> {
    predict(args.into())
}

fn predict(cfg: RunConfig) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let dev = PredictUseCase::new(cfg).execute()?;
    print_dev_scores(&dev);
    Ok(())
}

fn print_dev_scores(dev: &MultitaskEvaluation) {
    println!("dev sentiment acc  :: {:.3}", dev.metric(Task::Sentiment));
    println!("dev paraphrase acc :: {:.3}", dev.metric(Task::Paraphrase));
    println!("dev sts corr       :: {:.3}", dev.metric(Task::Similarity));
    println!("dev average        :: {:.3}", dev.average());
}
