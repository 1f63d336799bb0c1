use crate::server;
use arda_credit::credit::{CreditApplication, ScoringEngine};
use arda_credit::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ArdaCredit",
    about = "Score loan applications over HTTP and publish an audit trail to Kafka",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a single application locally without publishing an audit event
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Applicant identifier echoed in the decision
    #[arg(long)]
    pub(crate) user_id: String,
    /// Requested loan amount
    #[arg(long)]
    pub(crate) amount: f64,
    /// Applicant income
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) income: f64,
    /// Fix the random seed for a reproducible score
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
    }
}

fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        user_id,
        amount,
        income,
        seed,
    } = args;

    let application = CreditApplication {
        user_id,
        amount,
        income,
    };
    application.validate()?;

    let decision = ScoringEngine::seeded(seed).score(&application);
    let rendered = serde_json::to_string_pretty(&decision).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["arda-credit-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_score_arguments_with_negative_income() {
        let cli = Cli::try_parse_from([
            "arda-credit-api",
            "score",
            "--user-id",
            "u1",
            "--amount",
            "1000",
            "--income",
            "-250",
            "--seed",
            "9",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Score(args)) => {
                assert_eq!(args.user_id, "u1");
                assert_eq!(args.income, -250.0);
                assert_eq!(args.seed, Some(9));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn score_rejects_zero_amount() {
        let err = run_score(ScoreArgs {
            user_id: "u1".to_string(),
            amount: 0.0,
            income: 100.0,
            seed: Some(1),
        })
        .expect_err("zero amount rejected");
        assert!(matches!(err, AppError::Application(_)));
    }
}
