use crate::demo::{
    run_confirm, run_demo, run_rank_blood, run_rank_organ, ConfirmArgs, DemoArgs, RankBloodArgs,
    RankOrganArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lifeline::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lifeline",
    about = "Rank blood donors and organ offers, and run failover donor outreach",
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
    /// Print a ranking from the configured datasets
    Rank {
        #[command(subcommand)]
        command: RankCommand,
    },
    /// Record a completed donation in the donor dataset
    Confirm(ConfirmArgs),
    /// Walk through ranking, outreach, SOS and shortage monitoring without sending SMS
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum RankCommand {
    /// Rank eligible blood donors near a location
    Blood(RankBloodArgs),
    /// Rank viable organ offers near a location
    Organ(RankOrganArgs),
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

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rank {
            command: RankCommand::Blood(args),
        } => run_rank_blood(args),
        Command::Rank {
            command: RankCommand::Organ(args),
        } => run_rank_organ(args),
        Command::Confirm(args) => run_confirm(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use lifeline::workflows::registry::BloodGroup;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["lifeline-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn rank_blood_parses_group_and_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "lifeline-api",
            "rank",
            "blood",
            "--blood-group",
            "ab-",
            "--lat",
            "-33.86",
            "--lon",
            "151.2",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Rank {
                command: RankCommand::Blood(args),
            }) => {
                assert_eq!(args.blood_group, BloodGroup::AbNegative);
                assert_eq!(args.lat, -33.86);
                assert_eq!(args.top_n, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn demo_defaults_to_bundled_dataset_date() {
        let cli = Cli::try_parse_from(["lifeline-api", "demo"]).expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.today.to_string(), "2024-06-01");
                assert!(args.blood_group.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_blood_group_is_rejected_by_the_parser() {
        let result = Cli::try_parse_from([
            "lifeline-api",
            "rank",
            "blood",
            "--blood-group",
            "C+",
            "--lat",
            "19.0",
            "--lon",
            "72.8",
        ]);
        assert!(result.is_err());
    }
}
