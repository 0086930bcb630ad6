mod book;
mod core;
mod display;
mod init;
mod ledger;
mod report;
mod settings;
mod store;
mod summary;
mod txn;

use anyhow::Result;
use clap::{arg, Arg, Command};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::settings::Settings;

static CLIENT_NAME: &str = "purse";

fn kind_arg() -> Arg<'static> {
    Arg::new("kind")
        .short('t')
        .long("type")
        .takes_value(true)
        .value_name("TYPE")
        .help("Income or Expense.")
}

fn cli() -> Command<'static> {
    Command::new(CLIENT_NAME)
        .about("Records income and expenses and reports monthly totals. The ledger \
         lives in a local CSV file or in a file of a hosted repository.")
        .version("0.1.0")
        .subcommand_required(true)
        .allow_external_subcommands(false)
        .arg(arg!(CONFIG: -c --config [FILE] "Sets a custom config file"))
        .arg(arg!(verbose: -v --verbose "Logs what the command is doing"))
        .subcommand(Command::new("init")
            .about("Writes a default configuration file.")
            .arg(arg!(force: -f --force "Overwrites an existing configuration file.")))
        .subcommand(Command::new("add")
            .about("Records a new transaction.")
            .arg(kind_arg().required(true))
            .arg(arg!(amount: -a --amount <AMOUNT> "A non-negative amount.").allow_hyphen_values(true))
            .arg(arg!(category: -k --category <CATEGORY> "One of Salary, Food, Travel, Shopping, Bills or Other."))
            .arg(arg!(note: -n --note [NOTE] "Free text describing the transaction."))
            .arg(arg!(date: -d --date [DATE] "Date of the transaction as YYYY-MM-DD, defaults to today.")))
        .subcommand(Command::new("edit")
            .about("Changes fields of a recorded transaction, fields not passed are kept.")
            .arg(arg!(target: <TARGET> "Position or id of the transaction, see `list`."))
            .arg(kind_arg())
            .arg(arg!(amount: -a --amount [AMOUNT] "A non-negative amount.").allow_hyphen_values(true))
            .arg(arg!(category: -k --category [CATEGORY] "One of Salary, Food, Travel, Shopping, Bills or Other."))
            .arg(arg!(note: -n --note [NOTE] "Free text describing the transaction."))
            .arg(arg!(date: -d --date [DATE] "Date of the transaction as YYYY-MM-DD.")))
        .subcommand(Command::new("delete")
            .about("Removes a recorded transaction.")
            .arg(arg!(target: <TARGET> "Position or id of the transaction, see `list`.")))
        .subcommand(Command::new("list")
            .about("Prints every transaction with its position and id."))
        .subcommand(Command::new("months")
            .about("Prints the months that have transactions."))
        .subcommand(Command::new("report")
            .about("Prints income, expense and balances for a month along with its transactions \
             and expenses by category.")
            .arg(arg!(month: -m --month [MONTH] "Month to report on as YYYY-MM, defaults to the latest month with transactions.")))
}

async fn run() -> Result<()> {
    let matches = cli().get_matches();

    if matches.is_present("verbose") {
        tracing_subscriber::registry()
            .with(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = matches.value_of("CONFIG");
    match matches.subcommand() {
        Some(("init", init_matches)) => {
            init::run(config, init_matches.is_present("force"))?;
        }
        Some((name @ ("add" | "edit" | "delete" | "list"), txn_matches)) => {
            let settings = Settings::new(config)?;
            txn::run(name, txn_matches, settings).await?;
        }
        Some((name @ ("months" | "report"), report_matches)) => {
            let settings = Settings::new(config)?;
            report::run(name, report_matches, settings).await?;
        }
        None => unreachable!("subcommand is required"),
        _ => unreachable!(),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        println!("{:#}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn add_requires_type_amount_and_category() {
        assert!(cli()
            .try_get_matches_from(["purse", "add", "--amount", "5"])
            .is_err());

        let matches = cli()
            .try_get_matches_from([
                "purse", "add", "-t", "expense", "-a", "12.5", "-k", "food", "-n", "lunch",
            ])
            .unwrap();
        let (name, add) = matches.subcommand().unwrap();
        assert_eq!(name, "add");
        assert_eq!(add.value_of("kind"), Some("expense"));
        assert_eq!(add.value_of("date"), None);
    }

    #[test]
    fn edit_takes_target_and_optional_fields() {
        let matches = cli()
            .try_get_matches_from(["purse", "-c", "conf.toml", "edit", "1", "--note", ""])
            .unwrap();

        assert_eq!(matches.value_of("CONFIG"), Some("conf.toml"));
        let (_, edit) = matches.subcommand().unwrap();
        assert_eq!(edit.value_of("target"), Some("1"));
        assert_eq!(edit.value_of("note"), Some(""));
        assert_eq!(edit.value_of("amount"), None);
    }
}
