use clap::Parser;
use cli::{Cli, Command};

mod cli;
mod driver;
mod logging;

pub fn interface() -> driver::Result {
    let Cli {
        workspace,
        config,
        command,
    } = Cli::parse();

    let workspace = match workspace {
        Some(path) => path,
        None => driver::default_workspace()?,
    };

    let config = driver::load_config(&workspace, config.as_deref())?;
    logging::init_logging(config.logging.filter.as_deref());

    let context = driver::Context { workspace, config };

    match command {
        Command::Resolve {
            module,
            transitive,
            providers,
        } => context.resolve(&module, transitive, providers),
        Command::Cycles => context.cycles(),
        Command::Owner { package } => context.owner(&package),
        Command::Providers { service, module } => {
            context.providers(&service, &module)
        }
        Command::Modules => context.modules(),
    }
}

fn main() {
    if let Err(error) = interface() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
