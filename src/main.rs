use clap::{Parser, Subcommand};
use std::error::Error;
use std::net::SocketAddr;
use uno_server::uno_game::api::start_api_server;
use uno_server::uno_game::{GameController, MatchConfig, ModeKind};

#[derive(Parser)]
#[command(name = "uno-server", version, about = "UNO match engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a match in this terminal
    Play {
        #[arg(long, value_enum, default_value_t = ModeKind::Standard)]
        mode: ModeKind,
        /// Nickname of a human seat; repeat for more
        #[arg(long)]
        human: Vec<String>,
        /// Nickname of a computer seat; repeat for more
        #[arg(long)]
        computer: Vec<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Host matches over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Play {
            mode,
            human,
            computer,
            seed,
        } => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
            let mut config = MatchConfig::with_mode(mode);
            config.seed = seed;
            let mut controller = GameController::new(config, human, computer)?;
            controller.run();
        }
        Command::Serve { addr } => {
            tokio::runtime::Runtime::new()?.block_on(start_api_server(addr))?;
        }
    }
    Ok(())
}
