mod cli;

use clap::Parser;
use cli::{Cli, Commands, ProbeArgs, StatusArgs};
use lovit::handlers::Outcome;
use lovit::{
    CatchHandler, EntryFunction, Failure, FetchConfig, Handlers, Lovit, LovitConfig, ModuleConfig,
    Profile, Settings, StatusHandler, is_error_status, slot_name_for,
};
use serde_json::Value;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status(args) => status(args),
        Commands::Probe(args) => probe(args).await?,
    }

    Ok(())
}

fn status(args: StatusArgs) {
    let slot = slot_name_for(args.code.as_str());
    println!("slot:        {slot}");
    println!("status text: {}", slot.status_text());
    println!("error:       {}", is_error_status(args.code.as_str()));
}

async fn probe(args: ProbeArgs) -> Result<(), BoxError> {
    let settings = match args.config {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };
    let lovit = Lovit::from_settings(&settings);

    let (module, task) = args
        .key
        .split_once('.')
        .map(|(module, task)| (module.to_string(), task.to_string()))
        .ok_or_else(|| format!("key must look like module.task, got {}", args.key))?;

    let handlers = Handlers::new()
        .failed(StatusHandler::new(|ctx| {
            match serde_json::to_string_pretty(&ctx) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("failed to render context: {err}"),
            }
        }))
        .catch(CatchHandler::new(|err| eprintln!("error: {err}")));

    let client = lovit.clone();
    let ProbeArgs {
        url,
        key,
        status_path,
        ..
    } = args;
    let entry = EntryFunction::future(move |_| {
        let client = client.clone();
        let config = FetchConfig::builder()
            .key(key.clone())
            .url(url.clone())
            .maybe_status_path(status_path.clone())
            .build();
        async move { Ok::<_, Failure>(client.fetch(config).await?.into_value()) }
    });

    let functions = lovit.configure(
        LovitConfig::new().module(
            module,
            ModuleConfig::new()
                .profile(Profile::new().task(task.as_str(), handlers))
                .entry_function(task.as_str(), entry),
        ),
    )?;

    match functions.call(&task, Value::Null).await? {
        Outcome::Completed(response) => println!("{}", serde_json::to_string_pretty(&response)?),
        Outcome::Handled => println!("handled"),
    }

    Ok(())
}
