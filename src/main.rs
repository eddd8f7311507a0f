//! Purpose: `postgrid` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.

use std::io::{self, IsTerminal};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};

mod serve;

use postgrid::api::{ContentItem, Error, ErrorKind, LocalClient, SettingKey, to_exit_code};
use postgrid::store_paths::default_data_dir;

#[derive(Parser)]
#[command(
    name = "postgrid",
    version,
    about = "Settings-driven post grid: seed content, tune display settings, render or serve",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Data directory for settings and content (default: ~/.postgrid)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the grid, content API, and admin settings form over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:7878", help = "Address to bind")]
        bind: SocketAddr,
        #[arg(long, help = "Allow binding to a non-loopback address")]
        allow_non_loopback: bool,
        #[arg(long, help = "Require this bearer token on the content API")]
        token: Option<String>,
    },
    /// Render one page of the grid to stdout
    Render {
        #[arg(long, default_value_t = 1, help = "1-based page number")]
        page: u64,
    },
    /// Inspect or change display settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Seed or list content items in the local store
    Content {
        #[command(subcommand)]
        command: ContentCommand,
    },
    /// Generate shell completions
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Show all resolved settings
    List,
    /// Show one resolved setting
    Get { name: String },
    /// Sanitize and store one setting
    Set { name: String, value: String },
}

#[derive(Subcommand)]
enum ContentCommand {
    /// Add one item from inline JSON or a file
    Add {
        #[arg(help = "Item as a JSON object")]
        item: Option<String>,
        #[arg(long, help = "Read the item JSON from a file", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
    /// List all stored items
    List,
}

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    let data_dir = cli.dir.unwrap_or_else(default_data_dir);
    let client = LocalClient::new().with_data_dir(&data_dir);

    match cli.command {
        Command::Serve {
            bind,
            allow_non_loopback,
            token,
        } => {
            let config = serve::ServeConfig {
                bind,
                data_dir,
                token,
                allow_non_loopback,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))
        }
        Command::Render { page } => {
            let fragment = client.render_page(page)?;
            print!("{fragment}");
            if !fragment.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        Command::Settings { command } => run_settings(&client, command),
        Command::Content { command } => run_content(&client, command),
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "postgrid", &mut io::stdout());
            Ok(())
        }
    }
}

fn run_settings(client: &LocalClient, command: SettingsCommand) -> Result<(), Error> {
    match command {
        SettingsCommand::List => {
            let settings = client.load_settings();
            emit_json(json!({ "settings": settings.to_json() }));
            Ok(())
        }
        SettingsCommand::Get { name } => {
            let key: SettingKey = name.parse()?;
            let settings = client.load_settings();
            emit_json(json!({
                "setting": { "name": key.as_str(), "value": settings.value(key) }
            }));
            Ok(())
        }
        SettingsCommand::Set { name, value } => {
            let key: SettingKey = name.parse()?;
            let mut settings = client.load_settings();
            settings.apply(key, &value).map_err(|rejected| {
                Error::new(ErrorKind::Usage)
                    .with_message(rejected.reason.clone())
                    .with_setting(key.as_str())
                    .with_hint("The stored value is unchanged.")
            })?;
            client.save_settings(&settings)?;
            emit_json(json!({
                "setting": { "name": key.as_str(), "value": settings.value(key) }
            }));
            Ok(())
        }
    }
}

fn run_content(client: &LocalClient, command: ContentCommand) -> Result<(), Error> {
    match command {
        ContentCommand::Add { item, file } => {
            let raw = match (item, file) {
                (Some(_), Some(_)) => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("provide inline JSON or --file, not both"));
                }
                (Some(raw), None) => raw,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to read item file")
                        .with_path(&path)
                        .with_source(err)
                })?,
                (None, None) => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("content add requires inline JSON or --file"));
                }
            };
            let mut item: ContentItem = serde_json::from_str(&raw).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("item is not a valid JSON object")
                    .with_source(err)
            })?;
            if item.title.trim().is_empty() {
                return Err(Error::new(ErrorKind::Usage).with_message("item title must not be empty"));
            }
            if item.date.is_empty() {
                item.date = timestamp_now().unwrap_or_default();
            }
            let stored = client.content_store().add(item)?;
            emit_json(json!({ "item": stored }));
            Ok(())
        }
        ContentCommand::List => {
            let items = client.content_store().load_items()?;
            emit_json(json!({ "items": items }));
            Ok(())
        }
    }
}

fn timestamp_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_json(value: Value) {
    match serde_json::to_string(&value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("{{\"error\":{{\"kind\":\"Internal\",\"message\":\"{err}\"}}}}"),
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        if let Some(hint) = err.hint() {
            eprintln!("hint: {hint}");
        }
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("error")),
    );
    if let Some(setting) = err.setting() {
        inner.insert("setting".to_string(), json!(setting));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgrid::api::SETTING_KEYS;

    #[test]
    fn error_json_includes_setting_and_hint() {
        let err = Error::new(ErrorKind::Usage)
            .with_message("rejected")
            .with_setting("orderby")
            .with_hint("The stored value is unchanged.");
        let value = error_json(&err);
        let inner = value.get("error").and_then(Value::as_object).expect("error");
        assert_eq!(inner.get("kind").unwrap(), "Usage");
        assert_eq!(inner.get("setting").unwrap(), "orderby");
        assert!(inner.get("hint").is_some());
    }

    #[test]
    fn every_setting_key_is_addressable_from_the_cli() {
        for key in SETTING_KEYS {
            let parsed: SettingKey = key.as_str().parse().expect("parse key");
            assert_eq!(parsed, key);
        }
    }
}
