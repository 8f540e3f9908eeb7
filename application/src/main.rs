use std::{io, sync::OnceLock};

use application::{
    repl::{self, Line, Reply},
    Args, Config, Service,
};
use service::{
    command::Restore,
    infra::{directory, storage},
    Command as _,
};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stdout)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (!STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::INFO)
                                >= *meta.level()
                })),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stderr)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::INFO)
                                >= *meta.level()
                })),
        )
        .init();

    _ = start().await;
}

async fn start() -> Result<(), ()> {
    let args = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        session,
        storage,
        directory,
        log,
    } = Config::new(&args.config)
        .map(|config| args.apply(config))
        .map_err(|e| {
            log::error!("failed to load `Config`: {e}");
        })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    log::info!("persisting session into `{}`", storage.dir.display());
    let service = Service::new(
        session.into(),
        storage::File::new(storage.dir),
        directory::Mock::new(directory.into()),
    );

    let mut changes = service.subscribe();
    drop(tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let state = changes.borrow_and_update().clone();
            log::debug!(
                "session state changed: {}",
                repl::status(&state),
            );
        }
    }));

    let state = service
        .execute(Restore)
        .await
        .unwrap_or_else(|e| match e {});
    println!("{}", repl::status(&state));

    prompt(&service).await.map_err(|e| {
        log::error!("failed to read the prompt: {e}");
    })
}

/// Reads [`Line`]s from the standard input and executes them until the input
/// ends or [`Reply::Quit`] is requested.
async fn prompt(service: &Service) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match Line::parse(&line) {
            Ok(Line { action }) => repl::execute(service, action).await,
            Err(e) => Err(e),
        };
        match reply {
            Ok(Reply::Text(text)) => println!("{}", text.trim_end()),
            Ok(Reply::Quit) => return Ok(()),
            Err(e) => {
                log::debug!("{e}");
                eprintln!("{}", e.without_backtrace());
            }
        }
    }
}
