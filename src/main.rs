use std::env;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use lboro_timetable_ics::cli::{self, Args, CompileArgs, Output, ServeArgs, Source};
use lboro_timetable_ics::fetch::fetch_page;
use lboro_timetable_ics::{cache, compile, server};

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "lboro_timetable_ics=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}

#[tokio::main]
async fn main() {
    let args = cli::parse(env::args().skip(1).collect());

    setup_logging();

    let result = match args {
        Args::Compile(args) => run_compile(args).await,
        Args::Serve(args) => serve(args).await,
    };

    if let Err(err) = result {
        log::error!("{err:?}");
        eprintln!("{err}");
        process::exit(1);
    }
}

async fn run_compile(args: CompileArgs) -> Result<()> {
    let html = read_source(&args.source).await?;
    let calendar = compile(&html, Utc::now())?;

    let contents = if args.json {
        serde_json::to_string_pretty(&calendar)?
    } else {
        calendar.to_ics()?.to_string()
    };

    match &args.output {
        Output::Stdout => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(contents.as_bytes()).await?;
            stdout.flush().await?;
        }
        Output::File(path) => {
            write_atomically(path, contents.as_bytes()).await?;
            log::info!("Wrote {} events to {}", calendar.events.len(), path.display());
        }
    }

    Ok(())
}

async fn read_source(source: &Source) -> Result<String> {
    match source {
        Source::Stdin => {
            let mut html = String::new();
            tokio::io::stdin()
                .read_to_string(&mut html)
                .await
                .context("Failed to read timetable page from stdin")?;
            Ok(html)
        }
        Source::File(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        Source::Url(url) => fetch_page(&reqwest::Client::new(), url, &[])
            .await
            .with_context(|| format!("Failed to fetch {url}")),
    }
}

/// Writes through a temporary sibling so a failed write never leaves a
/// truncated calendar behind.
async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let mut temporary = PathBuf::from(path);
    temporary.as_mut_os_string().push(".part");

    let written: std::io::Result<()> = async {
        tokio::fs::write(&temporary, contents).await?;
        tokio::fs::rename(&temporary, path).await
    }
    .await;

    if let Err(err) = written {
        let _ = tokio::fs::remove_file(&temporary).await;
        return Err(err).with_context(|| format!("Failed to write {}", path.display()));
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let router = server::router(server::Config {
        upstream: args.upstream,
        cache: cache::Config {
            enabled: args.enable_cache,
            ttl: args.cache_ttl,
            capacity: 256,
        },
    });

    let listener = TcpListener::bind(args.address)
        .await
        .with_context(|| format!("Failed to listen on {}", args.address))?;
    log::info!("Listening at http://{}", args.address);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
