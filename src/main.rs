use std::{collections::HashMap, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use devshelf::{
    ContentSource,
    DataDir,
    Engine,
    Error,
    Index,
    Renderer,
    Result,
    Store,
    cli::{
        AvailableArgs,
        Cli,
        Command,
        ImportArgs,
        SearchArgs,
        ShowArgs,
        UninstallArgs,
    },
    docset::{Doc, parse_doc_slug},
    output::{self, InstalledDoc},
    render::Format,
    search::SourceIndex,
    text_util::{DEFAULT_CONTENT_MAX_CHARS, truncate_content},
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DEVSHELF_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_recoverable() => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    if let Err(e) = data_dir.migrate_legacy_layout() {
        tracing::warn!(error = %e, "data directory migration incomplete");
    }
    let store = Store::open(&data_dir);

    match cli.command {
        Command::Search(args) => cmd_search(&store, &args),
        Command::Show(args) => cmd_show(&store, &args),
        Command::List(args) => cmd_list(&store, &data_dir, args.json),
        Command::Available(args) => cmd_available(&store, &args),
        Command::Import(args) => cmd_import(&store, &args),
        Command::Uninstall(args) => cmd_uninstall(&store, &args),
        Command::Completions(_) => Ok(()),
    }
}

fn cmd_search(store: &Store, args: &SearchArgs) -> Result<()> {
    let filter: Vec<String> =
        args.docs.iter().map(|d| parse_doc_slug(d)).collect();
    let engine = load_engine(store, &filter, args.limit)?;
    let outcome = engine.search(&args.query, &filter)?;

    if let Some(warning) = &outcome.warning
        && !args.json
    {
        eprintln!("Warning: {warning}\n");
    }

    if args.json {
        println!("{}", output::to_json(&outcome.results)?);
        return Ok(());
    }
    if args.list {
        print!("{}", output::format_result_list(&outcome.results));
        return Ok(());
    }

    let Some(best) = outcome.results.first() else {
        println!("No results (limit is {}).", engine.limit());
        return Ok(());
    };
    println!("{}", output::format_match_header(best));
    let html = store.load_content(&best.source_id, &best.entry.path)?;
    print_rendered(&html, args.format, args.full);
    Ok(())
}

/// Build an engine over the installed docs named in `filter`, or over every
/// installed doc when `filter` is empty. Requested docs that are not
/// installed are reported and skipped.
fn load_engine(store: &Store, filter: &[String], limit: usize) -> Result<Engine> {
    let installed = store.list_installed()?;
    if installed.is_empty() {
        return Err(Error::NothingInstalled);
    }

    let selected: Vec<&String> = if filter.is_empty() {
        installed.iter().collect()
    } else {
        for slug in filter {
            if !installed.contains(slug) {
                tracing::warn!(doc = %slug, "doc is not installed");
            }
        }
        installed.iter().filter(|slug| filter.contains(slug)).collect()
    };

    let sources: Vec<SourceIndex> = selected
        .into_iter()
        .filter_map(|slug| match store.load_index(slug) {
            Ok(index) => Some(SourceIndex::new(slug.clone(), index)),
            Err(e) => {
                tracing::warn!(doc = %slug, error = %e, "failed to load index");
                None
            }
        })
        .collect();
    tracing::debug!(docs = sources.len(), "loaded indexes");

    if sources.is_empty() && filter.is_empty() {
        return Err(Error::NoLoadableDocs);
    }
    Engine::new(sources, limit)
}

fn cmd_show(store: &Store, args: &ShowArgs) -> Result<()> {
    let slug = parse_doc_slug(&args.doc);
    if !store.is_installed(&slug) {
        return Err(Error::NotFound {
            kind: "doc",
            name: slug,
        });
    }
    let html = store.load_content(&slug, &args.path)?;
    print_rendered(&html, args.format, args.full);
    Ok(())
}

fn print_rendered(html: &[u8], format: Format, full: bool) {
    let rendered = Renderer::new(format).render(html);
    if full {
        println!("{rendered}");
    } else {
        println!(
            "{}",
            truncate_content(&rendered, DEFAULT_CONTENT_MAX_CHARS)
        );
    }
}

fn cmd_list(store: &Store, data_dir: &DataDir, json: bool) -> Result<()> {
    let manifest: HashMap<String, Doc> = match store.load_manifest() {
        Ok(docs) => docs.into_iter().map(|d| (d.slug.clone(), d)).collect(),
        Err(Error::NotFound { .. }) => HashMap::new(),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable manifest");
            HashMap::new()
        }
    };

    let mut docs = Vec::new();
    for slug in store.list_installed()? {
        let index = match store.load_index(&slug) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(doc = %slug, error = %e, "skipping broken install");
                continue;
            }
        };
        let db_size = store.load_meta(&slug).map_or(0, |meta| meta.db_size);
        let catalog = manifest.get(&slug);

        docs.push(InstalledDoc {
            name: catalog.map_or_else(|| slug.clone(), |d| d.name.clone()),
            release: catalog.map(|d| d.release.clone()).unwrap_or_default(),
            version: catalog.map(|d| d.version.clone()).unwrap_or_default(),
            entries: index.len(),
            db_size,
            slug,
        });
    }

    if json {
        println!("{}", output::to_json(&docs)?);
    } else if docs.is_empty() {
        println!(
            "No documentation installed in {}.",
            data_dir.root().display()
        );
    } else {
        print!("{}", output::format_installed(&docs));
        println!("\nData directory: {}", data_dir.root().display());
    }
    Ok(())
}

fn cmd_available(store: &Store, args: &AvailableArgs) -> Result<()> {
    let catalog = match store.load_manifest() {
        Ok(docs) => docs,
        Err(Error::NotFound { .. }) => return Err(Error::NoCatalog),
        Err(e) => return Err(e),
    };

    let query = args.query.as_deref();
    let (docs, truncated) = output::matching_docs(&catalog, query);
    if args.json {
        println!("{}", output::to_json(&docs)?);
    } else {
        print!(
            "{}",
            output::format_available(catalog.len(), &docs, truncated, query)
        );
    }
    Ok(())
}

fn cmd_import(store: &Store, args: &ImportArgs) -> Result<()> {
    let slug = parse_doc_slug(&args.doc);
    let index = Index::from_json(&std::fs::read(&args.index)?)?;
    let db: HashMap<String, String> =
        serde_json::from_slice(&std::fs::read(&args.db)?)?;

    let catalog = match &args.manifest {
        Some(path) => {
            let docs: Vec<Doc> = serde_json::from_slice(&std::fs::read(path)?)?;
            store.save_manifest(&docs)?;
            let doc = docs.into_iter().find(|d| d.slug == slug);
            if doc.is_none() {
                tracing::warn!(doc = %slug, "doc is not listed in the manifest");
            }
            doc
        }
        None => None,
    };

    let meta = store.install(&slug, &index, &db, catalog.as_ref())?;
    tracing::debug!(doc = %meta.slug, installed = meta.installed, "wrote meta");
    println!("Installed {slug} ({} entries)", index.len());
    Ok(())
}

fn cmd_uninstall(store: &Store, args: &UninstallArgs) -> Result<()> {
    let mut failed = Vec::new();
    for doc in &args.docs {
        let slug = parse_doc_slug(doc);
        match store.uninstall(&slug) {
            Ok(()) => println!("Uninstalled {slug}"),
            Err(e) => {
                eprintln!("Failed to uninstall {slug}: {e}");
                failed.push(slug);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(Error::UninstallFailed { failed })
    }
}
