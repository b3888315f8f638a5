use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use scribe_core::config::{default_data_dir, default_session_dir, quota_bytes_from_env_value};
use scribe_core::constants::DEFAULT_STORE_KEY;
use scribe_core::{
    validate, CoreConfig, DeleteOutcome, EditHandoff, FileHandoff, FileRecordStore,
    FormIdGenerator, FormIntent, FormModel, FormSession, HtmlFileSurface, ListView,
    PrintSurface, RecordId, RecordStore, ReportRenderer, ScribeError, Statistics,
    WriterSurface,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "HIV/TB patient assessment scribe")]
struct Cli {
    /// Directory holding the record store (overrides SCRIBE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Store file stem (overrides SCRIBE_STORE_KEY)
    #[arg(long, global = true)]
    store_key: Option<String>,
    /// Directory holding the pending edit (overrides SCRIBE_SESSION_DIR)
    #[arg(long, global = true)]
    session_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved records
    List {
        /// Only show records whose name or id contains this text
        #[arg(long)]
        query: Option<String>,
    },
    /// Show one record in full
    Show {
        /// Record id
        id: String,
    },
    /// Show record counts by status
    Stats,
    /// Print a blank form to fill in
    Template {
        #[arg(long, value_enum, default_value_t = FormFormat::Yaml)]
        format: FormFormat,
    },
    /// Start a new form, discarding any pending edit
    New {
        /// Write the blank form here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load a saved record for editing
    Edit {
        /// Record id
        id: String,
        /// Write the form here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Save a filled-in form (JSON or YAML)
    Submit {
        /// Form file
        file: PathBuf,
        /// Save even if the form has validation problems
        #[arg(long)]
        force: bool,
    },
    /// Delete a record
    Delete {
        /// Record id
        id: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Export records as a printable HTML report
    Export {
        /// Restrict the list before selecting
        #[arg(long)]
        query: Option<String>,
        /// Select every record matching the query
        #[arg(long, conflicts_with = "id")]
        all: bool,
        /// Select a record by id (repeatable)
        #[arg(long)]
        id: Vec<String>,
        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormFormat {
    Json,
    Yaml,
}

impl FormFormat {
    /// JSON for `.json` files, YAML for everything else.
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FormFormat::Json,
            _ => FormFormat::Yaml,
        }
    }

    fn serialize_form(self, form: &FormModel) -> anyhow::Result<String> {
        Ok(match self {
            FormFormat::Json => form.to_json_pretty()?,
            FormFormat::Yaml => form.to_yaml()?,
        })
    }

    fn parse_form(self, input: &str) -> anyhow::Result<FormModel> {
        Ok(match self {
            FormFormat::Json => FormModel::from_json_str(input)?,
            FormFormat::Yaml => FormModel::from_yaml_str(input)?,
        })
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scribe=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;
    let mut store = FileRecordStore::from_config(&cfg);
    let mut handoff = FileHandoff::from_config(&cfg);

    match cli.command {
        Some(Commands::List { query }) => {
            let mut view = ListView::load(&store)?;
            view.set_query(query.unwrap_or_default());
            let visible = view.visible();
            if visible.is_empty() {
                println!("No records found.");
            } else {
                for record in visible {
                    println!(
                        "ID: {}, Name: {}, Status: {}, Saved: {}",
                        record.id, record.patient_name, record.status, record.date_created
                    );
                }
            }
        }
        Some(Commands::Show { id }) => {
            let id = parse_id(&id)?;
            let record = store
                .find(&id)?
                .ok_or_else(|| ScribeError::RecordNotFound(id.clone()))?;
            println!("ID: {}", record.id);
            println!("Name: {}", record.patient_name);
            println!("Status: {}", record.status);
            println!("Saved: {}", record.date_created);
            print!("{}", record.form_data.to_yaml()?);
        }
        Some(Commands::Stats) => {
            let Statistics {
                total,
                drafts,
                updated,
            } = Statistics::from_records(&store.list()?);
            println!("Total: {}, Drafts: {}, Updated: {}", total, drafts, updated);
        }
        Some(Commands::Template { format }) => {
            print!("{}", format.serialize_form(&FormModel::new())?);
        }
        Some(Commands::New { out }) => {
            handoff.clear_pending_edit()?;
            emit_form(&FormModel::new(), out.as_deref())?;
        }
        Some(Commands::Edit { id, out }) => {
            let id = parse_id(&id)?;
            let record = store
                .find(&id)?
                .ok_or_else(|| ScribeError::RecordNotFound(id.clone()))?;
            handoff.set_pending_edit(&record.id)?;
            emit_form(&record.form_data, out.as_deref())?;
        }
        Some(Commands::Submit { file, force }) => {
            submit(&mut store, &mut handoff, &file, force)?;
        }
        Some(Commands::Delete { id, yes }) => {
            let id = parse_id(&id)?;
            let mut view = ListView::load(&store)?;
            let outcome = view.delete_with_confirmation(&mut store, &id, |record| {
                yes || confirm(&format!(
                    "Delete record {} ({})? [y/N] ",
                    record.id, record.patient_name
                ))
            })?;
            match outcome {
                DeleteOutcome::Deleted => println!("Deleted record {}", id),
                DeleteOutcome::Declined => println!("Kept record {}", id),
                DeleteOutcome::NotFound => println!("No record with id {}", id),
            }
        }
        Some(Commands::Export {
            query,
            all,
            id,
            out,
        }) => {
            let mut view = ListView::load(&store)?;
            view.set_query(query.unwrap_or_default());
            if all {
                view.select_all(true);
            }
            for raw in &id {
                let id = parse_id(raw)?;
                if !view.is_selected(&id) && !view.toggle(&id) {
                    tracing::warn!(id = %id, "not in the current list; skipped");
                }
            }

            let html = match view.export(&ReportRenderer::new()) {
                Ok(html) => html,
                Err(ScribeError::NothingSelected) => {
                    bail!("Please select at least one record to export (use --all or --id)")
                }
                Err(e) => return Err(e.into()),
            };

            match out {
                Some(path) => {
                    HtmlFileSurface::new(&path).present(&html)?;
                    println!(
                        "Exported {} record(s) to {}",
                        view.selected_ids().len(),
                        path.display()
                    );
                }
                None => WriterSurface::new(io::stdout().lock()).present(&html)?,
            }
        }
        None => {
            println!("Use 'scribe --help' for commands");
        }
    }

    Ok(())
}

/// Flags first, then environment, then platform defaults.
fn resolve_config(cli: &Cli) -> anyhow::Result<CoreConfig> {
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| env_value("SCRIBE_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(default_data_dir);
    let store_key = cli
        .store_key
        .clone()
        .or_else(|| env_value("SCRIBE_STORE_KEY"))
        .unwrap_or_else(|| DEFAULT_STORE_KEY.to_string());
    let session_dir = cli
        .session_dir
        .clone()
        .or_else(|| env_value("SCRIBE_SESSION_DIR").map(PathBuf::from))
        .unwrap_or_else(default_session_dir);
    let quota_bytes = quota_bytes_from_env_value(std::env::var("SCRIBE_QUOTA_BYTES").ok())?;

    let cfg = CoreConfig::new(data_dir, &store_key, session_dir, quota_bytes)?;
    tracing::debug!(
        store = %cfg.store_path().display(),
        session = %cfg.session_dir().display(),
        quota_bytes = cfg.quota_bytes(),
        "configuration resolved"
    );
    Ok(cfg)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_id(raw: &str) -> anyhow::Result<RecordId> {
    RecordId::new(raw).with_context(|| format!("invalid record id {:?}", raw))
}

fn emit_form(form: &FormModel, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            let text = FormFormat::from_path(path).serialize_form(form)?;
            std::fs::write(path, text)
                .with_context(|| format!("failed to write form to {}", path.display()))?;
            println!("Form written to {}", path.display());
        }
        None => print!("{}", FormFormat::Yaml.serialize_form(form)?),
    }
    Ok(())
}

fn submit(
    store: &mut FileRecordStore,
    handoff: &mut FileHandoff,
    file: &Path,
    force: bool,
) -> anyhow::Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read form {}", file.display()))?;
    let form = FormFormat::from_path(file).parse_form(&input)?;

    let issues = validate(&form);
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  {}", issue);
        }
        if !force {
            bail!(
                "form has {} problem(s); fix them or pass --force",
                issues.len()
            );
        }
        tracing::warn!(problems = issues.len(), "saving form with validation problems");
    }

    let intent = FormIntent::take(handoff)?;
    let opened = FormSession::open(&*store, intent)?;
    let session = FormSession::with_form(form, opened.edit_target().cloned());
    let record = session.submit(store, &FormIdGenerator::new(), Utc::now())?;

    println!(
        "Saved record {} for {} ({})",
        record.id, record.patient_name, record.status
    );
    Ok(())
}

fn confirm(prompt: &str) -> bool {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
