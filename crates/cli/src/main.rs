//! signflow - command-line harness for the editing core
//!
//! Usage:
//!   signflow runs <file.pdf>                  Print the text runs of a page as JSON
//!   signflow render <file.pdf> -o page.png    Write a proof raster of a page
//!   signflow replay <file.pdf> <script.json>  Replay an editing script, print instructions
//!   signflow sign <file.pdf> <image>          Place a signature image, print the placement
//!   signflow settings                         Print the effective settings

mod script;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use kurbo::Point;
use serde::Serialize;
use signflow_editor::driver::{read_signature_upload, refresh_page};
use signflow_editor::{
    EditorSession, EditorSettings, KeyPress, NoCapture, PageSource, RenderOutcome, ResizeHandle,
    SettingsStore, SignatureMode, data_uri,
};
use signflow_pdf::HayroPageSource;
use signflow_store::{
    DocumentRecord, MemoryDocumentStore, NewDocument, OwnerId, ReplaceInstruction,
};

use script::Step;

#[derive(Parser)]
#[command(name = "signflow", version, about = "Edit and sign PDF pages from the command line")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the text runs of a page as JSON
    Runs {
        pdf: PathBuf,
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Render scale (defaults to the configured initial scale)
        #[arg(short, long)]
        scale: Option<f64>,
    },
    /// Write a proof raster of a page
    Render {
        pdf: PathBuf,
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(short, long)]
        scale: Option<f64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Replay an editing script and print the replacement instructions
    Replay {
        pdf: PathBuf,
        script: PathBuf,
    },
    /// Place a signature image on a page and print the placement record
    Sign {
        pdf: PathBuf,
        image: PathBuf,
        /// Defaults to the configured signature page
        #[arg(short, long)]
        page: Option<u32>,
        /// Top-left of the signature in signing-canvas pixels
        #[arg(long, value_name = "X,Y", value_parser = parse_point)]
        at: Option<Point>,
    },
    /// Print the effective settings as JSON
    Settings,
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{raw}'"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|error| format!("'{value}': {error}"))
    };
    Ok(Point::new(parse(x)?, parse(y)?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayReport {
    document: DocumentRecord,
    instructions: Vec<ReplaceInstruction>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => SettingsStore::new(path.clone()),
        None => SettingsStore::load(),
    };
    let settings = store.settings();

    match cli.command {
        Commands::Runs { pdf, page, scale } => {
            let (source, mut session) = open(&pdf, &settings, scale)?;
            show_page(&mut session, source, page).await?;
            print_json(&session.run_views())?;
        }
        Commands::Render {
            pdf,
            page,
            scale,
            output,
        } => {
            let (source, mut session) = open(&pdf, &settings, scale)?;
            let raster = show_page(&mut session, source, page).await?;
            raster
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("wrote {}", output.display());
        }
        Commands::Replay { pdf, script } => {
            let raw = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read {}", script.display()))?;
            let steps = script::parse(&raw)
                .with_context(|| format!("Invalid script {}", script.display()))?;
            let report = replay(&pdf, &settings, &steps).await?;
            print_json(&report)?;
        }
        Commands::Sign {
            pdf,
            image,
            page,
            at,
        } => {
            let defaults = &settings.signature_placement;
            let (source, mut session) = open(&pdf, &settings, None)?;
            show_page(&mut session, source, page.unwrap_or(defaults.page)).await?;

            let mut signing = session
                .start_signature(Arc::new(NoCapture))
                .context("No page rendered")?;
            let page_size = signing.page_size();
            signing.placement.set_canvas_size(
                page_size.width * settings.signature_scale,
                page_size.height * settings.signature_scale,
            );
            read_signature_upload(&mut signing.pad, &image).await?;
            signing.pad.set_mode(SignatureMode::Upload);
            if !signing.apply()? {
                bail!("No signature to apply");
            }

            let target = at.unwrap_or(Point::new(
                defaults.x * settings.signature_scale,
                defaults.y * settings.signature_scale,
            ));
            let placed = signing.placement.rect();
            signing.placement.begin_resize(ResizeHandle::E, Point::new(placed.right(), placed.y));
            signing.placement.pointer_move(Point::new(
                placed.x + defaults.size * settings.signature_scale,
                placed.y,
            ));
            signing.placement.pointer_up();

            let origin = signing.placement.rect().origin();
            signing.placement.begin_drag(origin);
            signing.placement.pointer_move(target);
            signing.placement.pointer_up();

            print_json(&signing.confirm()?)?;
        }
        Commands::Settings => {
            eprintln!("settings file: {}", store.config_path().display());
            print_json(&*settings)?;
        }
    }

    Ok(())
}

fn open(
    pdf: &Path,
    settings: &EditorSettings,
    scale: Option<f64>,
) -> Result<(Arc<dyn PageSource>, EditorSession)> {
    let source = HayroPageSource::open(pdf)
        .with_context(|| format!("Failed to open {}", pdf.display()))?;
    let mut settings = settings.clone();
    if let Some(scale) = scale {
        settings.initial_scale = scale;
    }
    let session = EditorSession::new(source.page_count(), Arc::new(settings))?;
    Ok((Arc::new(source), session))
}

async fn show_page(
    session: &mut EditorSession,
    source: Arc<dyn PageSource>,
    page: u32,
) -> Result<image::RgbaImage> {
    session.go_to_page(page)?;
    let refresh = refresh_page(session, source).await?;
    refresh.raster.context("Render was superseded")
}

async fn replay(pdf: &Path, settings: &EditorSettings, steps: &[Step]) -> Result<ReplayReport> {
    let bytes = std::fs::read(pdf).with_context(|| format!("Failed to read {}", pdf.display()))?;
    let (source, mut session) = open(pdf, settings, None)?;
    refresh_page(&mut session, source.clone()).await?;

    for (index, step) in steps.iter().enumerate() {
        tracing::debug!(index, ?step, "replaying step");
        let rerender = match step {
            Step::GoToPage { page } => {
                session.go_to_page(*page)?;
                true
            }
            Step::NextPage => session.next_page().is_some(),
            Step::PreviousPage => session.previous_page().is_some(),
            Step::ZoomIn => {
                session.zoom_in()?;
                true
            }
            Step::ZoomOut => session.zoom_out()?.is_some(),
            Step::Drag { from, to, target } => {
                if session.pointer_down(Point::new(from[0], from[1]), *target) {
                    session.pointer_move(Point::new(to[0], to[1]));
                    session.pointer_up();
                }
                false
            }
            Step::Type { text } => {
                session.set_active_text(text);
                false
            }
            Step::Resize { width, height } => {
                session.resize_active(*width, *height);
                false
            }
            Step::Key { key, modifier_held } => {
                session.handle_key(KeyPress {
                    key: *key,
                    modifier_held: *modifier_held,
                });
                false
            }
            Step::SyncRun { id, text } => {
                session.sync_run(*id, text)?;
                false
            }
            Step::RevertRun { id } => {
                session.revert_run(*id)?;
                false
            }
            Step::RemoveEdit { index } => {
                session.remove_selection_edit(*index);
                false
            }
            Step::PlaceImage { path, at } => {
                let image = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                session.select_image(&data_uri::from_image_bytes(&image, "cli-place-image")?)?;
                session.arm_image_placement();
                session.canvas_click(Point::new(at[0], at[1]));
                false
            }
        };

        if rerender {
            let refresh = refresh_page(&mut session, source.clone()).await?;
            if let RenderOutcome::Applied {
                discarded_run_edits,
            } = refresh.outcome
                && discarded_run_edits > 0
            {
                eprintln!("step {index}: {discarded_run_edits} unsaved run edits discarded");
            }
        }
    }

    let store = MemoryDocumentStore::new();
    let file_name = pdf
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let record = store.insert(NewDocument {
        owner_id: OwnerId::new_v7(),
        file_name,
        bytes,
    })?;
    let document = session.save(&store, record.id)?.unwrap_or(record);
    Ok(ReplayReport {
        document,
        instructions: session.build_replace_blocks(),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
