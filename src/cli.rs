use crate::app::OverlaySession;
use crate::config::{Config, load_config};
use crate::layout::Viewport;
use crate::layout_dump::write_layout_dump;
use crate::overlay::load_overlay;
use crate::render::{DEFAULT_EXPORT_NAME, EmbeddedImage, write_output_svg};
use crate::store::{FileStorage, MemoryStorage, Storage};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ctrlabel", version, about = "Label a controller image with connector lines")]
pub struct Args {
    /// Overlay description (JSON5). Defaults to the built-in controller.
    #[arg(short = 'l', long = "labels")]
    pub labels: Option<PathBuf>,

    /// Base image; overrides the description's image
    #[arg(short = 'i', long = "image")]
    pub image: Option<PathBuf>,

    /// Directory holding persisted label text. In-memory if omitted.
    #[arg(short = 's', long = "store")]
    pub store: Option<PathBuf>,

    /// Set a label's text, as id=text (repeatable)
    #[arg(long = "set", value_name = "ID=TEXT")]
    pub set: Vec<String>,

    /// Reset every label to its default text before applying --set
    #[arg(long = "reset")]
    pub reset: bool,

    /// Print the current label text as JSON
    #[arg(long = "printLabels")]
    pub print_labels: bool,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, layout, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Write the computed geometry as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,

    /// Width. Defaults to the config's render width (1200).
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height. Defaults to the config's render height (800).
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    apply_size(&mut config, &args);

    let mut overlay = load_overlay(args.labels.as_deref())?;
    if let Some(image) = args.image.clone() {
        overlay.image = Some(image);
    }

    let storage: Box<dyn Storage> = match args.store.as_deref() {
        Some(dir) => Box::new(FileStorage::new(dir)),
        None => Box::new(MemoryStorage::new()),
    };
    let viewport = Viewport::new(config.render.width, config.render.height);
    let mut session = OverlaySession::new(overlay, storage, config.clone(), viewport);

    let image = load_image(&mut session);

    if args.reset {
        session.request_reset(|_| true);
    }
    for edit in &args.set {
        let (id, text) = parse_edit(edit)?;
        session.on_text_input(id, text)?;
    }
    if args.reset || !args.set.is_empty() {
        session.relayout();
    }

    for notification in session.notifications() {
        info!(message = %notification.message, "notification");
    }

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, session.layout())?;
    }

    if args.print_labels {
        println!("{}", serde_json::to_string_pretty(&session.store().snapshot())?);
        if args.output.is_none() {
            return Ok(());
        }
    }

    match args.output_format {
        OutputFormat::Svg => {
            let svg = session.render_svg(image.as_ref());
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_NAME));
            export_png(&mut session, image.as_ref(), &output, &config)?;
        }
    }

    Ok(())
}

fn apply_size(config: &mut Config, args: &Args) {
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
}

fn load_image<S: Storage>(session: &mut OverlaySession<S>) -> Option<EmbeddedImage> {
    let path = session.overlay().image.clone()?;
    match EmbeddedImage::load(&path) {
        Ok(image) => {
            session.on_image_loaded();
            Some(image)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "image not loaded");
            session.on_image_failed();
            None
        }
    }
}

#[cfg(feature = "png")]
fn export_png<S: Storage>(
    session: &mut OverlaySession<S>,
    image: Option<&EmbeddedImage>,
    output: &Path,
    config: &Config,
) -> Result<()> {
    let mut exporter = crate::render::PngExporter {
        render: config.render.clone(),
        theme: config.theme.clone(),
    };
    let png = session
        .export(&mut exporter, image)
        .ok_or_else(|| anyhow::anyhow!(crate::app::EXPORT_FAILED))?;
    std::fs::write(output, png)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
fn export_png<S: Storage>(
    _session: &mut OverlaySession<S>,
    _image: Option<&EmbeddedImage>,
    _output: &Path,
    _config: &Config,
) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn parse_edit(edit: &str) -> Result<(&str, &str)> {
    let (id, text) = edit
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected ID=TEXT, got `{edit}`"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(anyhow::anyhow!("Missing label id in `{edit}`"));
    }
    Ok((id, text))
}
