//! tap-process - insert settling dwells into a linear-move program.
//!
//! Reads one program from disk, writes the processed copy next to it (or to
//! `--output`) and prints the run statistics.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use tap_core::{
    process, output_filename, Annotation, Material, ProcessOptions, Processed, ScaleRequest, Template,
};

/// Command-line arguments for tap-process
#[derive(Parser, Debug)]
#[command(name = "tap-process")]
#[command(version, about = "Insert distance-based dwells into a G-code program", long_about = None)]
pub struct Args {
    /// Program to process
    pub input: PathBuf,

    /// Output path (default: sanitised, dated name next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Built-in material preset
    #[arg(short, long, default_value = "T1")]
    pub material: String,

    /// TOML file describing a custom material; overrides --material
    #[arg(long)]
    pub material_file: Option<PathBuf>,

    /// Fail on unreadable X/Y numbers instead of holding the axis
    #[arg(long)]
    pub strict: bool,

    /// Scale the drawing: CURRENT:DESIRED length, e.g. 200:300
    #[arg(long, value_parser = parse_scale)]
    pub scale: Option<ScaleRequest>,

    /// Keep rapids, existing dwells and feed words
    #[arg(long)]
    pub no_clean: bool,

    /// Emit only the rewritten program, without header and footer
    #[arg(long)]
    pub raw: bool,

    /// TOML file with `header` and/or `footer` text using {PLACEHOLDER} slots
    #[arg(long, conflicts_with = "raw")]
    pub template: Option<PathBuf>,
}

fn parse_scale(s: &str) -> std::result::Result<ScaleRequest, String> {
    let (cur, want) = s
        .split_once(':')
        .ok_or_else(|| format!("expected CURRENT:DESIRED, got {s:?}"))?;
    let req = ScaleRequest {
        current_length: cur.trim().parse().map_err(|e| format!("current length: {e}"))?,
        desired_length: want.trim().parse().map_err(|e| format!("desired length: {e}"))?,
    };
    req.factor().map_err(|e| e.to_string())?;
    Ok(req)
}

fn load_material(args: &Args) -> Result<Material> {
    let material = match &args.material_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading material file {}", path.display()))?;
            toml::from_str::<Material>(&text)
                .with_context(|| format!("parsing material file {}", path.display()))?
        }
        None => Material::preset(&args.material)?,
    };
    material.validate()?;
    Ok(material)
}

fn load_template(path: &Path) -> Result<Template> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading template file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing template file {}", path.display()))
}

fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let today = chrono::Local::now().date_naive();
    input.with_file_name(output_filename(&name, today))
}

/// Writes through a temp file in the destination directory so a failed run
/// never leaves a half-written program behind.
fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn print_summary(p: &Processed, material: &Material, output: &Path) {
    let s = &p.stats;
    println!("Output: {}", output.display());
    println!("Material: {} ({} mm/min)", material.name, material.feed_rate);
    println!("Moves: {}", s.moves);
    println!("Total distance: {:.1} mm", s.total_distance);
    println!(
        "Pauses: short {}, medium {}, long {} ({} total)",
        s.counts.short,
        s.counts.medium,
        s.counts.long,
        s.counts.total()
    );
    println!("Estimated pause time: {:.1} s", s.estimated_time);
    println!("Estimated cutting time: {:.1} min", s.cutting_minutes(material.feed_rate));
    if p.removed.total() > 0 {
        println!(
            "Removed: {} rapid, {} dwell, {} old annotation",
            p.removed.rapid, p.removed.dwell, p.removed.annotation
        );
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let material = load_material(&args)?;
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let project = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let template = args.template.as_deref().map(load_template).transpose()?;
    let opts = ProcessOptions {
        strict: args.strict,
        clean: !args.no_clean,
        scale: args.scale,
        annotation: (!args.raw).then(|| Annotation {
            project,
            date: chrono::Local::now().format("%d/%m/%Y %H:%M:%S").to_string(),
            scale: None,
            template,
        }),
    };

    let processed = process(&content, &material, &opts)?;
    if processed.already_processed {
        warn!("{} is already processed; nothing to do", args.input.display());
        return Ok(());
    }
    for d in &processed.diagnostics {
        warn!("line {}: unreadable {} value {:?}, axis held", d.line, d.axis, d.token);
    }

    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input));
    if output == args.input {
        bail!("refusing to overwrite the input file {}", output.display());
    }
    write_atomically(&output, &processed.content())?;
    info!("wrote {} lines to {}", processed.lines.len(), output.display());

    print_summary(&processed, &material, &output);
    Ok(())
}
