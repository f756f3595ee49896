// ============================================================================
// Visionary CLI - headless compositing and liquify via command-line arguments
// ============================================================================
//
// Usage examples:
//   visionary compose --session edit.toml --output result.png
//   visionary compose --session edit.toml --output-dir out/       (writes composition.png)
//   visionary liquify -i face.jpg --stroke "100,100;140,100" --radius 60 -o warped.png
//   visionary --lang fr --verbose liquify -i face.jpg --stroke "10,10;20,30"
//   visionary liquify -i face.jpg --stroke "10,10;20,30" --ask      (prompts for the path)

use std::cell::RefCell;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use crate::error::{EditorError, Result};
use crate::i18n::{Catalog, Locale};
use crate::io::{self, COMPOSITION_FILENAME, LIQUIFY_FILENAME, SaveDialog};
use crate::ops::liquify::{DEFAULT_RADIUS, DEFAULT_STRENGTH, WarpCanvas};
use crate::session::{Event, Session};
use crate::tr;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Visionary headless raster editor.
#[derive(Parser, Debug)]
#[command(
    name = "visionary",
    about = "Visionary headless layer compositor and liquify brush",
    long_about = "Replay a TOML editing session against the two-layer compositor, or\n\
                  push pixels around with the liquify brush, and export PNG.\n\n\
                  Example:\n  \
                  visionary compose --session edit.toml --output result.png\n  \
                  visionary liquify -i face.jpg --stroke \"100,100;140,100\" -o warped.png"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Language for status messages: en, es, fr.
    #[arg(long, global = true, default_value = "en", value_name = "CODE")]
    pub lang: String,

    /// Write the session log here instead of the per-user data directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Echo log lines to stderr and print timing.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a composition from a session script and export it.
    Compose {
        /// TOML session script.
        #[arg(short, long, value_name = "SESSION.toml")]
        session: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Apply liquify strokes to an image and export it.
    Liquify {
        /// Source image.
        #[arg(short, long, value_name = "IMAGE")]
        input: PathBuf,

        /// A stroke as `x,y;x,y;...` in working-canvas pixels.  Repeatable.
        #[arg(long = "stroke", value_name = "POINTS", value_parser = parse_stroke)]
        strokes: Vec<Stroke>,

        /// Brush radius (10-200).
        #[arg(short, long, default_value_t = DEFAULT_RADIUS)]
        radius: f32,

        /// Brush strength (0.1-1.0).
        #[arg(short = 'k', long, default_value_t = DEFAULT_STRENGTH)]
        strength: f32,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output file path.
    #[arg(short, long, value_name = "FILE", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory to write the default file name into (current directory when
    /// neither this nor --output is given).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Ask for the file name on stdin; a blank answer cancels the export.
    #[arg(long, conflicts_with = "output")]
    pub ask: bool,
}

/// Pointer samples of one liquify drag.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke(pub Vec<(f32, f32)>);

/// `"10,20;30,40"` → `[(10, 20), (30, 40)]`.
pub fn parse_stroke(s: &str) -> std::result::Result<Stroke, String> {
    s.split(';')
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let (x, y) = p
                .split_once(',')
                .ok_or_else(|| format!("point '{}' is not x,y", p.trim()))?;
            let x = x
                .trim()
                .parse::<f32>()
                .map_err(|e| format!("bad x in '{}': {}", p.trim(), e))?;
            let y = y
                .trim()
                .parse::<f32>()
                .map_err(|e| format!("bad y in '{}': {}", p.trim(), e))?;
            Ok((x, y))
        })
        .collect::<std::result::Result<Vec<_>, String>>()
        .map(Stroke)
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one subcommand and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let locale = Locale::from_code(&args.lang).unwrap_or_else(|| {
        let known: Vec<String> = Locale::all()
            .iter()
            .map(|l| format!("{} ({})", l.code(), l.native_name()))
            .collect();
        eprintln!(
            "warning: unknown language '{}', using English; available: {}",
            args.lang,
            known.join(", ")
        );
        Locale::En
    });
    let catalog = Catalog::new(locale);

    match &args.log_file {
        Some(path) => crate::logger::init_at(path),
        None => crate::logger::init(),
    }
    crate::logger::set_echo_stderr(args.verbose);
    crate::log_info!("cli: status messages in {}", catalog.locale().native_name());

    let start = Instant::now();
    let result = match &args.command {
        Command::Compose { session, output } => run_compose(session, output, &catalog),
        Command::Liquify { input, strokes, radius, strength, output } => {
            run_liquify(input, strokes, *radius, *strength, output, &catalog)
        }
    };

    let code = match result {
        Ok(Some(path)) => {
            println!("{}", tr!(catalog, "status.exported", path = path.display()));
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("{}", tr!(catalog, "status.export_cancelled"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            crate::log_err!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    };
    if args.verbose {
        println!("  ({:.0}ms)", start.elapsed().as_secs_f64() * 1000.0);
        if let Some(path) = crate::logger::log_path() {
            println!("  log: {}", path.display());
        }
    }
    code
}

// ============================================================================
// Subcommands
// ============================================================================

pub fn run_compose(
    session_path: &Path,
    output: &OutputArgs,
    catalog: &Catalog,
) -> Result<Option<PathBuf>> {
    let session = Session::load(session_path)?;
    let base_dir = session_path.parent().unwrap_or_else(|| Path::new("."));
    let replay = session.run(base_dir)?;
    for event in &replay.events {
        match event {
            Event::Step { .. } | Event::Loaded { .. } => println!("{}", event.describe(catalog)),
            _ => println!("  {}", event.describe(catalog)),
        }
    }
    let bytes = replay.canvas.export_png()?;
    write_output(&bytes, output, COMPOSITION_FILENAME, catalog)
}

pub fn run_liquify(
    input: &Path,
    strokes: &[Stroke],
    radius: f32,
    strength: f32,
    output: &OutputArgs,
    catalog: &Catalog,
) -> Result<Option<PathBuf>> {
    let (image, _) = io::load_image_file(input)?;
    let mut warp = WarpCanvas::new(image);
    warp.set_radius(radius);
    warp.set_strength(strength);

    for (i, stroke) in strokes.iter().enumerate() {
        let Some((first, rest)) = stroke.0.split_first() else {
            return Err(EditorError::InvalidArgument(format!("stroke {} has no points", i + 1)));
        };
        warp.begin_stroke(*first);
        let changed = rest.iter().filter(|p| warp.stroke_to(**p)).count();
        warp.end_stroke();
        crate::log_info!("liquify: stroke {} moved {} samples", i + 1, changed);
    }

    let bytes = warp.export_png()?;
    write_output(&bytes, output, LIQUIFY_FILENAME, catalog)
}

/// Terminal stand-in for a save picker: reads one line, resolved against
/// `dir`.  A blank line or end of input cancels.
pub struct PromptDialog<'a, R> {
    catalog: &'a Catalog,
    input: RefCell<R>,
    dir: PathBuf,
}

impl<'a, R: BufRead> PromptDialog<'a, R> {
    pub fn new(catalog: &'a Catalog, input: R, dir: &Path) -> Self {
        Self {
            catalog,
            input: RefCell::new(input),
            dir: dir.to_path_buf(),
        }
    }
}

impl<R: BufRead> SaveDialog for PromptDialog<'_, R> {
    fn pick_save_path(&self, default_name: &str) -> Option<PathBuf> {
        eprint!("{} ", tr!(self.catalog, "prompt.save_as", name = default_name));
        let mut line = String::new();
        match self.input.borrow_mut().read_line(&mut line) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => {
                crate::log_warn!("save prompt: {}", e);
                return None;
            }
        }
        let answer = line.trim();
        if answer.is_empty() { None } else { Some(self.dir.join(answer)) }
    }
}

fn write_output(
    bytes: &[u8],
    output: &OutputArgs,
    default_name: &str,
    catalog: &Catalog,
) -> Result<Option<PathBuf>> {
    if let Some(dir) = &output.output_dir {
        std::fs::create_dir_all(dir)?;
    }
    match (&output.output, &output.output_dir) {
        (Some(file), _) => {
            let dir = file.parent().unwrap_or_else(|| Path::new("."));
            let name = file.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
                EditorError::InvalidArgument(format!("bad output path {}", file.display()))
            })?;
            io::save_export(bytes, None, dir, name)
        }
        (None, dir) => {
            let dir = dir.as_deref().unwrap_or_else(|| Path::new("."));
            if output.ask {
                let dialog = PromptDialog::new(catalog, std::io::stdin().lock(), dir);
                io::save_export(bytes, Some(&dialog), dir, default_name)
            } else {
                io::save_export(bytes, None, dir, default_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn strokes_parse() {
        assert_eq!(parse_stroke("1,2;3.5, 4").unwrap(), Stroke(vec![(1.0, 2.0), (3.5, 4.0)]));
        assert_eq!(parse_stroke("1,2;").unwrap(), Stroke(vec![(1.0, 2.0)]));
        assert!(parse_stroke("1;2").is_err());
        assert!(parse_stroke("a,2").is_err());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "visionary", "liquify", "-i", "in.png", "--stroke", "0,0;5,5", "--stroke", "1,1;2,2",
            "--lang", "es", "-v",
        ])
        .unwrap();
        assert_eq!(args.lang, "es");
        assert!(args.verbose);
        match args.command {
            Command::Liquify { strokes, radius, .. } => {
                assert_eq!(strokes.len(), 2);
                assert_eq!(radius, DEFAULT_RADIUS);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn output_and_output_dir_conflict() {
        let r = CliArgs::try_parse_from([
            "visionary", "compose", "-s", "a.toml", "-o", "x.png", "--output-dir", "out",
        ]);
        assert!(r.is_err());
        let r = CliArgs::try_parse_from([
            "visionary", "compose", "-s", "a.toml", "-o", "x.png", "--ask",
        ]);
        assert!(r.is_err());
    }

    #[test]
    fn prompt_answer_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(Locale::En);
        let dialog = PromptDialog::new(&catalog, Cursor::new("mine.png\n"), dir.path());
        let written =
            io::save_export(b"png", Some(&dialog), dir.path(), COMPOSITION_FILENAME).unwrap();
        assert_eq!(written, Some(dir.path().join("mine.png")));
        assert!(!dir.path().join(COMPOSITION_FILENAME).exists());
    }

    #[test]
    fn blank_prompt_cancels_the_export() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(Locale::Fr);
        for answer in ["\n", "   \n", ""] {
            let dialog = PromptDialog::new(&catalog, Cursor::new(answer), dir.path());
            let written =
                io::save_export(b"png", Some(&dialog), dir.path(), LIQUIFY_FILENAME).unwrap();
            assert_eq!(written, None);
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn compose_writes_default_name_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(30, 20, Rgba([0, 128, 255, 255]));
        std::fs::write(dir.path().join("blue.png"), io::encode_png(&img).unwrap()).unwrap();
        let session = dir.path().join("edit.toml");
        std::fs::write(&session, "[[layers]]\nslot = 1\nimage = \"blue.png\"\n").unwrap();

        let out_dir = dir.path().join("out");
        let output = OutputArgs {
            output: None,
            output_dir: Some(out_dir.clone()),
            ask: false,
        };
        let catalog = Catalog::new(Locale::En);
        let written = run_compose(&session, &output, &catalog).unwrap().unwrap();
        assert_eq!(written, out_dir.join(COMPOSITION_FILENAME));

        let result = io::decode_image(&std::fs::read(written).unwrap()).unwrap();
        assert_eq!(result.dimensions(), (800, 600));
        assert_eq!(*result.get_pixel(60, 60), Rgba([0, 128, 255, 255]));
        assert_eq!(result.get_pixel(10, 10)[3], 0);
    }

    #[test]
    fn liquify_writes_explicit_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let img = RgbaImage::from_fn(64, 64, |x, _| Rgba([(x * 4) as u8, 0, 0, 255]));
        std::fs::write(&input, io::encode_png(&img).unwrap()).unwrap();

        let target = dir.path().join("warped.png");
        let output = OutputArgs {
            output: Some(target.clone()),
            output_dir: None,
            ask: false,
        };
        let strokes = vec![Stroke(vec![(20.0, 32.0), (30.0, 32.0), (40.0, 32.0)])];
        let catalog = Catalog::new(Locale::En);
        let written = run_liquify(&input, &strokes, 20.0, 1.0, &output, &catalog).unwrap();
        assert_eq!(written, Some(target.clone()));

        let result = io::decode_image(&std::fs::read(target).unwrap()).unwrap();
        assert_eq!(result.dimensions(), (64, 64));
        assert_ne!(result, img);
    }

    #[test]
    fn empty_stroke_is_an_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        std::fs::write(&input, io::encode_png(&RgbaImage::new(4, 4)).unwrap()).unwrap();
        let output =
            OutputArgs {
                output: None,
                output_dir: Some(dir.path().to_path_buf()),
                ask: false,
            };
        let catalog = Catalog::new(Locale::Es);
        let r = run_liquify(&input, &[Stroke(vec![])], 20.0, 1.0, &output, &catalog);
        assert!(matches!(r, Err(EditorError::InvalidArgument(_))));
    }
}
