use clap::{Parser, Subcommand};
use form_auto::detect::{is_file_like, select_encoding};
use form_auto::flatten::{flatten, resolve, ResolvedField};
use form_auto::value::json::record_from_json_with_files;
use form_auto::{encode, FormError, FormOptions, InputRecord};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "form-auto", about = "Encode a JSON record as a form request body")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the encoded body and its headers
    Encode {
        /// JSON record, or `-` for stdin.  String values `@path` attach files.
        input: PathBuf,
        /// Body destination (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Headers destination as JSON (default: stderr)
        #[arg(long)]
        headers_out: Option<PathBuf>,
        /// JSON options object: {payload, headers, forceMultiPart}
        #[arg(long)]
        options: Option<PathBuf>,
        /// Output key for the body
        #[arg(long)]
        payload_key: Option<String>,
        /// Output key for the headers
        #[arg(long)]
        headers_key: Option<String>,
        /// Use multipart even without file fields
        #[arg(short = 'm', long)]
        force_multipart: bool,
    },
    /// Show the flattened fields and the encoding that would be chosen
    Inspect {
        input: PathBuf,
        #[arg(short = 'm', long)]
        force_multipart: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {

        // ── Encode ───────────────────────────────────────────────────────────
        Commands::Encode {
            input, output, headers_out, options, payload_key, headers_key, force_multipart,
        } => {
            let mut opts = match options {
                Some(path) => FormOptions::from_json(serde_json::from_reader(File::open(path)?)?)?,
                None       => FormOptions::default(),
            };
            if let Some(key) = payload_key { opts.payload = key; }
            if let Some(key) = headers_key { opts.headers = key; }
            opts.force_multipart |= force_multipart;

            let record = load_record(&input)?;
            let out    = encode(record, &opts)?;
            let mut named = out.into_named(&opts)?;

            let mut slot = serde_json::Map::new();
            slot.insert(opts.headers.clone(), serde_json::to_value(named.headers(&opts.headers))?);
            let headers = serde_json::to_string_pretty(&slot)?;
            match headers_out {
                Some(path) => std::fs::write(path, headers + "\n")?,
                None       => eprintln!("{headers}"),
            }

            if let Some(mut body) = named.take_payload(&opts.payload) {
                let written = match output {
                    Some(path) => io::copy(&mut body, &mut File::create(path)?)?,
                    None       => {
                        let stdout = io::stdout();
                        let mut lock = stdout.lock();
                        let n = io::copy(&mut body, &mut lock)?;
                        lock.flush()?;
                        n
                    }
                };
                log::debug!("wrote {written} body bytes");
            }
        }

        // ── Inspect ──────────────────────────────────────────────────────────
        Commands::Inspect { input, force_multipart } => {
            let record = load_record(&input)?;
            let fields: Vec<ResolvedField> = flatten(record).into_iter().map(resolve).collect();
            println!("{:<20} {:<8} {:<6} Filename", "Field", "Kind", "File");
            for field in &fields {
                let filename = field
                    .options
                    .as_ref()
                    .and_then(|o| o.filename.as_deref())
                    .unwrap_or("-");
                println!("{:<20} {:<8} {:<6} {}",
                    field.name, field.value.kind(), is_file_like(&field.value), filename);
            }
            let encoding = select_encoding(fields.iter().map(|f| &f.value), force_multipart);
            println!("Encoding: {} ({} field(s))", encoding.media_type(), fields.len());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn load_record(input: &Path) -> Result<InputRecord, FormError> {
    let (text, base_dir) = if input == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        (text, std::env::current_dir()?)
    } else {
        let base = input.parent().map(Path::to_path_buf).unwrap_or_default();
        (std::fs::read_to_string(input)?, base)
    };
    if text.trim().is_empty() {
        return Err(FormError::InvalidInput("nothing"));
    }
    let json = serde_json::from_str(&text)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    record_from_json_with_files(json, &base_dir)
}
