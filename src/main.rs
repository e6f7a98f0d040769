use std::path::PathBuf;
use std::process::ExitCode;

use xrender::{CompileOptions, RenderConfig, RenderContext, RenderEngine};

const USAGE: &str = "usage: xrender <template-file> [context.json] [--strict] [--raw] [--config config.json]";

struct Args {
    template: PathBuf,
    context: Option<PathBuf>,
    config: Option<PathBuf>,
    options: CompileOptions,
}

fn parse_args() -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut options = CompileOptions::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--strict" => options.strict = true,
            "--raw" => options.no_escape = true,
            "--config" => {
                config = Some(PathBuf::from(args.next().ok_or("--config needs a path")?));
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let mut positional = positional.into_iter();
    let template = positional.next().ok_or_else(|| USAGE.to_string())?;
    Ok(Args {
        template,
        context: positional.next(),
        config,
        options,
    })
}

fn run(args: Args) -> Result<String, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => RenderConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => RenderConfig::default(),
    };
    let source = std::fs::read_to_string(&args.template)?;
    let context: RenderContext = match &args.context {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => RenderContext::default(),
    };

    let engine = RenderEngine::with_config(config);
    let report = engine.validate(&source);
    for error in &report.errors {
        tracing::warn!(template = %args.template.display(), error = %error, "template did not validate");
    }
    Ok(engine.render(&source, &context, &args.options))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "render failed");
            ExitCode::FAILURE
        }
    }
}
