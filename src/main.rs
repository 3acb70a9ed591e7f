use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use booklet::{Config, ConversionJob, Length, Orientation, PaperFormat};
use clap::Parser;

#[derive(Parser)]
#[command(name = "booklet", version)]
#[command(about = "Convert a Markdown booklet to PDF")]
struct Cli {
    /// Input Markdown file [default: booklet.md]
    input: Option<PathBuf>,

    /// Output PDF file (defaults to input name with .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// CSS stylesheet applied while rendering [default: css/style.css]
    #[arg(long, value_name = "PATH", conflicts_with = "no_css")]
    css: Option<PathBuf>,

    /// Render without a stylesheet
    #[arg(long)]
    no_css: bool,

    /// Page margin, e.g. 1in, 2cm, 15mm [default: 1in]
    #[arg(long, value_name = "LENGTH")]
    border: Option<Length>,

    /// Milliseconds to wait before capturing the document [default: 2000]
    #[arg(long, value_name = "MS")]
    delay: Option<u64>,

    /// Paper size: A3, A4, A5, Legal, Letter or Tabloid [default: A4]
    #[arg(long, value_name = "FORMAT")]
    paper: Option<PaperFormat>,

    /// Lay pages out in landscape
    #[arg(long)]
    landscape: bool,

    /// TOML config file [default: booklet.toml, if present]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Command line flags override the config file.
    fn into_job(self, mut config: Config) -> ConversionJob {
        let options = &mut config.options;
        if let Some(css) = self.css {
            options.stylesheet = Some(css);
        }
        if self.no_css {
            options.stylesheet = None;
        }
        if let Some(border) = self.border {
            options.page_border = border;
        }
        if let Some(delay) = self.delay {
            options.render_delay = Duration::from_millis(delay);
        }
        if let Some(paper) = self.paper {
            options.paper_format = paper;
        }
        if self.landscape {
            options.orientation = Orientation::Landscape;
        }

        match (self.input, self.output) {
            (Some(input), output) => {
                config.job.destination = output.unwrap_or_else(|| input.with_extension("pdf"));
                config.job.source = input;
            }
            (None, Some(output)) => config.job.destination = output,
            (None, None) => {}
        }

        ConversionJob::from_config(&config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::discover(cli.config.as_deref()).context("Failed to load configuration")?;
    let job = cli.into_job(config);

    let pending = job.submit(|outcome| {
        if outcome.is_ok() {
            println!("Done");
        }
    });
    pending.wait().context("Conversion failed")?;

    Ok(())
}
