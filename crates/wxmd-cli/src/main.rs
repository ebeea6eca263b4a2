use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use wxmd::{extract_article, ImageProxy, TranscodeOptions, Transcoder};

#[derive(Parser)]
#[command(name = "wxmd")]
#[command(about = "Convert WeChat article HTML to Markdown")]
#[command(version)]
struct Cli {
    /// HTML file to convert; reads stdin when absent or `-`
    input: Option<PathBuf>,

    /// Write Markdown here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Treat the input as a full article page and convert only its body
    #[arg(long)]
    page: bool,

    /// Image proxy endpoint; the encoded image URL is appended to it
    #[arg(long, value_name = "URL", conflicts_with = "no_proxy")]
    proxy_endpoint: Option<String>,

    /// Keep image URLs unchanged
    #[arg(long)]
    no_proxy: bool,

    /// Alt text for images without one
    #[arg(long, value_name = "TEXT", default_value = "image")]
    default_alt: String,

    /// Deepest element nesting accepted before falling back to plain text
    #[arg(long, value_name = "N", default_value_t = 512)]
    max_depth: usize,

    /// Log pipeline details to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn transcode_options(&self) -> TranscodeOptions {
        let image_proxy = if self.no_proxy {
            ImageProxy::Off
        } else if let Some(endpoint) = &self.proxy_endpoint {
            ImageProxy::endpoint(endpoint.clone())
        } else {
            ImageProxy::default()
        };

        TranscodeOptions {
            image_proxy,
            default_image_alt: self.default_alt.clone(),
            max_depth: self.max_depth,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let html = read_input(cli.input.as_ref())?;

    let html = if cli.page {
        let article = extract_article(&html);
        info!(title = %article.title, "extracted article body");
        article.content
    } else {
        html
    };

    let transcoder = Transcoder::with_options(cli.transcode_options());
    let markdown = transcoder.convert(&html);
    debug!(bytes = markdown.len(), "conversion finished");

    write_output(cli.output.as_ref(), &markdown)
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut html = String::new();
            io::stdin()
                .read_to_string(&mut html)
                .context("failed to read stdin")?;
            Ok(html)
        }
    }
}

fn write_output(path: Option<&PathBuf>, markdown: &str) -> Result<()> {
    let mut text = markdown.to_string();
    text.push('\n');

    match path {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("failed to write stdout")?;
            stdout.flush().context("failed to flush stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_options() {
        let cli = Cli::parse_from(["wxmd"]);
        let options = cli.transcode_options();
        assert!(matches!(
            options.image_proxy,
            ImageProxy::Endpoint(ref base) if base == wxmd::DEFAULT_PROXY_ENDPOINT
        ));
        assert_eq!(options.default_image_alt, "image");
        assert_eq!(options.max_depth, 512);
    }

    #[test]
    fn test_proxy_flags() {
        let cli = Cli::parse_from(["wxmd", "--no-proxy", "in.html"]);
        assert!(matches!(cli.transcode_options().image_proxy, ImageProxy::Off));

        let cli = Cli::parse_from(["wxmd", "--proxy-endpoint", "https://p.test/?u="]);
        assert!(matches!(
            cli.transcode_options().image_proxy,
            ImageProxy::Endpoint(ref base) if base == "https://p.test/?u="
        ));

        assert!(Cli::try_parse_from(["wxmd", "--no-proxy", "--proxy-endpoint", "x"]).is_err());
    }
}
