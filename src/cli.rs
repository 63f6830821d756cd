use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{builder::NonEmptyStringValueParser, Parser};
use log::info;

use crate::config::Config;
use crate::error::Error;
use crate::output;
use crate::request_builder::RequestBuilder;
use crate::template::{BodyParams, Template};
use crate::url_builder;

const DEFAULT_OUTPUT_PATH: &str = "./data.json";

/// Long flags that may also be written with a single dash, e.g. `-pr=2`
const SINGLE_DASH_FLAGS: &[&str] = &[
    "start", "end", "config", "output", "template", "timeout", "pr", "ps",
];

/// Fetch a report from the partner API for a date range and save it to a file
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct CLI {
    /// Start DateTime in 'YYYY-MM-DD' or 'YYYY-MM-DDTHH-MM-SS' format
    #[arg(short = 's', long = "start", value_parser = NonEmptyStringValueParser::new())]
    pub start: String,

    /// End DateTime in 'YYYY-MM-DD' or 'YYYY-MM-DDTHH-MM-SS' format
    #[arg(short = 'e', long = "end", value_parser = NonEmptyStringValueParser::new())]
    pub end: String,

    /// Configuration file path
    #[arg(short = 'c', long = "config", default_value = "./config.json")]
    pub config: PathBuf,

    /// Output file path [default: OutputFilePath from the config, or ./data.json]
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Request body template path
    #[arg(short = 't', long = "template", default_value = "./bodytemplate.json")]
    pub template: PathBuf,

    /// Page number requested from the API
    ///
    /// With 300 matching entries and a page size of 10, pages 1-30 cover the
    /// whole range (entries 1-10, 11-20, 21-30 and so on).
    #[arg(long = "pr", default_value_t = 1)]
    pub page: u32,

    /// Page size; the API serves at most 10 entries per page
    #[arg(long = "ps", default_value_t = 10)]
    pub page_size: u32,

    /// Request timeout in seconds [default: none]
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl CLI {
    /// Parses command line arguments, including the program name
    ///
    /// A missing or empty start or end date is a usage error.
    pub fn from_args<I>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = String>,
    {
        Ok(Self::try_parse_from(normalize_args(args))?)
    }

    /// Resolves where the report is saved
    ///
    /// The command line wins over the config file, which wins over the default.
    pub fn output_path(&self, config: &Config) -> PathBuf {
        match (&self.output, config.output_file_path()) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) => path.to_path_buf(),
            (None, None) => PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

pub async fn run<I>(args: I) -> Result<PathBuf, Error>
where
    I: IntoIterator<Item = String>,
{
    let cli = CLI::from_args(args)?;
    fetch(&cli).await
}

/// Loads the config, renders the body, requests the report, and saves it
///
/// Returns the path the report was written to.
pub async fn fetch(cli: &CLI) -> Result<PathBuf, Error> {
    let config = Config::load_from_path(&cli.config)
        .await
        .map_err(Error::Config)?;

    let body = render_body(&cli.template, BodyParams::new(&config, &cli.start, &cli.end))
        .await
        .map_err(Error::Template)?;
    info!("Created body content and ready to make a request");

    let url =
        url_builder::paged_url(&config.url, cli.page, cli.page_size).map_err(Error::Config)?;
    info!("URL Path {}", url);

    let response = RequestBuilder::new(url, body)
        .timeout(cli.timeout.map(Duration::from_secs))
        .send()
        .await?;

    let output_path = cli.output_path(&config);
    output::save(response, &output_path)
        .await
        .map_err(Error::Io)?;
    info!(
        "Successfully loaded and saved file to {}",
        output_path.display()
    );

    Ok(output_path)
}

async fn render_body(path: &Path, params: BodyParams<'_>) -> anyhow::Result<String> {
    Template::load(path).await?.render(&params)
}

/// Rewrites Go-style single-dash long flags (`-start`, `-pr=2`) into the
/// double-dash form clap expects
fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.strip_prefix('-') {
            Some(flag) if !flag.starts_with('-') => {
                let name = flag.split_once('=').map_or(flag, |(name, _)| name);

                if SINGLE_DASH_FLAGS.contains(&name) {
                    format!("-{}", arg)
                } else {
                    arg
                }
            }
            _ => arg,
        })
        .collect()
}
