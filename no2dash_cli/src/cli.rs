use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use no2dash::{
    config::Config,
    formatters::{
        CSVFormatter, GeoJSONFormatter, GeoJSONSeqFormatter, OutputFormatter, OutputGenerator,
    },
    views::{ViewOutcome, View},
    Dashboard, DashboardCache,
};
use polars::frame::DataFrame;
use regex::Regex;
use serde::{Deserialize, Serialize};
use spinners::{Spinner, Spinners};
use strum::IntoEnumIterator;
use strum_macros::EnumString;

use crate::display::{bar_table, countries_table, legend_table, summary_table, trend_table};
use crate::error::No2CliResult;

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";
const LOADING_STRING: &str = "Loading NO₂ measurements and country boundaries";

/// Defines the output formats we are able to produce map data in.
#[derive(Clone, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    GeoJSON,
    GeoJSONSeq,
    Csv,
}

impl From<&OutputFormat> for OutputFormatter {
    fn from(value: &OutputFormat) -> Self {
        match value {
            OutputFormat::GeoJSON => OutputFormatter::GeoJSON(GeoJSONFormatter::default()),
            OutputFormat::GeoJSONSeq => OutputFormatter::GeoJSONSeq(GeoJSONSeqFormatter),
            OutputFormat::Csv => OutputFormatter::Csv(CSVFormatter),
        }
    }
}

impl From<OutputFormat> for OutputFormatter {
    fn from(value: OutputFormat) -> Self {
        Self::from(&value)
    }
}

fn write_output<T, U>(
    output_generator: T,
    mut data: DataFrame,
    output_file: Option<U>,
) -> No2CliResult<()>
where
    T: OutputGenerator,
    U: AsRef<Path>,
{
    if let Some(output_file) = output_file {
        let mut f = File::create(output_file).context("Failed to write output")?;
        output_generator.save(&mut f, &mut data)?;
    } else {
        let mut stdout_lock = std::io::stdout().lock();
        output_generator.save(&mut stdout_lock, &mut data)?;
    };
    Ok(())
}

/// Writes rendered text to a file, or to stdout when no file is given.
fn write_text<U: AsRef<Path>>(text: &str, output_file: Option<U>) -> No2CliResult<()> {
    if let Some(output_file) = output_file {
        let mut f = File::create(output_file).context("Failed to write output")?;
        writeln!(f, "{text}")?;
    } else {
        println!("{text}");
    }
    Ok(())
}

/// Loads the dashboard, showing a spinner unless `quiet` is set.
fn load_dashboard(config: Config, quiet: bool) -> No2CliResult<Dashboard> {
    let sp = (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            LOADING_STRING.to_string() + RUNNING_TAIL_STRING,
        )
    });
    let dashboard = Dashboard::new_with_config(config);
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
    Ok(dashboard?)
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    fn run(&self, config: Config) -> No2CliResult<()>;
}

/// Options shared by the commands that print a chart or table.
#[derive(Args, Debug, Clone, Default)]
pub struct ChartOutputArgs {
    #[arg(long, help = "Print the chart data as JSON instead of a table")]
    json: bool,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<String>,
}

impl ChartOutputArgs {
    fn emit<T: Serialize>(&self, data: &T, table: impl FnOnce(&T) -> String) -> No2CliResult<()> {
        let text = if self.json {
            serde_json::to_string_pretty(data)?
        } else {
            table(data)
        };
        write_text(&text, self.output_file.as_deref())
    }
}

/// The `intro` command prints the project overview.
#[derive(Args, Debug)]
pub struct IntroCommand {
    #[command(flatten)]
    output: ChartOutputArgs,
}

impl RunCommand for IntroCommand {
    fn run(&self, _config: Config) -> No2CliResult<()> {
        info!("Running `intro` subcommand");
        self.output
            .emit(&no2dash::views::intro::Introduction::default(), |intro| {
                intro.to_string()
            })
    }
}

/// The `map` command writes the classified countries with their style and geometry.
#[derive(Args, Debug)]
pub struct MapCommand {
    #[arg(
        short = 'f',
        long,
        value_name = "geojson|geojsonseq|csv",
        default_value = "geojson",
        help = "Output format for the results"
    )]
    output_format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for MapCommand {
    fn run(&self, config: Config) -> No2CliResult<()> {
        info!("Running `map` subcommand");
        let dashboard = load_dashboard(config, self.quiet)?;
        let map = dashboard.change_map()?;
        debug!("{:#?}", map.features());
        let formatter = match self.output_format {
            OutputFormat::GeoJSON => OutputFormatter::GeoJSON(map.geojson_formatter()?),
            ref other => other.into(),
        };
        write_output(formatter, map.features().clone(), self.output_file.as_deref())?;
        if self.output_file.is_some() && !self.quiet {
            println!("\n{}", map.title());
            println!("{}", legend_table(&map.legend));
        }
        Ok(())
    }
}

/// The `trend` command shows the four yearly means of one country.
#[derive(Args, Debug)]
pub struct TrendCommand {
    #[arg(index = 1, help = "Country name as it appears in the dashboard")]
    country: String,
    #[command(flatten)]
    output: ChartOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for TrendCommand {
    fn run(&self, config: Config) -> No2CliResult<()> {
        info!("Running `trend` subcommand");
        let dashboard = load_dashboard(config, self.quiet)?;
        let chart = dashboard.single_country_trend(&self.country)?;
        self.output.emit(&chart, |chart| {
            format!("{}\n{}", chart.title, trend_table(chart))
        })
    }
}

/// The `compare` command shows the trends of several countries side by side.
#[derive(Args, Debug)]
pub struct CompareCommand {
    #[arg(
        short = 'c',
        long = "country",
        help = "Country to compare, may be repeated. Defaults to the configured comparison"
    )]
    countries: Vec<String>,
    #[arg(
        long,
        help = "Start from an empty selection instead of the configured comparison"
    )]
    no_defaults: bool,
    #[command(flatten)]
    output: ChartOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for CompareCommand {
    fn run(&self, config: Config) -> No2CliResult<()> {
        info!("Running `compare` subcommand");
        let dashboard = load_dashboard(config, self.quiet)?;
        let selection = if self.countries.is_empty() && !self.no_defaults {
            dashboard.default_comparison()?
        } else {
            self.countries.clone()
        };
        debug!("selection: {selection:?}");
        let outcome = dashboard.compare_trends(&selection)?;
        self.output.emit(&outcome, |outcome| match outcome {
            ViewOutcome::Ready(chart) => format!("{}\n{}", chart.title, trend_table(chart)),
            ViewOutcome::Notice(notice) => notice.message.clone(),
        })
    }
}

/// The `bar` command shows the yearly means of one country as bars.
#[derive(Args, Debug)]
pub struct BarCommand {
    #[arg(index = 1, help = "Country name as it appears in the dashboard")]
    country: String,
    #[command(flatten)]
    output: ChartOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for BarCommand {
    fn run(&self, config: Config) -> No2CliResult<()> {
        info!("Running `bar` subcommand");
        let dashboard = load_dashboard(config, self.quiet)?;
        let chart = dashboard.bar_chart(&self.country)?;
        self.output.emit(&chart, |chart| {
            format!("{}\n{}", chart.title, bar_table(chart))
        })
    }
}

/// The `countries` command lists the countries that can be selected in the charts.
#[derive(Args, Debug)]
pub struct CountriesCommand {
    #[arg(index = 1, help = "Only list countries matching this regular expression")]
    filter: Option<String>,
    #[command(flatten)]
    output: ChartOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for CountriesCommand {
    fn run(&self, config: Config) -> No2CliResult<()> {
        info!("Running `countries` subcommand");
        let filter = self.filter.as_deref().map(Regex::new).transpose()?;
        let dashboard = load_dashboard(config, self.quiet)?;
        let countries: Vec<String> = dashboard
            .country_options()?
            .into_iter()
            .filter(|name| filter.as_ref().map_or(true, |re| re.is_match(name)))
            .collect();
        self.output
            .emit(&countries, |countries| countries_table(countries).to_string())
    }
}

/// The `summary` command reports category counts and the countries the join dropped.
#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    output: ChartOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for SummaryCommand {
    fn run(&self, config: Config) -> No2CliResult<()> {
        info!("Running `summary` subcommand");
        let dashboard = load_dashboard(config, self.quiet)?;
        let summary = dashboard.summary()?;
        self.output
            .emit(&summary, |summary| summary_table(summary).to_string())
    }
}

/// The `explore` command starts an interactive session over the four views.
#[derive(Args, Debug)]
pub struct ExploreCommand;

impl RunCommand for ExploreCommand {
    fn run(&self, config: Config) -> No2CliResult<()> {
        info!("Running `explore` subcommand");
        let mut session = Session::new(DashboardCache::new(config));
        session.run(io::stdin().lock(), io::stdout().lock())
    }
}

const EXPLORE_HELP: &str = "\
Commands:
  views                 list the views
  view <name>           switch view (intro, map, line, bar)
  trend <country>       choose the country of the single trend
  select [a, b, ...]    set the comparison countries, empty to clear
  bar <country>         choose the country of the bar chart
  countries             list the countries
  summary               show category counts and dropped countries
  reload                reload the source files
  help                  show this message
  quit                  leave the session";

/// State of an interactive session: the active view and the user's selections. The dashboard
/// itself is read through the cache on every command.
pub struct Session {
    cache: DashboardCache,
    view: View,
    trend_country: Option<String>,
    selection: Option<Vec<String>>,
    bar_country: Option<String>,
}

impl Session {
    pub fn new(cache: DashboardCache) -> Self {
        Self {
            cache,
            view: View::Introduction,
            trend_country: None,
            selection: None,
            bar_country: None,
        }
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> No2CliResult<()> {
        writeln!(output, "{EXPLORE_HELP}")?;
        self.render(&mut output)?;
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (command, argument) = line
                .split_once(char::is_whitespace)
                .map(|(command, argument)| (command, argument.trim()))
                .unwrap_or((line, ""));
            match command {
                "quit" | "exit" | "q" => break,
                _ => {
                    // A failed command does not end the session
                    if let Err(err) = self.handle(command, argument, &mut output) {
                        writeln!(output, "Error: {err}")?;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle<W: Write>(&mut self, command: &str, argument: &str, output: &mut W) -> No2CliResult<()> {
        match command {
            "help" => writeln!(output, "{EXPLORE_HELP}")?,
            "views" => {
                for view in View::iter() {
                    let marker = if view == self.view { "*" } else { " " };
                    writeln!(output, "{marker} {view}")?;
                }
            }
            "view" => {
                self.view = View::from_str(argument)
                    .with_context(|| format!("Unknown view `{argument}`"))?;
                self.render(output)?;
            }
            "trend" => {
                self.trend_country = Some(argument.to_string());
                self.view = View::LineChart;
                self.render(output)?;
            }
            "select" => {
                self.selection = Some(
                    argument
                        .split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(String::from)
                        .collect(),
                );
                self.view = View::LineChart;
                self.render(output)?;
            }
            "bar" => {
                self.bar_country = Some(argument.to_string());
                self.view = View::BarChart;
                self.render(output)?;
            }
            "countries" => {
                let dashboard = self.cache.get()?;
                writeln!(output, "{}", countries_table(&dashboard.country_options()?))?;
            }
            "summary" => {
                let dashboard = self.cache.get()?;
                writeln!(output, "{}", summary_table(&dashboard.summary()?))?;
            }
            "reload" => {
                self.cache.invalidate();
                self.cache.get()?;
                writeln!(output, "Reloaded")?;
            }
            other => writeln!(output, "Unknown command `{other}`, try `help`")?,
        }
        Ok(())
    }

    /// Writes the active view.
    fn render<W: Write>(&mut self, output: &mut W) -> No2CliResult<()> {
        writeln!(output, "\n== {} ==", self.view)?;
        let dashboard = self.cache.get()?;
        match self.view {
            View::Introduction => writeln!(output, "{}", dashboard.introduction())?,
            View::ChangeMap => {
                let map = dashboard.change_map()?;
                writeln!(output, "{}", map.title())?;
                writeln!(output, "{}", legend_table(&map.legend))?;
                writeln!(
                    output,
                    "{} countries on the map, write them with `no2dash map`",
                    map.features().height()
                )?;
            }
            View::LineChart => {
                // Single trend above the comparison, first country by default
                let country = match &self.trend_country {
                    Some(country) => Some(country.clone()),
                    None => dashboard.country_options()?.into_iter().next(),
                };
                if let Some(country) = country {
                    let chart = dashboard.single_country_trend(&country)?;
                    writeln!(output, "{}\n{}", chart.title, trend_table(&chart))?;
                }
                let selection = match &self.selection {
                    Some(selection) => selection.clone(),
                    None => dashboard.default_comparison()?,
                };
                match dashboard.compare_trends(&selection)? {
                    ViewOutcome::Ready(chart) => {
                        writeln!(output, "{}\n{}", chart.title, trend_table(&chart))?
                    }
                    ViewOutcome::Notice(notice) => writeln!(output, "{}", notice.message)?,
                }
            }
            View::BarChart => {
                let country = match &self.bar_country {
                    Some(country) => Some(country.clone()),
                    None => dashboard.bar_options()?.into_iter().next(),
                };
                if let Some(country) = country {
                    let chart = dashboard.bar_chart(&country)?;
                    writeln!(output, "{}\n{}", chart.title, bar_table(&chart))?;
                }
            }
        }
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="no2dash explores NO₂ change across African countries", long_about = None, name="no2dash")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress bar to stdout. Prompt, results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
    #[arg(long, global = true, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Measurements CSV, overrides the config file")]
    measurements: Option<PathBuf>,
    #[arg(long, global = true, help = "Country boundaries GeoJSON, overrides the config file")]
    geometries: Option<PathBuf>,
}

impl Cli {
    /// Applies the path flags on top of `config`.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(measurements) = &self.measurements {
            config.measurements_path = measurements.clone();
        }
        if let Some(geometries) = &self.geometries {
            config.geometries_path = geometries.clone();
        }
        config
    }
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implmement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Show the project overview
    Intro(IntroCommand),
    /// Output the NO₂ change map for every joined country
    Map(MapCommand),
    /// Show the NO₂ trend of one country
    Trend(TrendCommand),
    /// Compare the NO₂ trends of several countries
    Compare(CompareCommand),
    /// Show the yearly NO₂ means of one country as a bar chart
    Bar(BarCommand),
    /// List countries for which measurements are available
    Countries(CountriesCommand),
    /// Count countries per change category and list those dropped by the join
    Summary(SummaryCommand),
    /// Explore the views interactively
    Explore(ExploreCommand),
}
