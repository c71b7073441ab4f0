//! Load Launcher
//!
//! The driver behind the `load` binary: parse options, build the selected
//! topologies, run them as one cascade and report the statistics.

use load_common::{LoadError, Result, current_timestamp_millis};
use load_core::{
    OptionTable, Options, ParseOutcome, Platform, RunSelection, StatsPrinter, derive,
    load_platform,
};
use load_core::stats::Stats;
use std::io::{self, Write};
use tracing::{error, info, warn};

/// Name of the cascade every run submits.
pub const CASCADE_NAME: &str = "load";

/// What the binary should do after reading its arguments.
pub enum Launch {
    /// Options are valid; run the driver.
    Run(Box<Main>),
    /// Print `message` to stdout and exit with `status`.
    Exit { status: u8, message: String },
}

/// One configured run.
pub struct Main {
    options: Options,
    ignored: Vec<String>,
    platform: Box<dyn Platform>,
    full_stats_root: Option<String>,
}

impl Main {
    /// Parse, resolve the platform and derive options.
    ///
    /// User-facing problems (no options, help, bad flags, unknown platform)
    /// come back as [`Launch::Exit`]; only internal failures are errors.
    pub fn from_args<I, S>(args: I) -> Result<Launch>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = OptionTable::standard()?;
        let usage = || load_core::options::render_usage(&table);
        let options_error = |e: LoadError| Launch::Exit {
            status: 1,
            message: format!("options error: {}\n\n{}", e, usage()),
        };

        let parsed = match load_core::parse_args(&table, args) {
            Ok(ParseOutcome::Run(parsed)) => parsed,
            Ok(ParseOutcome::Help(text)) | Ok(ParseOutcome::Markdown(text)) => {
                return Ok(Launch::Exit {
                    status: 0,
                    message: text,
                });
            }
            Ok(ParseOutcome::NoOptions(text)) => {
                return Ok(Launch::Exit {
                    status: 1,
                    message: text,
                });
            }
            Err(e) if e.is_configuration() => return Ok(options_error(e)),
            Err(e) => return Err(e),
        };

        let platform = match load_platform(&parsed.options.platform_name) {
            Ok(platform) => platform,
            Err(e) if e.is_configuration() => return Ok(options_error(e)),
            Err(e) => return Err(e),
        };

        let mut options = parsed.options;
        match derive(&mut options, platform.capacity()) {
            Ok(()) => {}
            Err(e) if e.is_configuration() => return Ok(options_error(e)),
            Err(e) => return Err(e),
        }

        let mut main = Main::new(options, platform);
        main.ignored = parsed.ignored;
        Ok(Launch::Run(Box::new(main)))
    }

    /// A driver for already derived options.
    pub fn new(options: Options, platform: Box<dyn Platform>) -> Self {
        Self {
            options,
            ignored: Vec::new(),
            platform,
            full_stats_root: None,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    /// Arguments no option claimed.
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// Build and run every selected topology.
    ///
    /// Build errors are returned. A failing cascade is logged and reported
    /// as `Ok(false)`; its statistics are still printed.
    pub fn execute(&mut self) -> Result<bool> {
        for argument in &self.ignored {
            warn!("ignoring unrecognized argument: {}", argument);
        }
        info!("options: {}", self.options.to_json_line()?);

        let properties = self.platform.build_properties(&self.options)?;
        let selection = RunSelection::from_options(&self.options);
        info!(
            "running {} loads: {}",
            selection.len(),
            selection
                .kinds()
                .iter()
                .map(|kind| kind.flow_name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let flows = selection.build_all(&self.options)?;

        if self.options.write_dot_file {
            for flow in &flows {
                let path = format!("{}{}.dot", self.options.working_root, flow.name());
                info!("DOT file: {}", path);
                let lines: Vec<String> = flow.to_dot().lines().map(String::from).collect();
                self.platform.write_lines(&path, &lines)?;
            }
        }

        let mut cascade = self
            .platform
            .new_cascade(CASCADE_NAME, flows, properties)?;

        if self.options.write_trace_files {
            for (flow, plan) in cascade.flows().iter().zip(cascade.plans()) {
                let path = format!("{}{}.trace", self.options.working_root, flow.name());
                info!("trace file: {}", path);
                let lines: Vec<String> =
                    plan.render_trace(flow).lines().map(String::from).collect();
                self.platform.write_lines(&path, &lines)?;
            }
        }

        let succeeded = match cascade.complete() {
            Ok(()) => true,
            Err(e) => {
                error!("failed running cascade: {:#}", anyhow::Error::from(e));
                false
            }
        };

        self.print_summary(cascade.stats())?;

        if succeeded && self.options.clean_work_files {
            self.clean_work_files();
        }

        Ok(succeeded)
    }

    /// Where the stats file goes: `<statsRoot><platform>-<millis>`, fixed on first use.
    pub fn full_stats_root(&mut self) -> Option<String> {
        let stats_root = self.options.stats_root.as_ref()?;
        let platform = self.platform.name();
        Some(
            self.full_stats_root
                .get_or_insert_with(|| {
                    format!("{}{}-{}", stats_root, platform, current_timestamp_millis())
                })
                .clone(),
        )
    }

    /// The options line followed by the stats report.
    pub fn summary_lines(&self, stats: &Stats) -> Result<Vec<String>> {
        let mut lines = vec![self.options.to_json_line()?];
        let printer = StatsPrinter::new(self.platform.as_ref(), self.options.singleline_stats);
        lines.extend(printer.render(stats));
        Ok(lines)
    }

    fn print_summary(&mut self, stats: &Stats) -> Result<()> {
        let lines = self.summary_lines(stats)?;

        match self.full_stats_root() {
            Some(path) => {
                self.platform.write_lines(&path, &lines)?;
                info!("wrote stats to {}", path);
            }
            None => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                for line in &lines {
                    writeln!(out, "{line}")?;
                }
                out.flush()?;
            }
        }
        Ok(())
    }

    fn clean_work_files(&self) {
        info!("cleaning work files");
        let roots = [
            self.options.input_root.as_str(),
            self.options.working_root.as_str(),
            self.options.output_root.as_str(),
        ];
        if let Err(e) = self.platform.clean_directories(&roots) {
            error!("failed cleaning work files: {}", e);
        }
    }
}
