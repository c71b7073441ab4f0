//! Argument parsing and setter dispatch.

use super::Options;
use super::descriptor::Target;
use super::render::{render_markdown, render_usage};
use super::table::OptionTable;
use load_common::{LoadError, Result};
use tracing::debug;

/// A successfully parsed configuration, before derivation.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub options: Options,
    /// Tokens no descriptor claimed, in the order they appeared.
    pub ignored: Vec<String>,
}

/// What the caller should do after parsing.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// Proceed with the run.
    Run(Parsed),
    /// Print the usage text and exit 0.
    Help(String),
    /// Print the markdown table and exit 0.
    Markdown(String),
    /// No option was recognized: print the usage text and exit 1.
    NoOptions(String),
}

/// One recognized flag occurrence.
#[derive(Debug)]
struct Occurrence {
    descriptor: usize,
    token: String,
    value: Option<String>,
}

/// Parse an argument vector (without the program name) against `table`.
///
/// Value-bearing flags consume the next token verbatim, so negative numbers
/// work as arguments. `--long=value` is accepted for value-bearing flags.
/// Unknown tokens are collected into [`Parsed::ignored`].
pub fn parse_args<I, S>(table: &OptionTable, args: I) -> Result<ParseOutcome>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let (occurrences, ignored) = tokenize(table, args)?;

    if occurrences.is_empty() {
        return Ok(ParseOutcome::NoOptions(render_usage(table)));
    }

    let descriptors: Vec<_> = table.descriptors().collect();
    let has_target = |wanted: fn(&Target) -> bool| {
        occurrences
            .iter()
            .any(|occurrence| wanted(&descriptors[occurrence.descriptor].target()))
    };

    if has_target(|t| matches!(t, Target::Help)) {
        return Ok(ParseOutcome::Help(render_usage(table)));
    }
    if has_target(|t| matches!(t, Target::Markdown)) {
        return Ok(ParseOutcome::Markdown(render_markdown(table)));
    }

    let mut options = Options::default();
    let mut missing = None;

    for (index, descriptor) in descriptors.iter().enumerate() {
        let mut matched = false;

        for occurrence in occurrences.iter().filter(|o| o.descriptor == index) {
            matched = true;
            apply(&mut options, descriptor.target(), occurrence)?;
        }

        if !matched && descriptor.is_required() && missing.is_none() {
            missing = Some(descriptor.primary_alias());
        }
    }

    if let Some(alias) = missing {
        return Err(LoadError::configuration_error(format!(
            "The {alias} option is required"
        )));
    }

    if !options.has_work_selected() {
        return Err(LoadError::configuration_error(
            "At least one flow must be selected, to run Load",
        ));
    }

    Ok(ParseOutcome::Run(Parsed { options, ignored }))
}

fn tokenize<I, S>(table: &OptionTable, args: I) -> Result<(Vec<Occurrence>, Vec<String>)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut occurrences = Vec::new();
    let mut ignored = Vec::new();
    let mut tokens = args.into_iter().map(|arg| -> String { arg.into() });

    while let Some(token) = tokens.next() {
        if let Some(index) = table.index_of(&token) {
            let value = if table.descriptor_at(index).takes_value() {
                match tokens.next() {
                    Some(value) => Some(value),
                    None => {
                        return Err(LoadError::configuration_error(format!(
                            "Option {token} requires an argument"
                        )));
                    }
                }
            } else {
                None
            };
            occurrences.push(Occurrence {
                descriptor: index,
                token,
                value,
            });
            continue;
        }

        if let Some((index, name, value)) = split_long_value(table, &token) {
            occurrences.push(Occurrence {
                descriptor: index,
                token: name,
                value: Some(value),
            });
            continue;
        }

        debug!("ignoring unrecognized argument: {}", token);
        ignored.push(token);
    }

    Ok((occurrences, ignored))
}

/// Split `--name=value` when `--name` is a value-bearing alias.
fn split_long_value(table: &OptionTable, token: &str) -> Option<(usize, String, String)> {
    if !token.starts_with("--") {
        return None;
    }
    let (name, value) = token.split_once('=')?;
    let index = table.index_of(name)?;
    if !table.descriptor_at(index).takes_value() {
        return None;
    }
    Some((index, name.to_string(), value.to_string()))
}

fn apply(options: &mut Options, target: Target, occurrence: &Occurrence) -> Result<()> {
    let value = occurrence.value.clone().unwrap_or_default();

    match target {
        Target::Help | Target::Markdown => {}
        Target::Flag(set) => set(options),
        Target::Integer(set) => {
            let parsed = value
                .trim()
                .parse::<i32>()
                .map_err(|_| LoadError::invalid_value(&occurrence.token, &value, "an integer"))?;
            set(options, parsed);
        }
        Target::Float(set) => {
            let parsed = value
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| LoadError::invalid_value(&occurrence.token, &value, "a number"))?;
            set(options, parsed);
        }
        Target::Text(set) => set(options, value),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ParseOutcome> {
        let table = OptionTable::standard().unwrap();
        parse_args(&table, args.iter().copied())
    }

    fn run(args: &[&str]) -> Parsed {
        match parse(args).unwrap() {
            ParseOutcome::Run(parsed) => parsed,
            other => panic!("expected a run, got {other:?}"),
        }
    }

    #[test]
    fn test_basic_run() {
        let parsed = run(&["-I", "in", "-O", "out", "-g", "-gf", "3", "-gs", "1", "-c"]);
        let options = parsed.options;
        assert_eq!(options.input_root, "in");
        assert_eq!(options.output_root, "out");
        assert!(options.data_generate);
        assert_eq!(options.data_num_files, 3);
        assert_eq!(options.data_file_size_mb, 1.0);
        assert!(options.count_sort);
        assert!(parsed.ignored.is_empty());
    }

    #[test]
    fn test_empty_args_is_no_options() {
        assert!(matches!(parse(&[]).unwrap(), ParseOutcome::NoOptions(_)));
    }

    #[test]
    fn test_only_unknown_tokens_is_no_options() {
        assert!(matches!(
            parse(&["whatever", "--nope"]).unwrap(),
            ParseOutcome::NoOptions(_)
        ));
    }

    #[test]
    fn test_help_short_circuits() {
        // missing -I/-O would otherwise be an error
        match parse(&["-c", "--help"]).unwrap() {
            ParseOutcome::Help(text) => assert!(text.starts_with("Usage:")),
            other => panic!("expected help, got {other:?}"),
        }
        assert!(matches!(parse(&["-h"]).unwrap(), ParseOutcome::Help(_)));
    }

    #[test]
    fn test_markdown_short_circuits() {
        match parse(&["--markdown"]).unwrap() {
            ParseOutcome::Markdown(text) => assert!(text.contains("<table>")),
            other => panic!("expected markdown, got {other:?}"),
        }
    }

    #[test]
    fn test_help_wins_over_markdown() {
        assert!(matches!(
            parse(&["--markdown", "-h"]).unwrap(),
            ParseOutcome::Help(_)
        ));
    }

    #[test]
    fn test_missing_required_input() {
        let err = parse(&["-O", "out", "-c"]).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "The -I option is required");
    }

    #[test]
    fn test_missing_required_output() {
        let err = parse(&["-I", "in", "-c"]).unwrap_err();
        assert_eq!(err.to_string(), "The -O option is required");
    }

    #[test]
    fn test_first_missing_required_reported() {
        let err = parse(&["-c"]).unwrap_err();
        assert_eq!(err.to_string(), "The -I option is required");
    }

    #[test]
    fn test_required_checked_before_selection() {
        let err = parse(&["-X"]).unwrap_err();
        assert_eq!(err.to_string(), "The -I option is required");
    }

    #[test]
    fn test_no_work_selected() {
        let err = parse(&["-I", "in", "-O", "out", "-X"]).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "At least one flow must be selected, to run Load"
        );
    }

    #[test]
    fn test_meta_selector_counts_as_work() {
        let parsed = run(&["-I", "in", "-O", "out", "-ALL"]);
        assert!(parsed.options.run_all_loads);

        let parsed = run(&["-I", "in", "-O", "out", "-RTD"]);
        assert!(parsed.options.run_to_destruction);
    }

    #[test]
    fn test_invalid_integer() {
        let err = parse(&["-I", "in", "-O", "out", "-c", "-gf", "three"]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { .. }));
        assert!(err.is_configuration());
        assert!(err.to_string().contains("-gf"));
    }

    #[test]
    fn test_invalid_float() {
        let err = parse(&["-I", "in", "-O", "out", "-c", "-gs", "big"]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { .. }));

        let err = parse(&["-I", "in", "-O", "out", "-c", "-gwm", "NaN"]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { .. }));
    }

    #[test]
    fn test_value_flag_at_end() {
        let err = parse(&["-I", "in", "-O", "out", "-c", "-gf"]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("-gf"));
    }

    #[test]
    fn test_negative_value_consumed() {
        let parsed = run(&["-I", "in", "-O", "out", "-c", "-MXCF", "-5", "-NM", "-1"]);
        assert_eq!(parsed.options.max_concurrent_flows, -1);
        assert_eq!(parsed.options.num_default_mappers, -1);

        let parsed = run(&["-I", "in", "-O", "out", "-c", "-MXCF", "0"]);
        assert_eq!(parsed.options.max_concurrent_flows, 0);
    }

    #[test]
    fn test_repeatable_accumulates() {
        let parsed = run(&[
            "-I", "in", "-O", "out", "-c", "-DH", "a=1", "-DH", "b=2",
        ]);
        assert_eq!(parsed.options.backend_properties, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_last_value_wins() {
        let parsed = run(&["-I", "in", "-O", "out", "-c", "-gf", "3", "-gf", "7"]);
        assert_eq!(parsed.options.data_num_files, 7);
    }

    #[test]
    fn test_long_aliases_and_equals_form() {
        let parsed = run(&[
            "-I",
            "in",
            "-O",
            "out",
            "--count-sort",
            "--generate-num-files=12",
            "--generate-max-words",
            "20",
        ]);
        assert!(parsed.options.count_sort);
        assert_eq!(parsed.options.data_num_files, 12);
        assert_eq!(parsed.options.data_max_words, 20);
    }

    #[test]
    fn test_unknown_tokens_ignored() {
        let parsed = run(&["-I", "in", "--bogus", "-O", "out", "stray", "-c"]);
        assert_eq!(parsed.ignored, vec!["--bogus", "stray"]);
        assert_eq!(parsed.options.output_root, "out");
    }

    #[test]
    fn test_flag_with_equals_is_ignored() {
        let parsed = run(&["-I", "in", "-O", "out", "-c", "--generate=yes"]);
        assert!(!parsed.options.data_generate);
        assert_eq!(parsed.ignored, vec!["--generate=yes"]);
    }
}
