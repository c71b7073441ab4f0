//! Data generation and consumption.

use super::{input_tap, output_tap};
use crate::flow::{Assembly, EachOp, FlowDef, SetupAction};
use crate::generate::{GeneratorConfig, dictionary};
use crate::options::Options;
use crate::tap::Tap;
use load_common::Result;

/// Writes the dictionary once per requested file, then expands every copy
/// into generated lines under the input root.
pub fn generate_data(options: &Options) -> Result<FlowDef> {
    let dictionary_path = format!("{}dictionary/", options.working_root);

    let mut assembly = Assembly::new();
    let pipe = assembly.head("load-generator");
    let pipe = assembly.each(
        pipe,
        EachOp::split_fields("line", dictionary().len(), "\t")?,
    )?;
    let pipe = assembly.each(pipe, EachOp::Generate(GeneratorConfig::from_options(options)))?;

    let flow = FlowDef::connect(
        "generate-data",
        assembly,
        vec![("load-generator", Tap::new(dictionary_path.as_str()))],
        vec![(pipe, input_tap(options))],
    )?;
    Ok(flow.with_setup(SetupAction::WriteDictionary {
        path: dictionary_path,
        copies: options.data_num_files.max(1) as usize,
    }))
}

/// Reads everything and keeps nothing.
pub fn consume_data(options: &Options) -> Result<FlowDef> {
    let mut assembly = Assembly::new();
    let pipe = assembly.head("load-consumer");
    let pipe = assembly.each(pipe, EachOp::Discard)?;

    FlowDef::connect(
        "consume-data",
        assembly,
        vec![("load-consumer", input_tap(options))],
        vec![(pipe, output_tap(options, "consumedata"))],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_data_shape() {
        let mut options = Options::default();
        options.input_root = "in/".to_string();
        options.working_root = "work/".to_string();
        options.data_num_files = 4;

        let flow = generate_data(&options).unwrap();
        assert_eq!(flow.source_paths(), vec!["work/dictionary/"]);
        assert_eq!(flow.sink_paths(), vec!["in/"]);
        assert_eq!(
            flow.setup(),
            &[SetupAction::WriteDictionary {
                path: "work/dictionary/".to_string(),
                copies: 4
            }]
        );
    }

    #[test]
    fn test_consume_data_shape() {
        let mut options = Options::default();
        options.input_root = "in/".to_string();
        options.output_root = "out/".to_string();

        let flow = consume_data(&options).unwrap();
        assert_eq!(flow.sink_paths(), vec!["out/consumedata"]);
        assert_eq!(flow.assembly().len(), 2);
    }
}
