use serde::Serialize;
use tagwire_codec::{decode_with_config, DecodeConfig, Value};

use crate::cmd::DecodeArgs;
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::input::read_message;
use crate::output::{outline, print_json, value_table, OutputFormat};

#[derive(Serialize)]
struct DecodeOutput<'a> {
    schema_id: &'a str,
    size: usize,
    root: &'a str,
    value: &'a Value,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = read_message(args.path.as_deref(), args.hex.as_deref())?;
    let value = decode_message(&bytes, args.max_depth)?;

    match format {
        OutputFormat::Json => print_json(&DecodeOutput {
            schema_id: "https://schemas.3leaps.dev/tagwire/cli/v1/decoded-message.schema.json",
            size: bytes.len(),
            root: value.kind().as_str(),
            value: &value,
        }),
        OutputFormat::Table => println!("{}", value_table(&value)),
        OutputFormat::Pretty => println!("{}", outline(&value)),
        OutputFormat::Raw => print_json(&value),
    }
    Ok(SUCCESS)
}

pub(crate) fn decode_message(bytes: &[u8], max_depth: usize) -> CliResult<Value> {
    let config = DecodeConfig {
        max_depth,
        ..DecodeConfig::default()
    };
    decode_with_config(bytes, config).map_err(|err| codec_error("decode failed", err))
}
