use std::fs;

use tagwire_codec::{encode, Envelope, Value};
use tracing::info;

use crate::cmd::EncodeArgs;
use crate::exit::{codec_error, io_error, json_error, CliError, CliResult, SUCCESS, USAGE};
use crate::input::read_text;
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let value = if args.envelope {
        envelope_value(&args)?
    } else {
        read_value(&args)?
    };
    let bytes = encode(&value).map_err(|err| codec_error("encode failed", err))?;

    let out = if args.hex {
        format!("{}\n", hex::encode(&bytes)).into_bytes()
    } else {
        bytes.to_vec()
    };

    match &args.out {
        Some(path) => {
            fs::write(path, &out)
                .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
            info!(path = %path.display(), bytes = bytes.len(), "wrote message");
        }
        None => print_raw(&out),
    }
    Ok(SUCCESS)
}

fn read_value(args: &EncodeArgs) -> CliResult<Value> {
    let text = read_text(args.json.as_deref(), args.file.as_deref())?;
    serde_json::from_str(&text).map_err(|err| json_error("input is not valid JSON", err))
}

fn envelope_value(args: &EncodeArgs) -> CliResult<Value> {
    let data = if args.no_data {
        None
    } else {
        match read_value(args)? {
            Value::List(items) => Some(items),
            other => {
                return Err(CliError::new(
                    USAGE,
                    format!("envelope data must be a JSON array, got {}", other.kind()),
                ))
            }
        }
    };
    let traceback = (!args.traceback.is_empty())
        .then(|| args.traceback.iter().map(|line| Value::from(line.as_str())).collect());

    Ok(Envelope { data, traceback }.into())
}
