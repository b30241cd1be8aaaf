use simplerpc_channel::{client_trace_stage, ClientPipeline, InvocationRequest};
use tracing::debug;

use crate::cmd::CallArgs;
use crate::exit::{channel_error, frame_error, CliError, CliResult, REMOTE_FAULT, SUCCESS, USAGE};
use crate::output::{print_result, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let values = parse_args(&args.args)?;
    let request = InvocationRequest::from_json(args.method.as_str(), &values)
        .map_err(|err| frame_error("unsupported argument", err))?;

    let mut builder =
        ClientPipeline::builder(&args.url).map_err(|err| channel_error("invalid endpoint", err))?;
    if args.trace {
        builder = builder.with_stage(client_trace_stage());
    }
    let pipeline = builder
        .build()
        .map_err(|err| channel_error("pipeline setup failed", err))?;

    debug!(endpoint = %pipeline.endpoint(), method = %args.method, argc = values.len(), "calling");
    let result = pipeline.invoke(&request);
    print_result(&args.method, &result, format);

    Ok(if result.is_fault() { REMOTE_FAULT } else { SUCCESS })
}

fn parse_args(raw: &[String]) -> CliResult<Vec<serde_json::Value>> {
    raw.iter()
        .enumerate()
        .map(|(i, text)| {
            serde_json::from_str(text).map_err(|err| {
                CliError::new(USAGE, format!("--arg #{} is not valid JSON ({text}): {err}", i + 1))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_argument_as_json() {
        let args = ["2".to_string(), "\"x\"".to_string(), "null".to_string()];
        let values = parse_args(&args).unwrap();
        assert_eq!(
            values,
            vec![serde_json::json!(2), serde_json::json!("x"), serde_json::Value::Null]
        );
    }

    #[test]
    fn bare_words_are_usage_errors() {
        let err = parse_args(&["hello".to_string()]).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("--arg #1 is not valid JSON"));
    }
}
