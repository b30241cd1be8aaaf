use simplerpc_transport::Endpoint;

use crate::cmd::ParseArgs;
use crate::exit::{parse_error, CliResult, SUCCESS};
use crate::output::{print_endpoint, OutputFormat};

pub fn run(args: ParseArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = Endpoint::parse(&args.url).map_err(|err| parse_error("invalid endpoint", err))?;
    print_endpoint(&endpoint, format);
    Ok(SUCCESS)
}
