use crate::cmd::{parse_attribute, GetArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_attribute, AttributeOutput, OutputFormat};

pub fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    let attribute = parse_attribute(&args.attribute)?;
    let controller = args.connection.connect()?;

    let value = controller
        .get(attribute)
        .map_err(|err| session_error("query failed", err))?;
    controller.stop();

    print_attribute(&AttributeOutput::new(attribute, value), format);
    Ok(SUCCESS)
}
