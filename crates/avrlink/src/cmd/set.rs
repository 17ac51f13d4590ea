use avrlink_frame::{canonical, parse_value};

use crate::cmd::{parse_attribute, SetArgs};
use crate::exit::{frame_error, session_error, CliResult, SUCCESS};
use crate::output::{print_set, AttributeOutput, OutputFormat, SetOutput};

pub fn run(args: SetArgs, format: OutputFormat) -> CliResult<i32> {
    let attribute = parse_attribute(&args.attribute)?;
    // Reject bad input before opening a connection.
    let value = parse_value(attribute, &args.value)
        .and_then(|value| canonical(attribute, &value))
        .map_err(|err| frame_error("invalid value", err))?;
    let controller = args.connection.connect()?;

    controller
        .set(attribute, value.clone())
        .map_err(|err| session_error("set failed", err))?;
    let confirmed = controller.store().get(attribute).unwrap_or(value);
    controller.stop();

    let out = SetOutput {
        target: AttributeOutput::new(attribute, confirmed),
        acknowledged: true,
    };
    print_set(&out, format);
    Ok(SUCCESS)
}
