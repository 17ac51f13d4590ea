use avrlink_frame::Attribute;

use crate::cmd::StatusArgs;
use crate::exit::{CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_status, AttributeOutput, OutputFormat, StatusOutput};

pub fn run(args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let controller = args.connection.connect()?;

    // Nothing is subscribed, so this queries every attribute.
    let updates = controller.sync();
    let max_volume = controller.session().max_volume();
    let address = controller
        .session()
        .address()
        .map_or_else(|| args.connection.address.clone(), ToString::to_string);
    controller.stop();

    if updates.is_empty() {
        return Err(CliError::new(
            TIMEOUT,
            format!("receiver at {} answered no queries", args.connection.address),
        ));
    }

    let unavailable = Attribute::ALL
        .into_iter()
        .filter(|attribute| !updates.iter().any(|update| update.attribute == *attribute))
        .collect();
    let attributes = updates
        .into_iter()
        .map(|update| AttributeOutput::new(update.attribute, update.value))
        .collect();

    let out = StatusOutput {
        address,
        max_volume,
        attributes,
        unavailable,
    };
    print_status(&out, format);
    Ok(SUCCESS)
}
