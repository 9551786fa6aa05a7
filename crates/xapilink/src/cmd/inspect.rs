use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use xapilink_schema::{MessageDescriptor, Schema};

use crate::cmd::InspectArgs;
use crate::exit::{definition_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = Schema::from_files(&args.definitions)
        .map_err(|err| definition_error("loading definitions failed", err))?;

    let devices: Vec<_> = match &args.device {
        Some(name) => {
            let device = schema.device(name).ok_or_else(|| {
                CliError::new(USAGE, format!("device {name:?} is not in the definitions"))
            })?;
            vec![device]
        }
        None => schema.devices(),
    };

    match format {
        OutputFormat::Json => print_json(&devices),
        OutputFormat::Table | OutputFormat::Pretty => print_table(&devices),
    }
    Ok(SUCCESS)
}

fn print_json(devices: &[&xapilink_schema::DeviceSchema]) {
    let mut out = Vec::new();
    for device in devices {
        let mut classes = Vec::new();
        for class in device.classes() {
            let commands: Vec<_> = class
                .commands()
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "name": entry.command.name,
                        "id": entry.command.id,
                        "params": field_names(&entry.command),
                        "returns": entry.response.as_ref().map(|r| field_names(r)),
                    })
                })
                .collect();
            let events: Vec<_> = class
                .events()
                .iter()
                .map(|event| {
                    serde_json::json!({
                        "name": event.name,
                        "id": event.id,
                        "params": field_names(event),
                    })
                })
                .collect();
            classes.push(serde_json::json!({
                "name": class.name,
                "id": class.id,
                "commands": commands,
                "events": events,
            }));
        }
        out.push(serde_json::json!({
            "device": device.name,
            "id": device.id,
            "version": device.version,
            "classes": classes,
        }));
    }
    println!(
        "{}",
        serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
    );
}

fn print_table(devices: &[&xapilink_schema::DeviceSchema]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["DEVICE", "CLASS", "KIND", "NAME", "PARAMS", "RETURNS"]);

    for device in devices {
        for class in device.classes() {
            for entry in class.commands() {
                table.add_row(vec![
                    device.name.clone(),
                    class.name.clone(),
                    "cmd".to_string(),
                    entry.command.name.clone(),
                    field_summary(&entry.command),
                    entry
                        .response
                        .as_ref()
                        .map(|r| field_summary(r))
                        .unwrap_or_else(|| "(none)".to_string()),
                ]);
            }
            for event in class.events() {
                table.add_row(vec![
                    device.name.clone(),
                    class.name.clone(),
                    "evt".to_string(),
                    event.name.clone(),
                    field_summary(event),
                    String::new(),
                ]);
            }
        }
    }
    println!("{table}");
}

fn field_names(descriptor: &MessageDescriptor) -> Vec<String> {
    descriptor
        .fields
        .iter()
        .map(|f| format!("{}:{}", f.name, f.kind.name()))
        .collect()
}

fn field_summary(descriptor: &MessageDescriptor) -> String {
    if descriptor.fields.is_empty() {
        "-".to_string()
    } else {
        field_names(descriptor).join(", ")
    }
}
