use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use avrlink_frame::{encode, Attribute, Value};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct AttributeOutput {
    pub attribute: Attribute,
    pub wire_code: &'static str,
    pub value: Value,
}

impl AttributeOutput {
    pub fn new(attribute: Attribute, value: Value) -> Self {
        Self {
            attribute,
            wire_code: attribute.wire_code(),
            value,
        }
    }

    /// The frame the receiver would send for this value, without the delimiter.
    fn wire_frame(&self) -> String {
        match encode(self.attribute, &self.value) {
            Ok(token) => format!("{}{token}", self.wire_code),
            Err(_) => format!("{}{}", self.wire_code, self.value),
        }
    }
}

#[derive(Serialize)]
pub struct SetOutput {
    #[serde(flatten)]
    pub target: AttributeOutput,
    pub acknowledged: bool,
}

#[derive(Serialize)]
pub struct StatusOutput {
    pub address: String,
    pub max_volume: f64,
    pub attributes: Vec<AttributeOutput>,
    pub unavailable: Vec<Attribute>,
}

#[derive(Serialize)]
struct UpdateOutput<'a> {
    #[serde(flatten)]
    update: &'a AttributeOutput,
    timestamp: String,
}

pub fn print_attribute(out: &AttributeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(std::slice::from_ref(out)),
        OutputFormat::Pretty => println!("{}: {}", out.attribute, out.value),
        OutputFormat::Raw => println!("{}", out.wire_frame()),
    }
}

pub fn print_set(out: &SetOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(std::slice::from_ref(&out.target)),
        OutputFormat::Pretty => println!(
            "{} set to {} (acknowledged)",
            out.target.attribute, out.target.value
        ),
        OutputFormat::Raw => println!("{}", out.target.wire_frame()),
    }
}

pub fn print_status(out: &StatusOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            print_table(&out.attributes);
            println!("max volume: {}", out.max_volume);
            print_unavailable(&out.unavailable);
        }
        OutputFormat::Pretty => {
            println!("Receiver {}:", out.address);
            for attribute in &out.attributes {
                println!("  {:<12}{}", format!("{}:", attribute.attribute), attribute.value);
            }
            println!("  {:<12}{}", "max volume:", out.max_volume);
            print_unavailable(&out.unavailable);
        }
        OutputFormat::Raw => {
            for attribute in &out.attributes {
                println!("{}", attribute.wire_frame());
            }
        }
    }
}

/// One line per update so the output can be piped while watching.
pub fn print_update(out: &AttributeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&UpdateOutput {
            update: out,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{} {} = {}", now_unix_seconds(), out.attribute, out.value);
        }
        OutputFormat::Raw => println!("{}", out.wire_frame()),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(rows: &[AttributeOutput]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ATTRIBUTE", "CODE", "VALUE"]);
    for row in rows {
        table.add_row(vec![
            row.attribute.to_string(),
            row.wire_code.to_string(),
            row.value.to_string(),
        ]);
    }
    println!("{table}");
}

fn print_unavailable(unavailable: &[Attribute]) {
    if unavailable.is_empty() {
        return;
    }
    let names = unavailable
        .iter()
        .map(|attribute| attribute.name())
        .collect::<Vec<_>>()
        .join(", ");
    println!("no answer: {names}");
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
