use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use simplerpc_channel::{Endpoint, InvocationResult, TypedValue};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct ResultOutput<'a> {
    method: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_arguments: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fault: Option<&'a str>,
}

pub fn print_result(method: &str, result: &InvocationResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = match result {
                InvocationResult::Return {
                    return_value,
                    out_arguments,
                } => ResultOutput {
                    method,
                    status: "return",
                    return_value: Some(return_value.to_json()),
                    out_arguments: Some(out_arguments.iter().map(TypedValue::to_json).collect()),
                    fault: None,
                },
                InvocationResult::Fault { message } => ResultOutput {
                    method,
                    status: "fault",
                    return_value: None,
                    out_arguments: None,
                    fault: Some(message.as_str()),
                },
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["METHOD", "STATUS", "VALUE"]);
            match result {
                InvocationResult::Return {
                    return_value,
                    out_arguments,
                } => {
                    table.add_row(vec![
                        method.to_string(),
                        "return".to_string(),
                        return_value.to_string(),
                    ]);
                    for (i, out) in out_arguments.iter().enumerate() {
                        table.add_row(vec![String::new(), format!("out[{i}]"), out.to_string()]);
                    }
                }
                InvocationResult::Fault { message } => {
                    table.add_row(vec![method.to_string(), "fault".to_string(), message.clone()]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => match result {
            InvocationResult::Return {
                return_value,
                out_arguments,
            } => {
                let outs: Vec<String> = out_arguments.iter().map(ToString::to_string).collect();
                println!("{method} -> {return_value} out=[{}]", outs.join(", "));
            }
            InvocationResult::Fault { message } => println!("{method} !! {message}"),
        },
    }
}

#[derive(Serialize)]
struct EndpointOutput<'a> {
    scheme: &'a str,
    host: &'a str,
    port: u16,
    object_uri: Option<&'a str>,
    canonical: String,
}

pub fn print_endpoint(endpoint: &Endpoint, format: OutputFormat) {
    let out = EndpointOutput {
        scheme: endpoint.scheme(),
        host: endpoint.host(),
        port: endpoint.port(),
        object_uri: endpoint.object_uri(),
        canonical: endpoint.canonical(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            table
                .add_row(vec!["scheme", out.scheme])
                .add_row(vec!["host", out.host])
                .add_row(vec!["port".to_string(), out.port.to_string()])
                .add_row(vec!["object_uri", out.object_uri.unwrap_or("-")])
                .add_row(vec!["canonical", out.canonical.as_str()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "scheme={} host={} port={} object_uri={} canonical={}",
                out.scheme,
                out.host,
                out.port,
                out.object_uri.unwrap_or("-"),
                out.canonical
            );
        }
    }
}

#[derive(Serialize)]
pub struct PublishedObject {
    pub object_uri: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct ServingOutput {
    pub channel_uri: String,
    pub workers: usize,
    pub objects: Vec<PublishedObject>,
}

pub fn print_serving(serving: &ServingOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(serving),
        OutputFormat::Table => {
            let mut table = new_table(vec!["OBJECT", "URL"]);
            for object in &serving.objects {
                table.add_row(vec![object.object_uri.as_str(), object.url.as_str()]);
            }
            println!("serving on {} ({} worker(s))", serving.channel_uri, serving.workers);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("serving on {}", serving.channel_uri);
            for object in &serving.objects {
                println!("  {} -> {}", object.object_uri, object.url);
            }
        }
    }
    // Scripts wait for this line before calling.
    let _ = std::io::stdout().flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}
