#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::PathBuf;

use route_query::ArgsBag;
use route_query::client::RequestOptions;
use serde_json::Value;

use crate::args::BagInput;
use crate::client::CliError;

pub fn read_opt_value(
    val: Option<String>,
    file: Option<PathBuf>,
) -> Result<Option<String>, CliError> {
    if let Some(path) = file {
        let data = fs::read_to_string(&path).map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })?;
        return Ok(Some(data));
    }
    Ok(val)
}

/// Parse the argument bag, which must be a JSON object when present.
pub fn read_bag(input: BagInput) -> Result<Option<ArgsBag>, CliError> {
    let Some(raw) = read_opt_value(input.args, input.args_file)? else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(bag)) => Ok(Some(bag)),
        Ok(other) => Err(CliError::InvalidInput(format!(
            "argument bag must be a JSON object, got {other}"
        ))),
        Err(err) => Err(CliError::InvalidInput(format!(
            "argument bag is not valid JSON: {err}"
        ))),
    }
}

/// Turn repeated `NAME:VALUE` flags into request options.
pub fn request_options(headers: &[String]) -> Result<Option<RequestOptions>, CliError> {
    if headers.is_empty() {
        return Ok(None);
    }
    headers
        .iter()
        .try_fold(RequestOptions::new(), |options, header| {
            let (name, value) = header.split_once(':').ok_or_else(|| {
                CliError::InvalidInput(format!("header `{header}` must look like NAME:VALUE"))
            })?;
            Ok(options.header(name.trim(), value.trim()))
        })
        .map(Some)
}
