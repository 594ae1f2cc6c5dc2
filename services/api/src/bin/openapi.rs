//! services/api/src/bin/openapi.rs
//!
//! Dumps the OpenAPI document of the courses API. Prints to stdout, or writes
//! to the path given as the only argument.

use api_lib::{error::ApiError, web::ApiDoc};
use std::io::Write;
use utoipa::OpenApi;

fn main() -> Result<(), ApiError> {
    let doc = ApiDoc::openapi();
    let json = doc
        .to_pretty_json()
        .map_err(|e| ApiError::Internal(format!("serializing the OpenAPI document: {e}")))?;

    match std::env::args().nth(1) {
        Some(path) => {
            std::fs::write(&path, json)?;
            eprintln!("{} paths written to {path}", doc.paths.paths.len());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
