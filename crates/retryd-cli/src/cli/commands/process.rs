//! `retryd process --id <id> --header k=v ...` – classify and route one message.

use anyhow::{bail, Context, Result};
use retryd_core::headers::Headers;
use retryd_core::record::MessageId;
use retryd_core::service::RetryService;

use super::describe;

pub async fn run_process(
    service: &RetryService,
    id: &str,
    header_args: &[String],
    payload: Option<&str>,
) -> Result<()> {
    let headers = parse_headers(header_args)?;
    let payload = match payload {
        Some(raw) => serde_json::from_str(raw).context("payload is not valid JSON")?,
        None => serde_json::Value::Null,
    };
    let id = MessageId::from(id);
    let outcome = service.process(&id, &headers, payload).await?;
    println!("{id}: {}", describe(&outcome));
    Ok(())
}

/// `key=value` pairs in argument order. Only the first `=` splits.
pub(crate) fn parse_headers(args: &[String]) -> Result<Headers> {
    let mut headers = Headers::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("header {arg:?} is not in key=value form");
        };
        if key.is_empty() {
            bail!("header {arg:?} has an empty key");
        }
        headers.push(key, value);
    }
    Ok(headers)
}
