// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CUPS adapter speaking IPP to the local scheduler.
//
// Uses the `ipp` crate's async API for:
//   - CUPS-Get-Printers        (queue enumeration)
//   - Get-Printer-Attributes   (RFC 8011 §4.2.5, printer-commands)
//   - Print-Job                (RFC 8011 §4.2.1, CUPS command documents)
//   - CUPS-Add-Modify-Printer  (queue creation, option defaults)
//   - Pause/Resume-Printer     (RFC 8011 §4.3.5-6)
//   - CUPS-Accept/Reject-Jobs
// and plain HTTP for downloading a queue's PPD.

mod drivers;

pub use drivers::{CupsDriverService, classify_candidate};

use std::collections::HashMap;
use std::io::{Cursor, Write};

use async_trait::async_trait;
use ipp::prelude::*;
use tracing::{debug, error, info, instrument};

use plugwerk_core::error::{PlugwerkError, Result};

use crate::traits::{DriverFile, Spooler, SpoolerMechanism};

/// Attributes of a response flattened to name → display string.
pub type PrinterAttributes = HashMap<String, String>;

/// MIME type of CUPS maintenance command files.
const CUPS_COMMAND_FORMAT: &str = "application/vnd.cups-command";

/// IPP client bound to one CUPS scheduler.
pub struct CupsClient {
    /// Scheduler base, e.g. `ipp://localhost:631`.
    base: String,
    /// HTTP form of `base`, used for PPD downloads.
    http_base: String,
    /// Sent as `requesting-user-name` on administrative requests.
    user: String,
}

impl CupsClient {
    /// Create a client for the scheduler at `base_uri`.
    pub fn new(base_uri: &str) -> Result<Self> {
        let base = base_uri.trim_end_matches('/').to_string();
        parse_uri(&base)?;
        Ok(Self {
            http_base: http_base(&base),
            base,
            user: std::env::var("USER").unwrap_or_else(|_| "root".into()),
        })
    }

    fn printer_uri(&self, queue: &str) -> Result<Uri> {
        parse_uri(&format!("{}/printers/{queue}", self.base))
    }

    /// New request addressed at `queue`, carrying the requesting user.
    fn request(&self, operation: Operation, queue: &str) -> Result<IppRequestResponse> {
        let mut request =
            IppRequestResponse::new(IppVersion::v1_1(), operation, Some(self.printer_uri(queue)?));
        request.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                "requesting-user-name",
                IppValue::NameWithoutLanguage(self.user.clone()),
            ),
        );
        Ok(request)
    }

    /// Send an administrative request to `/admin/`.
    async fn send_admin(&self, request: IppRequestResponse, call: &'static str) -> Result<()> {
        let endpoint = parse_uri(&format!("{}/admin/", self.base))?;
        send(&endpoint, request, call).await.map(|_| ())
    }
}

#[async_trait]
impl Spooler for CupsClient {
    #[instrument(skip(self))]
    async fn queue_names(&self) -> Result<Vec<String>> {
        let mut request =
            IppRequestResponse::new(IppVersion::v1_1(), Operation::CupsGetPrinters, None);
        request.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                "requested-attributes",
                IppValue::Array(vec![IppValue::Keyword("printer-name".into())]),
            ),
        );

        let endpoint = parse_uri(&format!("{}/", self.base))?;
        let response = send(&endpoint, request, "CUPS-Get-Printers").await?;

        let names: Vec<String> = response
            .attributes()
            .groups_of(DelimiterTag::PrinterAttributes)
            .filter_map(|group| group.attributes().get("printer-name"))
            .map(|attr| format!("{}", attr.value()))
            .collect();

        debug!(count = names.len(), "enumerated queues");
        Ok(names)
    }

    #[instrument(skip(self))]
    async fn queue_attribute(&self, queue: &str, attribute: &str) -> Result<Option<String>> {
        let uri = self.printer_uri(queue)?;
        let operation = IppOperationBuilder::get_printer_attributes(uri.clone()).build();
        let response = send(&uri, operation, "Get-Printer-Attributes").await?;
        let mut attrs = flatten_attributes(response.attributes());
        Ok(attrs.remove(attribute))
    }

    #[instrument(skip(self))]
    async fn submit_command(&self, queue: &str, command: &str, title: &str) -> Result<i32> {
        let document = format!("#CUPS-COMMAND\n{command}\n").into_bytes();
        let payload = IppPayload::new(Cursor::new(document));
        let uri = self.printer_uri(queue)?;

        let operation = IppOperationBuilder::print_job(uri.clone(), payload)
            .job_title(title)
            .document_format(CUPS_COMMAND_FORMAT)
            .build();

        info!(command, "sending maintenance command");
        let response = send(&uri, operation, "Print-Job").await?;

        let job_id = extract_job_id(response.attributes()).ok_or_else(|| PlugwerkError::Remote {
            call: "Print-Job",
            detail: "response missing job-id".into(),
        })?;
        debug!(job_id, "maintenance job accepted");
        Ok(job_id)
    }

    #[instrument(skip(self))]
    async fn fetch_driver_file(&self, queue: &str) -> Result<Option<DriverFile>> {
        let url = format!("{}/printers/{queue}.ppd", self.http_base);
        let response = reqwest::get(&url).await.map_err(|e| PlugwerkError::Transport {
            service: "cups",
            detail: format!("GET {url}: {e}"),
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("queue has no PPD");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PlugwerkError::Remote {
                call: "GetPPD",
                detail: format!("HTTP {}", response.status()),
            });
        }

        let body = response.bytes().await.map_err(|e| PlugwerkError::Transport {
            service: "cups",
            detail: format!("GET {url}: {e}"),
        })?;

        let mut file = tempfile::Builder::new()
            .prefix("plugwerk-")
            .suffix(".ppd")
            .tempfile()?;
        file.write_all(&body)?;

        debug!(bytes = body.len(), path = %file.path().display(), "PPD downloaded");
        Ok(Some(DriverFile::new(file.into_temp_path())))
    }
}

#[async_trait]
impl SpoolerMechanism for CupsClient {
    #[instrument(skip(self))]
    async fn printer_add(
        &self,
        name: &str,
        device_uri: &str,
        driver_id: &str,
        info: &str,
        location: &str,
    ) -> Result<()> {
        let mut request = self.request(Operation::CupsAddModifyPrinter, name)?;
        let attrs = request.attributes_mut();
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new("device-uri", IppValue::Uri(device_uri.into())),
        );
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new("ppd-name", IppValue::NameWithoutLanguage(driver_id.into())),
        );
        if !info.is_empty() {
            attrs.add(
                DelimiterTag::PrinterAttributes,
                IppAttribute::new("printer-info", IppValue::TextWithoutLanguage(info.into())),
            );
        }
        if !location.is_empty() {
            attrs.add(
                DelimiterTag::PrinterAttributes,
                IppAttribute::new(
                    "printer-location",
                    IppValue::TextWithoutLanguage(location.into()),
                ),
            );
        }

        info!("adding queue");
        self.send_admin(request, "CUPS-Add-Modify-Printer").await
    }

    #[instrument(skip(self))]
    async fn printer_set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let operation = if enabled {
            Operation::ResumePrinter
        } else {
            Operation::PausePrinter
        };
        let request = self.request(operation, name)?;
        self.send_admin(request, if enabled { "Resume-Printer" } else { "Pause-Printer" })
            .await
    }

    #[instrument(skip(self))]
    async fn printer_set_accept_jobs(&self, name: &str, accepting: bool, reason: &str) -> Result<()> {
        let operation = if accepting {
            Operation::CupsAcceptJobs
        } else {
            Operation::CupsRejectJobs
        };
        let mut request = self.request(operation, name)?;
        if !reason.is_empty() {
            request.attributes_mut().add(
                DelimiterTag::OperationAttributes,
                IppAttribute::new(
                    "printer-state-message",
                    IppValue::TextWithoutLanguage(reason.into()),
                ),
            );
        }
        self.send_admin(
            request,
            if accepting { "CUPS-Accept-Jobs" } else { "CUPS-Reject-Jobs" },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn printer_add_option_default(
        &self,
        name: &str,
        option: &str,
        values: &[String],
    ) -> Result<()> {
        let value = match values {
            [single] => IppValue::NameWithoutLanguage(single.clone()),
            many => IppValue::Array(
                many.iter()
                    .map(|v| IppValue::NameWithoutLanguage(v.clone()))
                    .collect(),
            ),
        };

        let mut request = self.request(Operation::CupsAddModifyPrinter, name)?;
        request
            .attributes_mut()
            .add(DelimiterTag::PrinterAttributes, IppAttribute::new(option, value));
        self.send_admin(request, "CUPS-Add-Modify-Printer").await
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the CUPS adapters
// ---------------------------------------------------------------------------

fn parse_uri(uri: &str) -> Result<Uri> {
    uri.parse()
        .map_err(|e| PlugwerkError::Config(format!("invalid CUPS URI '{uri}': {e}")))
}

/// `ipp://host:631` → `http://host:631`, `ipps://` → `https://`.
fn http_base(base: &str) -> String {
    if let Some(rest) = base.strip_prefix("ipps://") {
        format!("https://{rest}")
    } else if let Some(rest) = base.strip_prefix("ipp://") {
        format!("http://{rest}")
    } else {
        base.to_string()
    }
}

/// Send a request and insist on a successful IPP status.
async fn send<R>(endpoint: &Uri, request: R, call: &'static str) -> Result<IppRequestResponse>
where
    R: Into<IppRequestResponse>,
{
    let client = AsyncIppClient::new(endpoint.clone());
    let response = client
        .send(request)
        .await
        .map_err(|e| PlugwerkError::Transport {
            service: "cups",
            detail: format!("{call}: {e}"),
        })?;

    if !response.header().status_code().is_success() {
        let code = response.header().status_code();
        error!(status = ?code, call, "IPP request failed");
        return Err(PlugwerkError::Remote {
            call,
            detail: format!("status {code:?}"),
        });
    }
    Ok(response)
}

/// Flatten all attribute groups into a single map.
///
/// Multi-valued attributes keep the value's display form.  Group context is
/// dropped in favour of a simpler lookup.
fn flatten_attributes(attrs: &IppAttributes) -> PrinterAttributes {
    let mut map = HashMap::new();
    for group in attrs.groups() {
        for (name, attr) in group.attributes() {
            map.insert(name.clone(), format!("{}", attr.value()));
        }
    }
    map
}

/// Extract the `job-id` integer from a response's Job Attributes group.
fn extract_job_id(attrs: &IppAttributes) -> Option<i32> {
    for group in attrs.groups_of(DelimiterTag::JobAttributes) {
        if let Some(attr) = group.attributes().get("job-id")
            && let IppValue::Integer(id) = attr.value()
        {
            return Some(*id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_uri() {
        assert!(CupsClient::new("not a valid uri %%%").is_err());
    }

    #[test]
    fn printer_uri_appends_queue_path() {
        let client = CupsClient::new("ipp://localhost:631/").expect("client");
        let uri = client.printer_uri("Widget-2").expect("uri");
        assert_eq!(uri.to_string(), "ipp://localhost:631/printers/Widget-2");
    }

    #[test]
    fn http_base_swaps_scheme() {
        assert_eq!(http_base("ipp://localhost:631"), "http://localhost:631");
        assert_eq!(http_base("ipps://print.example:443"), "https://print.example:443");
        assert_eq!(http_base("http://localhost:631"), "http://localhost:631");
    }
}
