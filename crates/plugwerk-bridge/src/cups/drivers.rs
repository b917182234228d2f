// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Driver matching against the scheduler's PPD catalogue.
//
// CUPS-Get-PPDs filters the catalogue by device id (or make-and-model) and
// returns candidates best-first; each is then ranked locally into a match
// tier.  Missing executables are found by checking the filter programs a
// PPD names against the filter directory and PATH.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ipp::prelude::*;
use tracing::{debug, instrument, warn};

use plugwerk_core::error::Result;
use plugwerk_core::ppd::PpdFile;
use plugwerk_core::types::{DeviceIdentity, DriverCandidate, MatchTier};

use super::{parse_uri, send};
use crate::traits::DriverService;

/// Upper bound on catalogue entries requested per query.
const MAX_CANDIDATES: i32 = 50;

/// Driver service backed by CUPS-Get-PPDs.
pub struct CupsDriverService {
    endpoint: Uri,
    filter_dir: PathBuf,
}

impl CupsDriverService {
    pub fn new(base_uri: &str, filter_dir: PathBuf) -> Result<Self> {
        let endpoint = parse_uri(&format!("{}/", base_uri.trim_end_matches('/')))?;
        Ok(Self {
            endpoint,
            filter_dir,
        })
    }

    /// Whether `program` can be run by the scheduler.
    fn is_installed(&self, program: &str) -> bool {
        if program.contains('/') {
            return Path::new(program).is_file();
        }
        if self.filter_dir.join(program).is_file() {
            return true;
        }
        std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl DriverService for CupsDriverService {
    #[instrument(skip(self))]
    async fn get_best_drivers(
        &self,
        device_id: &str,
        make_and_model: &str,
        device_uri: &str,
    ) -> Result<Vec<DriverCandidate>> {
        let mut request = IppRequestResponse::new(IppVersion::v1_1(), Operation::CupsGetPPDs, None);
        let attrs = request.attributes_mut();
        attrs.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new("limit", IppValue::Integer(MAX_CANDIDATES)),
        );
        attrs.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                "requested-attributes",
                IppValue::Array(vec![
                    IppValue::Keyword("ppd-name".into()),
                    IppValue::Keyword("ppd-make-and-model".into()),
                    IppValue::Keyword("ppd-device-id".into()),
                ]),
            ),
        );
        if !device_id.is_empty() {
            attrs.add(
                DelimiterTag::OperationAttributes,
                IppAttribute::new("ppd-device-id", IppValue::TextWithoutLanguage(device_id.into())),
            );
        } else if !make_and_model.is_empty() {
            attrs.add(
                DelimiterTag::OperationAttributes,
                IppAttribute::new(
                    "ppd-make-and-model",
                    IppValue::TextWithoutLanguage(make_and_model.into()),
                ),
            );
        }

        let response = send(&self.endpoint, request, "CUPS-Get-PPDs").await?;

        let mut device = DeviceIdentity::from_device_id(device_id);
        if device.manufacturer.is_none()
            && let Some((mfg, mdl)) = make_and_model.split_once(' ')
        {
            device.manufacturer = Some(mfg.to_string());
            device.model = Some(mdl.to_string());
        }

        let candidates: Vec<DriverCandidate> = response
            .attributes()
            .groups_of(DelimiterTag::PrinterAttributes)
            .filter_map(|group| {
                let attrs = group.attributes();
                let text = |name: &str| {
                    attrs
                        .get(name)
                        .map(|attr| format!("{}", attr.value()))
                        .unwrap_or_default()
                };
                let name = text("ppd-name");
                if name.is_empty() {
                    return None;
                }
                let tier = classify_candidate(
                    &device,
                    &text("ppd-make-and-model"),
                    &text("ppd-device-id"),
                );
                Some(DriverCandidate::new(name, tier))
            })
            .collect();

        debug!(count = candidates.len(), device_uri, "driver candidates ranked");
        Ok(candidates)
    }

    #[instrument(skip(self))]
    async fn missing_executables(&self, driver_file: &Path) -> Result<Vec<String>> {
        let ppd = PpdFile::open(driver_file)?;

        let missing: BTreeSet<String> = ppd
            .filters
            .iter()
            .map(|filter| filter.program.as_str())
            .filter(|program| *program != "-" && !self.is_installed(program))
            .map(str::to_string)
            .collect();

        if !missing.is_empty() {
            warn!(count = missing.len(), "driver references missing programs");
        }
        Ok(missing.into_iter().collect())
    }
}

/// Rank one catalogue entry against the device.
///
/// Manufacturer and model both matching is `Exact`, promoted to
/// `ExactCommand` when the device supports every command set the driver
/// declares.  A generic driver is `Generic`; a driver from the same
/// manufacturer is `Close`.
pub fn classify_candidate(
    device: &DeviceIdentity,
    ppd_make_and_model: &str,
    ppd_device_id: &str,
) -> MatchTier {
    let driver = DeviceIdentity::from_device_id(ppd_device_id);
    let same = |a: &Option<String>, b: &Option<String>| match (a, b) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => false,
    };

    let same_manufacturer = same(&device.manufacturer, &driver.manufacturer)
        || device.manufacturer.as_ref().is_some_and(|mfg| {
            ppd_make_and_model
                .to_ascii_lowercase()
                .starts_with(&mfg.to_ascii_lowercase())
        });

    if same(&device.manufacturer, &driver.manufacturer) && same(&device.model, &driver.model) {
        return match (&device.command_set, &driver.command_set) {
            (Some(device_cmd), Some(driver_cmd)) if covers(device_cmd, driver_cmd) => {
                MatchTier::ExactCommand
            }
            _ => MatchTier::Exact,
        };
    }

    if ppd_make_and_model
        .to_ascii_lowercase()
        .starts_with("generic")
    {
        MatchTier::Generic
    } else if same_manufacturer {
        MatchTier::Close
    } else {
        MatchTier::None
    }
}

/// Whether every command set in `required` appears in `available`.
fn covers(available: &str, required: &str) -> bool {
    let available: BTreeSet<String> = available
        .split(',')
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
        .collect();
    let mut required = required
        .split(',')
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
        .peekable();
    required.peek().is_some() && required.all(|c| available.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn device(id: &str) -> DeviceIdentity {
        DeviceIdentity::from_device_id(id)
    }

    #[test]
    fn exact_match_with_command_set() {
        let dev = device("MFG:Acme;MDL:Widget;CMD:PCL,PJL,POSTSCRIPT;");
        let tier = classify_candidate(&dev, "Acme Widget", "MFG:ACME;MDL:widget;CMD:PCL;");
        assert_eq!(tier, MatchTier::ExactCommand);

        let tier = classify_candidate(&dev, "Acme Widget", "MFG:Acme;MDL:Widget;CMD:ESCPL2;");
        assert_eq!(tier, MatchTier::Exact);

        let tier = classify_candidate(&dev, "Acme Widget", "MFG:Acme;MDL:Widget;");
        assert_eq!(tier, MatchTier::Exact);
    }

    #[test]
    fn close_generic_and_none() {
        let dev = device("MFG:Acme;MDL:Widget;");
        assert_eq!(
            classify_candidate(&dev, "Acme Gadget", "MFG:Acme;MDL:Gadget;"),
            MatchTier::Close
        );
        assert_eq!(
            classify_candidate(&dev, "Generic PCL 6 Printer", ""),
            MatchTier::Generic
        );
        assert_eq!(
            classify_candidate(&dev, "Other Brand 1", "MFG:Other;MDL:1;"),
            MatchTier::None
        );
    }

    #[test]
    fn command_set_coverage() {
        assert!(covers("PCL, PJL", "pcl"));
        assert!(!covers("PCL", "PCL,POSTSCRIPT"));
        assert!(!covers("PCL", ""));
    }

    #[tokio::test]
    async fn missing_executables_are_deduplicated_and_sorted() {
        let filter_dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(filter_dir.path().join("rastertoacme"), b"").expect("write filter");

        let mut ppd = tempfile::NamedTempFile::new().expect("temp ppd");
        write!(
            ppd,
            "*PPD-Adobe: \"4.3\"\n\
             *cupsFilter: \"application/vnd.cups-raster 0 rastertoacme\"\n\
             *cupsFilter: \"application/vnd.cups-pdf 0 zz-plugwerk-missing\"\n\
             *cupsFilter: \"application/vnd.cups-postscript 0 zz-plugwerk-missing\"\n\
             *cupsFilter2: \"application/pdf application/vnd.acme 0 /nonexistent/plugwerk/aa-tool\"\n\
             *cupsFilter: \"application/vnd.cups-command 0 -\"\n"
        )
        .expect("write ppd");

        let service = CupsDriverService::new("ipp://localhost:631", filter_dir.path().into())
            .expect("service");
        let missing = service.missing_executables(ppd.path()).await.expect("scan");
        assert_eq!(missing, ["/nonexistent/plugwerk/aa-tool", "zz-plugwerk-missing"]);
    }
}
