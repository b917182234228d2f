// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Locale-driven default paper size.

use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, info, warn};

use plugwerk_core::ppd::PpdFile;
use plugwerk_core::types::PaperSize;

use crate::SetupContext;
use crate::call::timed;

/// Option key the spooler stores a default under.
pub const PAGE_SIZE_DEFAULT_OPTION: &str = "PageSize-default";

/// Environment variables that decide the paper category, in precedence
/// order.
const LOCALE_VARIABLES: [&str; 3] = ["LC_ALL", "LC_PAPER", "LANG"];

/// Territories that use US Letter.
static LETTER_LOCALE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[^_.@]{2,3}_(BZ|CA|CL|CO|CR|GT|MX|NI|PA|PH|PR|SV|US|VE)").ok()
});

/// Paper size customary for `locale`.  Anything unrecognised is A4.
pub fn paper_size_for_locale(locale: &str) -> PaperSize {
    let letter = LETTER_LOCALE
        .as_ref()
        .is_some_and(|re| re.is_match(locale));
    if letter { PaperSize::Letter } else { PaperSize::A4 }
}

/// First non-empty locale variable, read through `lookup`.
pub fn locale_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    LOCALE_VARIABLES
        .iter()
        .filter_map(|key| lookup(*key))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// Paper locale of this process.
pub fn current_locale() -> String {
    locale_from(|key| std::env::var(key).ok())
}

/// `PageSize` choice to make the default for `size`, if the PPD has one
/// that is not already the default.
pub fn default_page_size_choice(ppd: &mut PpdFile, size: PaperSize) -> Option<String> {
    ppd.mark_defaults();
    ppd.find_option("PageSize")?
        .first_unmarked_with_prefix(size.label())
        .map(|choice| choice.choice.clone())
}

/// Set the queue's default page size from the locale.  Returns whether a
/// default was set.
pub async fn apply_default_paper_size(ctx: &SetupContext, queue: &str, driver_file: &Path) -> bool {
    let mut ppd = match PpdFile::open(driver_file) {
        Ok(ppd) => ppd,
        Err(e) => {
            warn!(error = %e, "cannot read driver file");
            return false;
        }
    };

    let locale = &ctx.locale;
    let size = paper_size_for_locale(locale);
    let Some(choice) = default_page_size_choice(&mut ppd, size) else {
        debug!(%locale, size = size.label(), "no page size to change");
        return false;
    };

    info!(%locale, %choice, "setting default page size");
    match timed(
        "PrinterAddOptionDefault",
        ctx.timeouts.query,
        ctx.collaborators.mechanism.printer_add_option_default(
            queue,
            PAGE_SIZE_DEFAULT_OPTION,
            std::slice::from_ref(&choice),
        ),
    )
    .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "cannot set default page size");
            false
        }
    }
}
